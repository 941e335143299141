//! In-memory observational data for one cluster.
//!
//! - [`Variable`]: values + unit tag + free-form metadata
//! - [`Dataset`]: a named group of variables (e.g. `proper_motion/high_mass`)
//! - [`Observations`]: every dataset of a cluster, cluster metadata and the
//!   stored initial parameter values
//!
//! All three are immutable once built; share them across threads behind an
//! `Arc`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{Theta, Unit, convert_all};
use crate::error::{Error, Result};

/// Scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Number(f64),
    Text(String),
}

impl MetaValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Number(v) => Some(*v),
            MetaValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Number(_) => None,
            MetaValue::Text(s) => Some(s),
        }
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        MetaValue::Number(value)
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Text(value.to_string())
    }
}

/// One observed quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    values: Vec<f64>,
    unit: Option<Unit>,
    mdata: BTreeMap<String, MetaValue>,
}

impl Variable {
    pub fn new(values: Vec<f64>, unit: Option<Unit>) -> Self {
        Self {
            values,
            unit,
            mdata: BTreeMap::new(),
        }
    }

    pub fn with_mdata(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.mdata.insert(key.into(), value.into());
        self
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn unit(&self) -> Option<Unit> {
        self.unit
    }

    pub fn mdata(&self) -> &BTreeMap<String, MetaValue> {
        &self.mdata
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A named group of variables plus group metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    name: String,
    variables: BTreeMap<String, Variable>,
    mdata: BTreeMap<String, MetaValue>,
}

impl Dataset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: BTreeMap::new(),
            mdata: BTreeMap::new(),
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, variable: Variable) -> Self {
        self.variables.insert(name.into(), variable);
        self
    }

    pub fn with_mdata(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.mdata.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variables(&self) -> &BTreeMap<String, Variable> {
        &self.variables
    }

    pub fn mdata(&self) -> &BTreeMap<String, MetaValue> {
        &self.mdata
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Fixed tracer mass (`m` metadata, Msun), if this dataset has one.
    pub fn mass(&self) -> Option<f64> {
        self.mdata.get("m").and_then(MetaValue::as_f64)
    }

    pub fn variable(&self, name: &str) -> Result<&Variable> {
        self.variables.get(name).ok_or_else(|| Error::MissingVariable {
            dataset: self.name.clone(),
            variable: name.to_string(),
        })
    }

    /// Raw values of a variable, in whatever unit they were stored in.
    pub fn values(&self, name: &str) -> Result<&[f64]> {
        Ok(self.variable(name)?.values())
    }

    pub fn unit_of(&self, name: &str) -> Result<Unit> {
        self.variable(name)?.unit().ok_or_else(|| Error::MissingUnit {
            dataset: self.name.clone(),
            variable: name.to_string(),
        })
    }

    /// Values of `name` converted to `unit`. `d` is the distance in kpc.
    ///
    /// A variable without a unit is only accepted as dimensionless.
    pub fn values_in(&self, name: &str, unit: Unit, d: f64) -> Result<Vec<f64>> {
        let var = self.variable(name)?;
        match var.unit() {
            Some(from) => convert_all(var.values(), from, unit, d),
            None if unit == Unit::Dimensionless => Ok(var.values().to_vec()),
            None => Err(Error::MissingUnit {
                dataset: self.name.clone(),
                variable: name.to_string(),
            }),
        }
    }

    /// Whether `name` has either a symmetric or a complete asymmetric
    /// uncertainty.
    pub fn has_uncertainty(&self, name: &str) -> bool {
        self.contains(&format!("Δ{name}"))
            || (self.contains(&format!("Δ{name},up")) && self.contains(&format!("Δ{name},down")))
    }

    /// Uncertainties of `name` in `unit`.
    ///
    /// `model_at_obs` is the model prediction already interpolated to the
    /// observed points (in `unit`). It is only consulted for asymmetric
    /// errors: where the model lies above the observation the upper error is
    /// used, otherwise the lower one.
    pub fn uncertainty(
        &self,
        name: &str,
        model_at_obs: &[f64],
        unit: Unit,
        d: f64,
    ) -> Result<Vec<f64>> {
        let symmetric = format!("Δ{name}");
        if self.contains(&symmetric) {
            return self.error_values_in(&symmetric, name, unit, d);
        }

        let up_key = format!("Δ{name},up");
        let down_key = format!("Δ{name},down");
        if !(self.contains(&up_key) && self.contains(&down_key)) {
            return Err(Error::MissingUncertainty {
                dataset: self.name.clone(),
                variable: name.to_string(),
            });
        }

        let observed = self.values_in(name, unit, d)?;
        let up = self.error_values_in(&up_key, name, unit, d)?;
        let down = self.error_values_in(&down_key, name, unit, d)?;

        Ok(observed
            .iter()
            .zip(model_at_obs.iter())
            .enumerate()
            .map(|(i, (&obs, &model))| if model > obs { up[i] } else { down[i] })
            .collect())
    }

    /// Error arrays may omit their unit, in which case they share the unit of
    /// the variable they describe.
    fn error_values_in(&self, key: &str, parent: &str, unit: Unit, d: f64) -> Result<Vec<f64>> {
        let err = self.variable(key)?;
        let from = err.unit().or_else(|| self.get(parent).and_then(Variable::unit));
        match from {
            Some(from) => convert_all(err.values(), from, unit, d),
            None if unit == Unit::Dimensionless => Ok(err.values().to_vec()),
            None => Err(Error::MissingUnit {
                dataset: self.name.clone(),
                variable: key.to_string(),
            }),
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dataset('{}')", self.name)
    }
}

/// Every dataset of one cluster.
#[derive(Debug, Clone)]
pub struct Observations {
    cluster: String,
    datasets: BTreeMap<String, Dataset>,
    mdata: BTreeMap<String, MetaValue>,
    initials: Theta,
}

impl Observations {
    /// Assemble observations from datasets.
    ///
    /// Only leaf groups are kept: a dataset whose name is a parent path of
    /// another dataset (`proper_motion` vs `proper_motion/high_mass`) is
    /// dropped.
    pub fn new(
        cluster: impl Into<String>,
        datasets: Vec<Dataset>,
        mdata: BTreeMap<String, MetaValue>,
        initials: Theta,
    ) -> Self {
        let names: Vec<String> = datasets.iter().map(|d| d.name.clone()).collect();
        let mut map = BTreeMap::new();
        for dataset in datasets {
            let prefix = format!("{}/", dataset.name);
            if names.iter().any(|other| other.starts_with(&prefix)) {
                log::debug!("dropping parent group '{}' in favour of its subgroups", dataset.name);
                continue;
            }
            map.insert(dataset.name.clone(), dataset);
        }
        Self {
            cluster: cluster.into(),
            datasets: map,
            mdata,
            initials,
        }
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Datasets in iteration (name) order.
    pub fn datasets(&self) -> &BTreeMap<String, Dataset> {
        &self.datasets
    }

    pub fn mdata(&self) -> &BTreeMap<String, MetaValue> {
        &self.mdata
    }

    pub fn mdata_f64(&self, key: &str) -> Option<f64> {
        self.mdata.get(key).and_then(MetaValue::as_f64)
    }

    /// Numeric cluster metadata that must be present.
    pub fn require_mdata(&self, key: &str) -> Result<f64> {
        self.mdata_f64(key)
            .ok_or_else(|| Error::MissingMetadata(format!("{key} (cluster {})", self.cluster)))
    }

    pub fn initials(&self) -> &Theta {
        &self.initials
    }

    pub fn dataset(&self, key: &str) -> Result<&Dataset> {
        self.datasets
            .get(key)
            .ok_or_else(|| Error::Validation(format!("dataset '{key}' does not exist")))
    }

    /// Look up a dataset variable by path (`"group/variable"`).
    pub fn get(&self, key: &str) -> Result<&Variable> {
        let Some((group, name)) = key.rsplit_once('/') else {
            return Err(Error::Validation(format!("'{key}' does not name a variable")));
        };
        self.dataset(group)?.get(name).ok_or_else(|| {
            Error::Validation(format!("dataset or variable '{key}' does not exist"))
        })
    }

    /// Tracer masses in dataset iteration order.
    pub fn tracer_masses(&self) -> Vec<f64> {
        self.datasets.values().filter_map(Dataset::mass).collect()
    }
}

impl fmt::Display for Observations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Observations", self.cluster)
    }
}
