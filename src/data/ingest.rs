//! Cluster document ingest and schema validation.
//!
//! A cluster document is JSON with nested groups:
//!
//! ```json
//! {
//!   "cluster": "NGC0104",
//!   "mdata": {"FeHe": -0.72, "μ": 5.6, "b": -44.9, "l": 305.9},
//!   "initials": {"W0": 6.2},
//!   "groups": {
//!     "number_density": {
//!       "variables": {
//!         "r": {"values": [...], "unit": "arcmin"},
//!         "Σ": {"values": [...], "unit": "1/arcmin2"},
//!         "ΔΣ": {"values": [...]}
//!       }
//!     },
//!     "proper_motion": {"groups": {"high_mass": {...}, "low_mass": {...}}}
//!   }
//! }
//! ```
//!
//! Only leaf groups become datasets. Every dataset of a known kind is checked
//! against that kind's required variables, uncertainties and units, so the
//! likelihood code never has to re-validate.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::config::FitConfig;
use crate::data::{Dataset, DatasetKind, MetaValue, Observations, Variable};
use crate::domain::{Param, Theta, Unit};
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct ClusterDocument {
    cluster: String,
    #[serde(default)]
    mdata: BTreeMap<String, MetaValue>,
    #[serde(default)]
    initials: BTreeMap<String, f64>,
    #[serde(default)]
    groups: BTreeMap<String, GroupDocument>,
}

#[derive(Debug, Default, Deserialize)]
struct GroupDocument {
    #[serde(default)]
    mdata: BTreeMap<String, MetaValue>,
    #[serde(default)]
    variables: BTreeMap<String, VariableDocument>,
    #[serde(default)]
    groups: BTreeMap<String, GroupDocument>,
}

#[derive(Debug, Deserialize)]
struct VariableDocument {
    values: Vec<f64>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    mdata: BTreeMap<String, MetaValue>,
}

/// Load `<data_dir>/clusters/<cluster>.json`.
pub fn load_cluster(cluster: &str, config: &FitConfig) -> Result<Observations> {
    load_observations(config.cluster_path(cluster))
}

/// Load and validate a cluster document from disk.
pub fn load_observations(path: impl AsRef<Path>) -> Result<Observations> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read cluster file '{}': {e}", path.display()),
        ))
    })?;
    parse_observations(&text)
}

/// Parse and validate a cluster document.
pub fn parse_observations(text: &str) -> Result<Observations> {
    let doc: ClusterDocument = serde_json::from_str(text)?;

    let mut datasets = Vec::new();
    for (name, group) in doc.groups {
        flatten_group(name, group, &mut datasets)?;
    }

    for dataset in &datasets {
        validate_dataset(dataset)?;
    }

    let initials = resolve_initials(&doc.initials);
    let observations = Observations::new(doc.cluster, datasets, doc.mdata, initials);
    log::debug!(
        "loaded {} with {} datasets",
        observations,
        observations.datasets().len()
    );
    Ok(observations)
}

fn flatten_group(path: String, group: GroupDocument, out: &mut Vec<Dataset>) -> Result<()> {
    if !group.groups.is_empty() {
        if !group.variables.is_empty() {
            log::debug!("group '{path}' has subgroups; its own variables are ignored");
        }
        for (name, child) in group.groups {
            flatten_group(format!("{path}/{name}"), child, out)?;
        }
        return Ok(());
    }

    let mut dataset = Dataset::new(path.clone());
    for (key, value) in group.mdata {
        dataset = dataset.with_mdata(key, value);
    }
    for (name, var) in group.variables {
        let variable = build_variable(&path, &name, var)?;
        dataset = dataset.with_variable(name, variable);
    }
    out.push(dataset);
    Ok(())
}

fn build_variable(dataset: &str, name: &str, doc: VariableDocument) -> Result<Variable> {
    // The unit may also be stored in the variable's metadata.
    let unit_str = doc
        .unit
        .or_else(|| doc.mdata.get("unit").and_then(MetaValue::as_str).map(str::to_string));

    let unit = match unit_str {
        Some(s) => Some(s.parse::<Unit>().map_err(|_| {
            Error::Validation(format!("{dataset}/{name}: unrecognised unit '{s}'"))
        })?),
        None => None,
    };

    let mut variable = Variable::new(doc.values, unit);
    for (key, value) in doc.mdata {
        if key != "unit" {
            variable = variable.with_mdata(key, value);
        }
    }
    Ok(variable)
}

/// Stored initials override the defaults; unknown names are ignored.
fn resolve_initials(stored: &BTreeMap<String, f64>) -> Theta {
    let mut theta = Theta::default();
    for (name, &value) in stored {
        match Param::from_name(name) {
            Some(param) => theta.set(param, value),
            None => log::warn!("ignoring unknown initial parameter '{name}'"),
        }
    }
    theta
}

/// Check that a dataset carries everything its kind's likelihood needs.
///
/// Datasets whose key matches no known kind are accepted as-is.
pub fn validate_dataset(dataset: &Dataset) -> Result<()> {
    let Some(kind) = DatasetKind::classify(dataset.name()) else {
        return Ok(());
    };

    match kind {
        DatasetKind::Pulsar => {
            require_unit(dataset, "r")?;
            require_unit(dataset, "P")?;
            require_error(dataset, "P")?;
            require_unit(dataset, "Pdot")?;
            require_error(dataset, "Pdot")?;
            require_aligned(dataset, &["r", "P", "Pdot"])?;
        }
        DatasetKind::VelocityDispersion => {
            require_unit(dataset, "r")?;
            require_unit(dataset, "σ")?;
            require_error(dataset, "σ")?;
            require_aligned(dataset, &["r", "σ"])?;
        }
        DatasetKind::NumberDensity => {
            require_unit(dataset, "r")?;
            require_unit(dataset, "Σ")?;
            require_error(dataset, "Σ")?;
            require_aligned(dataset, &["r", "Σ"])?;
        }
        DatasetKind::ProperMotion => {
            require_unit(dataset, "r")?;
            let fields = ["PM_tot", "PM_ratio", "PM_R", "PM_T"];
            if !fields.iter().any(|f| dataset.contains(f)) {
                return Err(Error::MissingVariable {
                    dataset: dataset.name().to_string(),
                    variable: fields.join(" | "),
                });
            }
            let present: Vec<&str> = fields.into_iter().filter(|f| dataset.contains(f)).collect();
            for &field in &present {
                // The ratio is dimensionless and may omit its unit.
                if field != "PM_ratio" {
                    require_unit(dataset, field)?;
                }
                require_error(dataset, field)?;
            }
            let mut columns = vec!["r"];
            columns.extend(present);
            require_aligned(dataset, &columns)?;
        }
        DatasetKind::MassFunction => {
            for name in ["N", "ΔN", "mbin_mean", "mbin_width"] {
                dataset.variable(name)?;
            }
            require_unit(dataset, "mbin_mean")?;
            require_unit(dataset, "mbin_width")?;
            let location: &[&str] = if dataset.contains("r1") || dataset.contains("r2") {
                require_unit(dataset, "r1")?;
                require_unit(dataset, "r2")?;
                &["r1", "r2"]
            } else {
                dataset.variable("bin")?;
                &["bin"]
            };
            let mut columns = vec!["N", "mbin_mean", "mbin_width"];
            columns.extend_from_slice(location);
            require_aligned(dataset, &columns)?;
        }
    }
    Ok(())
}

fn require_unit(dataset: &Dataset, name: &str) -> Result<()> {
    dataset.unit_of(name).map(|_| ())
}

fn require_error(dataset: &Dataset, name: &str) -> Result<()> {
    if dataset.has_uncertainty(name) {
        Ok(())
    } else {
        Err(Error::MissingUncertainty {
            dataset: dataset.name().to_string(),
            variable: name.to_string(),
        })
    }
}

/// Every error column stored for `name`: `Δname`, `Δname,up`, `Δname,down`.
fn error_keys(dataset: &Dataset, name: &str) -> Vec<String> {
    [format!("Δ{name}"), format!("Δ{name},up"), format!("Δ{name},down")]
        .into_iter()
        .filter(|key| dataset.contains(key))
        .collect()
}

/// The likelihoods index every column and its errors point by point.
fn require_aligned(dataset: &Dataset, columns: &[&str]) -> Result<()> {
    let mut names = Vec::new();
    for &column in columns {
        names.push(column.to_string());
        names.extend(error_keys(dataset, column));
    }
    require_equal_lengths(dataset, &names)
}

fn require_equal_lengths(dataset: &Dataset, names: &[String]) -> Result<()> {
    let mut expected = None;
    for name in names {
        let len = dataset.variable(name)?.len();
        match expected {
            None => expected = Some(len),
            Some(n) if n != len => {
                return Err(Error::Validation(format!(
                    "{}: '{name}' has {len} values, expected {n}",
                    dataset.name()
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "cluster": "TEST",
        "mdata": {"FeHe": -0.72, "μ": 5.0, "b": -44.9, "l": 305.9, "source": "catalogue"},
        "initials": {"W0": 7.5, "d": 4.45, "bogus": 1.0},
        "groups": {
            "number_density": {
                "variables": {
                    "r": {"values": [1.0, 2.0, 3.0], "unit": "pc"},
                    "Σ": {"values": [10.0, 5.0, 2.0], "mdata": {"unit": "1/pc2"}},
                    "ΔΣ": {"values": [1.0, 1.0, 1.0]}
                }
            },
            "proper_motion": {
                "groups": {
                    "high_mass": {
                        "mdata": {"m": 0.85},
                        "variables": {
                            "r": {"values": [30.0], "unit": "arcsec"},
                            "PM_tot": {"values": [0.5], "unit": "mas/yr"},
                            "ΔPM_tot": {"values": [0.05], "unit": "mas/yr"}
                        }
                    }
                }
            }
        }
    }"#;

    #[test]
    fn parses_leaf_groups_and_metadata() {
        let obs = parse_observations(DOC).unwrap();
        assert_eq!(obs.cluster(), "TEST");
        let keys: Vec<&String> = obs.datasets().keys().collect();
        assert_eq!(keys, vec!["number_density", "proper_motion/high_mass"]);

        assert_eq!(obs.mdata_f64("FeHe"), Some(-0.72));
        assert_eq!(obs.mdata_f64("source"), None);

        let pm = obs.dataset("proper_motion/high_mass").unwrap();
        assert_eq!(pm.mass(), Some(0.85));
        assert_eq!(obs.get("number_density/Σ").unwrap().unit(), Some(Unit::PerPc2));
    }

    #[test]
    fn stored_initials_override_defaults() {
        let obs = parse_observations(DOC).unwrap();
        assert_eq!(obs.initials().w0, 7.5);
        assert_eq!(obs.initials().d, 4.45);
        assert_eq!(obs.initials().m, Theta::default().m);
    }

    #[test]
    fn missing_uncertainty_fails_at_load() {
        let doc = r#"{
            "cluster": "TEST",
            "groups": {"velocity_dispersion": {"variables": {
                "r": {"values": [1.0], "unit": "arcsec"},
                "σ": {"values": [5.0], "unit": "km/s"}
            }}}
        }"#;
        let err = parse_observations(doc).unwrap_err();
        assert!(matches!(err, Error::MissingUncertainty { ref variable, .. } if variable == "σ"));
    }

    #[test]
    fn missing_unit_fails_at_load() {
        let doc = r#"{
            "cluster": "TEST",
            "groups": {"number_density": {"variables": {
                "r": {"values": [1.0]},
                "Σ": {"values": [5.0], "unit": "1/arcmin2"},
                "ΔΣ": {"values": [0.5]}
            }}}
        }"#;
        assert!(matches!(parse_observations(doc), Err(Error::MissingUnit { .. })));
    }

    #[test]
    fn unknown_unit_is_rejected() {
        let doc = r#"{
            "cluster": "TEST",
            "groups": {"other": {"variables": {"x": {"values": [1.0], "unit": "furlong"}}}}
        }"#;
        assert!(matches!(parse_observations(doc), Err(Error::Validation(_))));
    }

    #[test]
    fn proper_motion_needs_some_component() {
        let ds = Dataset::new("proper_motion")
            .with_variable("r", Variable::new(vec![1.0], Some(Unit::Arcsec)));
        assert!(matches!(validate_dataset(&ds), Err(Error::MissingVariable { .. })));

        let ds = ds
            .with_variable("PM_ratio", Variable::new(vec![1.1], None))
            .with_variable("ΔPM_ratio", Variable::new(vec![0.1], None));
        assert!(validate_dataset(&ds).is_ok());
    }

    #[test]
    fn mass_function_needs_bin_or_radii() {
        let base = Dataset::new("mass_function")
            .with_variable("N", Variable::new(vec![10.0], None))
            .with_variable("ΔN", Variable::new(vec![3.0], None))
            .with_variable("mbin_mean", Variable::new(vec![0.5], Some(Unit::SolarMass)))
            .with_variable("mbin_width", Variable::new(vec![0.1], Some(Unit::SolarMass)));
        assert!(matches!(validate_dataset(&base), Err(Error::MissingVariable { .. })));

        let with_bin = base.clone().with_variable("bin", Variable::new(vec![0.0], None));
        assert!(validate_dataset(&with_bin).is_ok());

        let with_radii = base
            .with_variable("r1", Variable::new(vec![0.0], Some(Unit::Arcmin)))
            .with_variable("r2", Variable::new(vec![0.4], Some(Unit::Arcmin)));
        assert!(validate_dataset(&with_radii).is_ok());
    }

    fn assert_length_mismatch(ds: &Dataset, column: &str) {
        match validate_dataset(ds) {
            Err(Error::Validation(msg)) => assert!(msg.contains(column), "{msg}"),
            other => panic!("expected a length mismatch on {column}, got {other:?}"),
        }
    }

    #[test]
    fn number_density_columns_must_align() {
        let doc = r#"{
            "cluster": "TEST",
            "groups": {"number_density": {"variables": {
                "r": {"values": [1.0, 2.0], "unit": "pc"},
                "Σ": {"values": [10.0, 5.0, 2.0], "unit": "1/pc2"},
                "ΔΣ": {"values": [1.0, 1.0, 1.0]}
            }}}
        }"#;
        assert!(matches!(parse_observations(doc), Err(Error::Validation(_))));

        let ds = Dataset::new("number_density")
            .with_variable("r", Variable::new(vec![1.0, 2.0], Some(Unit::Parsec)))
            .with_variable("Σ", Variable::new(vec![10.0, 5.0], Some(Unit::PerPc2)))
            .with_variable("ΔΣ", Variable::new(vec![1.0], None));
        assert_length_mismatch(&ds, "ΔΣ");
    }

    #[test]
    fn dispersion_asymmetric_errors_must_align() {
        let ds = Dataset::new("velocity_dispersion")
            .with_variable("r", Variable::new(vec![1.0, 2.0], Some(Unit::Arcsec)))
            .with_variable("σ", Variable::new(vec![8.0, 6.0], Some(Unit::KmPerSecond)))
            .with_variable("Δσ,up", Variable::new(vec![0.5, 0.5], None))
            .with_variable("Δσ,down", Variable::new(vec![0.3], None));
        assert_length_mismatch(&ds, "Δσ,down");

        let ok = ds.with_variable("Δσ,down", Variable::new(vec![0.3, 0.3], None));
        assert!(validate_dataset(&ok).is_ok());
    }

    #[test]
    fn pulsar_columns_must_align() {
        let ds = Dataset::new("pulsar")
            .with_variable("r", Variable::new(vec![1.0, 2.0], Some(Unit::Arcsec)))
            .with_variable("P", Variable::new(vec![0.004, 0.005], Some(Unit::Second)))
            .with_variable("ΔP", Variable::new(vec![1e-12, 1e-12], Some(Unit::Second)))
            .with_variable("Pdot", Variable::new(vec![1e-20], Some(Unit::Dimensionless)))
            .with_variable("ΔPdot", Variable::new(vec![1e-22], Some(Unit::Dimensionless)));
        assert_length_mismatch(&ds, "Pdot");
    }

    #[test]
    fn proper_motion_columns_must_align() {
        let ds = Dataset::new("proper_motion")
            .with_variable("r", Variable::new(vec![10.0, 20.0, 30.0], Some(Unit::Arcsec)))
            .with_variable("PM_tot", Variable::new(vec![0.5, 0.4, 0.3], Some(Unit::MasPerYear)))
            .with_variable("ΔPM_tot", Variable::new(vec![0.05; 3], Some(Unit::MasPerYear)))
            .with_variable("PM_ratio", Variable::new(vec![1.0, 1.1], None))
            .with_variable("ΔPM_ratio", Variable::new(vec![0.1, 0.1], None));
        assert_length_mismatch(&ds, "PM_ratio");
    }

    #[test]
    fn mass_function_location_must_align_with_counts() {
        let base = Dataset::new("mass_function")
            .with_variable("N", Variable::new(vec![10.0, 8.0], None))
            .with_variable("ΔN", Variable::new(vec![3.0, 3.0], None))
            .with_variable("mbin_mean", Variable::new(vec![0.5, 0.6], Some(Unit::SolarMass)))
            .with_variable("mbin_width", Variable::new(vec![0.1, 0.1], Some(Unit::SolarMass)));

        let short_bin = base.clone().with_variable("bin", Variable::new(vec![0.0], None));
        assert_length_mismatch(&short_bin, "bin");

        let short_r2 = base
            .with_variable("r1", Variable::new(vec![0.0, 0.0], Some(Unit::Arcmin)))
            .with_variable("r2", Variable::new(vec![0.4], Some(Unit::Arcmin)));
        assert_length_mismatch(&short_r2, "r2");
    }

    #[test]
    fn unclassified_datasets_pass() {
        assert!(validate_dataset(&Dataset::new("photometry")).is_ok());
    }
}
