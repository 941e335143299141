//! Galactic-field millisecond pulsar catalogue.
//!
//! The catalogue is a whitespace-separated text table (a `psrcat -x` export).
//! Rows are either the six used columns
//!
//! `P  Pdot  Pdot_pm  b  l  D`
//!
//! or a full export, from which columns 0, 3, 6, 7, 8 and 9 are taken (the
//! others carry uncertainties and references). `#` starts a comment.
//! Units: P in s, Pdot and Pdot_pm in s/s, b and l in degrees, D in kpc.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Column positions in a full export.
const EXPORT_COLUMNS: [usize; 6] = [0, 3, 6, 7, 8, 9];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldPulsar {
    pub period: f64,
    pub pdot: f64,
    /// Pdot corrected for the Shklovskii effect.
    pub pdot_pm: f64,
    pub b_deg: f64,
    pub l_deg: f64,
    pub distance_kpc: f64,
}

/// A catalogue row that could not be used.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct FieldCatalogue {
    pub pulsars: Vec<FieldPulsar>,
    pub row_errors: Vec<RowError>,
}

pub fn read_catalogue(path: impl AsRef<Path>) -> Result<FieldCatalogue> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read pulsar catalogue '{}': {e}", path.display()),
        ))
    })?;
    parse_catalogue(&text)
}

/// Parse catalogue text. Unparseable rows (psrcat writes `*` for missing
/// values) are skipped and reported; an empty result is an error.
pub fn parse_catalogue(text: &str) -> Result<FieldCatalogue> {
    let mut pulsars = Vec::new();
    let mut row_errors = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        match parse_row(content) {
            Ok(p) => pulsars.push(p),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if !row_errors.is_empty() {
        log::debug!("skipped {} unusable catalogue rows", row_errors.len());
    }
    if pulsars.is_empty() {
        return Err(Error::Validation("field pulsar catalogue has no usable rows".to_string()));
    }

    Ok(FieldCatalogue {
        pulsars,
        row_errors,
    })
}

fn parse_row(content: &str) -> std::result::Result<FieldPulsar, String> {
    let tokens: Vec<&str> = content.split_whitespace().collect();
    let cols: [usize; 6] = match tokens.len() {
        6 => [0, 1, 2, 3, 4, 5],
        n if n >= 10 => EXPORT_COLUMNS,
        n => return Err(format!("expected 6 or at least 10 columns, found {n}")),
    };

    let mut vals = [0.0; 6];
    for (slot, &col) in vals.iter_mut().zip(cols.iter()) {
        let tok = tokens[col];
        *slot = tok
            .parse::<f64>()
            .map_err(|_| format!("column {col}: cannot parse '{tok}'"))?;
    }

    Ok(FieldPulsar {
        period: vals[0],
        pdot: vals[1],
        pdot_pm: vals[2],
        b_deg: vals[3],
        l_deg: vals[4],
        distance_kpc: vals[5],
    })
}
