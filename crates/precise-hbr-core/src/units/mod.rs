//! Laboratory unit conversion.
//!
//! Every analyte has one canonical unit the scoring math runs in, plus a
//! table of accepted source-unit aliases with multiplicative factors.
//! A value the table cannot convert is reported absent, never passed
//! through in a foreign unit.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{Gender, Observation};

/// Laboratory analytes the pipeline reads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Analyte {
    Hemoglobin,
    Creatinine,
    Egfr,
    Wbc,
    Platelets,
}

impl Analyte {
    pub const ALL: [Analyte; 5] = [
        Analyte::Hemoglobin,
        Analyte::Creatinine,
        Analyte::Egfr,
        Analyte::Wbc,
        Analyte::Platelets,
    ];
}

/// Canonical unit for one analyte plus the accepted source-unit aliases.
/// Alias keys are lowercased; the factor converts source → canonical.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitSpec {
    pub unit: String,
    #[serde(default)]
    pub factors: HashMap<String, f64>,
}

impl UnitSpec {
    fn new(unit: &str, factors: &[(&str, f64)]) -> Self {
        Self {
            unit: unit.to_string(),
            factors: factors
                .iter()
                .map(|(alias, factor)| (alias.to_string(), *factor))
                .collect(),
        }
    }

    /// Convert a value from `source_unit` to this spec's canonical unit.
    /// Returns `None` when no conversion rule exists.
    pub fn convert(&self, value: f64, source_unit: &str) -> Option<f64> {
        let source = source_unit.to_lowercase();
        if source == self.unit.to_lowercase() {
            return Some(value);
        }
        if let Some(factor) = self.factors.get(&source) {
            let converted = value * factor;
            tracing::debug!(
                "converted {value} {source} to {converted:.2} {}",
                self.unit
            );
            return Some(converted);
        }
        tracing::warn!(
            "unit mismatch and no conversion rule: received '{source}', expected '{}'",
            self.unit
        );
        None
    }
}

/// Conversion table for all analytes. Deserializable so deployments can
/// extend the alias lists; defaults to the fixed canonical table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct UnitTable {
    pub hemoglobin: UnitSpec,
    pub creatinine: UnitSpec,
    pub egfr: UnitSpec,
    pub wbc: UnitSpec,
    pub platelets: UnitSpec,
}

impl Default for UnitTable {
    fn default() -> Self {
        Self {
            hemoglobin: UnitSpec::new(
                "g/dl",
                &[
                    ("g/l", 0.1),
                    // Hb molar mass 64,458 g/mol
                    ("mmol/l", 1.61135),
                    ("mg/dl", 0.001),
                ],
            ),
            creatinine: UnitSpec::new(
                "mg/dl",
                &[("umol/l", 0.0113), ("µmol/l", 0.0113)],
            ),
            egfr: UnitSpec::new(
                "ml/min/1.73m2",
                &[
                    ("ml/min/1.73m2", 1.0),
                    // Cerner writes the denominator in braces
                    ("ml/min/{1.73_m2}", 1.0),
                    ("ml/min/1.73m^2", 1.0),
                    ("ml/min/1.73 m2", 1.0),
                    ("ml/min/1.73 m^2", 1.0),
                    ("ml/min per 1.73m2", 1.0),
                    ("ml/min/bsa", 1.0),
                    ("ml/min", 1.0),
                ],
            ),
            wbc: UnitSpec::new(
                "10*9/l",
                &[
                    ("10*3/ul", 1.0),
                    ("k/ul", 1.0),
                    ("/ul", 0.001),
                    ("/mm3", 0.001),
                    ("10^9/l", 1.0),
                    ("giga/l", 1.0),
                ],
            ),
            platelets: UnitSpec::new(
                "10*9/l",
                &[
                    ("10*3/ul", 1.0),
                    ("k/ul", 1.0),
                    ("/ul", 0.001),
                    ("10^9/l", 1.0),
                    ("giga/l", 1.0),
                ],
            ),
        }
    }
}

impl UnitTable {
    /// Spec for one analyte.
    pub fn spec(&self, analyte: Analyte) -> &UnitSpec {
        match analyte {
            Analyte::Hemoglobin => &self.hemoglobin,
            Analyte::Creatinine => &self.creatinine,
            Analyte::Egfr => &self.egfr,
            Analyte::Wbc => &self.wbc,
            Analyte::Platelets => &self.platelets,
        }
    }

    /// Extract a numeric value from an observation in the analyte's
    /// canonical unit. `None` when the value is absent, non-numeric, or
    /// the source unit cannot be converted.
    pub fn value_from_observation(&self, obs: &Observation, analyte: Analyte) -> Option<f64> {
        let quantity = obs.value_quantity.as_ref()?;
        let value = quantity.value?;
        let source_unit = quantity.unit.as_deref().unwrap_or_default();
        self.spec(analyte).convert(value, source_unit)
    }
}

/// An eGFR estimate derived from creatinine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EgfrEstimate {
    /// mL/min/1.73m², rounded to the nearest integer.
    pub value: f64,
    pub method: &'static str,
}

/// Estimate eGFR with the race-free CKD-EPI 2021 equation.
///
/// Expects creatinine in mg/dL and age in years; gender selects the sex
/// coefficients. Callers gate on input availability — all three arguments
/// are required by construction.
pub fn calculate_egfr(cr_mg_dl: f64, age_years: f64, gender: Gender) -> EgfrEstimate {
    let (k, alpha) = match gender {
        Gender::Female => (0.7, -0.241),
        Gender::Male => (0.9, -0.302),
    };
    let ratio = cr_mg_dl / k;
    let mut egfr = 142.0
        * ratio.min(1.0).powf(alpha)
        * ratio.max(1.0).powf(-1.2)
        * 0.9938_f64.powf(age_years);
    if gender == Gender::Female {
        egfr *= 1.012;
    }
    EgfrEstimate {
        value: egfr.round(),
        method: "CKD-EPI 2021",
    }
}
