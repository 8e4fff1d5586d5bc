//! Score input / output models for the PRECISE-HBR engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A continuous input the extractor could not obtain.
///
/// Binary and count inputs are never missing: absence of matching evidence
/// is treated as a confirmed negative. Only the four continuous variables
/// participate here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MissingField {
    Age,
    Hemoglobin,
    Egfr,
    Wbc,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MissingField::Age => "Age",
            MissingField::Hemoglobin => "Hemoglobin",
            MissingField::Egfr => "eGFR",
            MissingField::Wbc => "WBC",
        };
        f.write_str(label)
    }
}

/// Where an eGFR value came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EgfrSource {
    /// A directly reported eGFR observation.
    Direct,
    /// Derived from creatinine via the CKD-EPI 2021 equation.
    CkdEpi2021,
}

impl fmt::Display for EgfrSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EgfrSource::Direct => f.write_str("Direct eGFR"),
            EgfrSource::CkdEpi2021 => f.write_str("CKD-EPI 2021"),
        }
    }
}

/// Individual ARC-HBR risk-factor flags.
///
/// A set flag means the concept was positively matched against at least one
/// coding system or text keyword; an unset flag means "not detected", not
/// "confirmed negative".
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArcHbrFactors {
    pub thrombocytopenia: bool,
    pub bleeding_diathesis: bool,
    pub active_malignancy: bool,
    pub liver_cirrhosis: bool,
    pub nsaids_corticosteroids: bool,
}

impl ArcHbrFactors {
    /// Whether any of the five factors is present.
    pub fn has_any_factor(&self) -> bool {
        self.count() > 0
    }

    /// Number of factors present.
    pub fn count(&self) -> u8 {
        [
            self.thrombocytopenia,
            self.bleeding_diathesis,
            self.active_malignancy,
            self.liver_cirrhosis,
            self.nsaids_corticosteroids,
        ]
        .iter()
        .filter(|&&flag| flag)
        .count() as u8
    }
}

/// Effective (clamped) values and provenance for the extracted inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InputMetadata {
    pub age_effective: Option<f64>,
    pub hb_effective: Option<f64>,
    pub egfr_effective: Option<f64>,
    pub wbc_effective: Option<f64>,
    pub egfr_source: Option<EgfrSource>,
    pub hb_date: Option<String>,
    pub egfr_date: Option<String>,
    pub wbc_date: Option<String>,
    pub bleeding_evidence: Vec<String>,
    pub arc_details: ArcHbrFactors,
}

/// Canonical inputs for one scoring request. Constructed once from raw
/// clinical data, immutable afterwards.
///
/// Missing-data policy is deliberately asymmetric: a null continuous input
/// contributes zero and is listed in `missing_fields`, while absent evidence
/// for the binary/count inputs yields `false` / `0` and is never reported
/// as missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoreInputs {
    pub age: Option<f64>,
    pub hb: Option<f64>,
    pub egfr: Option<f64>,
    pub wbc: Option<f64>,
    pub prior_bleeding: bool,
    pub oral_anticoag: bool,
    pub arc_hbr_count: u8,
    pub missing_fields: Vec<MissingField>,
    pub metadata: InputMetadata,
}

/// Per-term contributions, pre-rounding.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    pub base: f64,
    pub age: f64,
    pub hb: f64,
    pub egfr: f64,
    pub wbc: f64,
    pub bleeding: f64,
    pub anticoag: f64,
    pub arc_hbr: f64,
}

impl ScoreBreakdown {
    /// Raw (unrounded) score: the sum of every contribution.
    pub fn raw_total(&self) -> f64 {
        self.base
            + self.age
            + self.hb
            + self.egfr
            + self.wbc
            + self.bleeding
            + self.anticoag
            + self.arc_hbr
    }
}

/// One row of the score report.
///
/// The five individual ARC-HBR element rows are display-only: they carry
/// `score = 0` and `is_arc_hbr_element = true`, with the ARC contribution
/// carried by the summary row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreComponent {
    pub parameter: String,
    pub value: String,
    /// Pre-rounding contribution of this term.
    pub score: f64,
    pub date: Option<String>,
    pub is_present: Option<bool>,
    pub is_arc_hbr_element: bool,
    pub is_outdated: bool,
    pub description: String,
}

impl ScoreComponent {
    pub(crate) fn new(parameter: impl Into<String>, value: impl Into<String>, score: f64) -> Self {
        Self {
            parameter: parameter.into(),
            value: value.into(),
            score,
            date: None,
            is_present: None,
            is_arc_hbr_element: false,
            is_outdated: false,
            description: String::new(),
        }
    }
}

/// Full result of a scoring request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreReport {
    pub total_score: i64,
    pub components: Vec<ScoreComponent>,
    pub missing_fields: Vec<MissingField>,
}

/// Named risk category for a PRECISE-HBR score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RiskCategory {
    NotHbr,
    Hbr,
    VeryHbr,
}

impl RiskCategory {
    pub fn label(&self) -> &'static str {
        match self {
            RiskCategory::NotHbr => "Not high bleeding risk",
            RiskCategory::Hbr => "HBR",
            RiskCategory::VeryHbr => "Very HBR",
        }
    }
}

/// Severity tag consumed by the downstream renderer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskColor {
    Success,
    Warning,
    Danger,
}

impl fmt::Display for RiskColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskColor::Success => f.write_str("success"),
            RiskColor::Warning => f.write_str("warning"),
            RiskColor::Danger => f.write_str("danger"),
        }
    }
}

/// Risk categorization for a score. Pure function of the score, recomputed
/// on demand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskCategoryInfo {
    pub category: RiskCategory,
    pub color: RiskColor,
    pub bleeding_risk_percent: f64,
    pub score_range: String,
}

/// Complete display payload for a score, including the recommendation line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskDisplayInfo {
    pub score: i64,
    pub risk_category: String,
    pub score_range: String,
    pub bleeding_risk_percent: f64,
    pub color_class: RiskColor,
    pub full_label: String,
    pub recommendation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_display_names() {
        assert_eq!(MissingField::Age.to_string(), "Age");
        assert_eq!(MissingField::Hemoglobin.to_string(), "Hemoglobin");
        assert_eq!(MissingField::Egfr.to_string(), "eGFR");
        assert_eq!(MissingField::Wbc.to_string(), "WBC");
    }

    #[test]
    fn test_arc_factor_count() {
        let none = ArcHbrFactors::default();
        assert_eq!(none.count(), 0);
        assert!(!none.has_any_factor());

        let two = ArcHbrFactors {
            thrombocytopenia: true,
            active_malignancy: true,
            ..Default::default()
        };
        assert_eq!(two.count(), 2);
        assert!(two.has_any_factor());
    }

    #[test]
    fn test_breakdown_raw_total() {
        let breakdown = ScoreBreakdown {
            base: 2.0,
            age: 11.25,
            hb: 12.5,
            egfr: 3.5,
            wbc: 7.2,
            bleeding: 7.0,
            anticoag: 5.0,
            arc_hbr: 3.0,
        };
        assert!((breakdown.raw_total() - 51.45).abs() < 1e-9);
    }
}
