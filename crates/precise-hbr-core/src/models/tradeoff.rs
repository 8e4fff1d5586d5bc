//! Bleeding/thrombosis tradeoff model data.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::MissingField;

/// One predictor in the tradeoff model: a named risk factor with its
/// published hazard ratio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Predictor {
    pub factor: String,
    pub hazard_ratio: f64,
    pub description: String,
}

/// Predictor list for one event family.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventModel {
    #[serde(default)]
    pub predictors: Vec<Predictor>,
}

/// The tradeoff hazard-ratio model: two independent predictor lists, one
/// for bleeding events and one for thrombotic events. Loaded once per
/// process and treated as read-only reference data.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TradeoffModel {
    #[serde(default)]
    pub bleeding_events: EventModel,
    #[serde(default)]
    pub thrombotic_events: EventModel,
}

/// Clinical factor flags gathered outside the lab bundle (conditions,
/// procedures, smoking status, discharge medications). Produced by the
/// FHIR adapter; every flag defaults to absent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TradeoffFlags {
    pub diabetes: bool,
    pub prior_mi: bool,
    pub smoker: bool,
    pub nstemi_stemi: bool,
    pub complex_pci: bool,
    pub bms_used: bool,
    pub copd: bool,
    pub oac_discharge: bool,
}

/// The set of active tradeoff factor keys, plus the continuous inputs that
/// could not be evaluated. Factor keys are the `factor` strings of the
/// model's predictors; a missing input omits its factors rather than
/// assuming them present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectedFactors {
    pub active: BTreeSet<String>,
    pub missing_data: Vec<MissingField>,
}

impl DetectedFactors {
    pub fn is_active(&self, factor: &str) -> bool {
        self.active.contains(factor)
    }
}

/// Per-request tradeoff estimate: 1-year event probabilities (percent) and
/// the factor descriptions that produced them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TradeoffResult {
    pub bleeding_score: f64,
    pub thrombotic_score: f64,
    pub bleeding_factors: Vec<String>,
    pub thrombotic_factors: Vec<String>,
    #[serde(default)]
    pub missing_data: Vec<String>,
    #[serde(default)]
    pub warning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_deserializes_from_json() {
        let json = r#"{
            "bleedingEvents": {
                "predictors": [
                    {"factor": "age_ge_65", "hazardRatio": 1.45,
                     "description": "Age >= 65 years"}
                ]
            },
            "thromboticEvents": {"predictors": []}
        }"#;
        let model: TradeoffModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.bleeding_events.predictors.len(), 1);
        assert_eq!(model.bleeding_events.predictors[0].factor, "age_ge_65");
        assert!((model.bleeding_events.predictors[0].hazard_ratio - 1.45).abs() < 1e-9);
        assert!(model.thrombotic_events.predictors.is_empty());
    }

    #[test]
    fn test_detected_factors_lookup() {
        let mut detected = DetectedFactors::default();
        detected.active.insert("diabetes".into());
        assert!(detected.is_active("diabetes"));
        assert!(!detected.is_active("smoker"));
    }
}
