//! Bleeding/thrombosis tradeoff estimation.
//!
//! Composes boolean risk factors, each carrying a published hazard ratio,
//! into aggregate HRs for bleeding and thrombotic events separately, then
//! converts each aggregate into a 1-year event probability with the Cox
//! proportional-hazards transform.

use crate::config::ReferenceConfig;
use crate::models::{
    ClinicalBundle, Demographics, DetectedFactors, MissingField, Predictor, TradeoffFlags,
    TradeoffModel, TradeoffResult,
};
use crate::units::{calculate_egfr, Analyte};

// Factor keys shared between detection and the model's predictor lists.
pub const FACTOR_AGE_GE_65: &str = "age_ge_65";
pub const FACTOR_HB_MODERATE: &str = "hemoglobin_11_12.9";
pub const FACTOR_HB_SEVERE: &str = "hemoglobin_lt_11";
pub const FACTOR_EGFR_MODERATE: &str = "egfr_30_59";
pub const FACTOR_EGFR_SEVERE: &str = "egfr_lt_30";
pub const FACTOR_DIABETES: &str = "diabetes";
pub const FACTOR_PRIOR_MI: &str = "prior_mi";
pub const FACTOR_SMOKER: &str = "smoker";
pub const FACTOR_NSTEMI_STEMI: &str = "nstemi_stemi";
pub const FACTOR_COMPLEX_PCI: &str = "complex_pci";
pub const FACTOR_BMS: &str = "bms";
pub const FACTOR_COPD: &str = "copd";
pub const FACTOR_OAC_DISCHARGE: &str = "oac_discharge";

/// Multiply out the hazard ratios of every active predictor.
/// Returns the aggregate HR (1.0 when nothing is active) and the matched
/// predictors' descriptions.
pub fn compose_hr(active: &DetectedFactors, predictors: &[Predictor]) -> (f64, Vec<String>) {
    let mut aggregate = 1.0;
    let mut matched = Vec::new();
    for predictor in predictors {
        if active.is_active(&predictor.factor) {
            aggregate *= predictor.hazard_ratio;
            matched.push(format!(
                "{} (HR: {})",
                predictor.description, predictor.hazard_ratio
            ));
        }
    }
    (aggregate, matched)
}

/// Convert an aggregate hazard ratio plus a baseline 1-year event rate
/// (percent) into a 1-year event probability (percent).
///
/// Cox transform: `P = 1 - exp(-(-ln(1 - baseline)) * HR)`. A baseline at
/// or above 100% short-circuits to 100. The result is clamped to [0, 100]
/// and rounded to two decimals.
pub fn hr_to_probability(aggregate_hr: f64, baseline_rate_percent: f64) -> f64 {
    let baseline = baseline_rate_percent / 100.0;
    if baseline >= 1.0 {
        return 100.0;
    }
    let baseline_hazard = -(1.0 - baseline).ln();
    let event_probability = 1.0 - (-baseline_hazard * aggregate_hr).exp();
    let percent = (event_probability * 100.0).min(100.0);
    (percent * 100.0).round_ties_even() / 100.0
}

/// Calculator for the bleeding/thrombosis tradeoff estimate.
pub struct TradeoffCalculator<'a> {
    config: &'a ReferenceConfig,
    model: &'a TradeoffModel,
}

impl<'a> TradeoffCalculator<'a> {
    pub fn new(config: &'a ReferenceConfig, model: &'a TradeoffModel) -> Self {
        Self { config, model }
    }

    /// Detect which tradeoff factors are present.
    ///
    /// Continuous inputs use their own threshold table, distinct from the
    /// scoring engine's clamp windows. A missing input simply omits its
    /// factors and is reported in `missing_data` — it is never assumed
    /// present.
    pub fn detect_factors(
        &self,
        bundle: &ClinicalBundle,
        demographics: &Demographics,
        flags: &TradeoffFlags,
    ) -> DetectedFactors {
        let thresholds = &self.config.tradeoff_analysis.risk_factor_thresholds;
        let units = &self.config.unit_conversion;
        let mut detected = DetectedFactors::default();

        // Age
        match demographics.age {
            Some(age) => {
                if age >= thresholds.age_threshold {
                    detected.active.insert(FACTOR_AGE_GE_65.into());
                }
            }
            None => detected.missing_data.push(MissingField::Age),
        }

        // Hemoglobin bands
        let hb = bundle
            .hemoglobin
            .first()
            .and_then(|obs| units.value_from_observation(obs, Analyte::Hemoglobin));
        match hb {
            Some(hb) => {
                if thresholds.hemoglobin_moderate.contains(hb) {
                    detected.active.insert(FACTOR_HB_MODERATE.into());
                } else if hb < thresholds.hemoglobin_severe_max {
                    detected.active.insert(FACTOR_HB_SEVERE.into());
                }
            }
            None => detected.missing_data.push(MissingField::Hemoglobin),
        }

        // eGFR bands, with the same creatinine fallback as the extractor.
        let mut egfr = bundle
            .egfr
            .first()
            .and_then(|obs| units.value_from_observation(obs, Analyte::Egfr));
        if egfr.is_none() {
            if let (Some(obs), Some(age), Some(gender)) = (
                bundle.creatinine.first(),
                demographics.age,
                demographics.gender,
            ) {
                if let Some(creatinine) = units.value_from_observation(obs, Analyte::Creatinine) {
                    egfr = Some(calculate_egfr(creatinine, age, gender).value);
                }
            }
        }
        match egfr {
            Some(egfr) => {
                if thresholds.egfr_moderate.contains(egfr) {
                    detected.active.insert(FACTOR_EGFR_MODERATE.into());
                } else if egfr < thresholds.egfr_severe_max {
                    detected.active.insert(FACTOR_EGFR_SEVERE.into());
                }
            }
            None => detected.missing_data.push(MissingField::Egfr),
        }

        // Clinical flags gathered outside the lab bundle.
        let clinical = [
            (flags.diabetes, FACTOR_DIABETES),
            (flags.prior_mi, FACTOR_PRIOR_MI),
            (flags.smoker, FACTOR_SMOKER),
            (flags.nstemi_stemi, FACTOR_NSTEMI_STEMI),
            (flags.complex_pci, FACTOR_COMPLEX_PCI),
            (flags.bms_used, FACTOR_BMS),
            (flags.copd, FACTOR_COPD),
            (flags.oac_discharge, FACTOR_OAC_DISCHARGE),
        ];
        for (present, key) in clinical {
            if present {
                detected.active.insert(key.into());
            }
        }

        detected
    }

    /// Score a set of already-detected factors against the model. Used by
    /// the interactive recalculation path, where the caller toggles
    /// factors directly.
    pub fn calculate_interactive(&self, active: &DetectedFactors) -> TradeoffResult {
        let rates = &self.config.tradeoff_analysis.baseline_event_rates;

        let (bleeding_hr, bleeding_factors) =
            compose_hr(active, &self.model.bleeding_events.predictors);
        let (thrombotic_hr, thrombotic_factors) =
            compose_hr(active, &self.model.thrombotic_events.predictors);

        TradeoffResult {
            bleeding_score: hr_to_probability(bleeding_hr, rates.bleeding_rate_percent),
            thrombotic_score: hr_to_probability(thrombotic_hr, rates.thrombotic_rate_percent),
            bleeding_factors,
            thrombotic_factors,
            missing_data: Vec::new(),
            warning: None,
        }
    }

    /// Full tradeoff estimate for a patient: detect factors, compose HRs,
    /// convert to probabilities, and report any inputs that could not be
    /// evaluated.
    pub fn calculate(
        &self,
        bundle: &ClinicalBundle,
        demographics: &Demographics,
        flags: &TradeoffFlags,
    ) -> TradeoffResult {
        let detected = self.detect_factors(bundle, demographics, flags);
        let mut result = self.calculate_interactive(&detected);

        result.missing_data = detected
            .missing_data
            .iter()
            .map(MissingField::to_string)
            .collect();
        if !result.missing_data.is_empty() {
            result.warning = Some(format!(
                "Missing data for: {}. Risks may be underestimated.",
                result.missing_data.join(", ")
            ));
        }
        result
    }
}
