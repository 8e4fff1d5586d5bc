//! Score input extraction.
//!
//! Pulls the canonical scoring inputs out of a raw clinical bundle,
//! applying unit conversion and concept matching, and records which
//! continuous inputs were unavailable.

use crate::config::ReferenceConfig;
use crate::matcher::RiskFactorMatcher;
use crate::models::{ClinicalBundle, Demographics, EgfrSource, MissingField, ScoreInputs};
use crate::units::{calculate_egfr, Analyte};

/// Clamp windows applied to the continuous inputs before scoring.
/// Raw values are preserved for display; only the effective values feed
/// the formula.
pub const MIN_AGE: f64 = 30.0;
pub const MAX_AGE: f64 = 80.0;
pub const MIN_HB: f64 = 5.0;
pub const MAX_HB: f64 = 15.0;
pub const MIN_EGFR: f64 = 5.0;
pub const MAX_EGFR: f64 = 100.0;
/// WBC has no lower clamp.
pub const MAX_WBC: f64 = 15.0;

/// Extractor for `ScoreInputs`.
///
/// Missing-data policy is asymmetric by design: a continuous input that
/// cannot be obtained is recorded in `missing_fields` and contributes zero;
/// a binary/count input without positive evidence is a confirmed negative.
pub struct InputExtractor<'a> {
    config: &'a ReferenceConfig,
    matcher: RiskFactorMatcher<'a>,
}

impl<'a> InputExtractor<'a> {
    pub fn new(config: &'a ReferenceConfig) -> Self {
        Self {
            config,
            matcher: RiskFactorMatcher::new(config),
        }
    }

    /// Extract scoring inputs from a clinical bundle and demographics.
    pub fn extract(&self, bundle: &ClinicalBundle, demographics: &Demographics) -> ScoreInputs {
        let mut inputs = ScoreInputs::default();
        let units = &self.config.unit_conversion;

        // Age
        match demographics.age {
            Some(age) => {
                inputs.age = Some(age);
                inputs.metadata.age_effective = Some(age.clamp(MIN_AGE, MAX_AGE));
            }
            None => inputs.missing_fields.push(MissingField::Age),
        }

        // Hemoglobin
        match bundle.hemoglobin.first() {
            Some(obs) => match units.value_from_observation(obs, Analyte::Hemoglobin) {
                Some(hb) => {
                    inputs.hb = Some(hb);
                    inputs.metadata.hb_effective = Some(hb.clamp(MIN_HB, MAX_HB));
                    inputs.metadata.hb_date = Some(obs.effective_date().to_string());
                }
                None => inputs.missing_fields.push(MissingField::Hemoglobin),
            },
            None => inputs.missing_fields.push(MissingField::Hemoglobin),
        }

        // eGFR: prefer a direct observation, else derive from creatinine.
        let mut egfr_value = None;
        let mut egfr_source = EgfrSource::Direct;
        let mut egfr_date = None;
        if let Some(obs) = bundle.egfr.first() {
            if let Some(value) = units.value_from_observation(obs, Analyte::Egfr) {
                egfr_value = Some(value);
                egfr_date = Some(obs.effective_date().to_string());
            }
        }
        if egfr_value.is_none() {
            if let (Some(obs), Some(age), Some(gender)) = (
                bundle.creatinine.first(),
                inputs.age,
                demographics.gender,
            ) {
                if let Some(creatinine) = units.value_from_observation(obs, Analyte::Creatinine) {
                    let estimate = calculate_egfr(creatinine, age, gender);
                    egfr_value = Some(estimate.value);
                    egfr_source = EgfrSource::CkdEpi2021;
                    egfr_date = Some(obs.effective_date().to_string());
                }
            }
        }
        match egfr_value {
            Some(egfr) => {
                inputs.egfr = Some(egfr);
                inputs.metadata.egfr_effective = Some(egfr.clamp(MIN_EGFR, MAX_EGFR));
                inputs.metadata.egfr_source = Some(egfr_source);
                inputs.metadata.egfr_date = egfr_date;
            }
            None => inputs.missing_fields.push(MissingField::Egfr),
        }

        // WBC
        match bundle.wbc.first() {
            Some(obs) => match units.value_from_observation(obs, Analyte::Wbc) {
                Some(wbc) => {
                    inputs.wbc = Some(wbc);
                    inputs.metadata.wbc_effective = Some(wbc.min(MAX_WBC));
                    inputs.metadata.wbc_date = Some(obs.effective_date().to_string());
                }
                None => inputs.missing_fields.push(MissingField::Wbc),
            },
            None => inputs.missing_fields.push(MissingField::Wbc),
        }

        // Prior bleeding: evidence or confirmed negative.
        let bleeding_evidence = self
            .matcher
            .conditions()
            .check_prior_bleeding(&bundle.conditions);
        inputs.prior_bleeding = !bleeding_evidence.is_empty();
        inputs.metadata.bleeding_evidence = bleeding_evidence;

        // Oral anticoagulation
        inputs.oral_anticoag = self
            .matcher
            .medications()
            .check_oral_anticoagulation(&bundle.med_requests);

        // ARC-HBR factors
        let arc_details = self.matcher.arc_hbr_factors(bundle);
        inputs.arc_hbr_count = arc_details.count();
        inputs.metadata.arc_details = arc_details;

        inputs
    }
}
