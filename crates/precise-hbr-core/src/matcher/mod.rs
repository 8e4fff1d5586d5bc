//! Clinical concept matching.
//!
//! Determines whether coded clinical records (conditions, medications, lab
//! values) match the risk-factor concepts the score needs, checking SNOMED
//! CT, ICD-10-CM, and Taiwan NHI codes with a text-keyword fallback.

mod conditions;
mod medications;

pub use conditions::*;
pub use medications::*;

use crate::config::ReferenceConfig;
use crate::models::{ArcHbrFactors, ClinicalBundle};
use crate::units::Analyte;

/// Aggregate matcher for the ARC-HBR risk-factor set.
///
/// Holds only borrowed reference data; cheap to construct per request and
/// safe to share across threads.
pub struct RiskFactorMatcher<'a> {
    config: &'a ReferenceConfig,
    conditions: ConditionMatcher<'a>,
    medications: MedicationMatcher<'a>,
}

impl<'a> RiskFactorMatcher<'a> {
    pub fn new(config: &'a ReferenceConfig) -> Self {
        Self {
            config,
            conditions: ConditionMatcher::new(config),
            medications: MedicationMatcher::new(config),
        }
    }

    /// Condition-level matcher.
    pub fn conditions(&self) -> &ConditionMatcher<'a> {
        &self.conditions
    }

    /// Medication-level matcher.
    pub fn medications(&self) -> &MedicationMatcher<'a> {
        &self.medications
    }

    /// Thrombocytopenia: platelet count below the configured threshold, or
    /// a matching ICD-10 diagnosis. An unconvertible platelet value falls
    /// through to the diagnosis check.
    pub fn check_thrombocytopenia(&self, bundle: &ClinicalBundle) -> bool {
        let spec = &self.config.concepts.thrombocytopenia;

        if let Some(obs) = bundle.platelets.first() {
            if let Some(count) = self
                .config
                .unit_conversion
                .value_from_observation(obs, Analyte::Platelets)
            {
                if count < spec.threshold {
                    return true;
                }
            }
        }

        bundle.conditions.iter().any(|condition| {
            condition
                .icd10_code()
                .is_some_and(|(code, _)| icd10_prefix_hit(&code, &spec.icd10cm_codes))
        })
    }

    /// Evaluate the five ARC-HBR factors independently.
    pub fn arc_hbr_factors(&self, bundle: &ClinicalBundle) -> ArcHbrFactors {
        ArcHbrFactors {
            thrombocytopenia: self.check_thrombocytopenia(bundle),
            bleeding_diathesis: self
                .conditions
                .check_bleeding_diathesis(&bundle.conditions)
                .is_some(),
            active_malignancy: self
                .conditions
                .check_active_cancer(&bundle.conditions)
                .is_some(),
            liver_cirrhosis: self
                .conditions
                .check_liver_cirrhosis_with_portal_hypertension(&bundle.conditions)
                .is_some(),
            nsaids_corticosteroids: self
                .medications
                .check_nsaids_or_corticosteroids(&bundle.med_requests),
        }
    }
}
