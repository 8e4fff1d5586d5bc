//! Medication matching against Taiwan NHI codes and drug-name keywords.

use crate::config::{MedicationConceptSpec, ReferenceConfig};
use crate::models::MedicationRequest;

/// Matcher for medication classes.
///
/// NHI codes are checked first (exact or bare prefix — an NHI target of
/// `B023` covers every product code in that group), then drug-name keywords
/// against the medication concept's text, displays, and codes.
pub struct MedicationMatcher<'a> {
    config: &'a ReferenceConfig,
}

impl<'a> MedicationMatcher<'a> {
    pub fn new(config: &'a ReferenceConfig) -> Self {
        Self { config }
    }

    /// Check a medication list against one class spec.
    pub fn check_class(
        &self,
        medications: &[MedicationRequest],
        spec: &MedicationConceptSpec,
    ) -> bool {
        for med in medications {
            if let Some(code) = med.nhi_code() {
                if spec
                    .nhi_codes
                    .iter()
                    .any(|target| code == target.as_str() || code.starts_with(target.as_str()))
                {
                    tracing::info!("matched medication class via NHI code: {code}");
                    return true;
                }
            }

            let blob = med.match_blob();
            if blob.is_empty() {
                continue;
            }
            if spec
                .keywords
                .iter()
                .any(|keyword| blob.contains(keyword.to_lowercase().as_str()))
            {
                return true;
            }
        }
        false
    }

    /// Long-term oral anticoagulation therapy.
    pub fn check_oral_anticoagulation(&self, medications: &[MedicationRequest]) -> bool {
        self.check_class(
            medications,
            &self.config.medication_keywords.oral_anticoagulants,
        )
    }

    /// Chronic NSAID or corticosteroid use.
    pub fn check_nsaids_or_corticosteroids(&self, medications: &[MedicationRequest]) -> bool {
        self.check_class(
            medications,
            &self.config.medication_keywords.nsaids_corticosteroids,
        )
    }
}
