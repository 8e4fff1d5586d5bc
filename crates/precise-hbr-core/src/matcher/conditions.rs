//! Condition matching against SNOMED CT, ICD-10-CM, and text keywords.

use crate::config::{CancerSpec, CirrhosisSpec, ConceptSpec, ReferenceConfig};
use crate::models::Condition;

/// SNOMED CT code system URL.
pub const SNOMED_SYSTEM: &str = "http://snomed.info/sct";

/// Matcher for diagnosis-level clinical concepts.
///
/// Matching precedence per concept: SNOMED exact code, then ICD-10 prefix
/// (respecting the dot-segment boundary), then lowercase keyword substring
/// over the condition's text and coding displays. The first positive match
/// wins and supplies the evidence string.
pub struct ConditionMatcher<'a> {
    config: &'a ReferenceConfig,
}

impl<'a> ConditionMatcher<'a> {
    pub fn new(config: &'a ReferenceConfig) -> Self {
        Self { config }
    }

    /// Check a list of conditions against a generic concept spec.
    /// Returns the first match's evidence string.
    pub fn check_concept(&self, conditions: &[Condition], spec: &ConceptSpec) -> Option<String> {
        for condition in conditions {
            if let Some(evidence) = snomed_match(condition, &spec.snomed_codes) {
                return Some(evidence);
            }
            if let Some(evidence) = icd10_match(condition, &spec.icd10cm_codes) {
                return Some(evidence);
            }
            if let Some(evidence) = keyword_match(condition, &spec.keywords) {
                return Some(evidence);
            }
        }
        None
    }

    /// Chronic bleeding diathesis.
    pub fn check_bleeding_diathesis(&self, conditions: &[Condition]) -> Option<String> {
        self.check_concept(conditions, &self.config.concepts.bleeding_diathesis)
    }

    /// Prior bleeding history. Unlike the single-concept checks this
    /// collects every piece of evidence across all conditions and all
    /// three code systems, deduplicated in first-seen order.
    pub fn check_prior_bleeding(&self, conditions: &[Condition]) -> Vec<String> {
        let spec = &self.config.concepts.prior_bleeding;
        let mut found: Vec<String> = Vec::new();
        let mut push = |evidence: String| {
            if !evidence.is_empty() && !found.contains(&evidence) {
                found.push(evidence);
            }
        };

        for condition in conditions {
            if let Some(evidence) = snomed_match(condition, &spec.snomed_codes) {
                push(evidence);
            }
            if let Some((code, display)) = condition.icd10_code() {
                if icd10_prefix_hit(&code, &spec.icd10cm_codes) {
                    push(display.unwrap_or_else(|| format!("Prior bleeding (ICD-10: {code})")));
                }
            }
            if let Some(evidence) = keyword_match(condition, &spec.keywords) {
                push(evidence);
            }
        }
        found
    }

    /// Liver cirrhosis with portal hypertension. The composite rule needs
    /// BOTH an independent cirrhosis match AND an independent
    /// portal-hypertension-sign match; either alone is not enough.
    pub fn check_liver_cirrhosis_with_portal_hypertension(
        &self,
        conditions: &[Condition],
    ) -> Option<Vec<String>> {
        let spec: &CirrhosisSpec = &self.config.concepts.liver_cirrhosis;
        let pht = &spec.portal_hypertension;

        let mut has_cirrhosis = false;
        let mut has_pht = false;
        let mut found: Vec<String> = Vec::new();
        let push = |list: &mut Vec<String>, evidence: String| {
            if !list.contains(&evidence) {
                list.push(evidence);
            }
        };

        for condition in conditions {
            if let Some(evidence) = snomed_match(condition, &spec.snomed_codes) {
                has_cirrhosis = true;
                push(&mut found, evidence);
            }
            if let Some(evidence) = snomed_match(condition, &pht.snomed_codes) {
                has_pht = true;
                push(&mut found, evidence);
            }

            let text = condition.full_text().to_lowercase();
            if spec.keywords.iter().any(|k| text.contains(k.as_str())) {
                has_cirrhosis = true;
                push(&mut found, format!("Cirrhosis: {}", truncate(&text, 50)));
            }
            if let Some(criterion) = pht.keywords.iter().find(|k| text.contains(k.as_str())) {
                has_pht = true;
                push(&mut found, format!("Portal HTN sign: {criterion}"));
            }

            if let Some((code, display)) = condition.icd10_code() {
                if icd10_prefix_hit(&code, &spec.icd10cm_codes) {
                    has_cirrhosis = true;
                    push(
                        &mut found,
                        display
                            .clone()
                            .unwrap_or_else(|| format!("Liver cirrhosis (ICD-10: {code})")),
                    );
                }
                if icd10_prefix_hit(&code, &pht.icd10cm_codes) {
                    has_pht = true;
                    push(
                        &mut found,
                        display.unwrap_or_else(|| {
                            format!("Portal hypertension sign (ICD-10: {code})")
                        }),
                    );
                }
            }
        }

        (has_cirrhosis && has_pht).then_some(found)
    }

    /// Active malignant neoplastic disease, excluding configured
    /// non-melanoma skin cancers. Only conditions in an active-family
    /// clinical status count; an absent status defaults to active.
    pub fn check_active_cancer(&self, conditions: &[Condition]) -> Option<String> {
        let spec: &CancerSpec = &self.config.concepts.active_cancer;

        for condition in conditions {
            if !condition.is_active() {
                continue;
            }

            if let Some(code) = condition.code.as_ref() {
                for coding in &code.coding {
                    if coding.system.as_deref() != Some(SNOMED_SYSTEM) {
                        continue;
                    }
                    let Some(code_value) = coding.code.as_deref() else {
                        continue;
                    };
                    if spec.exclude_snomed_codes.iter().any(|c| c == code_value) {
                        continue;
                    }
                    if spec.snomed_codes.iter().any(|c| c == code_value) {
                        return Some(
                            coding
                                .display
                                .clone()
                                .unwrap_or_else(|| "Active malignancy".to_string()),
                        );
                    }
                }
            }

            // ICD-10 malignancy chapters match on bare prefix ("C" covers
            // C00-C97), not the dot boundary used elsewhere.
            if let Some((code, display)) = condition.icd10_code() {
                if spec.icd10_prefixes.iter().any(|p| code.starts_with(p.as_str())) {
                    return Some(
                        display.unwrap_or_else(|| format!("Active cancer (ICD-10: {code})")),
                    );
                }
            }

            let text = condition.full_text().to_lowercase();
            if spec
                .exclusion_keywords
                .iter()
                .any(|exclusion| text.contains(exclusion.as_str()))
            {
                continue;
            }
            if spec.keywords.iter().any(|k| text.contains(k.as_str())) {
                return Some(text);
            }
        }
        None
    }
}

/// First SNOMED coding matching one of `codes`, as an evidence string.
pub(crate) fn snomed_match(condition: &Condition, codes: &[String]) -> Option<String> {
    let concept = condition.code.as_ref()?;
    for coding in &concept.coding {
        if coding.system.as_deref() != Some(SNOMED_SYSTEM) {
            continue;
        }
        let Some(code) = coding.code.as_deref() else {
            continue;
        };
        if codes.iter().any(|c| c == code) {
            return Some(
                coding
                    .display
                    .clone()
                    .unwrap_or_else(|| format!("SNOMED: {code}")),
            );
        }
    }
    None
}

/// ICD-10 match against target prefixes, as an evidence string.
pub(crate) fn icd10_match(condition: &Condition, targets: &[String]) -> Option<String> {
    let (code, display) = condition.icd10_code()?;
    icd10_prefix_hit(&code, targets)
        .then(|| display.unwrap_or_else(|| format!("ICD-10: {code}")))
}

/// ICD-10 prefix test respecting the dot-segment boundary: `I21` matches
/// `I21` and `I21.0` but not `I210`.
pub(crate) fn icd10_prefix_hit(code: &str, targets: &[String]) -> bool {
    targets
        .iter()
        .any(|target| code == target.as_str() || code.starts_with(&format!("{target}.")))
}

/// Case-insensitive keyword substring match over the condition's text.
/// The evidence is the matched condition's lowercased text.
pub(crate) fn keyword_match(condition: &Condition, keywords: &[String]) -> Option<String> {
    if keywords.is_empty() {
        return None;
    }
    let text = condition.full_text().to_lowercase();
    if text.is_empty() {
        return None;
    }
    keywords
        .iter()
        .any(|keyword| text.contains(keyword.to_lowercase().as_str()))
        .then_some(text)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClinicalStatus, CodeableConcept, Coding};

    fn config() -> ReferenceConfig {
        ReferenceConfig::default()
    }

    fn condition(system: &str, code: &str, display: &str) -> Condition {
        Condition {
            code: Some(CodeableConcept {
                coding: vec![Coding {
                    system: Some(system.into()),
                    code: Some(code.into()),
                    display: Some(display.into()),
                }],
                text: None,
            }),
            clinical_status: None,
        }
    }

    fn text_condition(text: &str) -> Condition {
        Condition {
            code: Some(CodeableConcept {
                coding: vec![],
                text: Some(text.into()),
            }),
            clinical_status: None,
        }
    }

    #[test]
    fn test_bleeding_diathesis_via_snomed() {
        let config = config();
        let matcher = ConditionMatcher::new(&config);
        let conditions = vec![condition(SNOMED_SYSTEM, "64779008", "Bleeding diathesis")];
        assert_eq!(
            matcher.check_bleeding_diathesis(&conditions).as_deref(),
            Some("Bleeding diathesis")
        );
    }

    #[test]
    fn test_bleeding_diathesis_via_icd10() {
        let config = config();
        let matcher = ConditionMatcher::new(&config);
        let conditions = vec![condition(
            "http://hl7.org/fhir/sid/icd-10-cm",
            "D66",
            "Hereditary factor VIII deficiency",
        )];
        assert_eq!(
            matcher.check_bleeding_diathesis(&conditions).as_deref(),
            Some("Hereditary factor VIII deficiency")
        );
    }

    #[test]
    fn test_bleeding_diathesis_via_keyword() {
        let config = config();
        let matcher = ConditionMatcher::new(&config);
        let conditions = vec![text_condition("History of Von Willebrand disease")];
        let evidence = matcher.check_bleeding_diathesis(&conditions).unwrap();
        assert!(evidence.contains("von willebrand"));
    }

    #[test]
    fn test_icd10_dot_boundary() {
        let targets = vec!["I21".to_string()];
        assert!(icd10_prefix_hit("I21", &targets));
        assert!(icd10_prefix_hit("I21.0", &targets));
        assert!(!icd10_prefix_hit("I210", &targets));
        assert!(!icd10_prefix_hit("I22.1", &targets));
    }

    #[test]
    fn test_prior_bleeding_collects_and_dedupes() {
        let config = config();
        let matcher = ConditionMatcher::new(&config);
        let conditions = vec![
            condition(
                "http://hl7.org/fhir/sid/icd-10-cm",
                "K62.5",
                "Hemorrhage of anus and rectum",
            ),
            text_condition("melena, resolved"),
            text_condition("melena, resolved"),
        ];
        let evidence = matcher.check_prior_bleeding(&conditions);
        assert_eq!(evidence.len(), 2);
        assert_eq!(evidence[0], "Hemorrhage of anus and rectum");
        assert_eq!(evidence[1], "melena, resolved");
    }

    #[test]
    fn test_prior_bleeding_empty_when_no_match() {
        let config = config();
        let matcher = ConditionMatcher::new(&config);
        let conditions = vec![text_condition("essential hypertension")];
        assert!(matcher.check_prior_bleeding(&conditions).is_empty());
    }

    #[test]
    fn test_cirrhosis_alone_is_not_enough() {
        let config = config();
        let matcher = ConditionMatcher::new(&config);
        let conditions = vec![condition(SNOMED_SYSTEM, "19943007", "Cirrhosis of liver")];
        assert!(matcher
            .check_liver_cirrhosis_with_portal_hypertension(&conditions)
            .is_none());
    }

    #[test]
    fn test_portal_hypertension_sign_alone_is_not_enough() {
        let config = config();
        let matcher = ConditionMatcher::new(&config);
        let conditions = vec![text_condition("Ascites")];
        assert!(matcher
            .check_liver_cirrhosis_with_portal_hypertension(&conditions)
            .is_none());
    }

    #[test]
    fn test_cirrhosis_with_ascites_matches() {
        let config = config();
        let matcher = ConditionMatcher::new(&config);
        let conditions = vec![
            condition(SNOMED_SYSTEM, "19943007", "Cirrhosis of liver"),
            text_condition("Ascites"),
        ];
        let evidence = matcher
            .check_liver_cirrhosis_with_portal_hypertension(&conditions)
            .unwrap();
        assert!(evidence.iter().any(|e| e.contains("Cirrhosis")));
        assert!(evidence.iter().any(|e| e.contains("Portal HTN sign: ascites")));
    }

    #[test]
    fn test_cirrhosis_and_pht_via_icd10() {
        let config = config();
        let matcher = ConditionMatcher::new(&config);
        let conditions = vec![
            condition("http://hl7.org/fhir/sid/icd-10-cm", "K74.6", "Other cirrhosis"),
            condition("http://hl7.org/fhir/sid/icd-10-cm", "K76.6", "Portal hypertension"),
        ];
        assert!(matcher
            .check_liver_cirrhosis_with_portal_hypertension(&conditions)
            .is_some());
    }

    #[test]
    fn test_active_cancer_via_icd10_bare_prefix() {
        let config = config();
        let matcher = ConditionMatcher::new(&config);
        let conditions = vec![condition(
            "http://hl7.org/fhir/sid/icd-10-cm",
            "C18.9",
            "Malignant neoplasm of colon, unspecified",
        )];
        let evidence = matcher.check_active_cancer(&conditions).unwrap();
        assert!(evidence.contains("Malignant neoplasm"));
    }

    #[test]
    fn test_inactive_cancer_is_skipped() {
        let config = config();
        let matcher = ConditionMatcher::new(&config);
        let mut resolved = condition(SNOMED_SYSTEM, "363346000", "Malignant neoplastic disease");
        resolved.clinical_status = Some(ClinicalStatus::Text("resolved".into()));
        assert!(matcher.check_active_cancer(&[resolved]).is_none());
    }

    #[test]
    fn test_excluded_snomed_skin_cancer_is_skipped() {
        let config = config();
        let matcher = ConditionMatcher::new(&config);
        let conditions = vec![condition(SNOMED_SYSTEM, "254637007", "Basal cell carcinoma")];
        assert!(matcher.check_active_cancer(&conditions).is_none());
    }

    #[test]
    fn test_excluded_skin_cancer_keyword_is_skipped() {
        let config = config();
        let matcher = ConditionMatcher::new(&config);
        let conditions = vec![text_condition("Basal cell carcinoma of skin")];
        assert!(matcher.check_active_cancer(&conditions).is_none());

        let lymphoma = vec![text_condition("Hodgkin lymphoma")];
        assert!(matcher.check_active_cancer(&lymphoma).is_some());
    }

    #[test]
    fn test_malformed_condition_is_no_match() {
        let config = config();
        let matcher = ConditionMatcher::new(&config);
        let conditions = vec![Condition::default()];
        assert!(matcher.check_bleeding_diathesis(&conditions).is_none());
        assert!(matcher.check_active_cancer(&conditions).is_none());
        assert!(matcher.check_prior_bleeding(&conditions).is_empty());
    }
}
