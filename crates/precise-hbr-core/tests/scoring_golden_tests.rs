//! Golden tests for the full scoring pipeline.
//!
//! Each case runs raw clinical JSON through extraction, scoring, and
//! classification, and checks against hand-computed expectations.

use precise_hbr_core::models::RiskCategory;
use precise_hbr_core::scoring::risk_category_info;
use precise_hbr_core::{ClinicalBundle, Demographics, ReferenceConfig, Scorer};

struct GoldenCase {
    id: &'static str,
    bundle_json: &'static str,
    demographics_json: &'static str,
    expected_score: i64,
    expected_category: RiskCategory,
    expected_missing: usize,
}

fn golden_cases() -> Vec<GoldenCase> {
    vec![
        GoldenCase {
            id: "normal-patient",
            // Hb and eGFR on the healthy side of their thresholds; age and
            // WBC contribute 2.5 + 1.6 on top of the base 2.0 → 6.1 → 6.
            bundle_json: r#"{
                "HEMOGLOBIN": [{"valueQuantity": {"value": 16.0, "unit": "g/dL"}}],
                "EGFR": [{"valueQuantity": {"value": 110.0, "unit": "mL/min/1.73m2"}}],
                "WBC": [{"valueQuantity": {"value": 5.0, "unit": "10*9/L"}}]
            }"#,
            demographics_json: r#"{"age": 40, "gender": "male"}"#,
            expected_score: 6,
            expected_category: RiskCategory::NotHbr,
            expected_missing: 0,
        },
        GoldenCase {
            id: "pathological-patient",
            // 2 + 11.25 + 12.5 + 3.5 + 7.2 + 7 + 5 + 3 = 51.45 → 51.
            bundle_json: r#"{
                "HEMOGLOBIN": [{"valueQuantity": {"value": 10.0, "unit": "g/dL"}}],
                "EGFR": [{"valueQuantity": {"value": 30.0, "unit": "mL/min/1.73m2"}}],
                "WBC": [{"valueQuantity": {"value": 12.0, "unit": "10*9/L"}}],
                "PLATELETS": [{"valueQuantity": {"value": 80.0, "unit": "10*9/L"}}],
                "conditions": [{
                    "code": {"coding": [{
                        "system": "http://hl7.org/fhir/sid/icd-10-cm",
                        "code": "K92.2",
                        "display": "Gastrointestinal hemorrhage, unspecified"
                    }]}
                }],
                "med_requests": [{
                    "medicationCodeableConcept": {"text": "Warfarin 5mg daily"}
                }]
            }"#,
            demographics_json: r#"{"age": 75, "gender": "female"}"#,
            expected_score: 51,
            expected_category: RiskCategory::VeryHbr,
            expected_missing: 0,
        },
        GoldenCase {
            id: "empty-bundle",
            bundle_json: "{}",
            demographics_json: "{}",
            expected_score: 2,
            expected_category: RiskCategory::NotHbr,
            expected_missing: 4,
        },
        GoldenCase {
            id: "clamped-extremes",
            // Age 95→80 (12.5), Hb 3→5 (25), eGFR 2→5 (4.75), WBC 40→15
            // (9.6): 2 + 12.5 + 25 + 4.75 + 9.6 = 53.85 → 54.
            bundle_json: r#"{
                "HEMOGLOBIN": [{"valueQuantity": {"value": 3.0, "unit": "g/dL"}}],
                "EGFR": [{"valueQuantity": {"value": 2.0, "unit": "mL/min/1.73m2"}}],
                "WBC": [{"valueQuantity": {"value": 40.0, "unit": "10*9/L"}}]
            }"#,
            demographics_json: r#"{"age": 95, "gender": "male"}"#,
            expected_score: 54,
            expected_category: RiskCategory::VeryHbr,
            expected_missing: 0,
        },
        GoldenCase {
            id: "unit-aliases",
            // 120 g/L → 12 g/dL (7.5); WBC 8000 /uL → 8.0 (4.0); age 50
            // (5.0); eGFR missing: 2 + 5 + 7.5 + 4 = 18.5 → 18 (half-even).
            bundle_json: r#"{
                "HEMOGLOBIN": [{"valueQuantity": {"value": 120.0, "unit": "g/L"}}],
                "WBC": [{"valueQuantity": {"value": 8000.0, "unit": "/uL"}}]
            }"#,
            demographics_json: r#"{"age": 50}"#,
            expected_score: 18,
            expected_category: RiskCategory::NotHbr,
            expected_missing: 1,
        },
        GoldenCase {
            id: "derived-egfr",
            // Cr 0.9 mg/dL, male 40 → eGFR 111 → no eGFR contribution.
            // Age 40: 2 + 2.5 = 4.5 → 4 (half-even).
            bundle_json: r#"{
                "CREATININE": [{"valueQuantity": {"value": 0.9, "unit": "mg/dL"}}]
            }"#,
            demographics_json: r#"{"age": 40, "gender": "male"}"#,
            expected_score: 4,
            expected_category: RiskCategory::NotHbr,
            expected_missing: 2,
        },
    ]
}

#[test]
fn test_golden_cases() {
    let config = ReferenceConfig::builtin();
    let scorer = Scorer::new(&config);

    for case in golden_cases() {
        let bundle: ClinicalBundle =
            serde_json::from_str(case.bundle_json).unwrap_or_else(|e| {
                panic!("case {}: bundle JSON invalid: {e}", case.id);
            });
        let demographics: Demographics =
            serde_json::from_str(case.demographics_json).unwrap_or_else(|e| {
                panic!("case {}: demographics JSON invalid: {e}", case.id);
            });

        let report = scorer.calculate_score(&bundle, &demographics);
        assert_eq!(
            report.total_score, case.expected_score,
            "case {}: score mismatch",
            case.id
        );
        assert_eq!(
            report.missing_fields.len(),
            case.expected_missing,
            "case {}: missing-field count mismatch",
            case.id
        );

        let info = risk_category_info(report.total_score);
        assert_eq!(
            info.category, case.expected_category,
            "case {}: category mismatch",
            case.id
        );
    }
}

#[test]
fn test_component_invariants_hold_for_every_case() {
    let config = ReferenceConfig::builtin();
    let scorer = Scorer::new(&config);

    for case in golden_cases() {
        let bundle: ClinicalBundle = serde_json::from_str(case.bundle_json).unwrap();
        let demographics: Demographics = serde_json::from_str(case.demographics_json).unwrap();
        let report = scorer.calculate_score(&bundle, &demographics);

        // 14 rows: base, 4 continuous, 2 binary, 5 ARC elements, summary.
        assert_eq!(report.components.len(), 14, "case {}", case.id);

        let scored_sum: f64 = report
            .components
            .iter()
            .filter(|c| !c.is_arc_hbr_element)
            .map(|c| c.score)
            .sum();
        assert_eq!(
            scored_sum.round_ties_even() as i64,
            report.total_score,
            "case {}: component sum must round to the total",
            case.id
        );

        for component in report.components.iter().filter(|c| c.is_arc_hbr_element) {
            assert_eq!(component.score, 0.0, "case {}: ARC rows are display-only", case.id);
        }
    }
}

#[test]
fn test_missing_data_asymmetry_end_to_end() {
    let config = ReferenceConfig::builtin();
    let scorer = Scorer::new(&config);

    let inputs = scorer.extract_inputs(&ClinicalBundle::default(), &Demographics::default());
    let labels: Vec<String> = inputs.missing_fields.iter().map(|f| f.to_string()).collect();
    assert_eq!(labels, vec!["Age", "Hemoglobin", "eGFR", "WBC"]);
    assert!(!inputs.prior_bleeding);
    assert!(!inputs.oral_anticoag);
    assert_eq!(inputs.arc_hbr_count, 0);
}

#[test]
fn test_scoring_is_deterministic() {
    let config = ReferenceConfig::builtin();
    let scorer = Scorer::new(&config);
    let case = &golden_cases()[1];
    let bundle: ClinicalBundle = serde_json::from_str(case.bundle_json).unwrap();
    let demographics: Demographics = serde_json::from_str(case.demographics_json).unwrap();

    let first = scorer.calculate_score(&bundle, &demographics);
    let second = scorer.calculate_score(&bundle, &demographics);
    assert_eq!(first.total_score, second.total_score);
    assert_eq!(first.components, second.components);
}
