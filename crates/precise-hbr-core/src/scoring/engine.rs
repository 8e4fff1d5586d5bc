//! The PRECISE-HBR scoring engine.
//!
//! `calculate_pure_score` is the arithmetic core: a fixed linear formula
//! over effective (clamped) inputs, rounded half-to-even. `Scorer` wraps
//! extraction plus the expansion into the ordered component list consumed
//! by downstream renderers.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::config::ReferenceConfig;
use crate::models::{
    ClinicalBundle, Demographics, ScoreBreakdown, ScoreComponent, ScoreInputs, ScoreReport,
};

use super::extractor::InputExtractor;

/// Fixed base score every patient starts from.
const BASE_SCORE: f64 = 2.0;

/// Observations older than this are flagged stale in the report.
const OUTDATED_AFTER_DAYS: i64 = 90;

/// Compute the PRECISE-HBR score from extracted inputs.
///
/// Pure arithmetic over the effective values: no I/O, no extraction.
/// A missing continuous input contributes zero. The ARC-HBR bonus is a
/// flat +3 gated on `arc_hbr_count > 0` — the count never scales it.
pub fn calculate_pure_score(inputs: &ScoreInputs) -> (i64, ScoreBreakdown) {
    let mut breakdown = ScoreBreakdown {
        base: BASE_SCORE,
        ..Default::default()
    };

    if let Some(age) = inputs.metadata.age_effective {
        if age > 30.0 {
            breakdown.age = (age - 30.0) * 0.25;
        }
    }
    if let Some(hb) = inputs.metadata.hb_effective {
        if hb < 15.0 {
            breakdown.hb = (15.0 - hb) * 2.5;
        }
    }
    if let Some(egfr) = inputs.metadata.egfr_effective {
        if egfr < 100.0 {
            breakdown.egfr = (100.0 - egfr) * 0.05;
        }
    }
    if let Some(wbc) = inputs.metadata.wbc_effective {
        if wbc > 3.0 {
            breakdown.wbc = (wbc - 3.0) * 0.8;
        }
    }
    if inputs.prior_bleeding {
        breakdown.bleeding = 7.0;
    }
    if inputs.oral_anticoag {
        breakdown.anticoag = 5.0;
    }
    if inputs.arc_hbr_count > 0 {
        breakdown.arc_hbr = 3.0;
    }

    let total = breakdown.raw_total().round_ties_even() as i64;
    (total, breakdown)
}

/// Orchestrating entry point: extraction, pure scoring, and the component
/// expansion for UI consumption.
pub struct Scorer<'a> {
    extractor: InputExtractor<'a>,
}

impl<'a> Scorer<'a> {
    pub fn new(config: &'a ReferenceConfig) -> Self {
        Self {
            extractor: InputExtractor::new(config),
        }
    }

    /// Extract inputs without scoring.
    pub fn extract_inputs(
        &self,
        bundle: &ClinicalBundle,
        demographics: &Demographics,
    ) -> ScoreInputs {
        self.extractor.extract(bundle, demographics)
    }

    /// Score a clinical bundle end to end.
    pub fn calculate_score(
        &self,
        bundle: &ClinicalBundle,
        demographics: &Demographics,
    ) -> ScoreReport {
        let inputs = self.extractor.extract(bundle, demographics);
        self.score_inputs(&inputs)
    }

    /// Score pre-extracted inputs, producing the full report.
    pub fn score_inputs(&self, inputs: &ScoreInputs) -> ScoreReport {
        let (total_score, breakdown) = calculate_pure_score(inputs);
        let components = build_components(inputs, &breakdown, Utc::now());
        tracing::info!("PRECISE-HBR calculation complete: {total_score}");
        ScoreReport {
            total_score,
            components,
            missing_fields: inputs.missing_fields.clone(),
        }
    }
}

fn build_components(
    inputs: &ScoreInputs,
    breakdown: &ScoreBreakdown,
    now: DateTime<Utc>,
) -> Vec<ScoreComponent> {
    let mut components = Vec::with_capacity(14);

    let mut base = ScoreComponent::new(
        "PRECISE-HBR - Base Score",
        "Fixed base score",
        breakdown.base,
    );
    base.description = format!("Base score: {} points (fixed)", breakdown.base);
    components.push(base);

    // Age
    components.push(match (inputs.age, inputs.metadata.age_effective) {
        (Some(age), Some(effective)) => {
            let value = if age == effective {
                format!("{} years", fmt_num(age))
            } else {
                format!("{} years (effective: {})", fmt_num(age), fmt_num(effective))
            };
            let mut c = ScoreComponent::new("PRECISE-HBR - Age", value, breakdown.age);
            c.description = format!("Age score: {:.2}", breakdown.age);
            c
        }
        _ => unavailable("PRECISE-HBR - Age", "Unknown", "Age not available"),
    });

    // Hemoglobin
    components.push(match inputs.hb {
        Some(hb) => {
            let mut c = ScoreComponent::new(
                "PRECISE-HBR - Hemoglobin",
                format!("{} g/dL", fmt_num(hb)),
                breakdown.hb,
            );
            c.date = inputs.metadata.hb_date.clone();
            c.is_outdated = is_outdated(inputs.metadata.hb_date.as_deref(), now);
            c.description = format!("Hb score: {:.2}", breakdown.hb);
            c
        }
        None => unavailable(
            "PRECISE-HBR - Hemoglobin",
            "Not available",
            "Hemoglobin not available",
        ),
    });

    // eGFR
    components.push(match inputs.egfr {
        Some(egfr) => {
            let mut c = ScoreComponent::new(
                "PRECISE-HBR - eGFR",
                format!("{} mL/min/1.73m²", fmt_num(egfr)),
                breakdown.egfr,
            );
            c.date = inputs.metadata.egfr_date.clone();
            c.is_outdated = is_outdated(inputs.metadata.egfr_date.as_deref(), now);
            c.description = match inputs.metadata.egfr_source {
                Some(source) => format!("eGFR score: {:.2} ({source})", breakdown.egfr),
                None => format!("eGFR score: {:.2}", breakdown.egfr),
            };
            c
        }
        None => unavailable("PRECISE-HBR - eGFR", "Not available", "eGFR not available"),
    });

    // WBC
    components.push(match inputs.wbc {
        Some(wbc) => {
            let mut c = ScoreComponent::new(
                "PRECISE-HBR - White Blood Cell Count",
                format!("{} 10^9/L", fmt_num(wbc)),
                breakdown.wbc,
            );
            c.date = inputs.metadata.wbc_date.clone();
            c.is_outdated = is_outdated(inputs.metadata.wbc_date.as_deref(), now);
            c.description = format!("WBC score: {:.2}", breakdown.wbc);
            c
        }
        None => unavailable(
            "PRECISE-HBR - White Blood Cell Count",
            "Not available",
            "WBC not available",
        ),
    });

    // Prior bleeding
    let mut bleeding = ScoreComponent::new(
        "PRECISE-HBR - Prior Bleeding",
        yes_no(inputs.prior_bleeding),
        breakdown.bleeding,
    );
    bleeding.is_present = Some(inputs.prior_bleeding);
    bleeding.description = format!("Prior Bleeding: {}", breakdown.bleeding);
    components.push(bleeding);

    // Oral anticoagulation
    let mut anticoag = ScoreComponent::new(
        "PRECISE-HBR - Oral Anticoagulation",
        yes_no(inputs.oral_anticoag),
        breakdown.anticoag,
    );
    anticoag.is_present = Some(inputs.oral_anticoag);
    anticoag.description = format!("Anticoagulation: {}", breakdown.anticoag);
    components.push(anticoag);

    // Individual ARC-HBR elements: display-only rows, excluded from the
    // score sum; the summary row below carries the contribution.
    let arc = &inputs.metadata.arc_details;
    let elements = [
        (
            "PRECISE-HBR - Platelet Count",
            arc.thrombocytopenia,
            "Platelet count < 100x10^9/L",
        ),
        (
            "PRECISE-HBR - Chronic Bleeding Diathesis",
            arc.bleeding_diathesis,
            "History of chronic bleeding diathesis",
        ),
        (
            "PRECISE-HBR - Liver Cirrhosis",
            arc.liver_cirrhosis,
            "Liver cirrhosis with portal hypertension",
        ),
        (
            "PRECISE-HBR - Active Malignancy",
            arc.active_malignancy,
            "Active malignancy in past 12 months",
        ),
        (
            "PRECISE-HBR - NSAIDs/Corticosteroids",
            arc.nsaids_corticosteroids,
            "Chronic use of NSAIDs or corticosteroids",
        ),
    ];
    for (parameter, present, description) in elements {
        let mut c = ScoreComponent::new(parameter, yes_no(present), 0.0);
        c.is_present = Some(present);
        c.is_arc_hbr_element = true;
        c.description = description.to_string();
        components.push(c);
    }

    let mut summary = ScoreComponent::new(
        "PRECISE-HBR - ARC-HBR Summary",
        format!("{} factor(s)", inputs.arc_hbr_count),
        breakdown.arc_hbr,
    );
    summary.is_present = Some(inputs.arc_hbr_count > 0);
    summary.description = format!("ARC-HBR: {}", breakdown.arc_hbr);
    components.push(summary);

    components
}

fn unavailable(parameter: &str, value: &str, description: &str) -> ScoreComponent {
    let mut c = ScoreComponent::new(parameter, value, 0.0);
    c.description = description.to_string();
    c
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Format a numeric lab value without a trailing `.0` for whole numbers.
fn fmt_num(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Whether an observation date is older than the staleness window.
/// `N/A`, absent, and unparseable dates are never stale.
fn is_outdated(date: Option<&str>, now: DateTime<Utc>) -> bool {
    let Some(date_str) = date else {
        return false;
    };
    let date_str = date_str.trim();
    if date_str.is_empty() || date_str == "N/A" {
        return false;
    }

    let parsed: Option<DateTime<Utc>> = if date_str.len() == 10 && date_str.contains('-') {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    } else if date_str.contains('T') {
        DateTime::parse_from_rfc3339(date_str)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(date_str, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|dt| dt.and_utc())
            })
    } else {
        None
    };

    match parsed {
        Some(dt) => now - dt > Duration::days(OUTDATED_AFTER_DAYS),
        None => {
            tracing::warn!("could not parse observation date '{date_str}'");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InputMetadata;

    fn inputs_with(
        age: Option<f64>,
        hb: Option<f64>,
        egfr: Option<f64>,
        wbc: Option<f64>,
        prior_bleeding: bool,
        oral_anticoag: bool,
        arc_hbr_count: u8,
    ) -> ScoreInputs {
        ScoreInputs {
            age,
            hb,
            egfr,
            wbc,
            prior_bleeding,
            oral_anticoag,
            arc_hbr_count,
            missing_fields: Vec::new(),
            metadata: InputMetadata {
                age_effective: age.map(|a| a.clamp(30.0, 80.0)),
                hb_effective: hb.map(|h| h.clamp(5.0, 15.0)),
                egfr_effective: egfr.map(|e| e.clamp(5.0, 100.0)),
                wbc_effective: wbc.map(|w| w.min(15.0)),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_normal_patient() {
        // Hb 16 and eGFR 110 sit on the healthy side of their thresholds
        // and contribute nothing; age and WBC still count.
        let inputs = inputs_with(
            Some(40.0),
            Some(16.0),
            Some(110.0),
            Some(5.0),
            false,
            false,
            0,
        );
        let (total, breakdown) = calculate_pure_score(&inputs);
        assert!((breakdown.hb - 0.0).abs() < 1e-9);
        assert!((breakdown.egfr - 0.0).abs() < 1e-9);
        assert!((breakdown.age - 2.5).abs() < 1e-9);
        assert!((breakdown.wbc - 1.6).abs() < 1e-9);
        // 2.0 + 2.5 + 1.6 = 6.1
        assert_eq!(total, 6);
    }

    #[test]
    fn test_pathological_patient() {
        let inputs = inputs_with(
            Some(75.0),
            Some(10.0),
            Some(30.0),
            Some(12.0),
            true,
            true,
            1,
        );
        let (total, breakdown) = calculate_pure_score(&inputs);
        assert!((breakdown.age - 11.25).abs() < 1e-9);
        assert!((breakdown.hb - 12.5).abs() < 1e-9);
        assert!((breakdown.egfr - 3.5).abs() < 1e-9);
        assert!((breakdown.wbc - 7.2).abs() < 1e-9);
        assert!((breakdown.raw_total() - 51.45).abs() < 1e-9);
        assert_eq!(total, 51);
    }

    #[test]
    fn test_age_clamp_boundaries() {
        let at_30 = inputs_with(Some(30.0), None, None, None, false, false, 0);
        assert!((calculate_pure_score(&at_30).1.age - 0.0).abs() < 1e-9);

        let at_31 = inputs_with(Some(31.0), None, None, None, false, false, 0);
        assert!((calculate_pure_score(&at_31).1.age - 0.25).abs() < 1e-9);

        let at_81 = inputs_with(Some(81.0), None, None, None, false, false, 0);
        assert!((calculate_pure_score(&at_81).1.age - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_arc_bonus_is_flat() {
        let one = inputs_with(None, None, None, None, false, false, 1);
        let five = inputs_with(None, None, None, None, false, false, 5);
        let (total_one, breakdown_one) = calculate_pure_score(&one);
        let (total_five, breakdown_five) = calculate_pure_score(&five);
        assert!((breakdown_one.arc_hbr - 3.0).abs() < 1e-9);
        assert!((breakdown_five.arc_hbr - 3.0).abs() < 1e-9);
        assert_eq!(total_one, total_five);
    }

    #[test]
    fn test_round_half_to_even() {
        // Age 31 alone: 2.0 + 0.25 = 2.25, banker's rounding gives 2.
        let inputs = inputs_with(Some(31.0), None, None, None, false, false, 0);
        assert_eq!(calculate_pure_score(&inputs).0, 2);

        // Age 34 alone: 2.0 + 1.0 = 3.0.
        let inputs = inputs_with(Some(34.0), None, None, None, false, false, 0);
        assert_eq!(calculate_pure_score(&inputs).0, 3);

        // 3.5 rounds to 4, 2.5 rounds to 2.
        assert_eq!(3.5_f64.round_ties_even() as i64, 4);
        assert_eq!(2.5_f64.round_ties_even() as i64, 2);
    }

    #[test]
    fn test_missing_inputs_contribute_zero() {
        let inputs = inputs_with(None, None, None, None, false, false, 0);
        let (total, breakdown) = calculate_pure_score(&inputs);
        assert_eq!(total, 2);
        assert!((breakdown.raw_total() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_component_sum_matches_total() {
        let inputs = inputs_with(
            Some(75.0),
            Some(10.0),
            Some(30.0),
            Some(12.0),
            true,
            true,
            3,
        );
        let (total, breakdown) = calculate_pure_score(&inputs);
        let components = build_components(&inputs, &breakdown, Utc::now());

        let sum: f64 = components
            .iter()
            .filter(|c| !c.is_arc_hbr_element)
            .map(|c| c.score)
            .sum();
        assert_eq!(sum.round_ties_even() as i64, total);

        // Display-only rows carry no score.
        assert!(components
            .iter()
            .filter(|c| c.is_arc_hbr_element)
            .all(|c| c.score == 0.0));
        assert_eq!(components.iter().filter(|c| c.is_arc_hbr_element).count(), 5);
        assert_eq!(components.len(), 14);
    }

    #[test]
    fn test_component_values_for_missing_fields() {
        let inputs = ScoreInputs {
            missing_fields: vec![
                crate::models::MissingField::Age,
                crate::models::MissingField::Hemoglobin,
                crate::models::MissingField::Egfr,
                crate::models::MissingField::Wbc,
            ],
            ..Default::default()
        };
        let (total, breakdown) = calculate_pure_score(&inputs);
        let components = build_components(&inputs, &breakdown, Utc::now());
        assert_eq!(total, 2);
        assert_eq!(components[1].value, "Unknown");
        assert_eq!(components[2].value, "Not available");
        assert!(components[1].score == 0.0);
    }

    #[test]
    fn test_clamped_age_is_annotated() {
        let inputs = inputs_with(Some(88.0), None, None, None, false, false, 0);
        let (_, breakdown) = calculate_pure_score(&inputs);
        let components = build_components(&inputs, &breakdown, Utc::now());
        assert_eq!(components[1].value, "88 years (effective: 80)");
    }

    #[test]
    fn test_is_outdated() {
        let now = DateTime::parse_from_rfc3339("2026-08-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert!(is_outdated(Some("2024-01-15"), now));
        assert!(!is_outdated(Some("2026-07-20"), now));
        assert!(is_outdated(Some("2025-01-15T10:30:00Z"), now));
        assert!(is_outdated(Some("2025-01-15T10:30:00"), now));
        assert!(!is_outdated(Some("2026-06-01T00:00:00+08:00"), now));
        assert!(!is_outdated(Some("N/A"), now));
        assert!(!is_outdated(Some("garbage"), now));
        assert!(!is_outdated(None, now));
    }
}
