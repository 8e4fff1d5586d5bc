//! Property tests for the scoring engine.

use proptest::prelude::*;

use precise_hbr_core::models::{InputMetadata, ScoreInputs};
use precise_hbr_core::scoring::{bleeding_risk_percentage, calculate_pure_score};

fn inputs(
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

proptest! {
    #[test]
    fn score_is_deterministic(
        age in 20.0..95.0f64,
        hb in 4.0..18.0f64,
        egfr in 2.0..130.0f64,
        wbc in 1.0..30.0f64,
        bleeding: bool,
        anticoag: bool,
        arc in 0u8..=5,
    ) {
        let a = inputs(Some(age), Some(hb), Some(egfr), Some(wbc), bleeding, anticoag, arc);
        let b = inputs(Some(age), Some(hb), Some(egfr), Some(wbc), bleeding, anticoag, arc);
        prop_assert_eq!(calculate_pure_score(&a), calculate_pure_score(&b));
    }

    #[test]
    fn score_is_monotone_in_age(
        age_low in 30.0..80.0f64,
        delta in 0.0..50.0f64,
        hb in 4.0..18.0f64,
    ) {
        let low = inputs(Some(age_low), Some(hb), None, None, false, false, 0);
        let high = inputs(Some(age_low + delta), Some(hb), None, None, false, false, 0);
        prop_assert!(calculate_pure_score(&high).0 >= calculate_pure_score(&low).0);
    }

    #[test]
    fn score_is_monotone_in_hemoglobin(
        hb_low in 5.0..15.0f64,
        delta in 0.0..10.0f64,
        age in 30.0..80.0f64,
    ) {
        // Lower hemoglobin never lowers the score.
        let anemic = inputs(Some(age), Some(hb_low), None, None, false, false, 0);
        let healthier = inputs(Some(age), Some(hb_low + delta), None, None, false, false, 0);
        prop_assert!(calculate_pure_score(&anemic).0 >= calculate_pure_score(&healthier).0);
    }

    #[test]
    fn score_is_monotone_in_egfr(
        egfr_low in 5.0..100.0f64,
        delta in 0.0..60.0f64,
    ) {
        let impaired = inputs(None, None, Some(egfr_low), None, false, false, 0);
        let healthier = inputs(None, None, Some(egfr_low + delta), None, false, false, 0);
        prop_assert!(calculate_pure_score(&impaired).0 >= calculate_pure_score(&healthier).0);
    }

    #[test]
    fn score_is_monotone_in_wbc(
        wbc_low in 1.0..15.0f64,
        delta in 0.0..20.0f64,
    ) {
        let low = inputs(None, None, None, Some(wbc_low), false, false, 0);
        let high = inputs(None, None, None, Some(wbc_low + delta), false, false, 0);
        prop_assert!(calculate_pure_score(&high).0 >= calculate_pure_score(&low).0);
    }

    #[test]
    fn arc_bonus_never_scales_with_count(
        arc in 1u8..=5,
        age in 20.0..95.0f64,
    ) {
        let one = inputs(Some(age), None, None, None, false, false, 1);
        let many = inputs(Some(age), None, None, None, false, false, arc);
        prop_assert_eq!(calculate_pure_score(&one).0, calculate_pure_score(&many).0);
    }

    #[test]
    fn breakdown_sums_to_raw_total(
        age in 20.0..95.0f64,
        hb in 4.0..18.0f64,
        egfr in 2.0..130.0f64,
        wbc in 1.0..30.0f64,
        bleeding: bool,
        anticoag: bool,
        arc in 0u8..=5,
    ) {
        let inputs = inputs(Some(age), Some(hb), Some(egfr), Some(wbc), bleeding, anticoag, arc);
        let (total, breakdown) = calculate_pure_score(&inputs);
        prop_assert_eq!(breakdown.raw_total().round_ties_even() as i64, total);
        // Every contribution is non-negative and total never drops below base.
        prop_assert!(total >= 2);
        for term in [
            breakdown.age, breakdown.hb, breakdown.egfr, breakdown.wbc,
            breakdown.bleeding, breakdown.anticoag, breakdown.arc_hbr,
        ] {
            prop_assert!(term >= 0.0);
        }
    }

    #[test]
    fn risk_curve_is_bounded_and_monotone(score in 0i64..200) {
        let pct = bleeding_risk_percentage(score);
        prop_assert!((0.5..=15.0).contains(&pct));
        prop_assert!(bleeding_risk_percentage(score + 1) >= pct);
    }
}
