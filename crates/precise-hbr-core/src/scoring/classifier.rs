//! Risk categorization and the bleeding-risk calibration curve.

use crate::models::{RiskCategory, RiskCategoryInfo, RiskColor, RiskDisplayInfo};

/// Score ≤ 22: not high bleeding risk.
pub const THRESHOLD_NON_HBR: i64 = 22;
/// Score 23–26: high bleeding risk.
pub const THRESHOLD_HBR: i64 = 26;
/// Score 27–30: very high bleeding risk.
pub const THRESHOLD_VERY_HBR: i64 = 30;
/// Score 31–35: extremely high risk.
pub const THRESHOLD_EXTREME: i64 = 35;

struct RiskBand {
    base: f64,
    max: f64,
    slope: f64,
}

const NON_HBR: RiskBand = RiskBand { base: 0.5, max: 3.5, slope: 3.0 };
const HBR: RiskBand = RiskBand { base: 3.5, max: 5.5, slope: 2.0 };
const VERY_HBR: RiskBand = RiskBand { base: 5.5, max: 8.0, slope: 2.5 };
const EXTREME: RiskBand = RiskBand { base: 8.0, max: 12.0, slope: 4.0 };
const CAP: RiskBand = RiskBand { base: 12.0, max: 15.0, slope: 3.0 };

/// Estimated 1-year risk of BARC 3/5 bleeding for a PRECISE-HBR score,
/// from the validation study's calibration curve. Piecewise-linear within
/// each score band, capped at the band maximum.
pub fn bleeding_risk_percentage(score: i64) -> f64 {
    let score_f = score as f64;
    if score <= THRESHOLD_NON_HBR {
        let pct = NON_HBR.base + score_f / THRESHOLD_NON_HBR as f64 * NON_HBR.slope;
        pct.min(NON_HBR.max)
    } else if score <= THRESHOLD_HBR {
        let range = (THRESHOLD_HBR - THRESHOLD_NON_HBR) as f64;
        let pct = HBR.base + (score_f - THRESHOLD_NON_HBR as f64) / range * HBR.slope;
        pct.min(HBR.max)
    } else if score <= THRESHOLD_VERY_HBR {
        let range = (THRESHOLD_VERY_HBR - THRESHOLD_HBR) as f64;
        let pct = VERY_HBR.base + (score_f - THRESHOLD_HBR as f64) / range * VERY_HBR.slope;
        pct.min(VERY_HBR.max)
    } else if score <= THRESHOLD_EXTREME {
        let range = (THRESHOLD_EXTREME - THRESHOLD_VERY_HBR) as f64;
        let pct = EXTREME.base + (score_f - THRESHOLD_VERY_HBR as f64) / range * EXTREME.slope;
        pct.min(EXTREME.max)
    } else {
        // Beyond 35 the curve continues at its band slope per 10 points.
        let pct = CAP.base + (score_f - THRESHOLD_EXTREME as f64) / 10.0 * CAP.slope;
        pct.min(CAP.max)
    }
}

/// Risk category, severity color, and calibrated bleeding-risk percentage
/// for a score.
pub fn risk_category_info(score: i64) -> RiskCategoryInfo {
    let bleeding_risk_percent = bleeding_risk_percentage(score);

    if score <= THRESHOLD_NON_HBR {
        RiskCategoryInfo {
            category: RiskCategory::NotHbr,
            color: RiskColor::Success,
            bleeding_risk_percent,
            score_range: format!("(score ≤{THRESHOLD_NON_HBR})"),
        }
    } else if score <= THRESHOLD_HBR {
        RiskCategoryInfo {
            category: RiskCategory::Hbr,
            color: RiskColor::Warning,
            bleeding_risk_percent,
            score_range: format!(
                "(score {}-{THRESHOLD_HBR})",
                THRESHOLD_NON_HBR + 1
            ),
        }
    } else {
        RiskCategoryInfo {
            category: RiskCategory::VeryHbr,
            color: RiskColor::Danger,
            bleeding_risk_percent,
            score_range: format!("(score ≥{})", THRESHOLD_HBR + 1),
        }
    }
}

/// Complete display payload for a score, including the recommendation line.
pub fn display_info(score: i64) -> RiskDisplayInfo {
    let info = risk_category_info(score);
    RiskDisplayInfo {
        score,
        risk_category: info.category.label().to_string(),
        score_range: info.score_range.clone(),
        bleeding_risk_percent: info.bleeding_risk_percent,
        color_class: info.color,
        full_label: format!("{} {}", info.category.label(), info.score_range),
        recommendation: format!(
            "1-year risk of major bleeding: {:.2}% \
             (Bleeding Academic Research Consortium [BARC] type 3 or 5)",
            info.bleeding_risk_percent
        ),
    }
}
