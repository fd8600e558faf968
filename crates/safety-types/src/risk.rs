//! Risk classification.

use serde::{Deserialize, Serialize};

/// Weight of the caller's risk score in the combined score.
pub const RISK_WEIGHT: f64 = 0.6;
/// Weight of the caller's impact score in the combined score.
pub const IMPACT_WEIGHT: f64 = 0.4;

/// Weighted combination of risk and impact, rounded to nine decimals.
///
/// Rounding keeps boundary cases such as `0.6 * 1.0 + 0.4 * 0.5` at exactly
/// `0.8` instead of one ulp either side.
pub fn combined_score(risk_score: f64, impact_score: f64) -> f64 {
    let raw = RISK_WEIGHT * risk_score + IMPACT_WEIGHT * impact_score;
    (raw * 1e9).round() / 1e9
}

/// Four-tier risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Classify a combined score. Boundaries are inclusive.
    pub fn from_combined(score: f64) -> Self {
        if score >= 0.8 {
            RiskLevel::Critical
        } else if score >= 0.6 {
            RiskLevel::High
        } else if score >= 0.3 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Classify raw risk and impact scores.
    pub fn from_scores(risk_score: f64, impact_score: f64) -> Self {
        Self::from_combined(combined_score(risk_score, impact_score))
    }

    /// High or Critical.
    pub fn is_elevated(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn boundaries_are_inclusive() {
        assert_eq!(RiskLevel::from_combined(0.8), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_combined(0.79999), RiskLevel::High);
        assert_eq!(RiskLevel::from_combined(0.6), RiskLevel::High);
        assert_eq!(RiskLevel::from_combined(0.59999), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_combined(0.3), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_combined(0.29999), RiskLevel::Low);
        assert_eq!(RiskLevel::from_combined(0.0), RiskLevel::Low);
    }

    #[test]
    fn float_noise_does_not_move_boundaries() {
        // 0.6 * 1.0 + 0.4 * 0.5 is 0.8 on paper
        assert_eq!(combined_score(1.0, 0.5), 0.8);
        assert_eq!(RiskLevel::from_scores(1.0, 0.5), RiskLevel::Critical);
        // 0.6 * 0.5 + 0.4 * 0.75 is 0.6 on paper
        assert_eq!(RiskLevel::from_scores(0.5, 0.75), RiskLevel::High);
        assert_eq!(RiskLevel::from_scores(0.9, 0.9), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_scores(0.5, 0.5), RiskLevel::Medium);
    }

    #[test]
    fn elevated_levels() {
        assert!(!RiskLevel::Low.is_elevated());
        assert!(!RiskLevel::Medium.is_elevated());
        assert!(RiskLevel::High.is_elevated());
        assert!(RiskLevel::Critical.is_elevated());
    }

    proptest! {
        #[test]
        fn combined_score_is_weighted_sum(risk in 0.0f64..=1.0, impact in 0.0f64..=1.0) {
            let expected = 0.6 * risk + 0.4 * impact;
            prop_assert!((combined_score(risk, impact) - expected).abs() < 1e-8);
        }

        #[test]
        fn classification_is_monotonic(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(RiskLevel::from_combined(lo) <= RiskLevel::from_combined(hi));
        }

        #[test]
        fn raising_risk_never_lowers_level(
            risk in 0.0f64..=1.0,
            impact in 0.0f64..=1.0,
            bump in 0.0f64..=1.0,
        ) {
            let raised = (risk + bump).min(1.0);
            prop_assert!(
                RiskLevel::from_scores(risk, impact) <= RiskLevel::from_scores(raised, impact)
            );
        }
    }
}
