//! Behavioral heuristics over a user's recent actions.

use chrono::Duration;
use safety_types::ActionRequest;

use crate::config::SuspiciousPatternConfig;
use crate::history::ActionWindow;

/// Violations describing suspicious behavior, counting the current action.
pub(crate) fn detect(
    config: &SuspiciousPatternConfig,
    window: &ActionWindow<'_>,
    request: &ActionRequest,
) -> Vec<String> {
    let mut findings = Vec::new();

    let identical = window.of_type(&request.action_type, Duration::hours(24)) + 1;
    if identical > config.identical_daily {
        findings.push(format!(
            "Suspicious pattern: {} identical '{}' actions in 24 hours (limit {})",
            identical, request.action_type, config.identical_daily
        ));
    }

    let burst = window.total(Duration::hours(1)) + 1;
    if burst > config.total_hourly {
        findings.push(format!(
            "Suspicious pattern: {} actions in the last hour (limit {})",
            burst, config.total_hourly
        ));
    }

    let conflict_window = Duration::try_hours(config.conflict_window_hours.max(0)).unwrap_or(Duration::MAX);
    for pair in &config.conflicting_pairs {
        if let Some(opposite) = pair.opposite_of(&request.action_type) {
            if window.contains_type(opposite, conflict_window) {
                findings.push(format!(
                    "Suspicious pattern: conflicting action '{}' follows '{}' within {} hours",
                    request.action_type, opposite, config.conflict_window_hours
                ));
            }
        }
    }

    findings
}
