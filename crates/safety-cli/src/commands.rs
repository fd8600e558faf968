//! Subcommand implementations.
//!
//! Each command writes JSON to the given writer so it can be exercised
//! without a terminal.

use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use safety_constraints::ConstraintManager;
use safety_service::{ActionData, SafetyService, SafetyValidation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One recorded event in a replay file.
#[derive(Debug, Deserialize)]
pub struct ReplayEvent {
    pub user_id: String,
    pub action_data: ActionData,
}

#[derive(Debug, Serialize)]
struct ReplayVerdict<'a> {
    line: usize,
    user_id: &'a str,
    validation: &'a SafetyValidation,
}

/// Evaluate one action file for `user_id` and print the verdict.
pub fn validate(
    service: &SafetyService,
    user_id: &str,
    action_path: &Path,
    out: &mut impl Write,
) -> Result<SafetyValidation> {
    let raw = std::fs::read_to_string(action_path)
        .with_context(|| format!("reading {}", action_path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", action_path.display()))?;
    let Some(action) = value.as_object() else {
        bail!("{} must contain a JSON object", action_path.display());
    };

    let verdict = service.validate_agent_action(user_id, action);
    serde_json::to_writer_pretty(&mut *out, &verdict)?;
    writeln!(out)?;
    Ok(verdict)
}

/// Feed `{user_id, action_data}` lines through one service, printing one
/// verdict per line. Blank lines are skipped.
pub fn replay(
    service: &SafetyService,
    events: impl BufRead,
    out: &mut impl Write,
) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for (index, line) in events.lines().enumerate() {
        let number = index + 1;
        let line = line.with_context(|| format!("reading line {}", number))?;
        if line.trim().is_empty() {
            continue;
        }
        let event: ReplayEvent = serde_json::from_str(&line)
            .with_context(|| format!("line {}: expected {{user_id, action_data}}", number))?;

        let validation = service.validate_agent_action(&event.user_id, &event.action_data);
        summary.record(&validation);
        debug!(line = number, user_id = %event.user_id, is_valid = validation.is_valid, "Replayed");

        serde_json::to_writer(
            &mut *out,
            &ReplayVerdict {
                line: number,
                user_id: &event.user_id,
                validation: &validation,
            },
        )?;
        writeln!(out)?;
    }

    info!(
        total = summary.total,
        valid = summary.valid,
        requires_approval = summary.requires_approval,
        failed_closed = summary.failed_closed,
        "Replay complete"
    );
    Ok(summary)
}

/// Print the constraint set a fresh user starts with.
pub fn constraints(service: &SafetyService, out: &mut impl Write) -> Result<()> {
    let probe = ConstraintManager::new("constraints-probe", service.config().constraints.clone());
    serde_json::to_writer_pretty(&mut *out, &probe.get_constraints())?;
    writeln!(out)?;
    Ok(())
}

/// Counts over a replay run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub total: usize,
    pub valid: usize,
    pub requires_approval: usize,
    pub failed_closed: usize,
}

impl ReplaySummary {
    fn record(&mut self, validation: &SafetyValidation) {
        self.total += 1;
        if validation.is_valid {
            self.valid += 1;
        }
        if validation.requires_approval {
            self.requires_approval += 1;
        }
        if validation.failed_closed() {
            self.failed_closed += 1;
        }
    }
}
