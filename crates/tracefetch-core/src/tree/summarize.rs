//! Trace-wide aggregates over the flat run list
//!
//! Works on the records rather than the built tree, so orphans and a missing
//! root still count toward the totals.

use std::collections::BTreeSet;

use super::extract::{extract_model_name, run_duration_ms};
use crate::models::{ErrorRun, RunRecord, TraceSummary};

/// Histogram label for runs without a type
const UNKNOWN_RUN_TYPE: &str = "unknown";

/// Aggregate token, cost, type, model and error statistics for one trace
pub fn summarize(runs: &[RunRecord]) -> TraceSummary {
    let mut summary = TraceSummary {
        total_runs: runs.len(),
        ..TraceSummary::default()
    };
    let mut models = BTreeSet::new();

    for run in runs {
        summary.total_tokens = summary.total_tokens.saturating_add(run.total_tokens.unwrap_or(0));
        summary.prompt_tokens = summary.prompt_tokens.saturating_add(run.prompt_tokens.unwrap_or(0));
        summary.completion_tokens = summary
            .completion_tokens
            .saturating_add(run.completion_tokens.unwrap_or(0));
        summary.total_cost += run.total_cost.unwrap_or(0.0);
        summary.prompt_cost += run.prompt_cost.unwrap_or(0.0);
        summary.completion_cost += run.completion_cost.unwrap_or(0.0);

        let run_type = run.run_type.as_deref().unwrap_or(UNKNOWN_RUN_TYPE);
        *summary.run_types.entry(run_type.to_string()).or_default() += 1;

        if let Some(model) = extract_model_name(run) {
            models.insert(model);
        }

        if run.is_error() {
            summary.error_runs.push(ErrorRun {
                id: run.id.clone(),
                name: run.name.clone(),
                error: run.error.clone(),
            });
        }

        if run.is_root() {
            summary.root_count += 1;
            // last parseable root wins
            if let Some(duration) = run_duration_ms(run) {
                summary.total_duration_ms = Some(duration);
            }
        }
    }

    summary.models_used = models.into_iter().collect();
    summary.error_count = summary.error_runs.len();
    summary.has_errors = summary.error_count > 0;
    summary
}
