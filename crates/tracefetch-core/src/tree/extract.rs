//! Per-run summary extraction

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::models::{RunRecord, RunSummary};

/// Naive layouts the API emits when it omits the offset; read as UTC
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Model name lookup paths under `extra`, most specific first
const MODEL_PATHS: [[&str; 2]; 4] = [
    ["metadata", "ls_model_name"],
    ["runtime", "model"],
    ["invocation_params", "model"],
    ["invocation_params", "model_name"],
];

/// Normalize one run record into a compact summary
pub fn extract_run_summary(run: &RunRecord) -> RunSummary {
    let child_count = run.child_ids().len();

    RunSummary {
        id: run.id.clone(),
        name: run.name.clone(),
        run_type: run.run_type.clone(),
        status: run.status.clone(),
        error: run.error.clone(),
        tokens: run.total_tokens,
        prompt_tokens: run.prompt_tokens,
        completion_tokens: run.completion_tokens,
        cost: run.total_cost,
        prompt_cost: run.prompt_cost,
        completion_cost: run.completion_cost,
        duration_ms: run_duration_ms(run),
        model: extract_model_name(run),
        dotted_order: run.dotted_order.clone(),
        start_time: run.start_time.clone(),
        end_time: run.end_time.clone(),
        first_token_time: run.first_token_time.clone(),
        has_children: child_count > 0,
        child_count,
    }
}

/// Resolve the model name from the run's extras.
///
/// Checked in order, first non-empty string wins:
/// `extra.metadata.ls_model_name`, `extra.runtime.model`,
/// `extra.invocation_params.model`, `extra.invocation_params.model_name`.
pub fn extract_model_name(run: &RunRecord) -> Option<String> {
    let extra = run.extra.as_ref()?;

    MODEL_PATHS.iter().find_map(|&[section, key]| {
        extra
            .get(section)
            .and_then(|s| s.get(key))
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(String::from)
    })
}

/// Duration of a run from its own timestamps
pub(crate) fn run_duration_ms(run: &RunRecord) -> Option<i64> {
    duration_ms(run.start_time.as_deref()?, run.end_time.as_deref()?)
}

/// Milliseconds between two ISO-8601 timestamps, rounded to the nearest
/// millisecond. `None` if either fails to parse.
pub fn duration_ms(start: &str, end: &str) -> Option<i64> {
    let start = parse_timestamp(start)?;
    let end = parse_timestamp(end)?;
    let micros = (end - start).num_microseconds()?;

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    Some((micros as f64 / 1000.0).round() as i64)
}

/// Parse an ISO-8601 timestamp with `Z`, an explicit offset, or no offset at all
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
