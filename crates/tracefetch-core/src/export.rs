//! On-disk artifacts for a fetched trace
//!
//! ```text
//! <dir>/
//!   tree.json       full trace document
//!   summary.json    trace-wide aggregates
//!   NAVIGATION.md   human guide to the tree
//!   runs/           per-run JSON written by `tracefetch run`
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::TraceDocument;
use crate::tree::navigation_markdown;

/// Document file name
pub const TREE_FILE: &str = "tree.json";
/// Summary file name
pub const SUMMARY_FILE: &str = "summary.json";
/// Navigation guide file name
pub const NAVIGATION_FILE: &str = "NAVIGATION.md";
/// Per-run directory name
pub const RUNS_DIR: &str = "runs";

/// Paths written by [`write_trace_artifacts`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedFiles {
    /// `tree.json`
    pub tree: PathBuf,
    /// `summary.json`
    pub summary: PathBuf,
    /// `NAVIGATION.md`
    pub navigation: PathBuf,
    /// `runs/`
    pub runs_dir: PathBuf,
}

/// Write the document, summary and navigation guide into `dir`, creating it if needed
pub fn write_trace_artifacts(dir: &Path, doc: &TraceDocument) -> Result<ExportedFiles> {
    fs::create_dir_all(dir)?;

    let files = ExportedFiles {
        tree: dir.join(TREE_FILE),
        summary: dir.join(SUMMARY_FILE),
        navigation: dir.join(NAVIGATION_FILE),
        runs_dir: dir.join(RUNS_DIR),
    };

    fs::write(&files.tree, serde_json::to_string_pretty(doc)?)?;
    fs::write(&files.summary, doc.summary_json()?)?;

    let navigation = navigation_markdown(
        &doc.trace_id,
        doc.tree.as_ref(),
        &doc.summary,
        &dir.display().to_string(),
        &doc.fetched_at.to_rfc3339(),
    );
    fs::write(&files.navigation, navigation)?;
    fs::create_dir_all(&files.runs_dir)?;

    info!(dir = %dir.display(), runs = doc.total_runs, "wrote trace artifacts");
    Ok(files)
}

/// Write one run's full JSON to `<dir>/runs/<run_id>.json`
pub fn write_run(dir: &Path, run_id: &str, run: &Value) -> Result<PathBuf> {
    if run_id.is_empty() || run_id.contains(['/', '\\']) || run_id.starts_with('.') {
        return Err(Error::validation(format!("invalid run id for a file name: {run_id:?}")));
    }

    let runs_dir = dir.join(RUNS_DIR);
    fs::create_dir_all(&runs_dir)?;

    let path = runs_dir.join(format!("{run_id}.json"));
    fs::write(&path, serde_json::to_string_pretty(run)?)?;
    Ok(path)
}
