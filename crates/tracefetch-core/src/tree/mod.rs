//! Trace tree reconstruction and summarization
//!
//! The API hands back a flat, unordered list of run records, each pointing at
//! its parent. This module turns that list into:
//!
//! - per-run summaries ([`extract_run_summary`])
//! - an arena-backed execution tree with siblings in execution order ([`build_tree`])
//! - trace-wide aggregates computed over the flat list ([`summarize`])
//! - terminal and Markdown renderings ([`render`])
//!
//! Everything here is a pure function of its input. Missing or malformed
//! optional fields degrade to `None`; nothing in this module returns an error.

mod builder;
mod extract;
pub mod render;
mod summarize;

pub use builder::{build_tree, Preorder, TraceTree, TreeNode, MAX_NESTED_JSON_DEPTH};
pub use extract::{duration_ms, extract_model_name, extract_run_summary, parse_timestamp};
pub use render::{format_tree_pretty, navigation_markdown, TreeRenderOptions};
pub use summarize::summarize;
