//! Text renderings of a trace: ASCII tree, terminal summary and navigation Markdown

use super::builder::TraceTree;
use crate::models::{RunSummary, TraceSummary};

/// Width of the `=` rules in terminal output
const RULE_WIDTH: usize = 60;

/// Runs listed in the "errors" and "high token usage" sections
const NAVIGATION_LIST_LIMIT: usize = 5;

/// Options for the detailed tree view
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeRenderOptions {
    /// Append `id:<run id>` to each line
    pub show_ids: bool,
    /// Hide nodes below this depth (root is depth 0)
    pub max_depth: Option<usize>,
}

/// Line layout for the ASCII tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineStyle {
    /// `name [type] 1,234 tok 250ms (model) [ERROR]`
    Detailed,
    /// `name [type] 1,234 tokens model ERROR`
    Compact,
}

/// A run ranked by token usage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRun {
    /// Run id
    pub id: String,
    /// Run name
    pub name: String,
    /// Tokens used by the run
    pub tokens: u64,
}

/// Detailed ASCII tree, depth-first in execution order
pub fn ascii_tree(tree: &TraceTree, options: &TreeRenderOptions) -> Vec<String> {
    tree_lines(tree, LineStyle::Detailed, options)
}

/// Compact ASCII tree used in the navigation document
pub fn compact_ascii_tree(tree: &TraceTree) -> Vec<String> {
    tree_lines(tree, LineStyle::Compact, &TreeRenderOptions::default())
}

struct Frame {
    idx: usize,
    prefix: String,
    is_last: bool,
    depth: usize,
}

fn tree_lines(tree: &TraceTree, style: LineStyle, options: &TreeRenderOptions) -> Vec<String> {
    let mut lines = Vec::new();
    let mut stack = vec![Frame {
        idx: tree.root_index(),
        prefix: String::new(),
        is_last: true,
        depth: 0,
    }];

    while let Some(frame) = stack.pop() {
        let node = tree.node(frame.idx);
        let connector = if frame.is_last { "└── " } else { "├── " };
        let label = match style {
            LineStyle::Detailed => detailed_label(&node.summary, options.show_ids),
            LineStyle::Compact => compact_label(&node.summary),
        };
        lines.push(format!("{}{connector}{label}", frame.prefix));

        if node.children.is_empty() {
            continue;
        }

        let child_prefix = format!(
            "{}{}",
            frame.prefix,
            if frame.is_last { "    " } else { "│   " }
        );

        if options.max_depth.is_some_and(|max| frame.depth >= max) {
            lines.push(format!(
                "{child_prefix}... ({} children)",
                node.children.len()
            ));
            continue;
        }

        let last = node.children.len() - 1;
        for (i, &child) in node.children.iter().enumerate().rev() {
            stack.push(Frame {
                idx: child,
                prefix: child_prefix.clone(),
                is_last: i == last,
                depth: frame.depth + 1,
            });
        }
    }

    lines
}

fn detailed_label(run: &RunSummary, show_ids: bool) -> String {
    let mut parts = vec![
        run.display_name().to_string(),
        format!("[{}]", run.run_type.as_deref().unwrap_or("")),
    ];

    if let Some(tokens) = run.tokens.filter(|&t| t > 0) {
        parts.push(format!("{} tok", format_thousands(tokens)));
    }
    if let Some(duration) = run.duration_ms.filter(|&d| d != 0) {
        parts.push(format!("{duration}ms"));
    }
    if let Some(model) = &run.model {
        parts.push(format!("({model})"));
    }
    if run.is_error() {
        parts.push("[ERROR]".to_string());
    }
    if show_ids {
        parts.push(format!("id:{}", run.id));
    }

    parts.join(" ")
}

fn compact_label(run: &RunSummary) -> String {
    let mut parts = vec![format!("[{}]", run.run_type.as_deref().unwrap_or(""))];

    if let Some(tokens) = run.tokens.filter(|&t| t > 0) {
        parts.push(format!("{} tokens", format_thousands(tokens)));
    }
    if let Some(model) = &run.model {
        parts.push(model.clone());
    }
    if run.is_error() {
        parts.push("ERROR".to_string());
    }

    format!("{} {}", run.display_name(), parts.join(" "))
}

/// Runs reachable from the root with token counts, highest first.
/// Ties keep execution order.
pub fn high_token_runs(tree: &TraceTree, limit: usize) -> Vec<TokenRun> {
    let mut runs: Vec<TokenRun> = tree
        .preorder()
        .filter_map(|(_, idx)| {
            let summary = &tree.node(idx).summary;
            summary.tokens.map(|tokens| TokenRun {
                id: summary.id.clone(),
                name: summary.display_name().to_string(),
                tokens,
            })
        })
        .collect();

    runs.sort_by(|a, b| b.tokens.cmp(&a.tokens));
    runs.truncate(limit);
    runs
}

/// Summary block plus detailed tree for terminal display
pub fn format_tree_pretty(
    tree: Option<&TraceTree>,
    summary: &TraceSummary,
    options: &TreeRenderOptions,
) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = vec![
        rule.clone(),
        "TRACE SUMMARY".to_string(),
        rule.clone(),
        format!("Total runs: {}", summary.total_runs),
        format!("Total tokens: {}", format_thousands(summary.total_tokens)),
        format!("Total cost: ${:.5}", summary.total_cost),
    ];

    if let Some(duration) = summary.total_duration_ms.filter(|&d| d != 0) {
        lines.push(format!("Duration: {}", format_seconds(duration)));
    }
    if !summary.models_used.is_empty() {
        lines.push(format!("Models: {}", summary.models_used.join(", ")));
    }
    if summary.has_errors {
        lines.push(format!("Errors: {}", summary.error_count));
    }
    if summary.has_multiple_roots() {
        lines.push(format!("Warning: {} parentless runs", summary.root_count));
    }

    lines.push(String::new());
    lines.push("Run types:".to_string());
    for (run_type, count) in &summary.run_types {
        lines.push(format!("  {run_type}: {count}"));
    }

    lines.push(String::new());
    lines.push(rule.clone());
    lines.push("EXECUTION TREE".to_string());
    lines.push(rule);

    match tree {
        Some(tree) => lines.extend(ascii_tree(tree, options)),
        None => lines.push("(no tree data)".to_string()),
    }

    lines.join("\n")
}

/// NAVIGATION.md content for exploring an exported trace
pub fn navigation_markdown(
    trace_id: &str,
    tree: Option<&TraceTree>,
    summary: &TraceSummary,
    output_dir: &str,
    fetched_at: &str,
) -> String {
    let mut lines = vec![
        "# Trace Navigation Guide".to_string(),
        String::new(),
        format!("## Trace: {trace_id}"),
        format!("Fetched: {fetched_at}"),
        String::new(),
        "## Summary".to_string(),
        format!("- Total runs: {}", summary.total_runs),
        format!("- Total tokens: {}", format_thousands(summary.total_tokens)),
        format!("- Total cost: ${:.5}", summary.total_cost),
    ];

    if let Some(duration) = summary.total_duration_ms.filter(|&d| d != 0) {
        lines.push(format!("- Duration: {}", format_seconds(duration)));
    }
    if !summary.models_used.is_empty() {
        lines.push(format!("- Models: {}", summary.models_used.join(", ")));
    }
    if summary.has_errors {
        lines.push(format!("- Errors: {}", summary.error_count));
    }

    lines.push(String::new());
    lines.push("## Run Types".to_string());
    for (run_type, count) in &summary.run_types {
        lines.push(format!("- {run_type}: {count}"));
    }

    lines.push(String::new());
    lines.push("## Tree Structure".to_string());
    lines.push("```".to_string());
    match tree {
        Some(tree) => lines.extend(compact_ascii_tree(tree)),
        None => lines.push("(no tree data)".to_string()),
    }
    lines.extend([
        "```".to_string(),
        String::new(),
        "## How to Explore".to_string(),
        String::new(),
        "### View full data for a specific run:".to_string(),
        "```".to_string(),
        format!("tracefetch run <run-id> --output-dir {output_dir}"),
        "```".to_string(),
        String::new(),
    ]);

    if !summary.error_runs.is_empty() {
        lines.push("### Runs with errors:".to_string());
        for run in summary.error_runs.iter().take(NAVIGATION_LIST_LIMIT) {
            lines.push(format!(
                "- `{}` ({})",
                run.id,
                run.name.as_deref().unwrap_or("unknown")
            ));
        }
        lines.push(String::new());
    }

    if let Some(tree) = tree {
        let top = high_token_runs(tree, NAVIGATION_LIST_LIMIT);
        if !top.is_empty() {
            lines.push("### High token usage runs:".to_string());
            for run in top {
                lines.push(format!(
                    "- `{}` ({}): {} tokens",
                    run.id,
                    run.name,
                    format_thousands(run.tokens)
                ));
            }
            lines.push(String::new());
        }
    }

    lines.extend([
        "## Files".to_string(),
        "- `tree.json` - Full tree structure with all run metadata".to_string(),
        "- `summary.json` - Quick statistics".to_string(),
        "- `runs/` - Directory for fetched run data (initially empty)".to_string(),
    ]);

    lines.join("\n")
}

/// `1234567` -> `1,234,567`
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[allow(clippy::cast_precision_loss)]
fn format_seconds(ms: i64) -> String {
    format!("{:.2}s", ms as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RunRecord;
    use crate::tree::{build_tree, summarize};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_runs() -> Vec<RunRecord> {
        serde_json::from_value(json!([
            {
                "id": "root-uuid-1234",
                "name": "handleEpicChat",
                "run_type": "chain",
                "dotted_order": "1",
                "status": "success",
                "total_tokens": 1500,
                "start_time": "2025-01-10T12:00:00Z",
                "end_time": "2025-01-10T12:00:04.5Z",
                "child_run_ids": ["gen", "tool"],
            },
            {
                "id": "tool",
                "name": "searchDocs",
                "run_type": "tool",
                "parent_run_id": "root-uuid-1234",
                "dotted_order": "1.2",
                "status": "success",
            },
            {
                "id": "gen",
                "name": "generateEpicResponse",
                "run_type": "chain",
                "parent_run_id": "root-uuid-1234",
                "dotted_order": "1.1",
                "status": "success",
                "total_tokens": 1500,
                "child_run_ids": ["llm"],
            },
            {
                "id": "llm",
                "name": "createStreamChat",
                "run_type": "llm",
                "parent_run_id": "gen",
                "dotted_order": "1.1.1",
                "status": "success",
                "total_tokens": 1500,
                "total_cost": 0.0123,
                "start_time": "2025-01-10T12:00:01Z",
                "end_time": "2025-01-10T12:00:03.25Z",
                "extra": {"metadata": {"ls_model_name": "claude-sonnet-4"}},
            },
        ]))
        .unwrap()
    }

    #[test]
    fn test_ascii_tree_layout() {
        let tree = build_tree(&sample_runs()).unwrap();
        let lines = ascii_tree(&tree, &TreeRenderOptions::default());

        assert_eq!(
            lines,
            vec![
                "└── handleEpicChat [chain] 1,500 tok 4500ms",
                "    ├── generateEpicResponse [chain] 1,500 tok",
                "    │   └── createStreamChat [llm] 1,500 tok 2250ms (claude-sonnet-4)",
                "    └── searchDocs [tool]",
            ]
        );
    }

    #[test]
    fn test_ascii_tree_show_ids() {
        let tree = build_tree(&sample_runs()).unwrap();
        let options = TreeRenderOptions {
            show_ids: true,
            max_depth: None,
        };
        let lines = ascii_tree(&tree, &options);
        assert!(lines[0].ends_with("id:root-uuid-1234"));
    }

    #[test]
    fn test_ascii_tree_max_depth_truncates() {
        let tree = build_tree(&sample_runs()).unwrap();

        let depth_one = ascii_tree(
            &tree,
            &TreeRenderOptions {
                show_ids: false,
                max_depth: Some(1),
            },
        );
        assert_eq!(
            depth_one,
            vec![
                "└── handleEpicChat [chain] 1,500 tok 4500ms",
                "    ├── generateEpicResponse [chain] 1,500 tok",
                "    │   ... (1 children)",
                "    └── searchDocs [tool]",
            ]
        );

        let root_only = ascii_tree(
            &tree,
            &TreeRenderOptions {
                show_ids: false,
                max_depth: Some(0),
            },
        );
        assert_eq!(root_only.len(), 2);
        assert_eq!(root_only[1], "    ... (2 children)");
    }

    #[test]
    fn test_error_marker() {
        let runs: Vec<RunRecord> = serde_json::from_value(json!([
            {"id": "err-run", "name": "errorRun", "run_type": "llm", "status": "error", "error": "Test error"},
        ]))
        .unwrap();
        let tree = build_tree(&runs).unwrap();

        assert_eq!(
            ascii_tree(&tree, &TreeRenderOptions::default()),
            vec!["└── errorRun [llm] [ERROR]"]
        );
        assert_eq!(compact_ascii_tree(&tree), vec!["└── errorRun [llm] ERROR"]);
    }

    #[test]
    fn test_pretty_output() {
        let runs = sample_runs();
        let tree = build_tree(&runs).unwrap();
        let summary = summarize(&runs);
        let out = format_tree_pretty(Some(&tree), &summary, &TreeRenderOptions::default());

        assert!(out.contains("TRACE SUMMARY"));
        assert!(out.contains("EXECUTION TREE"));
        assert!(out.contains("Total runs: 4"));
        assert!(out.contains("Total tokens: 4,500"));
        assert!(out.contains("Total cost: $0.01230"));
        assert!(out.contains("Duration: 4.50s"));
        assert!(out.contains("Models: claude-sonnet-4"));
        assert!(out.contains("  chain: 2"));
        assert!(out.contains("handleEpicChat"));
        assert!(!out.contains("Errors:"));
    }

    #[test]
    fn test_pretty_output_without_tree() {
        let out = format_tree_pretty(None, &summarize(&[]), &TreeRenderOptions::default());
        assert!(out.contains("TRACE SUMMARY"));
        assert!(out.contains("Total runs: 0"));
        assert!(out.contains("(no tree data)"));
    }

    #[test]
    fn test_high_token_runs() {
        let mut runs = sample_runs();
        runs[1].total_tokens = Some(0);
        runs[0].total_tokens = Some(9000);
        let tree = build_tree(&runs).unwrap();

        let top = high_token_runs(&tree, 3);
        let ids: Vec<&str> = top.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["root-uuid-1234", "gen", "llm"]);

        assert_eq!(high_token_runs(&tree, 10).len(), 4);
    }

    #[test]
    fn test_navigation_markdown() {
        let runs = sample_runs();
        let tree = build_tree(&runs).unwrap();
        let summary = summarize(&runs);
        let md = navigation_markdown(
            "test-trace-123",
            Some(&tree),
            &summary,
            "./trace-data",
            "2025-01-10T12:00:00Z",
        );

        assert!(md.starts_with("# Trace Navigation Guide"));
        assert!(md.contains("## Trace: test-trace-123"));
        assert!(md.contains("- Total runs: 4"));
        assert!(md.contains("tracefetch run <run-id> --output-dir ./trace-data"));
        assert!(md.contains("└── handleEpicChat [chain] 1,500 tokens"));
        assert!(md.contains("### High token usage runs:"));
        assert!(md.contains("tree.json"));
        assert!(md.contains("summary.json"));
        assert!(!md.contains("Runs with errors:"));
    }

    #[test]
    fn test_navigation_markdown_with_errors() {
        let runs: Vec<RunRecord> = serde_json::from_value(json!([
            {"id": "err-run", "name": "errorRun", "run_type": "llm", "status": "error", "error": "Test error"},
        ]))
        .unwrap();
        let tree = build_tree(&runs).unwrap();
        let summary = summarize(&runs);
        let md = navigation_markdown("error-trace", Some(&tree), &summary, "./out", "now");

        assert!(md.contains("- Errors: 1"));
        assert!(md.contains("### Runs with errors:"));
        assert!(md.contains("- `err-run` (errorRun)"));
    }

    #[test]
    fn test_navigation_markdown_without_tree() {
        let md = navigation_markdown("empty", None, &summarize(&[]), "./out", "now");
        assert!(md.contains("(no tree data)"));
        assert!(!md.contains("High token usage"));
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(1_234_567), "1,234,567");
    }
}
