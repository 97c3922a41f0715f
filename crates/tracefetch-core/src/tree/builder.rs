//! Arena-backed trace tree
//!
//! Nodes live in a single `Vec` and refer to each other by index, so there is
//! no shared ownership between parents and children. Traversals use an
//! explicit stack. JSON serialization nests children only down to
//! [`MAX_NESTED_JSON_DEPTH`]; below that, each subtree is listed flat.

use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, warn};

use super::extract::extract_run_summary;
use crate::models::{RunRecord, RunSummary};

/// Deepest node whose children are nested in the JSON view.
///
/// A node at this depth carries a flat, pre-order `descendants` list (each
/// entry with `parent_id` and `depth`) instead of `children`. Keeps the
/// serializer's stack bounded and the output under serde_json's default
/// parse nesting limit.
pub const MAX_NESTED_JSON_DEPTH: usize = 50;

/// One node of the tree
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    /// Summary of the run at this node
    pub summary: RunSummary,
    /// Index of the parent node, `None` for the root and for orphans
    pub parent: Option<usize>,
    /// Child node indices, sorted by dotted order
    pub children: Vec<usize>,
}

/// A rooted execution tree plus an id index over every record it was built from
#[derive(Debug, Clone, PartialEq)]
pub struct TraceTree {
    nodes: Vec<TreeNode>,
    index: HashMap<String, usize>,
    root: usize,
    root_candidates: Vec<String>,
}

/// Rebuild the execution tree from a flat list of run records.
///
/// Returns `None` for empty input or when no record lacks a parent. Records
/// whose parent id matches nothing stay in the id index but are unreachable
/// from the root. When several records have no parent the last one wins;
/// the others are reported through [`TraceTree::root_candidates`].
pub fn build_tree(runs: &[RunRecord]) -> Option<TraceTree> {
    if runs.is_empty() {
        return None;
    }

    let mut nodes: Vec<TreeNode> = Vec::with_capacity(runs.len());
    let mut parents: Vec<Option<&str>> = Vec::with_capacity(runs.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(runs.len());

    for run in runs {
        let summary = extract_run_summary(run);
        match index.get(&run.id) {
            Some(&existing) => {
                debug!(run_id = %run.id, "Duplicate run id, keeping the later record");
                nodes[existing].summary = summary;
                parents[existing] = run.parent_run_id.as_deref();
            }
            None => {
                index.insert(run.id.clone(), nodes.len());
                nodes.push(TreeNode {
                    summary,
                    parent: None,
                    children: Vec::new(),
                });
                parents.push(run.parent_run_id.as_deref());
            }
        }
    }

    let mut root = None;
    let mut root_candidates = Vec::new();
    let mut orphans = 0usize;

    for (idx, parent_id) in parents.iter().enumerate() {
        match parent_id {
            None => {
                root = Some(idx);
                root_candidates.push(nodes[idx].summary.id.clone());
            }
            Some(parent_id) => match index.get(*parent_id) {
                Some(&parent_idx) if parent_idx != idx => {
                    nodes[idx].parent = Some(parent_idx);
                    nodes[parent_idx].children.push(idx);
                }
                _ => orphans += 1,
            },
        }
    }

    if orphans > 0 {
        debug!(orphans, "Runs reference parents that were not fetched");
    }

    if root_candidates.len() > 1 {
        warn!(
            roots = ?root_candidates,
            "Trace has multiple parentless runs; using the last one as root"
        );
    }

    let root = root?;
    sort_children(&mut nodes);

    Some(TraceTree {
        nodes,
        index,
        root,
        root_candidates,
    })
}

/// Stable sort of every sibling list by dotted order
fn sort_children(nodes: &mut [TreeNode]) {
    for idx in 0..nodes.len() {
        let mut children = std::mem::take(&mut nodes[idx].children);
        children.sort_by(|&a, &b| nodes[a].summary.sort_key().cmp(nodes[b].summary.sort_key()));
        nodes[idx].children = children;
    }
}

impl TraceTree {
    /// Root node
    pub fn root(&self) -> &TreeNode {
        &self.nodes[self.root]
    }

    /// Index of the root node
    pub fn root_index(&self) -> usize {
        self.root
    }

    /// Node at `idx`
    pub fn node(&self, idx: usize) -> &TreeNode {
        &self.nodes[idx]
    }

    /// Look up any indexed run by id, reachable from the root or not
    pub fn get(&self, id: &str) -> Option<&RunSummary> {
        self.index.get(id).map(|&idx| &self.nodes[idx].summary)
    }

    /// Index of the node for `id`
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Number of indexed runs (not just the reachable ones)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; an empty input never produces a tree
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of every parentless record, in input order
    pub fn root_candidates(&self) -> &[String] {
        &self.root_candidates
    }

    /// Whether more than one record claimed to be the root
    pub fn has_multiple_roots(&self) -> bool {
        self.root_candidates.len() > 1
    }

    /// Pre-order walk from the root, yielding `(depth, node index)`
    pub fn preorder(&self) -> Preorder<'_> {
        self.subtree(self.root, 0)
    }

    fn subtree(&self, idx: usize, depth: usize) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: vec![(depth, idx)],
        }
    }

    /// Number of nodes reachable from the root, root included
    pub fn reachable_count(&self) -> usize {
        self.preorder().count()
    }

    /// Depth of the deepest reachable node; the root alone has depth 0
    pub fn max_depth(&self) -> usize {
        self.preorder().map(|(depth, _)| depth).max().unwrap_or(0)
    }
}

/// Iterator returned by [`TraceTree::preorder`]
pub struct Preorder<'a> {
    tree: &'a TraceTree,
    stack: Vec<(usize, usize)>,
}

impl Iterator for Preorder<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, idx) = self.stack.pop()?;
        let children = &self.tree.nodes[idx].children;
        self.stack
            .extend(children.iter().rev().map(|&child| (depth + 1, child)));
        Some((depth, idx))
    }
}

fn serialize_summary<M: SerializeMap>(map: &mut M, summary: &RunSummary) -> Result<(), M::Error> {
    let fields = serde_json::to_value(summary).map_err(serde::ser::Error::custom)?;
    if let serde_json::Value::Object(fields) = fields {
        for (key, value) in &fields {
            map.serialize_entry(key, value)?;
        }
    }
    Ok(())
}

/// Nested `{...summary, children: [...]}` view of one subtree
struct NodeView<'a> {
    tree: &'a TraceTree,
    idx: usize,
    depth: usize,
}

impl Serialize for NodeView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = &self.tree.nodes[self.idx];
        let mut map = serializer.serialize_map(None)?;
        serialize_summary(&mut map, &node.summary)?;

        if self.depth < MAX_NESTED_JSON_DEPTH {
            let children: Vec<NodeView<'_>> = node
                .children
                .iter()
                .map(|&idx| NodeView {
                    tree: self.tree,
                    idx,
                    depth: self.depth + 1,
                })
                .collect();
            map.serialize_entry("children", &children)?;
        } else {
            map.serialize_entry(
                "descendants",
                &Descendants {
                    tree: self.tree,
                    idx: self.idx,
                    depth: self.depth,
                },
            )?;
        }
        map.end()
    }
}

/// Pre-order list of everything below one node, without nesting
struct Descendants<'a> {
    tree: &'a TraceTree,
    idx: usize,
    depth: usize,
}

impl Serialize for Descendants<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(
            self.tree
                .subtree(self.idx, self.depth)
                .skip(1)
                .map(|(depth, idx)| FlatNodeView {
                    tree: self.tree,
                    idx,
                    depth,
                }),
        )
    }
}

struct FlatNodeView<'a> {
    tree: &'a TraceTree,
    idx: usize,
    depth: usize,
}

impl Serialize for FlatNodeView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = &self.tree.nodes[self.idx];
        let mut map = serializer.serialize_map(None)?;
        serialize_summary(&mut map, &node.summary)?;
        let parent_id = node.parent.map(|p| self.tree.nodes[p].summary.id.as_str());
        map.serialize_entry("parent_id", &parent_id)?;
        map.serialize_entry("depth", &self.depth)?;
        map.end()
    }
}

impl Serialize for TraceTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        NodeView {
            tree: self,
            idx: self.root,
            depth: 0,
        }
        .serialize(serializer)
    }
}
