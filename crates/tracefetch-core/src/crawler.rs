//! Breadth-first reconstruction of a trace from a source that only exposes
//! one root run plus batched lookups by id.
//!
//! The crawl starts at the shared root, then expands level by level: unvisited
//! child ids are drained from a work queue in batches, fetched, and their own
//! children queued. A batch that fails or comes back empty is skipped. Only a
//! failure to fetch the root aborts the crawl.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::config::CrawlConfig;
use crate::error::Result;
use crate::models::RunRecord;

/// Remote source of runs for one shared trace
#[async_trait]
pub trait RunSource: Send + Sync {
    /// Fetch the root run of the shared trace
    async fn fetch_root(&self, token: &str) -> Result<RunRecord>;

    /// Fetch the runs with the given ids. Ids the source does not know are
    /// silently absent from the result.
    async fn fetch_batch(&self, token: &str, ids: &[String]) -> Result<Vec<RunRecord>>;
}

/// Result of one crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    /// Runs in discovery order, root first
    pub runs: Vec<RunRecord>,
    /// Batches that errored or returned nothing
    pub failed_batches: usize,
    /// Whether the run cap stopped the crawl before the queue drained
    pub truncated: bool,
}

impl CrawlOutcome {
    /// Whether some part of the trace may be missing
    pub fn is_partial(&self) -> bool {
        self.failed_batches > 0 || self.truncated
    }
}

/// Batched breadth-first crawler over a [`RunSource`]
pub struct PublicTraceCrawler<S> {
    source: S,
    config: CrawlConfig,
}

impl<S: RunSource> PublicTraceCrawler<S> {
    /// Create a crawler
    pub fn new(source: S, config: CrawlConfig) -> Self {
        Self { source, config }
    }

    /// The underlying source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Collect every run reachable from the root of the shared trace.
    ///
    /// Errors from the root fetch propagate unchanged, so an unshared trace
    /// surfaces as [`crate::Error::NotPublic`] and an unknown token as
    /// [`crate::Error::NotFound`].
    pub async fn crawl(&self, token: &str) -> Result<CrawlOutcome> {
        let cap = self.config.max_runs.max(1);
        let batch_size = self.config.effective_batch_size();
        let concurrency = self.config.effective_concurrency();

        let root = self.source.fetch_root(token).await?;
        debug!(run_id = %root.id, children = root.child_ids().len(), "fetched root run");

        let mut state = CrawlState::default();
        state.accept(root);

        while !state.queue.is_empty() && state.outcome.runs.len() < cap {
            let batches = state.next_batches(batch_size, concurrency);
            if batches.is_empty() {
                break;
            }

            let results = join_all(
                batches
                    .iter()
                    .map(|ids| self.source.fetch_batch(token, ids)),
            )
            .await;

            for (ids, result) in batches.iter().zip(results) {
                match result {
                    Ok(runs) if runs.is_empty() => {
                        warn!(requested = ids.len(), "batch returned no runs, skipping");
                        state.outcome.failed_batches += 1;
                    }
                    Ok(runs) => {
                        debug!(requested = ids.len(), returned = runs.len(), "fetched batch");
                        for run in runs {
                            if state.visited.contains(&run.id) {
                                continue;
                            }
                            if state.outcome.runs.len() >= cap {
                                state.outcome.truncated = true;
                                break;
                            }
                            state.accept(run);
                        }
                    }
                    Err(e) => {
                        warn!(requested = ids.len(), error = %e, "batch fetch failed, skipping");
                        state.outcome.failed_batches += 1;
                    }
                }
            }
        }

        if !state.queue.is_empty() && state.outcome.runs.len() >= cap {
            state.outcome.truncated = true;
        }
        if state.outcome.truncated {
            warn!(max_runs = cap, "run cap reached, trace is truncated");
        }

        info!(
            runs = state.outcome.runs.len(),
            failed_batches = state.outcome.failed_batches,
            truncated = state.outcome.truncated,
            "crawl complete"
        );
        Ok(state.outcome)
    }
}

#[derive(Default)]
struct CrawlState {
    visited: HashSet<String>,
    queued: HashSet<String>,
    queue: VecDeque<String>,
    outcome: CrawlOutcome,
}

impl CrawlState {
    /// Record a newly discovered run and queue its unseen children
    fn accept(&mut self, run: RunRecord) {
        self.visited.insert(run.id.clone());
        for child in run.child_ids() {
            if !self.visited.contains(child) && self.queued.insert(child.clone()) {
                self.queue.push_back(child.clone());
            }
        }
        self.outcome.runs.push(run);
    }

    /// Drain up to `concurrency` batches of unvisited ids from the queue
    fn next_batches(&mut self, batch_size: usize, concurrency: usize) -> Vec<Vec<String>> {
        let mut batches = Vec::with_capacity(concurrency);
        while batches.len() < concurrency {
            let mut batch = Vec::with_capacity(batch_size);
            while batch.len() < batch_size {
                let Some(id) = self.queue.pop_front() else {
                    break;
                };
                self.queued.remove(&id);
                if !self.visited.contains(&id) {
                    batch.push(id);
                }
            }
            if batch.is_empty() {
                break;
            }
            batches.push(batch);
        }
        batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeSource {
        root: Option<RunRecord>,
        runs: HashMap<String, RunRecord>,
        failing: HashSet<String>,
        batches: Mutex<Vec<Vec<String>>>,
    }

    impl FakeSource {
        fn with_root(root: RunRecord) -> Self {
            Self {
                root: Some(root),
                ..Self::default()
            }
        }

        fn add(&mut self, run: RunRecord) {
            self.runs.insert(run.id.clone(), run);
        }

        fn batch_sizes(&self) -> Vec<usize> {
            self.batches.lock().iter().map(Vec::len).collect()
        }
    }

    #[async_trait]
    impl RunSource for FakeSource {
        async fn fetch_root(&self, token: &str) -> Result<RunRecord> {
            self.root
                .clone()
                .ok_or_else(|| Error::NotPublic(token.to_string()))
        }

        async fn fetch_batch(&self, _token: &str, ids: &[String]) -> Result<Vec<RunRecord>> {
            self.batches.lock().push(ids.to_vec());
            if ids.iter().any(|id| self.failing.contains(id)) {
                return Err(Error::Api {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(ids.iter().filter_map(|id| self.runs.get(id).cloned()).collect())
        }
    }

    fn run(id: &str, children: &[&str]) -> RunRecord {
        RunRecord {
            child_run_ids: Some(children.iter().map(|c| (*c).to_string()).collect()),
            ..RunRecord::new(id)
        }
    }

    fn ids(outcome: &CrawlOutcome) -> Vec<&str> {
        outcome.runs.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_missing_child_is_skipped() {
        let mut source = FakeSource::with_root(run("root", &["a", "b"]));
        source.add(run("a", &["c"]));
        source.add(run("c", &[]));

        let crawler = PublicTraceCrawler::new(source, CrawlConfig::default());
        let outcome = crawler.crawl("token").await.unwrap();

        assert_eq!(ids(&outcome), vec!["root", "a", "c"]);
        assert!(!outcome.truncated);
        assert_eq!(outcome.failed_batches, 0);
    }

    #[tokio::test]
    async fn test_failed_batch_is_soft() {
        let mut source = FakeSource::with_root(run("root", &["a"]));
        source.add(run("a", &["b", "c"]));
        source.add(run("c", &[]));
        source.failing.insert("b".to_string());

        let config = CrawlConfig {
            batch_size: 1,
            ..CrawlConfig::default()
        };
        let crawler = PublicTraceCrawler::new(source, config);
        let outcome = crawler.crawl("token").await.unwrap();

        assert_eq!(ids(&outcome), vec!["root", "a", "c"]);
        assert_eq!(outcome.failed_batches, 1);
        assert!(outcome.is_partial());
    }

    #[tokio::test]
    async fn test_empty_batch_counts_as_failure() {
        let source = FakeSource::with_root(run("root", &["ghost"]));
        let crawler = PublicTraceCrawler::new(source, CrawlConfig::default());
        let outcome = crawler.crawl("token").await.unwrap();

        assert_eq!(ids(&outcome), vec!["root"]);
        assert_eq!(outcome.failed_batches, 1);
    }

    #[tokio::test]
    async fn test_root_error_propagates() {
        let crawler = PublicTraceCrawler::new(FakeSource::default(), CrawlConfig::default());
        let err = crawler.crawl("private-token").await.unwrap_err();
        assert!(matches!(err, Error::NotPublic(ref t) if t == "private-token"));
    }

    #[tokio::test]
    async fn test_root_without_children_makes_no_batch_calls() {
        let crawler =
            PublicTraceCrawler::new(FakeSource::with_root(run("solo", &[])), CrawlConfig::default());
        let outcome = crawler.crawl("token").await.unwrap();

        assert_eq!(ids(&outcome), vec!["solo"]);
        assert!(crawler.source().batch_sizes().is_empty());
    }

    #[tokio::test]
    async fn test_cycles_and_shared_children_fetched_once() {
        let mut source = FakeSource::with_root(run("root", &["a", "b"]));
        source.add(run("a", &["shared", "root"]));
        source.add(run("b", &["shared", "a"]));
        source.add(run("shared", &["root", "a"]));

        let crawler = PublicTraceCrawler::new(source, CrawlConfig::default());
        let outcome = crawler.crawl("token").await.unwrap();

        assert_eq!(ids(&outcome), vec!["root", "a", "b", "shared"]);
        let requested: Vec<Vec<String>> = crawler.source().batches.lock().clone();
        assert_eq!(requested, vec![vec!["a", "b"], vec!["shared"]]);
    }

    #[tokio::test]
    async fn test_wide_level_split_into_batches() {
        let children: Vec<String> = (0..250).map(|i| format!("child-{i:03}")).collect();
        let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();

        let mut source = FakeSource::with_root(run("root", &child_refs));
        for id in &children {
            source.add(run(id, &[]));
        }

        let crawler = PublicTraceCrawler::new(source, CrawlConfig::default());
        let outcome = crawler.crawl("token").await.unwrap();

        assert_eq!(outcome.runs.len(), 251);
        assert_eq!(crawler.source().batch_sizes(), vec![100, 100, 50]);
    }

    #[tokio::test]
    async fn test_concurrent_batches_keep_request_order() {
        let children: Vec<String> = (0..5).map(|i| format!("c{i}")).collect();
        let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();

        let mut source = FakeSource::with_root(run("root", &child_refs));
        for id in &children {
            source.add(run(id, &[]));
        }

        let config = CrawlConfig {
            batch_size: 2,
            max_concurrent_batches: 4,
            ..CrawlConfig::default()
        };
        let crawler = PublicTraceCrawler::new(source, config);
        let outcome = crawler.crawl("token").await.unwrap();

        assert_eq!(ids(&outcome), vec!["root", "c0", "c1", "c2", "c3", "c4"]);
        assert_eq!(crawler.source().batch_sizes(), vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_run_cap_is_strict() {
        let children: Vec<String> = (0..20).map(|i| format!("c{i:02}")).collect();
        let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();

        let mut source = FakeSource::with_root(run("root", &child_refs));
        for id in &children {
            source.add(run(id, &["deeper"]));
        }
        source.add(run("deeper", &[]));

        let config = CrawlConfig {
            max_runs: 10,
            ..CrawlConfig::default()
        };
        let crawler = PublicTraceCrawler::new(source, config);
        let outcome = crawler.crawl("token").await.unwrap();

        assert_eq!(outcome.runs.len(), 10);
        assert!(outcome.truncated);
        assert_eq!(crawler.source().batch_sizes(), vec![20]);
    }

    #[tokio::test]
    async fn test_deep_chain_is_fully_crawled() {
        let mut source = FakeSource::with_root(run("n0", &["n1"]));
        for i in 1..50 {
            let child = format!("n{}", i + 1);
            let children: Vec<&str> = if i < 49 { vec![child.as_str()] } else { vec![] };
            source.add(run(&format!("n{i}"), &children));
        }

        let crawler = PublicTraceCrawler::new(source, CrawlConfig::default());
        let outcome = crawler.crawl("token").await.unwrap();

        assert_eq!(outcome.runs.len(), 50);
        assert_eq!(outcome.runs.last().map(|r| r.id.as_str()), Some("n49"));
        assert!(!outcome.is_partial());
    }
}
