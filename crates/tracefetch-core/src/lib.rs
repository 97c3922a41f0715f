//! # TraceFetch
//!
//! Fetch LLM execution traces from LangSmith and rebuild them into navigable
//! run trees.
//!
//! The API returns a trace as a flat list of runs, each pointing at its
//! parent. TraceFetch reassembles the hierarchy, aggregates tokens, cost,
//! duration and errors over it, and renders it for terminals, agents and
//! scripts.
//!
//! ## Architecture
//!
//! - **Tree**: pure reconstruction, summarization and rendering
//! - **Crawler**: breadth-first batched retrieval of publicly shared traces
//! - **Client**: authenticated and public HTTP access to the LangSmith API
//! - **Export**: `tree.json`, `summary.json` and `NAVIGATION.md` on disk
//!
//! ## Quick Start
//!
//! ```bash
//! # Fetch a trace with an API key and write artifacts
//! tracefetch tree <trace-id> --output-dir ./trace-data
//!
//! # Fetch a publicly shared trace
//! tracefetch public https://smith.langchain.com/public/<token>/r
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod client;
pub mod config;
pub mod crawler;
pub mod error;
pub mod export;
pub mod models;
pub mod tree;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::client::{ApiClient, PublicClient};
    pub use crate::config::Config;
    pub use crate::crawler::{CrawlOutcome, PublicTraceCrawler, RunSource};
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::tree::{build_tree, summarize, TraceTree};
}
