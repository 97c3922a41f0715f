//! Data models for TraceFetch

mod document;
mod run;
mod summary;

pub use document::*;
pub use run::*;
pub use summary::*;
