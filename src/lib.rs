// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod config;
pub mod extract;
pub mod feed;
pub mod fetch;
pub mod headline;
pub mod ledger;
pub mod pipeline;
pub mod rank;
pub mod resolver;
pub mod types;
pub mod xml;

// ---- Re-exports for stable public API ----
pub use crate::config::Config;
pub use crate::fetch::{FixtureFetcher, HttpFetcher, PageFetcher};
pub use crate::pipeline::{run_once, RunSummary};
pub use crate::rank::ScoreConfig;
pub use crate::types::{AcqDisp, FilingRecord, FilingReference, RankedHeadline, Transaction};
