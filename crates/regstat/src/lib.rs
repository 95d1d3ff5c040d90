#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/regstat/regstat/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod pipeline;
pub mod reconcile;

// Re-export main types from sub-crates
pub use regstat_data as data;
pub use regstat_output as output;

pub use pipeline::{Pipeline, PipelineError, Stage};
pub use reconcile::{ReconcileError, SourceTables, reconcile};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
