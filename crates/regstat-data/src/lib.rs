#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/regstat/regstat/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod number;
pub mod source;
pub mod staging;
pub mod store;

pub use config::PipelineConfig;
pub use error::{ConfigError, DataError, ExtractError, Result};
pub use extract::{DropReason, Extractor};
pub use model::{
    JoinGap, NormalizedTable, ReconciledRecord, Reconciliation, RegionKey, RegionMetricRecord,
    SourceKind,
};
pub use number::{NumberError, NumberFormat};
pub use source::{ColumnRef, RawSheet, SourceConfig};
pub use staging::StagingError;
pub use store::{LoadError, LoadOutcome, LoadPolicy, SqliteStore};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
