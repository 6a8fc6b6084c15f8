//! # db-drift
//!
//! Detects structural and content drift between two PostgreSQL databases
//! that are expected to be logically equivalent (replicas, migration targets,
//! staging vs. production).
//!
//! For every table the checks run from cheapest to most expensive:
//!
//! - **Shape**: column and primary key lists from one metadata query per side
//! - **Count**: live `count(*)` on both sides
//! - **Content**: key-ordered row fingerprints, full rows only for differing keys
//!
//! Each table gets exactly one [`ComparisonOutcome`]; the run folds them into a
//! single verdict in [`CompareResult`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use db_drift::{Comparator, Config};
//!
//! #[tokio::main]
//! async fn main() -> db_drift::Result<()> {
//!     let config = Config::load("config.yml")?;
//!     let mut comparator = Comparator::from_config(&config).await?;
//!     let result = comparator.compare().await?;
//!     println!("equivalent: {}", result.all_same);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod compare;
pub mod config;
pub mod core;
pub mod diff;
pub mod drivers;
pub mod error;
pub mod observer;
pub mod report;

// Re-exports for convenient access
pub use catalog::MetadataCatalog;
pub use compare::{
    CompareOptions, CompareResult, CompareSummary, Comparator, ComparisonOutcome, TableOutcome,
};
pub use config::{CompareConfig, Config, ConfigTree, ConnectionConfig};
pub use core::{MetadataSource, RowDiffEngine, SchemaMap, TableDescriptor, TableInfoRow};
pub use diff::{DiffRequest, RowComparator, RowComparison, RowDiffError, RowDifference};
pub use drivers::postgres::{health_check, HealthCheckResult, PostgresRowDiffer, PostgresSource};
pub use error::{DriftError, Result};
pub use observer::{
    CompareEvent, CompareObserver, NullObserver, Progress, Severity, TracingObserver,
};
pub use report::{format_differences, FileReportSink, MemoryReportSink, ReportSink};
