//! Seams between the comparison engine and the database layer.
//!
//! - [`MetadataSource`]: table metadata and live row counts for one database
//! - [`RowDiffEngine`]: finds the keys whose rows differ between two tables
//!
//! The engine only talks to these traits, so the orchestration policy can be
//! exercised with in-memory implementations.

use async_trait::async_trait;

use crate::diff::{DiffRequest, RowDiffError, RowDifference};
use crate::error::Result;

use super::descriptor::TableInfoRow;

/// Read table metadata and row counts from one database.
///
/// Failures are infrastructure problems (connectivity, permissions) and
/// abort the comparison run.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Run the metadata query: one row per table, key and non-key column
    /// lists comma-joined in ordinal order.
    async fn fetch_table_info(&self) -> Result<Vec<TableInfoRow>>;

    /// Count the rows of a table right now.
    async fn record_count(&self, schema: &str, table: &str) -> Result<i64>;

    /// Label used in logs ("source", "target", or a host name).
    fn name(&self) -> &str;
}

/// Compare the content of a table that exists on both sides.
///
/// Errors are not fatal: the caller downgrades them to an indeterminate
/// outcome for that table.
#[async_trait]
pub trait RowDiffEngine: Send + Sync {
    /// Return one record per primary key whose row differs, is missing in
    /// the target, or is missing in the source.
    async fn diff_rows(
        &self,
        request: &DiffRequest,
    ) -> std::result::Result<Vec<RowDifference>, RowDiffError>;
}
