//! Types exchanged with row-diff engines.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::TableDescriptor;

/// A single rendered column value; `None` is SQL NULL.
pub type CellValue = Option<String>;

/// What to compare for one table present on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRequest {
    /// Schema name (same on both sides).
    pub schema: String,
    /// Table name (same on both sides).
    pub table: String,
    /// Join key: the primary key columns.
    pub key_columns: Vec<String>,
    /// Columns whose values are compared.
    pub value_columns: Vec<String>,
    /// Update-watermark column, if the table has one.
    pub update_column: Option<String>,
}

impl DiffRequest {
    /// Build a request from the source descriptor.
    ///
    /// Every non-key column is compared unless `exclude_watermark` is set,
    /// in which case the watermark column is left out.
    pub fn for_table(descriptor: &TableDescriptor, exclude_watermark: bool) -> Self {
        let value_columns = if exclude_watermark {
            descriptor.value_columns()
        } else {
            descriptor.columns().to_vec()
        };
        Self {
            schema: descriptor.schema_name().to_string(),
            table: descriptor.table_name().to_string(),
            key_columns: descriptor.primary_keys().to_vec(),
            value_columns,
            update_column: descriptor.timestamp_column().map(str::to_string),
        }
    }

    /// Get the fully qualified table name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    /// Key columns followed by value columns.
    pub fn all_columns(&self) -> impl Iterator<Item = &String> {
        self.key_columns.iter().chain(self.value_columns.iter())
    }
}

/// One primary key whose row differs between source and target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDifference {
    /// Key values, in key column order.
    pub key: Vec<CellValue>,
    /// Source values in value column order; `None` if the row is missing in the source.
    pub source: Option<Vec<CellValue>>,
    /// Target values in value column order; `None` if the row is missing in the target.
    pub target: Option<Vec<CellValue>>,
}

/// How a row differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifferenceKind {
    /// Row exists only in the source.
    MissingInTarget,
    /// Row exists only in the target.
    MissingInSource,
    /// Row exists on both sides with different values.
    Changed,
}

impl RowDifference {
    pub fn changed(key: Vec<CellValue>, source: Vec<CellValue>, target: Vec<CellValue>) -> Self {
        Self {
            key,
            source: Some(source),
            target: Some(target),
        }
    }

    pub fn missing_in_target(key: Vec<CellValue>, source: Vec<CellValue>) -> Self {
        Self {
            key,
            source: Some(source),
            target: None,
        }
    }

    pub fn missing_in_source(key: Vec<CellValue>, target: Vec<CellValue>) -> Self {
        Self {
            key,
            source: None,
            target: Some(target),
        }
    }

    pub fn kind(&self) -> DifferenceKind {
        match (&self.source, &self.target) {
            (Some(_), None) => DifferenceKind::MissingInTarget,
            (None, Some(_)) => DifferenceKind::MissingInSource,
            _ => DifferenceKind::Changed,
        }
    }

    /// Indexes of value columns whose values differ.
    ///
    /// For a row missing on one side every column counts as differing.
    pub fn differing_columns(&self) -> Vec<usize> {
        match (&self.source, &self.target) {
            (Some(s), Some(t)) => {
                let width = s.len().max(t.len());
                (0..width).filter(|&i| s.get(i) != t.get(i)).collect()
            }
            (Some(values), None) | (None, Some(values)) => (0..values.len()).collect(),
            (None, None) => Vec::new(),
        }
    }
}

/// Failure inside a row-diff engine.
///
/// Never fatal for the run: the comparator turns it into an indeterminate
/// outcome for the table.
#[derive(Error, Debug)]
pub enum RowDiffError {
    /// A diff query failed (type incompatibility, cast error, ...).
    #[error("diff query failed: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// No connection could be obtained.
    #[error("pool error: {0}")]
    Pool(String),

    /// The request cannot be compared as asked.
    #[error("incompatible comparison: {0}")]
    Incompatible(String),
}

/// Result of comparing one table's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowComparison {
    /// The engine finished; an empty list means the content matches.
    Differences(Vec<RowDifference>),
    /// The engine could not decide.
    Indeterminate(String),
}
