//! Table shape descriptors and the per-database schema map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{DriftError, Result};

/// Schema name → table name → descriptor, for one side of a comparison.
///
/// Ordered maps keep iteration deterministic, so two runs against unchanged
/// databases visit tables in the same order.
pub type SchemaMap = BTreeMap<String, BTreeMap<String, TableDescriptor>>;

/// One row of the metadata query.
///
/// Key and non-key column lists arrive comma-joined in ordinal order; either
/// may be absent (no primary key, or a table made only of key columns).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfoRow {
    pub schema_name: String,
    pub table_name: String,
    pub primary_keys: Option<String>,
    pub columns: Option<String>,
}

impl TableInfoRow {
    pub fn new(
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        primary_keys: Option<&str>,
        columns: Option<&str>,
    ) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            primary_keys: primary_keys.map(str::to_string),
            columns: columns.map(str::to_string),
        }
    }
}

/// Immutable description of one table's shape.
///
/// Two descriptors are equal when schema, table, primary key sequence, full
/// column sequence and derived watermark column all match. That equality is
/// what decides whether a table pair is compatible enough for a content
/// comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    schema_name: String,
    table_name: String,
    primary_keys: Vec<String>,
    columns: Vec<String>,
    timestamp_column: Option<String>,
}

impl TableDescriptor {
    /// Build a descriptor, deriving the watermark column from `watermark`.
    pub fn new(
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        primary_keys: Vec<String>,
        columns: Vec<String>,
        watermark: &str,
    ) -> Self {
        let timestamp_column = columns
            .iter()
            .any(|c| c == watermark)
            .then(|| watermark.to_string());
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            primary_keys,
            columns,
            timestamp_column,
        }
    }

    /// Build a descriptor from a metadata row.
    pub fn from_row(row: &TableInfoRow, watermark: &str) -> Result<Self> {
        if row.schema_name.is_empty() || row.table_name.is_empty() {
            return Err(DriftError::Metadata(format!(
                "metadata row without schema or table name: {:?}",
                row
            )));
        }
        Ok(Self::new(
            row.schema_name.clone(),
            row.table_name.clone(),
            split_columns(row.primary_keys.as_deref()),
            split_columns(row.columns.as_deref()),
            watermark,
        ))
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Get the fully qualified table name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema_name, self.table_name)
    }

    /// Primary key columns in ordinal order.
    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    /// Non-key columns in ordinal order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The update-watermark column, if the table has one.
    pub fn timestamp_column(&self) -> Option<&str> {
        self.timestamp_column.as_deref()
    }

    /// Non-key columns without the watermark column.
    pub fn value_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| Some(c.as_str()) != self.timestamp_column())
            .cloned()
            .collect()
    }

    /// Check if the table has a primary key.
    pub fn has_primary_key(&self) -> bool {
        !self.primary_keys.is_empty()
    }

    /// Human-readable reasons why `other` does not have the same shape.
    ///
    /// Empty when the descriptors are equal.
    pub fn shape_differences(&self, other: &TableDescriptor) -> Vec<String> {
        let mut reasons = Vec::new();

        if self.schema_name != other.schema_name || self.table_name != other.table_name {
            reasons.push(format!(
                "table name {} vs {}",
                self.full_name(),
                other.full_name()
            ));
        }
        if self.primary_keys != other.primary_keys {
            reasons.push(format!(
                "primary keys ({}) vs ({})",
                self.primary_keys.join(", "),
                other.primary_keys.join(", ")
            ));
        }
        if self.columns != other.columns {
            let only_source: Vec<&str> = self
                .columns
                .iter()
                .filter(|c| !other.columns.contains(c))
                .map(String::as_str)
                .collect();
            let only_target: Vec<&str> = other
                .columns
                .iter()
                .filter(|c| !self.columns.contains(c))
                .map(String::as_str)
                .collect();
            if !only_source.is_empty() {
                reasons.push(format!("only in source: {}", only_source.join(", ")));
            }
            if !only_target.is_empty() {
                reasons.push(format!("only in target: {}", only_target.join(", ")));
            }
            if only_source.is_empty() && only_target.is_empty() {
                reasons.push("column order differs".to_string());
            }
        }
        if self.timestamp_column != other.timestamp_column && reasons.is_empty() {
            reasons.push("watermark column differs".to_string());
        }

        reasons
    }
}

fn split_columns(joined: Option<&str>) -> Vec<String> {
    match joined {
        Some(s) if !s.is_empty() => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    }
}
