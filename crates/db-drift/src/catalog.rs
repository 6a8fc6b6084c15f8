//! Per-database metadata catalog.
//!
//! The [`MetadataCatalog`] wraps a [`MetadataSource`] and memoizes the schema
//! map: the metadata query runs at most once per catalog instance. To pick up
//! schema changes, build a new catalog. Row counts are never cached.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::SYSTEM_SCHEMAS;
use crate::core::{MetadataSource, SchemaMap, TableDescriptor, TableInfoRow};
use crate::error::{DriftError, Result};

/// Default name of the update-watermark column.
pub const DEFAULT_WATERMARK_COLUMN: &str = "date_updated";

/// Lazily built, memoized view of one database's tables.
pub struct MetadataCatalog {
    source: Arc<dyn MetadataSource>,
    watermark_column: String,
    excluded_schemas: Vec<String>,
    schemas: OnceCell<SchemaMap>,
}

impl MetadataCatalog {
    /// Create a catalog that excludes the built-in system schemas.
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self {
            source,
            watermark_column: DEFAULT_WATERMARK_COLUMN.to_string(),
            excluded_schemas: SYSTEM_SCHEMAS.iter().map(|s| s.to_string()).collect(),
            schemas: OnceCell::new(),
        }
    }

    /// Use a different watermark column name.
    pub fn with_watermark_column(mut self, name: impl Into<String>) -> Self {
        self.watermark_column = name.into();
        self
    }

    /// Exclude more schemas, on top of the built-in ones.
    pub fn with_excluded_schemas<I, S>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for schema in schemas {
            let schema = schema.into();
            if !self.excluded_schemas.contains(&schema) {
                self.excluded_schemas.push(schema);
            }
        }
        self
    }

    /// Label of the underlying source.
    pub fn name(&self) -> &str {
        self.source.name()
    }

    /// Whether the schema map has been fetched yet.
    pub fn is_loaded(&self) -> bool {
        self.schemas.initialized()
    }

    /// The schema map, fetched on first use.
    pub async fn schemas(&self) -> Result<&SchemaMap> {
        self.schemas.get_or_try_init(|| self.load()).await
    }

    /// Look up a single table.
    pub async fn table(&self, schema: &str, table: &str) -> Result<Option<&TableDescriptor>> {
        Ok(self.schemas().await?.get(schema).and_then(|t| t.get(table)))
    }

    /// Live row count of a table.
    pub async fn record_count(&self, schema: &str, table: &str) -> Result<i64> {
        let count = self.source.record_count(schema, table).await?;
        debug!("{}: {}.{} has {} rows", self.name(), schema, table, count);
        Ok(count)
    }

    async fn load(&self) -> Result<SchemaMap> {
        let rows = self.source.fetch_table_info().await?;
        let map = build_schema_map(&rows, &self.watermark_column, &self.excluded_schemas)?;
        info!(
            "{}: found {} tables in {} schemas",
            self.name(),
            map.values().map(BTreeMap::len).sum::<usize>(),
            map.len()
        );
        Ok(map)
    }
}

/// Build a schema map from metadata rows, dropping excluded schemas.
///
/// A table reported twice means the metadata query is broken, which is fatal.
pub fn build_schema_map(
    rows: &[TableInfoRow],
    watermark_column: &str,
    excluded_schemas: &[String],
) -> Result<SchemaMap> {
    let mut map = SchemaMap::new();

    for row in rows {
        if excluded_schemas.iter().any(|s| *s == row.schema_name) {
            continue;
        }
        let descriptor = TableDescriptor::from_row(row, watermark_column)?;
        let tables = map.entry(row.schema_name.clone()).or_default();
        if tables
            .insert(row.table_name.clone(), descriptor)
            .is_some()
        {
            return Err(DriftError::Metadata(format!(
                "table {}.{} reported more than once",
                row.schema_name, row.table_name
            )));
        }
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        rows: Vec<TableInfoRow>,
        metadata_calls: AtomicUsize,
        count_calls: AtomicUsize,
    }

    impl CountingSource {
        fn new(rows: Vec<TableInfoRow>) -> Self {
            Self {
                rows,
                metadata_calls: AtomicUsize::new(0),
                count_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MetadataSource for CountingSource {
        async fn fetch_table_info(&self) -> Result<Vec<TableInfoRow>> {
            self.metadata_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.clone())
        }

        async fn record_count(&self, _schema: &str, _table: &str) -> Result<i64> {
            Ok(self.count_calls.fetch_add(1, Ordering::SeqCst) as i64)
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    struct FailingSource;

    #[async_trait]
    impl MetadataSource for FailingSource {
        async fn fetch_table_info(&self) -> Result<Vec<TableInfoRow>> {
            Err(DriftError::pool("connection refused", "fetching metadata"))
        }

        async fn record_count(&self, _schema: &str, _table: &str) -> Result<i64> {
            Err(DriftError::pool("connection refused", "counting rows"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn rows() -> Vec<TableInfoRow> {
        vec![
            TableInfoRow::new("public", "users", Some("id"), Some("name,email")),
            TableInfoRow::new("public", "audit", None, Some("line")),
            TableInfoRow::new("sales", "orders", Some("id"), Some("total,date_updated")),
            TableInfoRow::new("pg_catalog", "pg_class", None, Some("relname")),
            TableInfoRow::new("information_schema", "tables", None, Some("table_name")),
            TableInfoRow::new("sqitch", "changes", Some("change_id"), Some("change")),
        ]
    }

    #[tokio::test]
    async fn test_schemas_fetched_once() {
        let source = Arc::new(CountingSource::new(rows()));
        let catalog = MetadataCatalog::new(source.clone());
        assert!(!catalog.is_loaded());

        let first = catalog.schemas().await.unwrap().clone();
        let second = catalog.schemas().await.unwrap();
        assert_eq!(&first, second);
        assert!(catalog.is_loaded());
        assert_eq!(source.metadata_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_system_schemas_excluded() {
        let catalog = MetadataCatalog::new(Arc::new(CountingSource::new(rows())));
        let schemas = catalog.schemas().await.unwrap();
        let names: Vec<&str> = schemas.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["public", "sales"]);
    }

    #[tokio::test]
    async fn test_configured_exclusions_and_watermark() {
        let catalog = MetadataCatalog::new(Arc::new(CountingSource::new(rows())))
            .with_excluded_schemas(["public"])
            .with_watermark_column("total");
        let orders = catalog.table("sales", "orders").await.unwrap().unwrap();
        assert_eq!(orders.timestamp_column(), Some("total"));
        assert!(catalog.table("public", "users").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_count_not_cached() {
        let source = Arc::new(CountingSource::new(rows()));
        let catalog = MetadataCatalog::new(source.clone());
        assert_eq!(catalog.record_count("public", "users").await.unwrap(), 0);
        assert_eq!(catalog.record_count("public", "users").await.unwrap(), 1);
        assert_eq!(source.count_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_propagate() {
        let catalog = MetadataCatalog::new(Arc::new(FailingSource));
        assert!(catalog.schemas().await.is_err());
        assert!(!catalog.is_loaded());
        assert!(catalog.record_count("public", "users").await.is_err());
    }

    #[test]
    fn test_duplicate_table_is_metadata_error() {
        let rows = vec![
            TableInfoRow::new("public", "users", Some("id"), None),
            TableInfoRow::new("public", "users", Some("id"), None),
        ];
        let err = build_schema_map(&rows, DEFAULT_WATERMARK_COLUMN, &[]).unwrap_err();
        assert!(matches!(err, DriftError::Metadata(_)));
    }
}
