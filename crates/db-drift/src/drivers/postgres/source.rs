//! PostgreSQL metadata source.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use tracing::{debug, info};

use crate::config::{ConnectionConfig, SYSTEM_SCHEMAS};
use crate::core::identifier::qualify_pg;
use crate::core::{MetadataSource, TableInfoRow};
use crate::error::{DriftError, Result};

use super::build_pool;

/// One row per table: primary key and non-key column names, each
/// comma-joined in ordinal order.
const TABLE_INFO_QUERY: &str = r#"
    WITH columns AS (
        SELECT t.schemaname::text AS schema_name,
               t.tablename::text AS table_name,
               a.attname::text AS column_name,
               a.attnum AS ordinal_position,
               pk.contype IS NOT NULL AS is_pk
        FROM pg_catalog.pg_tables t
        JOIN pg_catalog.pg_namespace ns ON ns.nspname = t.schemaname
        JOIN pg_catalog.pg_class c ON c.relname = t.tablename AND c.relnamespace = ns.oid
        JOIN pg_catalog.pg_attribute a
          ON a.attrelid = c.oid AND a.attnum > 0 AND NOT a.attisdropped
        LEFT JOIN pg_catalog.pg_constraint pk
          ON pk.contype = 'p' AND pk.conrelid = c.oid AND a.attnum = ANY (pk.conkey)
        WHERE a.atttypid <> 0
    )
    SELECT schema_name,
           table_name,
           string_agg(column_name, ',' ORDER BY ordinal_position) FILTER (WHERE is_pk) AS primary_keys,
           string_agg(column_name, ',' ORDER BY ordinal_position) FILTER (WHERE NOT is_pk) AS column_names
    FROM columns
    WHERE schema_name <> ALL ($1)
    GROUP BY schema_name, table_name
    ORDER BY schema_name, table_name
"#;

/// Metadata and row counts for one PostgreSQL database.
pub struct PostgresSource {
    name: String,
    pool: Pool,
    excluded_schemas: Vec<String>,
}

impl PostgresSource {
    /// Create the pool and check that a connection can be opened.
    pub async fn connect(name: &str, config: &ConnectionConfig) -> Result<Self> {
        let pool = build_pool(name, config)?;
        let source = Self::from_pool(name, pool);

        let version = source.server_version().await?;
        info!(
            "Connected to {} ({}): PostgreSQL {}",
            name,
            config.display_location(),
            version
        );

        Ok(source)
    }

    /// Wrap an existing pool.
    pub fn from_pool(name: &str, pool: Pool) -> Self {
        Self {
            name: name.to_string(),
            pool,
            excluded_schemas: SYSTEM_SCHEMAS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Skip more schemas in the metadata query.
    pub fn with_excluded_schemas(mut self, schemas: &[String]) -> Self {
        for schema in schemas {
            if !self.excluded_schemas.contains(schema) {
                self.excluded_schemas.push(schema.clone());
            }
        }
        self
    }

    /// `SHOW server_version` on a fresh connection.
    pub async fn server_version(&self) -> Result<String> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| DriftError::pool(e, format!("connecting to {}", self.name)))?;
        let row = client.query_one("SHOW server_version", &[]).await?;
        Ok(row.get(0))
    }
}

#[async_trait]
impl MetadataSource for PostgresSource {
    async fn fetch_table_info(&self) -> Result<Vec<TableInfoRow>> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| DriftError::pool(e, format!("fetching metadata from {}", self.name)))?;

        let rows = client
            .query(TABLE_INFO_QUERY, &[&self.excluded_schemas])
            .await?;
        debug!("{}: metadata query returned {} tables", self.name, rows.len());

        Ok(rows
            .iter()
            .map(|row| TableInfoRow {
                schema_name: row.get(0),
                table_name: row.get(1),
                primary_keys: row.get(2),
                columns: row.get(3),
            })
            .collect())
    }

    async fn record_count(&self, schema: &str, table: &str) -> Result<i64> {
        let query = format!("SELECT count(*) FROM {}", qualify_pg(schema, table)?);
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| DriftError::pool(e, format!("counting rows on {}", self.name)))?;
        let row = client.query_one(&query, &[]).await?;
        Ok(row.get(0))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
