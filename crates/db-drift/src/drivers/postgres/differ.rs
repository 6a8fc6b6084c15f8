//! Fingerprint-based row diff between two PostgreSQL tables.
//!
//! Each side is read once as `(key, md5(row))` pairs ordered by primary key.
//! Only keys whose fingerprints differ (or exist on one side only) are then
//! fetched in full, in batches, to build the [`RowDifference`] list.

use std::collections::HashMap;

use async_trait::async_trait;
use deadpool_postgres::Pool;
use tracing::debug;

use crate::core::identifier::{qualify_pg, quote_list};
use crate::core::RowDiffEngine;
use crate::diff::{CellValue, DiffRequest, DifferenceKind, RowDiffError, RowDifference};

/// Keys per full-row fetch.
const KEY_BATCH_SIZE: usize = 1000;

/// Row-diff engine over a source and a target pool.
pub struct PostgresRowDiffer {
    source: Pool,
    target: Pool,
}

impl PostgresRowDiffer {
    pub fn new(source: Pool, target: Pool) -> Self {
        Self { source, target }
    }
}

#[async_trait]
impl RowDiffEngine for PostgresRowDiffer {
    async fn diff_rows(&self, request: &DiffRequest) -> Result<Vec<RowDifference>, RowDiffError> {
        let queries = DiffQueries::build(request)?;

        let source_fingerprints =
            fetch_fingerprints(&self.source, &queries.fingerprints, "source").await?;
        let target_fingerprints =
            fetch_fingerprints(&self.target, &queries.fingerprints, "target").await?;
        debug!(
            "{}: fingerprinted {} source and {} target rows",
            request.full_name(),
            source_fingerprints.len(),
            target_fingerprints.len()
        );

        let differing = diff_fingerprints(&source_fingerprints, &target_fingerprints);
        if differing.is_empty() {
            return Ok(Vec::new());
        }

        let source_keys: Vec<String> = differing
            .iter()
            .filter(|(_, kind)| *kind != DifferenceKind::MissingInSource)
            .map(|(key, _)| key.clone())
            .collect();
        let target_keys: Vec<String> = differing
            .iter()
            .filter(|(_, kind)| *kind != DifferenceKind::MissingInTarget)
            .map(|(key, _)| key.clone())
            .collect();

        let key_count = request.key_columns.len();
        let source_rows =
            fetch_rows(&self.source, &queries.rows, &source_keys, key_count, "source").await?;
        let target_rows =
            fetch_rows(&self.target, &queries.rows, &target_keys, key_count, "target").await?;

        Ok(merge_rows(differing, source_rows, target_rows))
    }
}

/// Full rows by key text: `(key values, compared values)`.
type RowsByKey = HashMap<String, (Vec<CellValue>, Vec<CellValue>)>;

/// Pair up the full rows of every differing key, in `differing` order.
///
/// A key found on neither side was deleted between the two reads and is
/// dropped.
fn merge_rows(
    differing: Vec<(String, DifferenceKind)>,
    mut source_rows: RowsByKey,
    mut target_rows: RowsByKey,
) -> Vec<RowDifference> {
    let mut differences = Vec::with_capacity(differing.len());
    for (key_text, _) in differing {
        let source = source_rows.remove(&key_text);
        let target = target_rows.remove(&key_text);
        let key = match (&source, &target) {
            (Some((key, _)), _) | (None, Some((key, _))) => key.clone(),
            (None, None) => continue,
        };
        differences.push(RowDifference {
            key,
            source: source.map(|(_, values)| values),
            target: target.map(|(_, values)| values),
        });
    }
    differences
}

/// Split the cells after the key text into key and compared values.
fn split_row(mut cells: Vec<CellValue>, key_count: usize) -> (Vec<CellValue>, Vec<CellValue>) {
    let values = cells.split_off(key_count.min(cells.len()));
    (cells, values)
}

/// SQL for one diff request.
#[derive(Debug)]
struct DiffQueries {
    /// `(key text, md5 of row)` for every row, ordered by key.
    fingerprints: String,
    /// Key text, key values and compared values for the keys in `$1`.
    rows: String,
}

impl DiffQueries {
    fn build(request: &DiffRequest) -> Result<Self, RowDiffError> {
        if request.key_columns.is_empty() {
            return Err(RowDiffError::Incompatible(format!(
                "{} has no key columns",
                request.full_name()
            )));
        }

        let incompatible = |e: crate::error::DriftError| RowDiffError::Incompatible(e.to_string());
        let table = qualify_pg(&request.schema, &request.table).map_err(incompatible)?;
        let keys = quote_list(&request.key_columns, "").map_err(incompatible)?;
        let keys_text = quote_list(&request.key_columns, "::text").map_err(incompatible)?;
        let values = quote_list(&request.value_columns, "").map_err(incompatible)?;
        let values_text = quote_list(&request.value_columns, "::text").map_err(incompatible)?;

        let key_expr = format!("ARRAY[{}]::text", keys_text.join(", "));
        let order_by = keys.join(", ");

        let fingerprints = format!(
            "SELECT {key_expr}, md5(ROW({values})::text) FROM {table} ORDER BY {order_by}",
            values = values.join(", "),
        );

        let mut select = vec![key_expr.clone()];
        select.extend(keys_text);
        select.extend(values_text);
        let rows = format!(
            "SELECT {} FROM {table} WHERE {key_expr} = ANY($1) ORDER BY {order_by}",
            select.join(", "),
        );

        Ok(Self { fingerprints, rows })
    }
}

async fn fetch_fingerprints(
    pool: &Pool,
    query: &str,
    side: &str,
) -> Result<Vec<(String, String)>, RowDiffError> {
    let client = pool
        .get()
        .await
        .map_err(|e| RowDiffError::Pool(format!("{}: {}", side, e)))?;
    let rows = client.query(query, &[]).await?;
    Ok(rows
        .iter()
        .map(|row| (row.get::<_, String>(0), row.get::<_, String>(1)))
        .collect())
}

async fn fetch_rows(
    pool: &Pool,
    query: &str,
    keys: &[String],
    key_count: usize,
    side: &str,
) -> Result<RowsByKey, RowDiffError> {
    let mut found = HashMap::with_capacity(keys.len());
    if keys.is_empty() {
        return Ok(found);
    }

    let client = pool
        .get()
        .await
        .map_err(|e| RowDiffError::Pool(format!("{}: {}", side, e)))?;

    for batch in keys.chunks(KEY_BATCH_SIZE) {
        let rows = client.query(query, &[&batch]).await?;
        for row in rows {
            let key_text: String = row.get(0);
            let cells: Vec<CellValue> = (1..row.len()).map(|i| row.get(i)).collect();
            found.insert(key_text, split_row(cells, key_count));
        }
    }

    Ok(found)
}

/// Keys whose fingerprints differ, in source order, followed by target-only
/// keys in target order.
fn diff_fingerprints(
    source: &[(String, String)],
    target: &[(String, String)],
) -> Vec<(String, DifferenceKind)> {
    let target_map: HashMap<&str, &str> = target
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let source_map: HashMap<&str, &str> = source
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let mut differing = Vec::new();
    for (key, hash) in source {
        match target_map.get(key.as_str()) {
            None => differing.push((key.clone(), DifferenceKind::MissingInTarget)),
            Some(other) if *other != hash => differing.push((key.clone(), DifferenceKind::Changed)),
            _ => {}
        }
    }
    for (key, _) in target {
        if !source_map.contains_key(key.as_str()) {
            differing.push((key.clone(), DifferenceKind::MissingInSource));
        }
    }
    differing
}
