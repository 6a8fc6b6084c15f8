//! Row content comparison.
//!
//! [`RowComparator`] is a thin adapter over a [`RowDiffEngine`]: it builds the
//! request from the source descriptor and folds engine failures into
//! [`RowComparison::Indeterminate`], so a broken diff never aborts the run.

mod types;

pub use types::{
    CellValue, DiffRequest, DifferenceKind, RowComparison, RowDiffError, RowDifference,
};

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::core::{RowDiffEngine, TableDescriptor};

/// Hands table pairs to a row-diff engine and normalizes the result.
#[derive(Clone)]
pub struct RowComparator {
    engine: Arc<dyn RowDiffEngine>,
    exclude_watermark: bool,
}

impl RowComparator {
    /// Create a comparator that compares every non-key column.
    pub fn new(engine: Arc<dyn RowDiffEngine>) -> Self {
        Self {
            engine,
            exclude_watermark: false,
        }
    }

    /// Leave the watermark column out of compared values.
    pub fn with_exclude_watermark(mut self, exclude: bool) -> Self {
        self.exclude_watermark = exclude;
        self
    }

    /// The request this comparator would send for a table.
    pub fn request_for(&self, descriptor: &TableDescriptor) -> DiffRequest {
        DiffRequest::for_table(descriptor, self.exclude_watermark)
    }

    /// Compare one table's content.
    pub async fn compare(&self, request: &DiffRequest) -> RowComparison {
        let start = Instant::now();
        match self.engine.diff_rows(request).await {
            Ok(differences) => {
                debug!(
                    "{}: {} differing keys in {}ms",
                    request.full_name(),
                    differences.len(),
                    start.elapsed().as_millis()
                );
                RowComparison::Differences(differences)
            }
            Err(e) => {
                debug!("{}: row diff failed: {}", request.full_name(), e);
                RowComparison::Indeterminate(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedEngine {
        result: Mutex<Option<Result<Vec<RowDifference>, RowDiffError>>>,
        seen: Mutex<Vec<DiffRequest>>,
    }

    impl ScriptedEngine {
        fn new(result: Result<Vec<RowDifference>, RowDiffError>) -> Self {
            Self {
                result: Mutex::new(Some(result)),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RowDiffEngine for ScriptedEngine {
        async fn diff_rows(
            &self,
            request: &DiffRequest,
        ) -> Result<Vec<RowDifference>, RowDiffError> {
            self.seen.lock().unwrap().push(request.clone());
            self.result.lock().unwrap().take().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn users() -> TableDescriptor {
        TableDescriptor::new(
            "public",
            "users",
            vec!["id".into()],
            vec!["name".into(), "date_updated".into()],
            "date_updated",
        )
    }

    #[tokio::test]
    async fn test_differences_pass_through() {
        let diff = RowDifference::missing_in_target(
            vec![Some("1".into())],
            vec![Some("a".into()), None],
        );
        let engine = Arc::new(ScriptedEngine::new(Ok(vec![diff.clone()])));
        let comparator = RowComparator::new(engine.clone());

        let request = comparator.request_for(&users());
        let result = comparator.compare(&request).await;
        assert_eq!(result, RowComparison::Differences(vec![diff]));

        let seen = engine.seen.lock().unwrap();
        assert_eq!(seen[0].key_columns, vec!["id"]);
        assert_eq!(seen[0].value_columns, vec!["name", "date_updated"]);
    }

    #[tokio::test]
    async fn test_engine_error_becomes_indeterminate() {
        let engine = Arc::new(ScriptedEngine::new(Err(RowDiffError::Incompatible(
            "column total: numeric vs text".into(),
        ))));
        let comparator = RowComparator::new(engine);
        let request = comparator.request_for(&users());

        match comparator.compare(&request).await {
            RowComparison::Indeterminate(reason) => assert!(reason.contains("numeric vs text")),
            other => panic!("expected indeterminate, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exclude_watermark() {
        let engine = Arc::new(ScriptedEngine::new(Ok(Vec::new())));
        let comparator = RowComparator::new(engine.clone()).with_exclude_watermark(true);
        let request = comparator.request_for(&users());
        assert_eq!(request.value_columns, vec!["name"]);
        assert_eq!(
            comparator.compare(&request).await,
            RowComparison::Differences(Vec::new())
        );
    }
}
