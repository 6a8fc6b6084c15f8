//! Pure decision rules used by the comparator.

use std::collections::BTreeMap;

use crate::core::{SchemaMap, TableDescriptor};
use crate::diff::RowComparison;

use super::outcome::ComparisonOutcome;

/// Whether a schema passes the allow-list. An empty list selects everything.
pub fn schema_selected(schema: &str, include: &[String]) -> bool {
    include.is_empty() || include.iter().any(|s| s == schema)
}

/// Tables present in the target schema but not in the source schema.
pub fn extra_tables<'a>(
    source: &BTreeMap<String, TableDescriptor>,
    target: &'a BTreeMap<String, TableDescriptor>,
) -> Vec<&'a str> {
    target
        .keys()
        .filter(|name| !source.contains_key(*name))
        .map(String::as_str)
        .collect()
}

/// Selected schemas present in the target but not in the source.
pub fn extra_schemas<'a>(
    source: &SchemaMap,
    target: &'a SchemaMap,
    include: &[String],
) -> Vec<&'a str> {
    target
        .keys()
        .filter(|name| !source.contains_key(*name) && schema_selected(name, include))
        .map(String::as_str)
        .collect()
}

/// Shape check. `None` means the descriptors are equal.
pub fn shape_outcome(
    source: &TableDescriptor,
    target: Option<&TableDescriptor>,
) -> Option<ComparisonOutcome> {
    match target {
        None => Some(ComparisonOutcome::MissingInTarget),
        Some(target) if target == source => None,
        Some(target) => Some(ComparisonOutcome::ShapeMismatch {
            reasons: source.shape_differences(target),
        }),
    }
}

/// Count check. `None` means the counts match and are non-zero, so the row
/// content still has to be compared.
pub fn count_outcome(source: i64, target: i64) -> Option<ComparisonOutcome> {
    if source != target {
        Some(ComparisonOutcome::CountMismatch { source, target })
    } else if source == 0 {
        Some(ComparisonOutcome::EmptyBoth)
    } else {
        None
    }
}

/// Content check result for a table with `rows` rows on each side.
pub fn content_outcome(comparison: &RowComparison, rows: i64) -> ComparisonOutcome {
    match comparison {
        RowComparison::Indeterminate(reason) => ComparisonOutcome::ComparisonFailed {
            reason: reason.clone(),
        },
        RowComparison::Differences(diffs) if diffs.is_empty() => {
            ComparisonOutcome::ContentMatch { rows }
        }
        RowComparison::Differences(diffs) => ComparisonOutcome::ContentMismatch {
            differences: diffs.len(),
        },
    }
}

/// Whether an outcome makes the databases non-equivalent.
pub fn is_disqualifying(outcome: &ComparisonOutcome, fail_on_extra: bool) -> bool {
    match outcome {
        ComparisonOutcome::MissingSchemaInTarget
        | ComparisonOutcome::MissingInTarget
        | ComparisonOutcome::ShapeMismatch { .. }
        | ComparisonOutcome::CountMismatch { .. }
        | ComparisonOutcome::ContentMismatch { .. } => true,
        ComparisonOutcome::MissingSchemaInSource | ComparisonOutcome::MissingInSource => {
            fail_on_extra
        }
        ComparisonOutcome::NoPrimaryKeySkipped
        | ComparisonOutcome::EmptyBoth
        | ComparisonOutcome::ContentMatch { .. }
        | ComparisonOutcome::ComparisonFailed { .. } => false,
    }
}
