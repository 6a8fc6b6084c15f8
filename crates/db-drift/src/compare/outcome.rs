//! Outcome classes recorded by a comparison run.

use serde::{Deserialize, Serialize};

use crate::observer::Severity;

/// What was found for one schema or table.
///
/// The classes are deliberately distinct: a missing table is not a shape
/// mismatch, and a failed comparison is not a content mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComparisonOutcome {
    /// Source schema absent from the target.
    MissingSchemaInTarget,
    /// Target schema absent from the source.
    MissingSchemaInSource,
    /// Source table absent from the target.
    MissingInTarget,
    /// Target table absent from the source.
    MissingInSource,
    /// Source table has no primary key; nothing was compared.
    NoPrimaryKeySkipped,
    /// Columns or keys differ.
    ShapeMismatch { reasons: Vec<String> },
    /// Row counts differ.
    CountMismatch { source: i64, target: i64 },
    /// Both sides are empty.
    EmptyBoth,
    /// Row content is identical.
    ContentMatch { rows: i64 },
    /// Some keys differ in content.
    ContentMismatch { differences: usize },
    /// The row diff could not be completed.
    ComparisonFailed { reason: String },
}

impl ComparisonOutcome {
    /// Snake-case class name, as serialized.
    pub fn kind(&self) -> &'static str {
        match self {
            ComparisonOutcome::MissingSchemaInTarget => "missing_schema_in_target",
            ComparisonOutcome::MissingSchemaInSource => "missing_schema_in_source",
            ComparisonOutcome::MissingInTarget => "missing_in_target",
            ComparisonOutcome::MissingInSource => "missing_in_source",
            ComparisonOutcome::NoPrimaryKeySkipped => "no_primary_key_skipped",
            ComparisonOutcome::ShapeMismatch { .. } => "shape_mismatch",
            ComparisonOutcome::CountMismatch { .. } => "count_mismatch",
            ComparisonOutcome::EmptyBoth => "empty_both",
            ComparisonOutcome::ContentMatch { .. } => "content_match",
            ComparisonOutcome::ContentMismatch { .. } => "content_mismatch",
            ComparisonOutcome::ComparisonFailed { .. } => "comparison_failed",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ComparisonOutcome::MissingSchemaInTarget | ComparisonOutcome::MissingInTarget => {
                Severity::Error
            }
            ComparisonOutcome::MissingSchemaInSource
            | ComparisonOutcome::MissingInSource
            | ComparisonOutcome::ShapeMismatch { .. }
            | ComparisonOutcome::CountMismatch { .. }
            | ComparisonOutcome::ComparisonFailed { .. } => Severity::Warning,
            ComparisonOutcome::NoPrimaryKeySkipped
            | ComparisonOutcome::EmptyBoth
            | ComparisonOutcome::ContentMatch { .. }
            | ComparisonOutcome::ContentMismatch { .. } => Severity::Info,
        }
    }

    /// Human readable message, without the subject.
    pub fn description(&self) -> String {
        match self {
            ComparisonOutcome::MissingSchemaInTarget => "missing in target".to_string(),
            ComparisonOutcome::MissingSchemaInSource => "missing in source".to_string(),
            ComparisonOutcome::MissingInTarget => "missing in target".to_string(),
            ComparisonOutcome::MissingInSource => {
                "missing in source (target has more tables than source)".to_string()
            }
            ComparisonOutcome::NoPrimaryKeySkipped => "has no primary key (skipped)".to_string(),
            ComparisonOutcome::ShapeMismatch { reasons } if reasons.is_empty() => {
                "columns or keys differ".to_string()
            }
            ComparisonOutcome::ShapeMismatch { reasons } => {
                format!("columns or keys differ: {}", reasons.join("; "))
            }
            ComparisonOutcome::CountMismatch { source, target } => {
                format!("record count differs (source {}, target {})", source, target)
            }
            ComparisonOutcome::EmptyBoth => "is empty".to_string(),
            ComparisonOutcome::ContentMatch { rows } => {
                format!("data is the same ({} rows)", rows)
            }
            ComparisonOutcome::ContentMismatch { differences } => {
                format!("data differs ({} keys)", differences)
            }
            ComparisonOutcome::ComparisonFailed { reason } => format!("diff failed: {}", reason),
        }
    }
}

/// An outcome together with the schema/table it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOutcome {
    pub schema: String,
    /// `None` for schema-level outcomes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(flatten)]
    pub outcome: ComparisonOutcome,
}

impl TableOutcome {
    /// Outcome for a whole schema.
    pub fn schema(schema: impl Into<String>, outcome: ComparisonOutcome) -> Self {
        Self {
            schema: schema.into(),
            table: None,
            outcome,
        }
    }

    /// Outcome for a single table.
    pub fn table(
        schema: impl Into<String>,
        table: impl Into<String>,
        outcome: ComparisonOutcome,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: Some(table.into()),
            outcome,
        }
    }

    /// `schema` or `schema.table`.
    pub fn subject(&self) -> String {
        match &self.table {
            Some(table) => format!("{}.{}", self.schema, table),
            None => self.schema.clone(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.outcome.severity()
    }

    pub fn description(&self) -> String {
        self.outcome.description()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_serde_tag() {
        let outcomes = vec![
            ComparisonOutcome::MissingSchemaInTarget,
            ComparisonOutcome::MissingInSource,
            ComparisonOutcome::ShapeMismatch { reasons: vec![] },
            ComparisonOutcome::CountMismatch {
                source: 100,
                target: 99,
            },
            ComparisonOutcome::ContentMatch { rows: 3 },
            ComparisonOutcome::ComparisonFailed {
                reason: "boom".into(),
            },
        ];
        for outcome in outcomes {
            let json = serde_json::to_value(&outcome).unwrap();
            assert_eq!(json["kind"], outcome.kind());
        }
    }

    #[test]
    fn test_table_outcome_json() {
        let outcome = TableOutcome::table(
            "public",
            "orders",
            ComparisonOutcome::CountMismatch {
                source: 100,
                target: 99,
            },
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["schema"], "public");
        assert_eq!(json["table"], "orders");
        assert_eq!(json["kind"], "count_mismatch");
        assert_eq!(json["source"], 100);

        let back: TableOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back, outcome);

        let schema_level = TableOutcome::schema("audit", ComparisonOutcome::MissingSchemaInTarget);
        let json = serde_json::to_value(&schema_level).unwrap();
        assert!(json.get("table").is_none());
        assert_eq!(schema_level.subject(), "audit");
    }

    #[test]
    fn test_severities() {
        assert_eq!(ComparisonOutcome::MissingInTarget.severity(), Severity::Error);
        assert_eq!(
            ComparisonOutcome::CountMismatch { source: 1, target: 2 }.severity(),
            Severity::Warning
        );
        assert_eq!(ComparisonOutcome::EmptyBoth.severity(), Severity::Info);
        assert_eq!(
            ComparisonOutcome::ContentMismatch { differences: 2 }.severity(),
            Severity::Info
        );
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(
            ComparisonOutcome::NoPrimaryKeySkipped.description(),
            "has no primary key (skipped)"
        );
        assert_eq!(
            ComparisonOutcome::ShapeMismatch {
                reasons: vec!["only in target: email".into()]
            }
            .description(),
            "columns or keys differ: only in target: email"
        );
        assert!(ComparisonOutcome::ComparisonFailed {
            reason: "cannot cast".into()
        }
        .description()
        .starts_with("diff failed"));
    }
}
