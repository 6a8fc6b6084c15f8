//! Result of a comparison run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::outcome::{ComparisonOutcome, TableOutcome};

/// Result of a comparison run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareResult {
    /// Unique run identifier.
    pub run_id: String,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// True when no disqualifying outcome was recorded.
    pub all_same: bool,

    /// True when the run stopped at the first difference.
    pub halted: bool,

    /// Every recorded outcome, in the order found.
    pub outcomes: Vec<TableOutcome>,

    /// Counters over `outcomes`.
    pub summary: CompareSummary,
}

/// Outcome counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareSummary {
    /// Tables that reached the count check.
    pub tables_compared: usize,
    /// Tables found equal (content match or both empty).
    pub tables_matched: usize,
    /// Outcomes that count as drift.
    pub drifted: usize,
    /// Tables skipped for lack of a primary key.
    pub skipped: usize,
    /// Tables whose row diff could not be completed.
    pub indeterminate: usize,
}

impl CompareSummary {
    /// Tally outcomes; `fail_on_extra` decides whether extras count as drift.
    pub fn tally(outcomes: &[TableOutcome], fail_on_extra: bool) -> Self {
        let mut summary = Self::default();
        for entry in outcomes {
            match &entry.outcome {
                ComparisonOutcome::CountMismatch { .. } => summary.tables_compared += 1,
                ComparisonOutcome::EmptyBoth | ComparisonOutcome::ContentMatch { .. } => {
                    summary.tables_compared += 1;
                    summary.tables_matched += 1;
                }
                ComparisonOutcome::ContentMismatch { .. } => summary.tables_compared += 1,
                ComparisonOutcome::ComparisonFailed { .. } => {
                    summary.tables_compared += 1;
                    summary.indeterminate += 1;
                }
                ComparisonOutcome::NoPrimaryKeySkipped => summary.skipped += 1,
                _ => {}
            }
            if super::policy::is_disqualifying(&entry.outcome, fail_on_extra) {
                summary.drifted += 1;
            }
        }
        summary
    }
}

impl CompareResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Outcomes of a given class.
    pub fn outcomes_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a TableOutcome> {
        self.outcomes.iter().filter(move |o| o.outcome.kind() == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally() {
        let outcomes = vec![
            TableOutcome::table("public", "a", ComparisonOutcome::ContentMatch { rows: 5 }),
            TableOutcome::table("public", "b", ComparisonOutcome::EmptyBoth),
            TableOutcome::table("public", "c", ComparisonOutcome::NoPrimaryKeySkipped),
            TableOutcome::table(
                "public",
                "d",
                ComparisonOutcome::CountMismatch {
                    source: 1,
                    target: 2,
                },
            ),
            TableOutcome::table(
                "public",
                "e",
                ComparisonOutcome::ComparisonFailed {
                    reason: "x".into(),
                },
            ),
            TableOutcome::table("public", "f", ComparisonOutcome::MissingInSource),
        ];

        let lenient = CompareSummary::tally(&outcomes, false);
        assert_eq!(
            lenient,
            CompareSummary {
                tables_compared: 4,
                tables_matched: 2,
                drifted: 1,
                skipped: 1,
                indeterminate: 1,
            }
        );

        let strict = CompareSummary::tally(&outcomes, true);
        assert_eq!(strict.drifted, 2);
    }

    #[test]
    fn test_to_json() {
        let now = Utc::now();
        let result = CompareResult {
            run_id: "run-1".into(),
            started_at: now,
            completed_at: now,
            duration_seconds: 0.5,
            all_same: false,
            halted: true,
            outcomes: vec![TableOutcome::schema(
                "audit",
                ComparisonOutcome::MissingSchemaInTarget,
            )],
            summary: CompareSummary::default(),
        };

        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["all_same"], false);
        assert_eq!(json["halted"], true);
        assert_eq!(json["outcomes"][0]["kind"], "missing_schema_in_target");
        assert_eq!(result.outcomes_of("missing_schema_in_target").count(), 1);
    }
}
