//! Comparison orchestration.
//!
//! The [`Comparator`] walks the source schema map in order and, for every
//! table, runs the checks from cheapest to most expensive:
//!
//! 1. Shape: descriptor equality (metadata only)
//! 2. Count: live `count(*)` on both sides
//! 3. Content: row diff through the [`RowComparator`]
//!
//! Each table yields exactly one [`ComparisonOutcome`]. Structural differences
//! are recorded as outcomes, never returned as errors; only infrastructure
//! failures abort the run.

mod outcome;
pub mod policy;
mod result;

pub use outcome::{ComparisonOutcome, TableOutcome};
pub use result::{CompareResult, CompareSummary};

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::catalog::MetadataCatalog;
use crate::config::{CompareConfig, Config};
use crate::core::{SchemaMap, TableDescriptor};
use crate::diff::{RowComparator, RowComparison};
use crate::drivers::postgres::{PostgresRowDiffer, PostgresSource};
use crate::error::Result;
use crate::observer::{CompareEvent, CompareObserver, Progress, TracingObserver};
use crate::report::{format_differences, FileReportSink, ReportSink};

/// Options for a comparison run.
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Schemas to compare; empty compares all.
    pub include_schemas: Vec<String>,
    /// Stop at the first disqualifying outcome.
    pub break_on_diff: bool,
    /// Count target-only schemas and tables as drift.
    pub fail_on_extra: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            include_schemas: Vec::new(),
            break_on_diff: true,
            fail_on_extra: false,
        }
    }
}

impl From<&CompareConfig> for CompareOptions {
    fn from(config: &CompareConfig) -> Self {
        Self {
            include_schemas: config.schemas.clone(),
            break_on_diff: config.break_on_diff,
            fail_on_extra: config.fail_on_extra,
        }
    }
}

#[derive(Default)]
struct RunState {
    outcomes: Vec<TableOutcome>,
    all_same: bool,
    halted: bool,
}

/// Drives a comparison between a source and a target database.
pub struct Comparator {
    source: Arc<MetadataCatalog>,
    target: Arc<MetadataCatalog>,
    rows: RowComparator,
    options: CompareOptions,
    observer: Arc<dyn CompareObserver>,
    report: Option<Box<dyn ReportSink>>,
}

impl Comparator {
    /// Create a comparator with a non-verbose tracing observer and no report.
    pub fn new(
        source: Arc<MetadataCatalog>,
        target: Arc<MetadataCatalog>,
        rows: RowComparator,
        options: CompareOptions,
    ) -> Self {
        Self {
            source,
            target,
            rows,
            options,
            observer: Arc::new(TracingObserver::default()),
            report: None,
        }
    }

    /// Connect to both databases described by `config`.
    ///
    /// The report file from `compare.output_file` is attached if set.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let excluded = config.compare.excluded_schemas();
        let watermark = config.compare.watermark_column.clone();

        let source = PostgresSource::connect("source", &config.source)
            .await?
            .with_excluded_schemas(&excluded);
        let target = PostgresSource::connect("target", &config.target)
            .await?
            .with_excluded_schemas(&excluded);
        let differ = PostgresRowDiffer::new(source.pool().clone(), target.pool().clone());

        let source = MetadataCatalog::new(Arc::new(source))
            .with_watermark_column(watermark.clone())
            .with_excluded_schemas(excluded.clone());
        let target = MetadataCatalog::new(Arc::new(target))
            .with_watermark_column(watermark)
            .with_excluded_schemas(excluded);
        let rows = RowComparator::new(Arc::new(differ))
            .with_exclude_watermark(config.compare.exclude_watermark);

        let mut comparator = Self::new(
            Arc::new(source),
            Arc::new(target),
            rows,
            CompareOptions::from(&config.compare),
        );
        if let Some(path) = &config.compare.output_file {
            comparator = comparator.with_report_sink(Box::new(FileReportSink::new(path)));
        }
        Ok(comparator)
    }

    /// Replace the observer.
    pub fn with_observer(mut self, observer: Arc<dyn CompareObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Append content differences to a report sink.
    pub fn with_report_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.report = Some(sink);
        self
    }

    /// Run the comparison.
    ///
    /// Metadata is fetched at most once per catalog, so repeated runs on the
    /// same comparator reuse it; row counts and content are always re-read.
    pub async fn compare(&mut self) -> Result<CompareResult> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        info!("Starting comparison run: {}", run_id);

        let source = Arc::clone(&self.source);
        let target = Arc::clone(&self.target);
        let source_schemas = source.schemas().await?;
        let target_schemas = target.schemas().await?;

        let mut state = RunState {
            all_same: true,
            ..Default::default()
        };
        self.walk(source_schemas, target_schemas, &mut state).await?;

        let completed_at = Utc::now();
        let duration_seconds = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;
        let summary = CompareSummary::tally(&state.outcomes, self.options.fail_on_extra);

        info!(
            "Comparison {}: {} tables compared, {} matched, {} drifted, {} skipped, {} indeterminate in {:.1}s",
            if state.all_same { "passed" } else { "found drift" },
            summary.tables_compared,
            summary.tables_matched,
            summary.drifted,
            summary.skipped,
            summary.indeterminate,
            duration_seconds
        );

        Ok(CompareResult {
            run_id,
            started_at,
            completed_at,
            duration_seconds,
            all_same: state.all_same,
            halted: state.halted,
            outcomes: state.outcomes,
            summary,
        })
    }

    async fn walk(
        &mut self,
        source: &SchemaMap,
        target: &SchemaMap,
        state: &mut RunState,
    ) -> Result<()> {
        for (schema, source_tables) in source {
            if !policy::schema_selected(schema, &self.options.include_schemas) {
                self.observer.on_event(&CompareEvent::SchemaSkipped {
                    schema,
                    reason: "not in schemas (skipping)",
                });
                continue;
            }

            let Some(target_tables) = target.get(schema) else {
                let outcome =
                    TableOutcome::schema(schema, ComparisonOutcome::MissingSchemaInTarget);
                if self.record(state, outcome) {
                    return Ok(());
                }
                continue;
            };

            for extra in policy::extra_tables(source_tables, target_tables) {
                let outcome =
                    TableOutcome::table(schema, extra, ComparisonOutcome::MissingInSource);
                if self.record(state, outcome) {
                    return Ok(());
                }
            }

            let total = source_tables.len();
            for (index, (table, descriptor)) in source_tables.iter().enumerate() {
                self.observer.on_progress(&Progress {
                    schema: schema.clone(),
                    table: table.clone(),
                    position: index + 1,
                    total,
                });

                let outcome = self
                    .compare_table(descriptor, target_tables.get(table))
                    .await?;
                if self.record(state, TableOutcome::table(schema, table, outcome)) {
                    return Ok(());
                }
            }
        }

        for extra in policy::extra_schemas(source, target, &self.options.include_schemas) {
            let outcome = TableOutcome::schema(extra, ComparisonOutcome::MissingSchemaInSource);
            if self.record(state, outcome) {
                return Ok(());
            }
        }

        Ok(())
    }

    async fn compare_table(
        &mut self,
        descriptor: &TableDescriptor,
        target: Option<&TableDescriptor>,
    ) -> Result<ComparisonOutcome> {
        if !descriptor.has_primary_key() {
            return Ok(ComparisonOutcome::NoPrimaryKeySkipped);
        }

        if let Some(outcome) = policy::shape_outcome(descriptor, target) {
            return Ok(outcome);
        }

        let schema = descriptor.schema_name();
        let table = descriptor.table_name();
        let source_count = self.source.record_count(schema, table).await?;
        let target_count = self.target.record_count(schema, table).await?;
        if let Some(outcome) = policy::count_outcome(source_count, target_count) {
            return Ok(outcome);
        }

        let request = self.rows.request_for(descriptor);
        let comparison = self.rows.compare(&request).await;

        if let RowComparison::Differences(differences) = &comparison {
            if let Some(sink) = self.report.as_mut().filter(|_| !differences.is_empty()) {
                debug!(
                    "{}: writing {} differences to report",
                    request.full_name(),
                    differences.len()
                );
                sink.append(&format_differences(&request, differences))?;
            }
        }

        Ok(policy::content_outcome(&comparison, source_count))
    }

    /// Record an outcome; returns true when the run must stop.
    fn record(&self, state: &mut RunState, outcome: TableOutcome) -> bool {
        self.observer.on_event(&CompareEvent::Outcome(&outcome));

        let disqualifying = policy::is_disqualifying(&outcome.outcome, self.options.fail_on_extra);
        state.outcomes.push(outcome);

        if disqualifying {
            state.all_same = false;
            if self.options.break_on_diff {
                state.halted = true;
            }
        }
        state.halted
    }
}
