//! db-drift CLI - detect schema and data drift between two PostgreSQL databases.

use clap::{Parser, Subcommand, ValueEnum};
use db_drift::{
    health_check, CompareEvent, CompareObserver, CompareResult, Comparator, Config, DriftError,
    MetadataCatalog, PostgresSource, Progress, Severity, TracingObserver,
};
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Exit code when drift was found.
const EXIT_DRIFT: u8 = 1;

/// Exit code when a health check fails; matches database errors.
const EXIT_UNHEALTHY: u8 = 3;

#[derive(Parser)]
#[command(name = "db-drift")]
#[command(about = "Detect schema and data drift between two PostgreSQL databases")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yml")]
    config: PathBuf,

    /// Prefix of environment variables that override configuration values
    #[arg(long, default_value = "DB_DRIFT_")]
    env_prefix: String,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare source and target; exits 1 when drift is found
    Compare {
        /// Schemas to compare (repeatable); default is every schema
        #[arg(short, long = "schema")]
        schema: Vec<String>,

        /// Log every table outcome, not only differences
        #[arg(short, long)]
        verbose: bool,

        /// Stop at the first difference
        #[arg(short, long, overrides_with = "no_break_on_diff")]
        break_on_diff: bool,

        /// Compare every table even after a difference
        #[arg(long, overrides_with = "break_on_diff")]
        no_break_on_diff: bool,

        /// Treat tables and schemas that exist only in the target as drift
        #[arg(long)]
        fail_on_extra: bool,

        /// Print per-table progress as JSON lines to stderr (default)
        #[arg(short, long, overrides_with = "no_progress")]
        progress: bool,

        /// Do not print progress
        #[arg(long, overrides_with = "progress")]
        no_progress: bool,

        /// Append row differences to this file
        #[arg(short, long)]
        output_file: Option<PathBuf>,
    },

    /// Test database connections
    HealthCheck,

    /// Print the tables, keys and columns found in one database
    Inspect {
        /// Which database to inspect
        #[arg(long, value_enum, default_value = "source")]
        side: Side,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    Source,
    Target,
}

/// Tracing output plus optional JSON progress lines on stderr.
struct CliObserver {
    tracing: TracingObserver,
    progress: bool,
}

impl CompareObserver for CliObserver {
    fn on_event(&self, event: &CompareEvent<'_>) {
        self.tracing.on_event(event);
    }

    fn on_progress(&self, progress: &Progress) {
        if self.progress {
            if let Ok(line) = serde_json::to_string(progress) {
                eprintln!("{}", line);
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, DriftError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(DriftError::Config)?;

    let mut config = Config::load_with_env(&cli.config, &cli.env_prefix)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Compare {
            schema,
            verbose,
            break_on_diff,
            no_break_on_diff,
            fail_on_extra,
            progress,
            no_progress,
            output_file,
        } => {
            // Command-line flags override the compare section
            if !schema.is_empty() {
                config.compare.schemas = schema;
            }
            if let Some(value) = flag_pair(break_on_diff, no_break_on_diff) {
                config.compare.break_on_diff = value;
            }
            if fail_on_extra {
                config.compare.fail_on_extra = true;
            }
            if output_file.is_some() {
                config.compare.output_file = output_file;
            }
            config.validate()?;

            let observer = CliObserver {
                tracing: TracingObserver::new(verbose),
                progress: flag_pair(progress, no_progress).unwrap_or(true),
            };

            let result = until_cancelled(async {
                let mut comparator = Comparator::from_config(&config)
                    .await?
                    .with_observer(Arc::new(observer));
                comparator.compare().await
            })
            .await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                print_summary(&result);
            }

            Ok(if result.all_same {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_DRIFT)
            })
        }

        Commands::HealthCheck => {
            let result = until_cancelled(async { Ok(health_check(&config).await) }).await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                for status in [&result.source, &result.target] {
                    println!(
                        "  {} ({}): {} ({}ms)",
                        status.name,
                        status.location,
                        if status.connected { "OK" } else { "FAILED" },
                        status.latency_ms
                    );
                    if let Some(ref version) = status.server_version {
                        println!("    PostgreSQL {}", version);
                    }
                    if let Some(ref err) = status.error {
                        println!("    Error: {}", err);
                    }
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            Ok(if result.healthy {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_UNHEALTHY)
            })
        }

        Commands::Inspect { side } => {
            let (name, connection) = match side {
                Side::Source => ("source", &config.source),
                Side::Target => ("target", &config.target),
            };
            let excluded = config.compare.excluded_schemas();

            let catalog = until_cancelled(async {
                let source = PostgresSource::connect(name, connection).await?;
                let catalog = MetadataCatalog::new(Arc::new(source))
                    .with_watermark_column(config.compare.watermark_column.clone())
                    .with_excluded_schemas(excluded);
                catalog.schemas().await?;
                Ok(catalog)
            })
            .await?;
            let schemas = catalog.schemas().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(schemas)?);
            } else {
                for (schema, tables) in schemas {
                    println!("{} ({} tables)", schema, tables.len());
                    for table in tables.values() {
                        let keys = if table.has_primary_key() {
                            table.primary_keys().join(", ")
                        } else {
                            "no primary key".to_string()
                        };
                        println!("  {} [{}]", table.table_name(), keys);
                        println!("    {}", table.columns().join(", "));
                    }
                }
            }

            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Resolve a `--flag`/`--no-flag` pair; `None` when neither was given.
fn flag_pair(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn print_summary(result: &CompareResult) {
    println!(
        "\n{}",
        if result.all_same {
            "Databases are equivalent."
        } else {
            "Drift detected!"
        }
    );
    println!("  Run ID: {}", result.run_id);
    println!("  Duration: {:.2}s", result.duration_seconds);
    println!("  Tables compared: {}", result.summary.tables_compared);
    println!("  Tables matched: {}", result.summary.tables_matched);
    println!("  Skipped (no primary key): {}", result.summary.skipped);
    println!("  Indeterminate: {}", result.summary.indeterminate);
    if result.halted {
        println!("  Stopped at the first difference (--no-break-on-diff to compare everything)");
    }

    let drift: Vec<_> = result
        .outcomes
        .iter()
        .filter(|o| o.severity() > Severity::Info || o.outcome.kind() == "content_mismatch")
        .collect();
    if !drift.is_empty() {
        println!("  Findings:");
        for outcome in drift {
            println!("    {} {}", outcome.subject(), outcome.description());
        }
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("Invalid verbosity '{}'", other)),
    };

    // Logs go to stderr so stdout stays clean for --output-json
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("Invalid log format '{}'", other)),
    }

    Ok(())
}

/// Run `work` until it finishes or SIGINT/SIGTERM arrives.
#[cfg(unix)]
async fn until_cancelled<T>(
    work: impl Future<Output = Result<T, DriftError>>,
) -> Result<T, DriftError> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        result = work => result,
        _ = sigint.recv() => {
            eprintln!("\nReceived SIGINT. Stopping comparison.");
            Err(DriftError::Cancelled)
        }
        _ = sigterm.recv() => {
            eprintln!("\nReceived SIGTERM. Stopping comparison.");
            Err(DriftError::Cancelled)
        }
    }
}

#[cfg(not(unix))]
async fn until_cancelled<T>(
    work: impl Future<Output = Result<T, DriftError>>,
) -> Result<T, DriftError> {
    tokio::select! {
        result = work => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nReceived Ctrl-C. Stopping comparison.");
            Err(DriftError::Cancelled)
        }
    }
}
