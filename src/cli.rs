/*!
duckdash Command Line Interface

Runs dashboards into HTML or JSON pages and prepares data files for them.
*/

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use duckdash::convert::{convert_csv, describe_columns};
use duckdash::pipeline::{ProgressEvent, ProgressSink};
use duckdash::writer::{HtmlWriter, JsonWriter, Writer};
use duckdash::{DashboardConfig, EngineConfig, EngineHandle, Session, VERSION};

#[derive(Parser)]
#[command(name = "duckdash")]
#[command(about = "Analytics dashboards over an embedded DuckDB engine")]
#[command(version = VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Html,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a dashboard and write the resulting page
    Run {
        /// Path to the dashboard TOML file
        dashboard: PathBuf,

        /// Directory or URL prefix overriding the dashboard's `base`
        #[arg(long)]
        base: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "html")]
        format: OutputFormat,

        /// Output file path (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Show step progress and engine details
        #[arg(short, long)]
        verbose: bool,
    },

    /// Convert CSV files to Parquet
    Convert {
        /// CSV files to convert
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory the Parquet files are written to
        #[arg(long, default_value = "public/parquet")]
        out_dir: PathBuf,
    },

    /// List the columns of CSV, Parquet or JSON files
    Columns {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Prints progress to stderr as it happens
struct StderrProgress {
    verbose: bool,
}

impl ProgressSink for StderrProgress {
    fn report(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::StepStarted { .. } if !self.verbose => {}
            ProgressEvent::Status(_) if !self.verbose => {}
            event => eprintln!("{}", event),
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "duckdash=info" } else { "duckdash=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            dashboard,
            base,
            format,
            output,
            verbose,
        } => {
            init_tracing(verbose);
            if verbose {
                eprintln!("Running dashboard: {}", dashboard.display());
            }
            cmd_run(dashboard, base, format, output, verbose).await
        }

        Commands::Convert { files, out_dir } => {
            init_tracing(false);
            cmd_convert(files, out_dir).await
        }

        Commands::Columns { files } => {
            init_tracing(false);
            cmd_columns(files).await
        }
    }
}

async fn cmd_run(
    dashboard: PathBuf,
    base: Option<String>,
    format: OutputFormat,
    output: Option<PathBuf>,
    verbose: bool,
) -> anyhow::Result<()> {
    let mut config = DashboardConfig::from_file(&dashboard)?;
    if let Some(base) = base {
        config = config.with_base(base);
    }
    if verbose {
        eprintln!("Base: {}", config.base);
        eprintln!("Steps: {}, charts: {}", config.steps.len(), config.charts.len());
    }

    let mut session = Session::new(config);
    let mut progress = StderrProgress { verbose };
    let outcome = session.run(&mut progress).await;

    // The page is written even for a failed run; its log shows the error
    let page = session.page();
    let text = match format {
        OutputFormat::Html => HtmlWriter::new().write(&page)?,
        OutputFormat::Json => JsonWriter::new().pretty().write(&page)?,
    };
    match &output {
        Some(path) => {
            tokio::fs::write(path, &text).await?;
            if verbose {
                eprintln!("Page written to: {}", path.display());
            }
        }
        None => println!("{}", text),
    }

    session.close().await?;
    if let Err(e) = outcome {
        eprintln!("Run failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_convert(files: Vec<PathBuf>, out_dir: PathBuf) -> anyhow::Result<()> {
    let engine = EngineHandle::acquire(&EngineConfig::default()).await?;
    let mut failed = 0;
    for file in &files {
        match convert_csv(&engine, file, &out_dir).await {
            Ok(report) => {
                eprintln!("[OK] {}", report);
                if report.rows == 0 {
                    eprintln!("[WARN] {} is empty after conversion", report.output.display());
                }
            }
            Err(e) => {
                eprintln!("[FAIL] {}", e);
                failed += 1;
            }
        }
    }
    engine.close().await?;

    if failed > 0 {
        eprintln!("{} of {} file(s) failed", failed, files.len());
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_columns(files: Vec<PathBuf>) -> anyhow::Result<()> {
    let engine = EngineHandle::acquire(&EngineConfig::default()).await?;
    for file in &files {
        match describe_columns(&engine, file).await {
            Ok(columns) => {
                println!("=== {} ===", file.display());
                println!("Columns ({}):", columns.len());
                for column in columns {
                    println!("  {} {}", column.name, column.data_type);
                }
            }
            Err(e) => eprintln!("Failed to read {}: {}", file.display(), e),
        }
    }
    engine.close().await?;
    Ok(())
}
