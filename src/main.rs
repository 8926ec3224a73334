// src/main.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use timesheet_reconciler::{
    config::AppConfig,
    detect_anomalies, reconcile,
    report::{read_timesheet_file, write_anomaly_report, write_matched_pairs},
    server, AnomalyParams,
};

#[derive(Parser, Debug)]
#[command(
    name = "timesheet-reconciler",
    version,
    about = "Find hour discrepancies between client and company timesheets"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare a client timesheet against a company timesheet
    Reconcile {
        #[arg(long)]
        client: PathBuf,
        #[arg(long)]
        company: PathBuf,
        /// Report file; stdout when omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Write every matched pair, not only the discrepancies
        #[arg(long)]
        all: bool,
    },
    /// Flag employees whose weekday hours pattern is unusual
    Anomalies {
        #[arg(long)]
        timesheet: PathBuf,
        #[arg(long)]
        contamination: Option<f64>,
        #[arg(long)]
        estimators: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Serve both operations over HTTP
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

fn output_writer(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create report {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

fn run_reconcile(client: &Path, company: &Path, output: Option<&Path>, all: bool) -> Result<()> {
    let client_rows = read_timesheet_file(client)?;
    let company_rows = read_timesheet_file(company)?;

    let reconciliation =
        reconcile(&client_rows, &company_rows).context("Reconciliation failed")?;
    let summary = reconciliation.summary();

    if summary.unmatched_client > 0 || summary.unmatched_company > 0 {
        warn!(
            "Rows without a counterpart were left out of the report: client_only={}, company_only={}",
            summary.unmatched_client, summary.unmatched_company
        );
    }
    if summary.with_discrepancy == 0 {
        info!("No discrepancies found! Working hours match.");
    } else {
        info!(
            "Found {} discrepancies, net {} hours",
            summary.with_discrepancy, summary.net_discrepancy
        );
    }

    let rows = if all {
        reconciliation.matched().to_vec()
    } else {
        reconciliation.discrepancies()
    };
    write_matched_pairs(output_writer(output)?, &rows)?;
    if let Some(path) = output {
        info!("Discrepancy report written to {}", path.display());
    }
    Ok(())
}

fn run_anomalies(
    config: &AppConfig,
    timesheet: &Path,
    contamination: Option<f64>,
    estimators: Option<usize>,
    seed: Option<u64>,
    output: Option<&Path>,
) -> Result<()> {
    let defaults = config.anomaly_params();
    let params = AnomalyParams {
        contamination: contamination.unwrap_or(defaults.contamination),
        n_estimators: estimators.unwrap_or(defaults.n_estimators),
        seed: seed.unwrap_or(defaults.seed),
    };

    let rows = read_timesheet_file(timesheet)?;
    let report = detect_anomalies(&rows, &params).context("Anomaly detection failed")?;
    for result in report.anomalies() {
        info!(
            "Unusual pattern: employee={}, score={:.3}",
            result.employee_id, result.score
        );
    }
    write_anomaly_report(output_writer(output)?, &report)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; logs go to stderr so CSV on stdout stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mut config = AppConfig::from_env().context("Failed to load configuration")?;

    match cli.command {
        Command::Reconcile {
            client,
            company,
            output,
            all,
        } => run_reconcile(&client, &company, output.as_deref(), all),
        Command::Anomalies {
            timesheet,
            contamination,
            estimators,
            seed,
            output,
        } => run_anomalies(
            &config,
            &timesheet,
            contamination,
            estimators,
            seed,
            output.as_deref(),
        ),
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server_host = host;
            }
            if let Some(port) = port {
                config.server_port = port;
            }
            info!("Starting timesheet API server");
            server::serve(config).await
        }
    }
}
