//! wxalert - enrich an organization table with active NWS weather alerts
//!
//! Usage:
//!   wxalert --config config/wxalert.toml
//!   wxalert --orgs orgs.csv --output dashboard.csv --report run.json
//!   wxalert --alerts-file saved_alerts.json   (replay instead of the API)
//!
//! Exits non-zero on any fatal run failure; no output file is written in
//! that case.

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;

use wxalert_service::config::Config;
use wxalert_service::ingest::nws;
use wxalert_service::ingest::orgs::read_org_table_path;
use wxalert_service::logging::{self, DataSource, LogLevel};
use wxalert_service::output::write_enriched_csv_path;
use wxalert_service::pipeline::EnrichmentPipeline;

#[derive(Parser, Debug)]
#[command(name = "wxalert", version, about, long_about = None)]
struct Args {
    /// TOML configuration file. Built-in defaults apply when omitted and
    /// config/wxalert.toml does not exist.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Organization table (CSV)
    #[arg(long)]
    orgs: Option<PathBuf>,

    /// Enriched table destination (CSV)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON run report destination
    #[arg(long)]
    report: Option<PathBuf>,

    /// Saved /alerts/active payload to replay instead of calling the API
    #[arg(long)]
    alerts_file: Option<PathBuf>,

    /// Append log events to this file
    #[arg(long)]
    log_file: Option<String>,

    /// Debug-level logging with timestamps
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    let level = if args.verbose { LogLevel::Debug } else { LogLevel::Info };
    logging::init_logger(level, args.log_file.as_deref(), args.verbose);

    let mut config = Config::load_or_default(args.config.as_deref())?;
    config.apply_env_overrides();
    if let Some(path) = args.orgs {
        config.input.organizations = path;
    }
    if let Some(path) = args.output {
        config.output.path = path;
    }
    if let Some(path) = args.report {
        config.output.report = Some(path);
    }

    let pipeline = EnrichmentPipeline::new(&config)?;

    let alerts = match &args.alerts_file {
        Some(path) => {
            logging::info(DataSource::Nws, None, &format!("replaying alerts from {}", path.display()));
            nws::load_alerts_file(path)
        }
        None => nws::build_client(&config.nws).and_then(|client| nws::fetch_active_alerts(&client, &config.nws)),
    };
    let alerts = alerts.map_err(|e| {
        logging::log_fetch_failure(DataSource::Nws, "alert fetch", &e);
        e
    })?;

    let table = read_org_table_path(&config.input.organizations)?;
    logging::info(
        DataSource::Orgs,
        None,
        &format!("loaded {} rows from {}", table.len(), config.input.organizations.display()),
    );

    let output = pipeline.run(&table, alerts, Utc::now()).map_err(|e| {
        logging::error(DataSource::Pipeline, None, &e.to_string());
        e
    })?;

    write_enriched_csv_path(&config.output.path, &output.table, &config.text)?;
    logging::info(
        DataSource::System,
        None,
        &format!("wrote {} rows to {}", output.table.len(), config.output.path.display()),
    );

    if let Some(path) = &config.output.report {
        output.report.write_report(path)?;
        logging::info(DataSource::System, None, &format!("run report written to {}", path.display()));
    }

    Ok(())
}
