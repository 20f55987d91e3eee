//! Writes a Debezium connector descriptor from a template.
//!
//! Environment variables required (a `.env` file is honoured):
//! - EH_NAME, EH_CONNECTION_STRING: Event Hubs namespace and connection string
//! - HOST, PORT, LOGMINER_USER_NAME, LOGMINER_PASSWORD: source database login
//! - SID, PDB, DEBEZIUM_SERVER_NAME: database, pluggable database and logical server names

use std::path::PathBuf;

use anyhow::{Context, Result};
use cdc_feeder::connector::{generate, ConnectorParams};
use chrono::Local;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "connector_config", version, about)]
struct Args {
    /// Connector template to fill in
    #[arg(long, default_value = "src/connector.json")]
    template: PathBuf,
    /// Where to write the generated descriptor
    #[arg(long, default_value = "src/debezium_connector.json")]
    output: PathBuf,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let params = ConnectorParams::from_env()?;
    let rendered = generate(&args.template, &args.output, &params, Local::now().date_naive())
        .with_context(|| format!("failed to generate {}", args.output.display()))?;

    println!(
        "Wrote connector {} to {}",
        rendered["name"].as_str().unwrap_or_default(),
        args.output.display()
    );

    Ok(())
}
