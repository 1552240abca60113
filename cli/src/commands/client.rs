//! `client run` command implementation

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use parley_client::ClientConfig;
use parley_shared::{Gender, Identity};
use std::path::PathBuf;

use crate::output;

#[derive(Subcommand, Debug)]
pub enum ClientCommand {
    /// Upload SAMPLE to the server at ADDRESS
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Server address, as host:port
    pub address: String,

    /// Sample file to upload
    pub sample: PathBuf,

    /// Numeric user ID sent in the handshake
    #[arg(long, env = "PARLEY_USER_ID")]
    pub user_id: u64,

    /// Username sent in the handshake
    #[arg(long, env = "PARLEY_USERNAME")]
    pub username: String,

    /// Birth date (YYYY-MM-DD or RFC 3339)
    #[arg(long, env = "PARLEY_BIRTH_DATE", value_parser = parse_birth_date)]
    pub birth_date: DateTime<Utc>,

    /// Single-character gender code ('f', 'm', or any other ASCII character)
    #[arg(long, env = "PARLEY_GENDER")]
    pub gender: Gender,

    /// Connection attempts before giving up
    #[arg(long, default_value = "5")]
    pub attempts: u32,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_birth_date(s: &str) -> Result<DateTime<Utc>, String> {
    parley_shared::utils::time::parse_birth_date(s).map_err(|e| format!("{}: {:?}", e, s))
}

pub async fn run(args: RunArgs) -> Result<()> {
    let address = super::resolve_address(&args.address)?;

    let identity = Identity::new(args.user_id, args.username, args.birth_date, args.gender);
    let config = ClientConfig {
        connect_attempts: args.attempts,
        ..ClientConfig::new(identity)
    };

    output::info(&format!("Connecting to {} as {}", address, config.identity));
    let fields = parley_client::upload_sample(&address, &args.sample, &config).await?;

    output::info(&fields.to_string());
    output::success(&format!("Uploaded {}", args.sample.display()));
    Ok(())
}
