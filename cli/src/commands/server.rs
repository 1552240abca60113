//! `server run` command implementation

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::output;

#[derive(Subcommand, Debug)]
pub enum ServerCommand {
    /// Accept uploads on ADDRESS and store them under DATA
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Address to listen on, as host:port
    pub address: String,

    /// Directory samples are stored in
    pub data: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let address = super::resolve_address(&args.address)?;

    output::info(&format!(
        "Serving on {}, storing samples in {} (Ctrl-C to stop)",
        address,
        args.data.display()
    ));
    parley_server::run_server(&address, args.data).await?;
    output::success("Server stopped");
    Ok(())
}
