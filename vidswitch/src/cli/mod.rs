use anyhow::Result;
use clap::{Parser, Subcommand};

mod probe;
mod run;

pub use probe::ProbeCommand;
pub use run::RunCommand;

#[derive(Parser, Debug)]
#[command(name = "vidswitch")]
#[command(about = "Main/backup/filler input switching for live video ingest")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open all three sources and consume the current one
    Run(RunCommand),
    /// Open a single source and print its streams
    Probe(ProbeCommand),
}

impl Args {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Run(cmd) => cmd.run().await,
            Command::Probe(cmd) => cmd.run().await,
        }
    }
}
