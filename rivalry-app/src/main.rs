mod app;
mod cli;
mod simulate;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::cli::{Cli, Command};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Schedule(session) => {
            let path = App::new(session)?.export_schedule()?;
            println!("{}", path.display());
        }
        Command::Simulate {
            session,
            abort_after,
            realtime,
        } => {
            let summary = App::new(session)?.simulate(abort_after, realtime)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Analyze { events } => {
            let stats = app::analyze(&events)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
