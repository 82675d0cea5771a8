use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "rivalry", author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build the trial list and write it as JSON
    Schedule(SessionArgs),

    /// Play the schedule headless with a simulated participant
    Simulate {
        #[command(flatten)]
        session: SessionArgs,

        /// Press the exit key after this many responses
        #[arg(long)]
        abort_after: Option<usize>,

        /// Pace frames with the wall clock instead of a manual clock
        #[arg(long, default_value_t = false)]
        realtime: bool,
    },

    /// Switch statistics for a previously written events file
    Analyze {
        #[arg(value_name = "EVENTS_JSON")]
        events: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Subject label; the trailing number decides block order
    #[arg(long, default_value = "sub-01")]
    pub subject: String,

    #[arg(long, default_value = "1")]
    pub session: String,

    /// Path to settings TOML
    #[arg(long, default_value = "settings.toml")]
    pub config: PathBuf,

    /// Seed for the schedule RNG; OS entropy when absent
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,
}

impl SessionArgs {
    /// Number after the last `-` of labels like `sub-02`, or the whole label.
    pub fn subject_id(&self) -> Result<u32> {
        let digits = self
            .subject
            .rsplit('-')
            .next()
            .unwrap_or(self.subject.as_str())
            .trim();
        if digits.is_empty() {
            bail!("empty subject label");
        }
        digits
            .parse()
            .with_context(|| format!("subject label '{}' does not end in a number", self.subject))
    }

    /// Prefix shared by all artifacts of this session.
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.subject, self.session)
    }
}
