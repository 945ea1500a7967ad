//! Command-line front end for the producer/consumer demos

use std::time::Duration;

use clap::{Parser, Subcommand};
use pipepair::{Coordinator, Error, EventSink, Settings, Summary};

#[derive(Debug, Parser)]
#[command(name = "pipepair", about = "Producer/consumer pairs over bounded pipes")]
pub struct Args {
    /// Pause between two producer sends, in milliseconds
    #[arg(long, default_value_t = 100)]
    pub delay_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// One producer sending 1..=5 to one consumer
    Basic,
    /// Several pairs, each over its own pipe (count clamped to 0..=5)
    Pairs {
        #[arg(allow_negative_numbers = true)]
        count: i32,
    },
}

impl Args {
    #[must_use]
    pub fn settings(&self) -> Settings {
        Settings::default().with_send_delay(Duration::from_millis(self.delay_ms))
    }
}

/// Run the selected demo, printing progress to stdout
///
/// # Errors
/// Propagates pipe creation and spawn failures of the coordinator.
pub async fn run(args: &Args) -> Result<Summary, Error> {
    let coordinator = Coordinator::new(args.settings(), EventSink::stdout());
    match args.command {
        Command::Basic => coordinator.run_basic_demo().await,
        Command::Pairs { count } => coordinator.run_multiple_pairs(count).await,
    }
}
