use crate::server;
use clap::{Parser, Subcommand};
use talent_match::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "talent-match-worker",
    about = "Score the talent pool against every newly posted job",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Subscribe to job-posted events and score each job (default command)
    Listen,
    /// Run one match for a correlation id and print the summary
    Replay {
        /// Correlation id of the job to score
        correlation_id: String,
    },
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Listen) {
        Command::Listen => server::run().await,
        Command::Replay { correlation_id } => server::replay(correlation_id).await,
    }
}
