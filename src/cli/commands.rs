use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// List the command protocol table
    Commands(CommandsArgs),

    /// Run a scenario file against an in-memory page
    Run(RunArgs),
}

#[derive(Args, Clone, Debug)]
pub struct CommandsArgs {
    /// Only list commands executed as simulated input
    #[arg(long)]
    pub automation_only: bool,
}

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Scenario JSON file
    #[arg(short, long, value_name = "FILE")]
    pub scenario: PathBuf,

    /// Re-validate elements right before dispatch
    #[arg(long, conflicts_with = "lenient")]
    pub strict: bool,

    /// Skip the pre-dispatch element re-validation
    #[arg(long)]
    pub lenient: bool,
}

impl RunArgs {
    /// `None` leaves the configured default in place.
    pub fn strict_element_check(&self) -> Option<bool> {
        match (self.strict, self.lenient) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}
