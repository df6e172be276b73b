//! Command-line interface

mod serve;

use clap::{Parser, Subcommand};

pub use serve::serve;

#[derive(Debug, Parser)]
#[command(name = "fleetgate", version, about = "Request admission gateway for the fleet metrics server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP gateway
    Serve,
}
