//! Command-line interface for the `vex-server` binary.
//!
//! Everything else is configured through environment variables (see
//! [`Settings`](crate::utils::config::Settings)); flags given here win over
//! `HOST` and `PORT`.

use clap::Parser;
use std::path::PathBuf;

/// VEX - Conversational assistant server
#[derive(Parser, Debug)]
#[command(
    name = "vex-server",
    version,
    about = "VEX - Conversational assistant server with memory",
    after_help = "EXAMPLES:\n    \
                  vex-server                        # Listen on HOST:PORT from the environment\n    \
                  vex-server --port 9000            # Override the port\n    \
                  vex-server --env-file prod.env    # Load a specific env file"
)]
pub struct Cli {
    /// Address to bind (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Env file to load instead of ./.env
    #[arg(long)]
    pub env_file: Option<PathBuf>,
}
