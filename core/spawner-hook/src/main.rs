//! spawner-hook: live multi-agent notifications for Task tool calls.
//!
//! Configured as a PreToolUse/PostToolUse hook in the host's settings. Each
//! call is a fresh process; session continuity lives in the state file.
//!
//! ## Subcommands
//!
//! - `handle`: Main hook handler, reads JSON from stdin (default)
//! - `emit`: Print an event marker for agents and skills to embed
//! - `status`: Show the session in progress
//! - `reset`: Discard the session state

mod emit;
mod handle;
mod logging;
mod reset;
mod status;

use clap::{Parser, Subcommand};
use spawner_core::HookConfig;

#[derive(Parser)]
#[command(name = "spawner-hook")]
#[command(about = "Multi-agent session notifications")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle a hook event (reads JSON from stdin)
    Handle,

    /// Print a `[SPAWNER_EVENT]` marker to stdout
    Emit {
        /// Event kind: spawn, progress, waiting, handoff, complete, error
        #[arg(value_name = "KIND")]
        kind: String,

        /// Event data as a JSON object
        #[arg(value_name = "JSON")]
        data: String,
    },

    /// Show active agents and the collaboration graph so far
    Status,

    /// Discard the current session state
    Reset,
}

fn main() {
    let config = HookConfig::load();
    config.apply_color();
    let _logging_guard = logging::init(&config.log_file());
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Handle) {
        Commands::Handle => {
            // Never fail the host's tool call.
            if let Err(e) = handle::run(&config) {
                tracing::error!(error = %e, "spawner-hook handle failed");
            }
        }
        Commands::Emit { kind, data } => {
            if let Err(e) = emit::run(&kind, &data) {
                eprintln!("spawner-hook emit: {}", e);
                std::process::exit(2);
            }
        }
        Commands::Status => status::run(&config),
        Commands::Reset => {
            if let Err(e) = reset::run(&config) {
                eprintln!("spawner-hook reset: {}", e);
                std::process::exit(1);
            }
        }
    }
}
