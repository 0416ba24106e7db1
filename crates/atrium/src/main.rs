// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Atrium - conversation claim and assignment service.
//!
//! This is the binary entry point: configuration, the HTTP server, and
//! agent provisioning from the command line.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod agent;
mod serve;
mod shutdown;

use std::path::PathBuf;

use atrium_config::AtriumConfig;
use clap::{Parser, Subcommand};

/// Atrium - decides which agent owns each customer conversation.
#[derive(Parser, Debug)]
#[command(name = "atrium", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server and the background sweep.
    Serve,
    /// Print the effective configuration with secrets redacted.
    Config,
    /// Manage agents.
    Agent {
        #[command(subcommand)]
        action: AgentCommand,
    },
}

#[derive(Subcommand, Debug)]
enum AgentCommand {
    /// Provision an agent.
    Add {
        /// Integer agent code.
        code: i64,
        /// Display name shown to other agents.
        #[arg(long)]
        name: String,
        /// Home work group (must be configured).
        #[arg(long = "work-group")]
        work_group: String,
        /// Provisioning source recorded with the agent.
        #[arg(long, default_value = "cli")]
        source: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> AtriumConfig {
    let loaded = match path {
        Some(path) => atrium_config::load_and_validate_path(path),
        None => atrium_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            atrium_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Config) => match config.to_redacted_toml() {
            Ok(rendered) => {
                print!("{rendered}");
                Ok(())
            }
            Err(e) => Err(atrium_core::AtriumError::Config(e.to_string())),
        },
        Some(Commands::Agent {
            action:
                AgentCommand::Add {
                    code,
                    name,
                    work_group,
                    source,
                },
        }) => agent::add(&config, code, &name, &work_group, &source).await,
        None => {
            println!("atrium: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("atrium: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the stats epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn agent_add_parses() {
        let cli = Cli::try_parse_from([
            "atrium",
            "--config",
            "/tmp/atrium.toml",
            "agent",
            "add",
            "12",
            "--name",
            "Ana",
            "--work-group",
            "support",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/atrium.toml")));
        match cli.command {
            Some(Commands::Agent {
                action:
                    AgentCommand::Add {
                        code,
                        name,
                        work_group,
                        source,
                    },
            }) => {
                assert_eq!(code, 12);
                assert_eq!(name, "Ana");
                assert_eq!(work_group, "support");
                assert_eq!(source, "cli");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
