//! Command-line arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scanflow")]
#[command(about = "Security-scan report pipeline", long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, env = "SCANFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Workspace root (overrides the configuration)
    #[arg(short = 'C', long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Print results as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export, audit and render reports for one or more targets
    Scan {
        /// Folders relative to the workspace root; defaults to the root itself
        #[arg(default_value = ".")]
        targets: Vec<String>,
    },
    /// Local model server management
    Server {
        #[command(subcommand)]
        command: ServerCommands,
    },
    /// Print the artifact paths for a target without running anything
    Paths {
        /// Folder relative to the workspace root
        target: String,
    },
}

/// Server subcommands
#[derive(Subcommand, Debug)]
pub enum ServerCommands {
    /// Start the server and report its port
    Start,
    /// Stop the server
    Stop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_defaults_to_root() {
        let cli = Cli::parse_from(["scanflow", "scan"]);
        match cli.command {
            Commands::Scan { targets } => assert_eq!(targets, vec![".".to_string()]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["scanflow", "scan", "src", "lib", "-C", "/work", "--json"]);
        assert!(cli.json);
        assert_eq!(cli.workspace, Some(PathBuf::from("/work")));
        match cli.command {
            Commands::Scan { targets } => assert_eq!(targets, vec!["src", "lib"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_server_subcommands() {
        let cli = Cli::parse_from(["scanflow", "server", "stop"]);
        assert!(matches!(
            cli.command,
            Commands::Server {
                command: ServerCommands::Stop
            }
        ));
    }
}
