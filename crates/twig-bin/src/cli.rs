// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! Subcommands:
//!
//! - `run`: Start the gateway (default)
//! - `validate`: Validate configuration file
//! - `scan`: Scan a local bus for devices
//! - `version`: Show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// TWIG - Two-Wire Interface Gateway
///
/// Exposes local I2C buses over an HTTP/JSON RPC protocol and dispatches
/// device state changes into the hosting automation platform.
#[derive(Parser, Debug)]
#[command(
    name = "twig",
    author = "Sylvex <contact@sylvex.io>",
    version = twig_core::VERSION,
    about = "Two-Wire Interface Gateway",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "twig.toml",
        env = "TWIG_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        short,
        long,
        default_value = "info",
        env = "TWIG_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json, compact)
    #[arg(long, default_value = "text", env = "TWIG_LOG_FORMAT", global = true)]
    pub log_format: LogFormat,

    /// Enable quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands for the TWIG CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the gateway
    ///
    /// This is the default command when no subcommand is specified. It
    /// starts the configured bus, the RPC server when a port is set, and
    /// all configured device handlers.
    Run(RunArgs),

    /// Validate the configuration file
    ///
    /// Parses and validates the configuration file without starting the
    /// gateway.
    Validate(ValidateArgs),

    /// Scan a local bus for responding devices
    ///
    /// Probes the 7-bit address space and prints every address that
    /// answered.
    Scan(ScanArgs),

    /// Show detailed version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `run` command.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Skip starting device handlers (bus and RPC server only)
    #[arg(long)]
    pub no_handlers: bool,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Default, Clone)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,
}

/// Arguments for the `scan` command.
#[derive(Args, Debug, Default, Clone)]
pub struct ScanArgs {
    /// Bus number to scan (overrides the configured bus)
    #[arg(short, long)]
    pub bus: Option<u32>,

    /// First address of the scan range
    #[arg(long)]
    pub start: Option<u8>,

    /// Last address of the scan range (inclusive)
    #[arg(long)]
    pub end: Option<u8>,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective command, defaulting to `Run` if none specified.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    }

    /// Get the effective log level based on flags.
    pub fn effective_log_level(&self) -> &str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command() {
        let cli = Cli::parse_from(["twig"]);
        assert!(cli.command.is_none());
        assert!(matches!(cli.effective_command(), Commands::Run(_)));
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::parse_from(["twig", "run"]);
        assert!(matches!(cli.command, Some(Commands::Run(_))));
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["twig", "validate", "--show-config"]);
        if let Some(Commands::Validate(args)) = cli.command {
            assert!(args.show_config);
        } else {
            panic!("Expected Validate command");
        }
    }

    #[test]
    fn test_scan_command_range() {
        let cli = Cli::parse_from(["twig", "scan", "--bus", "3", "--start", "32", "--end", "39"]);
        if let Some(Commands::Scan(args)) = cli.command {
            assert_eq!(args.bus, Some(3));
            assert_eq!(args.start, Some(32));
            assert_eq!(args.end, Some(39));
        } else {
            panic!("Expected Scan command");
        }
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::parse_from(["twig", "-c", "/etc/twig/twig.yaml"]);
        assert_eq!(cli.config, PathBuf::from("/etc/twig/twig.yaml"));
    }

    #[test]
    fn test_quiet_mode() {
        let cli = Cli::parse_from(["twig", "-q"]);
        assert!(cli.quiet);
        assert_eq!(cli.effective_log_level(), "warn");
    }

    #[test]
    fn test_verbose_mode() {
        let cli = Cli::parse_from(["twig", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.effective_log_level(), "debug");
    }
}
