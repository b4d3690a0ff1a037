// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! TWIG - Two-Wire Interface Gateway
//!
//! Main binary entry point.

use twig_bin::cli::{Cli, Commands};
use twig_bin::error::report_error_and_exit;
use twig_bin::{commands, logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    logging::init_logging(cli.effective_log_level(), cli.log_format);

    let result = match cli.effective_command() {
        Commands::Run(args) => commands::run::execute(&cli.config, &args).await,
        Commands::Validate(args) => commands::validate::execute(&cli.config, &args).await,
        Commands::Scan(args) => commands::scan::execute(&cli.config, &args).await,
        Commands::Version => commands::version::execute().await,
    };

    if let Err(error) = result {
        report_error_and_exit(error);
    }
}
