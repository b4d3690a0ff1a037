// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the TWIG binary.

use thiserror::Error;

/// Result type alias for twig-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// Errors that can occur in the TWIG binary.
#[derive(Debug, Error)]
pub enum BinError {
    /// Initialization error.
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// Runtime error.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Config error.
    #[error("Config error: {0}")]
    Config(#[from] twig_core::error::ConfigError),

    /// Core error.
    #[error(transparent)]
    Core(#[from] twig_core::error::TwigError),

    /// Bus error.
    #[error("Bus error: {0}")]
    Bus(#[from] twig_core::error::BusError),
}

impl BinError {
    /// Creates an initialization error.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    /// Creates a runtime error.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Returns the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 1,
            Self::Initialization(_) => 2,
            Self::Runtime(_) => 3,
            Self::Bus(_) => 4,
            Self::Core(_) => 5,
        }
    }
}

/// Reports an error with its cause chain.
pub fn report_error(error: &BinError) {
    eprintln!("Error: {}", error);

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  Caused by: {}", cause);
        source = cause.source();
    }
}

/// Reports an error and exits with the appropriate code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use twig_core::error::ConfigError;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            BinError::Config(ConfigError::missing_field("type")).exit_code(),
            1
        );
        assert_eq!(BinError::init("test").exit_code(), 2);
        assert_eq!(BinError::runtime("test").exit_code(), 3);
    }
}
