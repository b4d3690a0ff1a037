// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The `version` command: detailed version information.

use crate::error::BinResult;

/// Prints version information for all components.
pub async fn execute() -> BinResult<()> {
    println!("twig {}", twig_core::VERSION);
    println!("  twig-core    {}", twig_core::VERSION);
    println!("  rpc protocol POST /rpc (json envelope, hex payloads)");
    Ok(())
}
