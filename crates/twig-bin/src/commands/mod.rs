// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Command implementations for the TWIG CLI.

pub mod run;
pub mod scan;
pub mod validate;
pub mod version;
