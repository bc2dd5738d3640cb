// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # warden-observability
//!
//! Logging setup shared by every warden crate, with per-crate debug flag
//! support.
//!
//! ## Features
//! - `file-logging`: daily-rolling JSON log files under a per-run folder

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known warden crate names for debug flags
///
/// These double as `tracing` targets: every crate logs under its own name.
pub const KNOWN_CRATES: &[&str] = &[
    "warden",
    "warden-api",
    "warden-agent-registry",
    "warden-config",
];
