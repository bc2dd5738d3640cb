// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! CLI argument parsing for per-crate debug flags
//!
//! Supports flags like `--debug-warden-api`, `--debug-warden-agent-registry`, etc.
//! to raise a single crate to DEBUG without touching the rest.

use std::collections::BTreeSet;
use std::env;

use crate::KNOWN_CRATES;

/// Per-crate debug flags
///
/// # Example
/// ```rust
/// use warden_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(vec!["--debug-warden-api".to_string()]);
/// assert!(flags.is_enabled("warden-api"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CrateDebugFlags {
    pub enabled_crates: BTreeSet<String>,
}

impl CrateDebugFlags {
    /// Parse debug flags from command-line arguments
    ///
    /// Looks for arguments matching `--debug-{crate-name}` pattern.
    /// Also supports `--debug-all` to enable all crates.
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = CrateDebugFlags::default();

        for arg in args {
            if arg == "--debug-all" {
                flags.enable_all();
                continue;
            }

            if let Some(crate_name) = arg.strip_prefix("--debug-") {
                flags.enabled_crates.insert(crate_name.to_string());
            }
        }

        flags
    }

    fn enable_all(&mut self) {
        for crate_name in KNOWN_CRATES {
            self.enabled_crates.insert(crate_name.to_string());
        }
    }

    /// Check if debug is enabled for a specific crate
    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains(crate_name)
    }

    /// Check if debug is enabled for any crate
    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// Create a tracing filter from debug flags
    ///
    /// Each enabled crate gets two directives: its explicit target
    /// (`warden-api`) and its module path (`warden_api`).
    /// Format: `"info,warden-api=debug,warden_api=debug"`.
    pub fn to_filter_string(&self, default_level: &str) -> String {
        let mut filters = vec![default_level.to_string()];
        for crate_name in &self.enabled_crates {
            filters.push(format!("{}=debug", crate_name));
            let module_path = crate_name.replace('-', "_");
            if module_path != *crate_name {
                filters.push(format!("{}=debug", module_path));
            }
        }
        filters.join(",")
    }
}

/// Parse debug flags from the process arguments and `WARDEN_DEBUG`
///
/// Environment variable format: comma-separated crate names, e.g.
/// `"warden-api,warden-agent-registry"`, or `all`.
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());

    if let Ok(env_var) = env::var("WARDEN_DEBUG") {
        merge_env_flags(&mut flags, &env_var);
    }

    flags
}

fn merge_env_flags(flags: &mut CrateDebugFlags, env_var: &str) {
    if env_var.trim() == "all" {
        flags.enable_all();
        return;
    }
    for crate_name in env_var.split(',') {
        let crate_name = crate_name.trim();
        if !crate_name.is_empty() {
            flags.enabled_crates.insert(crate_name.to_string());
        }
    }
}

/// Generate help text for debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all crates
  --debug-{{crate-name}}          Enable debug logging for specific crate

Available crates:
  {}

Environment Variable:
  WARDEN_DEBUG={{crate-name}}[,{{crate-name}}]  Enable debug for crates (comma-separated)
  WARDEN_DEBUG=all                               Enable debug for all crates
"#,
        KNOWN_CRATES.join(", ")
    )
}
