// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Simple diagnostics library for the filetree workspace
//!
//! Provides lightweight, configurable logging across all crates.
//!
//! Usage:
//! - Set FILETREE_LOG=off (default) - no logs
//! - Set FILETREE_LOG=info - basic operation logs
//! - Set FILETREE_LOG=debug - detailed diagnostic logs

use std::sync::Once;

// Re-export emit so macros can use it
pub use emit;

/// Environment variable read by `init_diagnostics`
pub const LOG_ENV: &str = "FILETREE_LOG";

static INIT: Once = Once::new();

/// Parsed value of FILETREE_LOG
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSetting {
    Off,
    Min(emit::Level),
    /// Not a known level; logs at info
    Unknown,
}

/// Interprets a FILETREE_LOG value. Case and surrounding space are ignored.
#[must_use]
pub fn parse_level(value: &str) -> LogSetting {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "off" => LogSetting::Off,
        "debug" => LogSetting::Min(emit::Level::Debug),
        "info" => LogSetting::Min(emit::Level::Info),
        "warn" => LogSetting::Min(emit::Level::Warn),
        "error" => LogSetting::Min(emit::Level::Error),
        _ => LogSetting::Unknown,
    }
}

/// Initialize diagnostics based on the FILETREE_LOG environment variable
///
/// This should be called once at application startup. It's safe to call
/// multiple times - subsequent calls will be ignored.
pub fn init_diagnostics() {
    INIT.call_once(|| {
        let value = std::env::var(LOG_ENV).unwrap_or_else(|_| "off".to_string());

        let level = match parse_level(&value) {
            LogSetting::Off => return,
            LogSetting::Min(level) => level,
            LogSetting::Unknown => emit::Level::Info,
        };
        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(level))
            .init();

        if parse_level(&value) == LogSetting::Unknown {
            emit::warn!("Unknown {env} value '{value}', using 'info'", env: LOG_ENV);
        }

        // The runtime lives for the rest of the process
        std::mem::forget(rt);
    });
}

/// Log basic operations (reads, watch subscriptions, etc.)
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed diagnostics
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log warning conditions (recoverable errors, ignored notifications)
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log critical error conditions
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

// Short-name versions for ergonomic usage

/// Log basic operations (reads, watch subscriptions, etc.)
///
/// Use this for operations that users might want to see in normal usage.
/// Examples: "Opened /src", "Watching /src"
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed diagnostics (entry counts, reconciliation steps, queue state)
///
/// Use this for detailed information useful for debugging.
/// Examples: "read 12 entries from /src", "preload 'readDirectory:/lib' started"
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log warning conditions (fallbacks, recoverable errors)
///
/// Use this for issues that don't prevent operation but should be noted.
/// Examples: "non-fatal error watching /src", "failed to apply file-created"
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log critical error conditions
/// Using "error" instead of "fatal" for consistency with emit-rs
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

/// Re-export the init function for convenience
pub use init_diagnostics as init;
