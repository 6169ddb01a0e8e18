//! Runtime configuration for enginectl.
//!
//! Every value has a compile-time default and can be overridden through a
//! dedicated environment variable. Command-line flags take precedence over
//! both.

use std::path::PathBuf;
use std::time::Duration;

/// Default deadline for each `uciok` / `readyok` wait (in seconds).
const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 10;

/// Default hash table budget handed to the engine (in MB).
const DEFAULT_MAX_MEMORY_MB: u32 = 256;

/// Extra time allowed on top of the search budget before giving up on a
/// `bestmove` (in milliseconds).
const DEFAULT_SEARCH_GRACE_MS: u64 = 5000;

/// Get an explicit path to the standard engine build.
///
/// Priority:
/// 1. `ENGINECTL_ENGINE_PATH` env variable if set
/// 2. `None`: the engine is looked up in common locations and on `PATH`
pub fn get_engine_path() -> Option<PathBuf> {
    std::env::var_os("ENGINECTL_ENGINE_PATH").map(PathBuf::from)
}

/// Get an explicit path to the variants-capable engine build.
///
/// Priority:
/// 1. `ENGINECTL_VARIANT_ENGINE_PATH` env variable if set
/// 2. `ENGINECTL_ENGINE_PATH` (see [`get_engine_path`])
pub fn get_variant_engine_path() -> Option<PathBuf> {
    std::env::var_os("ENGINECTL_VARIANT_ENGINE_PATH")
        .map(PathBuf::from)
        .or_else(get_engine_path)
}

/// Get the handshake timeout.
///
/// Priority:
/// 1. `ENGINECTL_HANDSHAKE_TIMEOUT_SECS` env variable if set (falls back to
///    the default if the value cannot be parsed as a `u64`)
/// 2. `10` seconds as fallback
pub fn get_handshake_timeout() -> Duration {
    let secs = std::env::var("ENGINECTL_HANDSHAKE_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

/// Get the engine memory budget in MB.
///
/// Priority:
/// 1. `ENGINECTL_MAX_MEMORY_MB` env variable if set (falls back to the
///    default if the value cannot be parsed as a `u32`)
/// 2. `256` MB as fallback
pub fn get_max_memory_mb() -> u32 {
    std::env::var("ENGINECTL_MAX_MEMORY_MB")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_MEMORY_MB)
}

/// Get the grace period added to a search budget while waiting for
/// `bestmove`. Not overridable via an environment variable.
pub fn get_search_grace() -> Duration {
    Duration::from_millis(DEFAULT_SEARCH_GRACE_MS)
}

/// Number of CPU cores reported to the adapter.
pub fn get_cpu_cores() -> usize {
    std::thread::available_parallelism()
        .map(usize::from)
        .unwrap_or(1)
}
