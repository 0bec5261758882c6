//! Centralized constants for naming patterns and limits.

/// Default ceiling for a single uploaded file (10 MB).
pub const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;

/// Default name pattern: second-resolution timestamp (YYYYMMDDHHMMSS).
pub const DEFAULT_NAME_PATTERN: &str = "%Y%m%d%H%M%S";

/// Amount of form content kept in memory before spilling to disk (32 MB).
pub const DEFAULT_MAX_MEMORY: u64 = 32 << 20;

/// Permission mode for a root directory created on demand.
#[cfg(unix)]
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "warn,upload_stamp=info";

/// Form field used by the command line front end.
pub const DEFAULT_FIELD: &str = "file";
