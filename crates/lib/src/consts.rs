/// Application name, used in log targets and the user agent.
pub const APP_NAME: &str = "mbuild";

/// Default directory for built binaries and archives.
pub const DEFAULT_OUT_DIR: &str = "out";

/// Default number of concurrent build workers.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Companion file added to every archive when it exists.
pub const DEFAULT_README: &str = "README.md";

/// Number of hex characters in a short commit hash.
pub const SHORT_SHA_LEN: usize = 7;
