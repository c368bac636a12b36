use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all pcs operations.
#[derive(Debug, Error, Diagnostic)]
pub enum PcsError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `package.json` or `package-lock.json` is missing or malformed.
    #[error("Lockfile error: {message}")]
    #[diagnostic(help("Run `npm install` to regenerate package-lock.json"))]
    Lockfile { message: String },

    /// Invalid configuration file or option.
    #[error("Config error: {message}")]
    #[diagnostic(help("Check ~/.pcs/config.toml for syntax errors"))]
    Config { message: String },

    /// A version string that is not a valid semantic version.
    #[error("Semantic version parse error: {name}@{version}: {message}")]
    InvalidVersion {
        name: String,
        version: String,
        message: String,
    },

    /// A dependency range that cannot be parsed.
    #[error("Invalid version range `{range}`: {message}")]
    InvalidRange { range: String, message: String },

    /// The registry does not know this package.
    #[error("Package `{name}` not found in registry")]
    PackageNotFound { name: String },

    /// Registry metadata lacks a version that was declared or selected.
    #[error("Version {version} of `{name}` not found in registry metadata")]
    VersionNotFound { name: String, version: String },

    /// Network request failed (timeout, rate limit, server error).
    #[error("Network error: {message}")]
    Network { message: String },

    /// A conflict could not be processed (unresolvable dependency subtree).
    #[error("Conflict resolution failed: {message}")]
    Resolution { message: String },

    /// The SAT engine reported an internal failure.
    #[error("SAT solver error: {message}")]
    Solver { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

impl PcsError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, PcsError::Network { .. })
    }
}

/// Convenience alias for results carrying a [`PcsError`].
pub type PcsResult<T> = Result<T, PcsError>;
