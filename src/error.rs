use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for setup, diagnostics and reporting.
///
/// The stepping loop itself never fails: numerical edge cases inside a
/// collision are counted, not raised. Everything here is detected either
/// before the first step or while post-processing samples.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration or API parameter.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// Non-finite or otherwise unusable numerical result.
    #[error("numerical error: {0}")]
    MathError(String),

    /// A statistic was requested over too few (or degenerate) samples.
    #[error("insufficient samples: {0}")]
    InsufficientSamples(String),

    /// Malformed configuration document.
    #[error(transparent)]
    Config(#[from] serde_json::Error),

    /// Propagated I/O errors (config files, CSV export).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
