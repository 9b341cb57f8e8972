use thiserror::Error;

#[derive(Error, Debug)]
pub enum PkgDiffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid report type: {0}. Valid types are 'simple' and 'unified'")]
    InvalidReportMode(String),

    #[error("Acquisition failed: {0}")]
    Acquisition(String),

    #[error("Package not installed: {0}")]
    Resolve(String),

    #[error("Path error: {0}")]
    Path(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, PkgDiffError>;
