use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for treeplate operations
#[derive(Error, Debug)]
pub enum TreeplateError {
    /// IO error when reading or writing a stream
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// IO error tied to a specific file or directory
    #[error("IO error on {path}: {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The mandatory base properties file is missing
    #[error("Base configuration file not found: {path}")]
    BaseConfigNotFound { path: PathBuf },

    /// The input root does not exist or is not a directory
    #[error("Input directory not found: {path}")]
    InputDirNotFound { path: PathBuf },

    /// Rendering into the input root would overwrite the templates
    #[error("Output directory is the input directory: {path}")]
    OutputIsInputDir { path: PathBuf },

    /// A walked entry does not live beneath the input root
    #[error("Path is outside the input directory: {path}")]
    OutsideInputRoot { path: PathBuf },

    /// `WalkDir` error when traversing the input tree
    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Invalid exclusion pattern
    #[error("Glob error: {0}")]
    Glob(#[from] globset::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TreeplateError {
    /// Wraps an IO error with the path it happened on
    pub fn file_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileIo {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TreeplateError>;
