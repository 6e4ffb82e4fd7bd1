//! # treeplate
//!
//! Directory-scoped text templating. Key/value pairs are loaded from a base
//! `config.properties` file and optional `config-<profile>.properties`
//! overlays, then every file under an input directory is copied to a mirrored
//! output directory with its `{{ key }}` placeholders replaced.
//!
//! ## Usage
//!
//! ### As a Library
//!
//! ```no_run
//! use std::path::Path;
//! use treeplate::Settings;
//!
//! let mut settings = Settings::from_root(
//!     Path::new("/workspace"),
//!     Path::new("config"),
//!     Path::new("input"),
//!     Path::new("output"),
//! );
//! settings.profiles = vec!["dev".to_string()];
//!
//! match treeplate::run(&settings) {
//!     Ok(summary) => println!("{} files written", summary.files),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```
//!
//! ### As a CLI Tool
//!
//! ```bash
//! # Render /workspace/input into /workspace/output
//! treeplate --rootdir /workspace --profiles dev,local
//!
//! # Print the rendered files instead of writing them
//! treeplate --rootdir /workspace --dryrun
//! ```

pub mod config;
pub mod error;
pub mod fs_utils;
pub mod processor;
pub mod template;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

// Re-export main types and functions for convenience
pub use config::{Configuration, load_configuration};
pub use error::{Result, TreeplateError};
pub use processor::{Destination, ProcessOptions, RunSummary, process_file, process_tree};
pub use template::{Diagnostic, ResolvedLine, resolve_line};

/// Everything a run needs, with directories already resolved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Directory holding `config.properties` and the profile overlays
    pub config_dir: PathBuf,
    /// Root of the tree to render
    pub input_dir: PathBuf,
    /// Root of the mirrored output tree
    pub output_dir: PathBuf,
    /// Overlay profiles, later entries win
    pub profiles: Vec<String>,
    /// Send rendered content to stdout instead of `output_dir`
    pub dry_run: bool,
    /// Glob patterns, relative to `input_dir`, of entries to leave out
    pub exclude: Vec<String>,
}

impl Settings {
    /// Resolves the three directories relative to `root_dir`
    #[must_use]
    pub fn from_root(root_dir: &Path, config_dir: &Path, input_dir: &Path, output_dir: &Path) -> Self {
        Self {
            config_dir: fs_utils::resolve_subdir(root_dir, config_dir),
            input_dir: fs_utils::resolve_subdir(root_dir, input_dir),
            output_dir: fs_utils::resolve_subdir(root_dir, output_dir),
            ..Self::default()
        }
    }
}

/// Loads the configuration and renders the input tree, using stdout for dry runs
///
/// # Errors
///
/// See [`run_with_stream`].
pub fn run(settings: &Settings) -> Result<RunSummary> {
    let stdout = io::stdout();
    let mut stream = io::BufWriter::new(stdout.lock());
    run_with_stream(settings, &mut stream)
}

/// Loads the configuration and renders the input tree; dry runs write to `stream`
///
/// # Errors
///
/// - `TreeplateError::BaseConfigNotFound` if the base properties file is missing.
/// - `TreeplateError::Glob` if an exclusion pattern is invalid.
/// - Any error from [`process_tree`].
pub fn run_with_stream<W: Write>(settings: &Settings, stream: &mut W) -> Result<RunSummary> {
    let configuration = load_configuration(&settings.config_dir, &settings.profiles)?;
    tracing::info!(
        entries = configuration.len(),
        profiles = ?settings.profiles,
        "Configuration merged"
    );

    let options = ProcessOptions::with_exclude_patterns(&settings.exclude)?;
    let destination = if settings.dry_run {
        Destination::Stream(stream)
    } else {
        Destination::Mirror(&settings.output_dir)
    };

    process_tree(&settings.input_dir, destination, &configuration, &options)
}
