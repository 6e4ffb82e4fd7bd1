use crate::config::Configuration;
use crate::error::{Result, TreeplateError};
use crate::fs_utils::{ensure_parent_dir, mirror_path, normalize_path};
use crate::template::{Diagnostic, resolve_line};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use walkdir::WalkDir;

/// Where resolved content goes
pub enum Destination<'a> {
    /// Mirror the input tree beneath this output root
    Mirror(&'a Path),
    /// Write every file's content to one stream (dry run)
    Stream(&'a mut dyn Write),
}

/// Options for walking the input tree
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Paths relative to the input root matching this set are skipped
    pub exclude: Option<GlobSet>,
}

impl ProcessOptions {
    /// Builds options from exclusion glob patterns
    ///
    /// # Errors
    ///
    /// Returns `TreeplateError::Glob` if a pattern is invalid.
    pub fn with_exclude_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self::default());
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern.as_ref())?);
        }
        Ok(Self {
            exclude: Some(builder.build()?),
        })
    }

    fn is_excluded(&self, relative: &Path) -> bool {
        self.exclude
            .as_ref()
            .is_some_and(|set| set.is_match(relative))
    }
}

/// Counters for one processed file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStats {
    pub lines: usize,
    pub missing_keys: usize,
    pub malformed: usize,
}

/// Counters for a whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files: usize,
    pub directories: usize,
    pub skipped: usize,
    pub excluded: usize,
    pub lines: usize,
    pub missing_keys: usize,
    pub malformed: usize,
}

impl RunSummary {
    fn add_file(&mut self, stats: FileStats) {
        self.files += 1;
        self.lines += stats.lines;
        self.missing_keys += stats.missing_keys;
        self.malformed += stats.malformed;
    }
}

/// Walks `input_root` and resolves every regular file into `destination`.
///
/// Entries are visited depth-first, sorted by name. Directories, symlinks and
/// other non-regular entries are skipped. The first I/O or walk error aborts
/// the run; files already written stay in place.
///
/// # Errors
///
/// - `TreeplateError::InputDirNotFound` if `input_root` is not a directory.
/// - `TreeplateError::OutputIsInputDir` if the mirror root is the input root itself.
/// - `TreeplateError::WalkDir` on traversal failures.
/// - `TreeplateError::FileIo` / `TreeplateError::Io` on read, write or directory creation failures.
pub fn process_tree(
    input_root: &Path,
    mut destination: Destination<'_>,
    config: &Configuration,
    options: &ProcessOptions,
) -> Result<RunSummary> {
    if !input_root.is_dir() {
        return Err(TreeplateError::InputDirNotFound {
            path: input_root.to_path_buf(),
        });
    }

    // An output root nested in the input tree must not be walked into
    let nested_output = match &destination {
        Destination::Mirror(output_root) => {
            let input = normalize_path(input_root);
            let output = normalize_path(output_root);
            if output == input {
                return Err(TreeplateError::OutputIsInputDir { path: output });
            }
            output.starts_with(&input).then_some(output)
        }
        Destination::Stream(_) => None,
    };

    let mut summary = RunSummary::default();
    let mut walker = WalkDir::new(input_root).sort_by_file_name().into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type();
        tracing::trace!(path = %path.display(), "Visited item");

        if entry.depth() > 0 {
            if nested_output
                .as_deref()
                .is_some_and(|output| normalize_path(path).starts_with(output))
            {
                tracing::debug!(path = %path.display(), "Skipping output directory");
                if file_type.is_dir() {
                    walker.skip_current_dir();
                }
                summary.skipped += 1;
                continue;
            }

            let relative =
                path.strip_prefix(input_root)
                    .map_err(|_| TreeplateError::OutsideInputRoot {
                        path: path.to_path_buf(),
                    })?;
            if options.is_excluded(relative) {
                tracing::debug!(path = %path.display(), "Excluded");
                if file_type.is_dir() {
                    walker.skip_current_dir();
                }
                summary.excluded += 1;
                continue;
            }
        }

        if file_type.is_dir() {
            summary.directories += 1;
            continue;
        }
        if !file_type.is_file() {
            tracing::debug!(path = %path.display(), "Skipping non-regular entry");
            summary.skipped += 1;
            continue;
        }

        let stats = match &mut destination {
            Destination::Mirror(output_root) => write_mirrored(input_root, output_root, path, config)?,
            Destination::Stream(stream) => {
                tracing::debug!(path = %path.display(), "Resolving to stream");
                let stats = process_file(path, &mut **stream, config)?;
                stream.flush()?;
                stats
            }
        };
        summary.add_file(stats);
    }

    tracing::info!(
        files = summary.files,
        missing_keys = summary.missing_keys,
        malformed = summary.malformed,
        "Processing complete"
    );
    Ok(summary)
}

fn write_mirrored(
    input_root: &Path,
    output_root: &Path,
    input_path: &Path,
    config: &Configuration,
) -> Result<FileStats> {
    let output_path = mirror_path(input_root, output_root, input_path)?;
    tracing::debug!(
        input = %input_path.display(),
        output = %output_path.display(),
        "Resolving file"
    );

    ensure_parent_dir(&output_path)?;
    let file = File::create(&output_path).map_err(|e| TreeplateError::file_io(&output_path, e))?;
    let mut writer = BufWriter::new(file);

    let with_output_path = |err: TreeplateError| match err {
        TreeplateError::Io(source) => TreeplateError::file_io(&output_path, source),
        other => other,
    };
    let stats = process_file(input_path, &mut writer, config).map_err(with_output_path)?;
    writer
        .flush()
        .map_err(|e| TreeplateError::file_io(&output_path, e))?;

    Ok(stats)
}

/// Resolves `input_path` line by line into `writer`, terminating every line
/// with a single `\n`. Diagnostics are logged with the file and line number.
///
/// Lines that are not valid UTF-8 are copied through unchanged.
///
/// # Errors
///
/// - `TreeplateError::FileIo` if the input cannot be opened or read.
/// - `TreeplateError::Io` if writing fails.
pub fn process_file<W: Write + ?Sized>(
    input_path: &Path,
    writer: &mut W,
    config: &Configuration,
) -> Result<FileStats> {
    let file = File::open(input_path).map_err(|e| TreeplateError::file_io(input_path, e))?;
    let mut reader = BufReader::new(file);
    let mut stats = FileStats::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| TreeplateError::file_io(input_path, e))?;
        if read == 0 {
            break;
        }
        stats.lines += 1;

        let line = strip_line_ending(&buf);
        if let Ok(text) = std::str::from_utf8(line) {
            let resolved = resolve_line(text, config);
            for diagnostic in &resolved.diagnostics {
                report(input_path, stats.lines, text, diagnostic, &mut stats);
            }
            writer.write_all(resolved.text.as_bytes())?;
        } else {
            tracing::warn!(
                path = %input_path.display(),
                line = stats.lines,
                "Line is not valid UTF-8, copied unchanged"
            );
            writer.write_all(line)?;
        }
        writer.write_all(b"\n")?;
    }

    Ok(stats)
}

fn strip_line_ending(buf: &[u8]) -> &[u8] {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn report(path: &Path, line: usize, text: &str, diagnostic: &Diagnostic, stats: &mut FileStats) {
    match diagnostic {
        Diagnostic::MissingKey { key } => {
            stats.missing_keys += 1;
            tracing::error!(path = %path.display(), line, text, key = %key, "{diagnostic}");
        }
        Diagnostic::Malformed { column } => {
            stats.malformed += 1;
            tracing::warn!(path = %path.display(), line, text, column, "{diagnostic}");
        }
        Diagnostic::SubstitutionLimit { .. } => {
            tracing::warn!(path = %path.display(), line, text, "{diagnostic}");
        }
    }
}
