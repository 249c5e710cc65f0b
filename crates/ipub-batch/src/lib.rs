//! ipub-batch: directory conversion for ipubpandoc
//!
//! Converts every markdown file of a directory in parallel. Each document is
//! filtered with its own context, so labels and counters never leak between
//! files, and a document that fails to convert does not stop the others.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ipub_ast::{OutputFormat, render, to_json_string};
use ipub_filters::{FilterSettings, InputFormat, Pipeline, Source, filter_document};
use rayon::prelude::*;

/// Errors that stop a batch before any document is converted
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),
}

/// Result type for batch operations
pub type Result<T> = std::result::Result<T, BatchError>;

/// Options for directory conversion
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Output directory for converted files
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    /// Write the filtered document as pandoc JSON instead of rendering it
    pub json: bool,
    /// Descend into subdirectories, mirroring them in the output
    pub recursive: bool,
    /// Number of parallel jobs (None = use all CPUs)
    pub parallel_jobs: Option<usize>,
    pub settings: FilterSettings,
    pub pipeline: Arc<Pipeline>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            format: OutputFormat::Latex,
            json: false,
            recursive: false,
            parallel_jobs: None,
            settings: FilterSettings::default(),
            pipeline: Arc::new(Pipeline::standard()),
        }
    }
}

impl BatchOptions {
    /// Extension of the files written
    pub fn extension(&self) -> &'static str {
        if self.json {
            "json"
        } else {
            self.format.extension()
        }
    }
}

/// Outcome of a directory conversion
#[derive(Debug, Default)]
pub struct BatchResult {
    /// Output files that were written
    pub converted: Vec<PathBuf>,
    /// Input files that failed, with their errors
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Convert all `.md` files under `input`
///
/// # Errors
///
/// Fails only if the input directory cannot be read or the output directory
/// cannot be created; per-document failures are reported in
/// [`BatchResult::failed`].
pub fn convert_directory(input: &Path, options: &BatchOptions) -> Result<BatchResult> {
    if !input.is_dir() {
        return Err(BatchError::DirectoryNotFound(input.to_path_buf()));
    }
    let mut files = collect_markdown_files(input, options.recursive)?;
    files.sort();

    if let Some(n) = options.parallel_jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .ok();
    }

    fs::create_dir_all(&options.output_dir)?;
    tracing::debug!(files = files.len(), input = %input.display(), "Converting directory");

    let outcomes: Vec<_> = files
        .par_iter()
        .map(|file| (file, convert_file(file, input, options)))
        .collect();

    let mut result = BatchResult::default();
    for (file, outcome) in outcomes {
        match outcome {
            Ok(output) => result.converted.push(output),
            Err(message) => {
                tracing::warn!(file = %file.display(), %message, "Conversion failed");
                result.failed.push((file.clone(), message));
            }
        }
    }
    Ok(result)
}

/// Convert one document to a string in the requested output
pub fn convert_source(text: &str, options: &BatchOptions) -> std::result::Result<String, String> {
    let doc = filter_document(
        Source::Text(text),
        InputFormat::Markdown,
        &options.pipeline,
        options.format,
        &options.settings,
    )
    .map_err(|e| e.to_string())?;
    if options.json {
        to_json_string(&doc).map_err(|e| e.to_string())
    } else {
        Ok(render(&doc, options.format))
    }
}

fn convert_file(file: &Path, root: &Path, options: &BatchOptions) -> std::result::Result<PathBuf, String> {
    let text = fs::read_to_string(file).map_err(|e| e.to_string())?;
    let out = convert_source(&text, options)?;

    let relative = file.strip_prefix(root).unwrap_or(file);
    let output_path = options
        .output_dir
        .join(relative)
        .with_extension(options.extension());
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    fs::write(&output_path, out).map_err(|e| e.to_string())?;
    Ok(output_path)
}

/// Collect all .md files in a directory
fn collect_markdown_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            if let Some(ext) = path.extension()
                && ext.eq_ignore_ascii_case("md")
            {
                files.push(path);
            }
        } else if path.is_dir() && recursive {
            files.extend(collect_markdown_files(&path, recursive)?);
        }
    }

    Ok(files)
}
