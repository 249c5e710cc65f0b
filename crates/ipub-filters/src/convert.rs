//! Whole-document conversion
//!
//! Reads a document from markdown or pandoc JSON, runs a [`Pipeline`] over
//! it and renders the result. These are the entry points used by the batch
//! converter and the command line.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use ipub_ast::{OutputFormat, Pandoc, from_json_str, from_json_value, render};
use serde::{Deserialize, Serialize};

use crate::bibliography::Bibliography;
use crate::context::FilterContext;
use crate::definitions::BIBLIOGRAPHY_META_ROUTE;
use crate::error::Result;
use crate::options::OptionOverrides;
use crate::pipeline::Pipeline;

/// Format of textual input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    #[default]
    Markdown,
    Json,
}

impl InputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputFormat::Markdown => "markdown",
            InputFormat::Json => "json",
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(InputFormat::Markdown),
            "json" => Ok(InputFormat::Json),
            _ => Err(format!("Unknown input format: {s}")),
        }
    }
}

/// A document to filter
#[derive(Debug, Clone)]
pub enum Source<'a> {
    /// Markdown or JSON text, depending on the [`InputFormat`]
    Text(&'a str),
    /// Lines of text, joined with newlines
    Lines(&'a [String]),
    /// An already decoded pandoc JSON value
    Json(serde_json::Value),
    /// An already built document tree
    Tree(Pandoc),
}

impl<'a> From<&'a str> for Source<'a> {
    fn from(text: &'a str) -> Self {
        Source::Text(text)
    }
}

impl From<Pandoc> for Source<'_> {
    fn from(doc: Pandoc) -> Self {
        Source::Tree(doc)
    }
}

impl Source<'_> {
    /// Build the document tree
    ///
    /// # Errors
    ///
    /// Returns an error for invalid front matter or a malformed JSON
    /// document (including one missing `meta`, `blocks` or
    /// `pandoc-api-version`).
    pub fn read(self, in_format: InputFormat) -> Result<Pandoc> {
        let doc = match self {
            Source::Text(text) => read_text(text, in_format)?,
            Source::Lines(lines) => read_text(&lines.join("\n"), in_format)?,
            Source::Json(value) => from_json_value(value)?,
            Source::Tree(doc) => doc,
        };
        Ok(doc)
    }
}

fn read_text(text: &str, in_format: InputFormat) -> Result<Pandoc> {
    Ok(match in_format {
        InputFormat::Markdown => ipub_markdown::parse(text)?,
        InputFormat::Json => from_json_str(text)?,
    })
}

/// Caller supplied settings shared by every document of a run
#[derive(Debug, Clone, Default)]
pub struct FilterSettings {
    /// Option layers, highest precedence first; document metadata still wins
    pub layers: Vec<OptionOverrides>,
    pub bibliography: Option<Arc<Bibliography>>,
}

impl FilterSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layer(mut self, layer: OptionOverrides) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn with_bibliography(mut self, bibliography: Arc<Bibliography>) -> Self {
        self.bibliography = Some(bibliography);
        self
    }

    /// A fresh context for one document
    ///
    /// Without a caller supplied bibliography, HTML output reads the file
    /// named by the document's `ipub.bibliography` metadata, resolved
    /// against the working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if that file cannot be read or parsed.
    pub fn context(&self, doc: &Pandoc, format: OutputFormat) -> Result<FilterContext> {
        let ctx = FilterContext::for_document(doc, format, &self.layers);
        if let Some(bibliography) = &self.bibliography {
            return Ok(ctx.with_bibliography(Arc::clone(bibliography)));
        }
        if format == OutputFormat::Html
            && let Some(path) = doc.meta.get_path(BIBLIOGRAPHY_META_ROUTE).and_then(|v| v.as_string())
        {
            let bibliography = Bibliography::load(Path::new(&path))?;
            tracing::debug!(path = %path, entries = bibliography.len(), "Loaded bibliography from metadata");
            return Ok(ctx.with_bibliography(Arc::new(bibliography)));
        }
        Ok(ctx)
    }
}

/// Read a document and run the pipeline over it, returning the tree
pub fn filter_document(
    source: Source<'_>,
    in_format: InputFormat,
    pipeline: &Pipeline,
    format: OutputFormat,
    settings: &FilterSettings,
) -> Result<Pandoc> {
    let mut doc = source.read(in_format)?;
    let mut ctx = settings.context(&doc, format)?;
    pipeline.run(&mut doc, &mut ctx)?;
    if !ctx.collisions().is_empty() {
        tracing::debug!(labels = ?ctx.collisions(), "Document has duplicate labels");
    }
    Ok(doc)
}

/// Read a document, run the pipeline and render it to `out_format`
///
/// # Example
///
/// ```
/// use ipub_ast::OutputFormat;
/// use ipub_filters::{FilterSettings, InputFormat, Pipeline, Source, apply_filter};
///
/// let out = apply_filter(
///     Source::Text("See +@fig:a."),
///     &Pipeline::standard(),
///     OutputFormat::Latex,
///     InputFormat::Markdown,
///     &FilterSettings::new(),
/// )
/// .unwrap();
/// assert_eq!(out, "See \\cref{fig:a}.\n");
/// ```
pub fn apply_filter(
    source: Source<'_>,
    pipeline: &Pipeline,
    out_format: OutputFormat,
    in_format: InputFormat,
    settings: &FilterSettings,
) -> Result<String> {
    let doc = filter_document(source, in_format, pipeline, out_format, settings)?;
    Ok(render(&doc, out_format))
}

/// Options applied by [`jinja_filter`] unless the caller or the document
/// sets them
pub fn jinja_defaults() -> OptionOverrides {
    OptionOverrides {
        use_numref: Some(true),
        at_notation: Some(true),
        reftag: Some("cref".to_string()),
        ..Default::default()
    }
}

/// Filter a markdown fragment with the standard pipeline, for use from
/// templates. Leading and trailing blank lines are removed.
pub fn jinja_filter(source: &str, to_format: OutputFormat, options: &OptionOverrides) -> Result<String> {
    let settings = FilterSettings::new()
        .with_layer(options.clone())
        .with_layer(jinja_defaults());
    let out = apply_filter(
        Source::Text(source),
        &Pipeline::standard(),
        to_format,
        InputFormat::Markdown,
        &settings,
    )?;
    Ok(out.trim_matches('\n').to_string())
}
