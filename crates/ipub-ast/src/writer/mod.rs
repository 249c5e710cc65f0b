//! Document writers
//!
//! Turns a (filtered) document into LaTeX, reStructuredText or HTML. The
//! writers only know pandoc's node types; everything format specific that
//! the filters produce arrives here as raw content.

mod html;
mod latex;
mod rst;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ast::{Block, Inline, Pandoc};

pub use html::{HtmlWriter, escape_html};
pub use latex::LatexWriter;
pub use rst::RstWriter;

/// Target output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Latex,
    Rst,
    Html,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Latex => "latex",
            OutputFormat::Rst => "rst",
            OutputFormat::Html => "html",
        }
    }

    /// Conventional file extension for documents in this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Latex => "tex",
            OutputFormat::Rst => "rst",
            OutputFormat::Html => "html",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized format name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown output format: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "latex" | "tex" | "beamer" => Ok(OutputFormat::Latex),
            "rst" => Ok(OutputFormat::Rst),
            "html" | "html4" | "html5" => Ok(OutputFormat::Html),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// Render a whole document
pub fn render(doc: &Pandoc, format: OutputFormat) -> String {
    render_blocks(&doc.blocks, format)
}

/// Render a list of blocks; non-empty output always ends in a newline
pub fn render_blocks(blocks: &[Block], format: OutputFormat) -> String {
    let mut out = match format {
        OutputFormat::Latex => LatexWriter::new().write_document(blocks),
        OutputFormat::Rst => RstWriter::new().write_document(blocks),
        OutputFormat::Html => HtmlWriter::new().write_document(blocks),
    };
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Render inline content without any block wrapping
pub fn render_inlines(inlines: &[Inline], format: OutputFormat) -> String {
    match format {
        OutputFormat::Latex => LatexWriter::new().inlines(inlines),
        OutputFormat::Rst => RstWriter::new().inlines(inlines),
        OutputFormat::Html => HtmlWriter::new().inlines(inlines),
    }
}

/// Indent every non-empty line by `width` spaces
pub(crate) fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Join rendered blocks with blank lines, skipping blocks that render empty
pub(crate) fn join_blocks(parts: impl IntoIterator<Item = String>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Whether a paragraph is a single captioned image (an implicit figure)
pub(crate) fn sole_image(inlines: &[Inline]) -> Option<&Inline> {
    match inlines {
        [image @ Inline::Image(_, caption, _)] if !caption.is_empty() => Some(image),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!("tex".parse::<OutputFormat>(), Ok(OutputFormat::Latex));
        assert_eq!("HTML5".parse::<OutputFormat>(), Ok(OutputFormat::Html));
        assert_eq!("rst".parse::<OutputFormat>(), Ok(OutputFormat::Rst));
        assert!("docx".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_indent_skips_blank_lines() {
        assert_eq!(indent("a\n\nb", 3), "   a\n\n   b");
    }
}
