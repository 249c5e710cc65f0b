//! ipub-ast: pandoc document model and writers for ipubpandoc
//!
//! This crate provides:
//! - The pandoc JSON AST (API 1.17) with serde support
//! - Bottom-up traversal helpers used by the filters
//! - LaTeX, reStructuredText and HTML writers
//!
//! ## Example
//!
//! ```rust
//! use ipub_ast::{Block, Inline, OutputFormat, render_blocks};
//!
//! let blocks = vec![Block::para(vec![Inline::str("Hello"), Inline::Space, Inline::str("World")])];
//! assert_eq!(render_blocks(&blocks, OutputFormat::Html), "<p>Hello World</p>\n");
//! ```

pub mod ast;
pub mod json;
pub mod meta;
pub mod stringify;
pub mod walk;
pub mod writer;

pub use ast::{
    API_VERSION, Alignment, Attr, Block, Citation, CitationMode, Format, Inline, ListAttributes,
    ListNumberDelim, ListNumberStyle, MathType, Pandoc, QuoteType, Table, TableCell, Target,
};
pub use json::{AstError, AstResult, from_json_str, from_json_value, to_json_string};
pub use meta::{Meta, MetaValue};
pub use stringify::{stringify, stringify_blocks};
pub use walk::{Parent, walk_blocks_mut, walk_inlines_mut};
pub use writer::{
    OutputFormat, UnknownFormat, escape_html, render, render_blocks, render_inlines,
};
