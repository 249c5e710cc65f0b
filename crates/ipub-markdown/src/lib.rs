//! ipub-markdown: markdown reader for ipubpandoc
//!
//! This crate provides:
//! - A line lexer classifying block constructs
//! - A recursive descent block parser
//! - An inline parser following pandoc's tokenization (citations, raw TeX,
//!   HTML tags, math)
//! - YAML front matter as document metadata
//!
//! # Example
//!
//! ```
//! use ipub_markdown::parse;
//!
//! let doc = parse("---\ntitle: Example\n---\n\nSee +@fig:one.\n").unwrap();
//! assert!(doc.meta.get("title").is_some());
//! assert_eq!(doc.blocks.len(), 1);
//! ```

pub mod front_matter;
pub mod inline;
pub mod lexer;
pub mod parser;

pub use inline::{parse_attributes, parse_inlines};
pub use lexer::{Line, LineKind, tokenize};
pub use parser::{ParseError, ParseResult, Parser, parse, parse_blocks};
