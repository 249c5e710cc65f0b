//! ipub-filters: citation, label and raw markup filters for ipubpandoc
//!
//! This crate provides:
//! - Extraction passes that turn `@label` notation, `{#label}` attribute
//!   blocks and raw LaTeX/RST/HTML fragments into tagged containers
//! - Rendering passes that write those containers for LaTeX, RST or HTML
//! - The [`Pipeline`] driving the passes over one document with its own
//!   [`FilterContext`]
//! - String level conveniences ([`apply_filter`], [`jinja_filter`])
//!
//! ## Example
//!
//! ```rust
//! use ipub_ast::OutputFormat;
//! use ipub_filters::{OptionOverrides, jinja_filter};
//!
//! let md = "$$a=b$$ {#eq:ab}\n\nSee =@eq:ab and @smith2020.\n";
//! let out = jinja_filter(md, OutputFormat::Latex, &OptionOverrides::default()).unwrap();
//! assert!(out.contains(r"\label{eq:ab}"));
//! assert!(out.contains(r"See \eqref{eq:ab} and \cite{smith2020}."));
//! ```

pub mod attributes;
pub mod bibliography;
pub mod context;
pub mod convert;
pub mod definitions;
pub mod error;
pub mod format_cites;
pub mod format_labels;
pub mod format_raw;
pub mod options;
pub mod pipeline;
pub mod prepare_cites;
pub mod prepare_labels;
pub mod prepare_raw;
pub mod render;
pub mod units;

pub use bibliography::{BibEntry, Bibliography};
pub use context::{FilterContext, Reference};
pub use convert::{
    FilterSettings, InputFormat, Source, apply_filter, filter_document, jinja_defaults,
    jinja_filter,
};
pub use definitions::{RefPrefix, RefType};
pub use error::{FilterError, Result};
pub use format_cites::{FormatCites, strip_cite_spans};
pub use format_labels::{FormatLabels, strip_labelled_spans};
pub use format_raw::FormatRaw;
pub use options::{FilterOptions, OptionOverrides};
pub use pipeline::{Pass, Pipeline, Stage};
pub use prepare_cites::PrepareCites;
pub use prepare_labels::PrepareLabels;
pub use prepare_raw::PrepareRaw;
