//! Filter errors

use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::Stage;

/// Errors that abort filtering of a document
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Pass '{pass}' ({stage}) cannot run after the {after} stage")]
    PassOrder {
        pass: String,
        stage: Stage,
        after: Stage,
    },

    #[error("Table '{label}': {message}")]
    TableFormat { label: String, message: String },

    #[error("Could not convert '{value}': {message}")]
    Units { value: String, message: String },

    #[error("Markdown error: {0}")]
    Markdown(#[from] ipub_markdown::ParseError),

    #[error("Document error: {0}")]
    Ast(#[from] ipub_ast::AstError),

    #[error("Could not read bibliography {}: {source}", path.display())]
    BibliographyIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid bibliography: {0}")]
    BibliographyJson(#[from] serde_json::Error),

    #[error("Invalid BibTeX bibliography: {0}")]
    BibliographyBibtex(String),
}

/// Result type for filter operations
pub type Result<T> = std::result::Result<T, FilterError>;
