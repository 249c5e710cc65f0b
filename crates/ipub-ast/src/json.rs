//! Reading and writing pandoc JSON

use serde_json::Value;
use thiserror::Error;

use crate::ast::{API_VERSION, Pandoc};

/// Errors raised while decoding a pandoc JSON document
#[derive(Debug, Error)]
pub enum AstError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document is missing required key '{0}'")]
    MissingKey(&'static str),

    #[error("Document root must be a JSON object")]
    NotAnObject,
}

pub type AstResult<T> = Result<T, AstError>;

const REQUIRED_KEYS: [&str; 3] = ["meta", "blocks", "pandoc-api-version"];

/// Parse a pandoc JSON document.
///
/// The version array is checked for presence only and is re-stamped with
/// [`API_VERSION`]; nodes from later API versions that this model does not
/// know about are rejected by the decoder.
pub fn from_json_str(input: &str) -> AstResult<Pandoc> {
    let value: Value = serde_json::from_str(input)?;
    from_json_value(value)
}

pub fn from_json_value(mut value: Value) -> AstResult<Pandoc> {
    let object = value.as_object_mut().ok_or(AstError::NotAnObject)?;
    for key in REQUIRED_KEYS {
        if !object.contains_key(key) {
            return Err(AstError::MissingKey(key));
        }
    }
    object.insert(
        "pandoc-api-version".to_string(),
        Value::from(API_VERSION.to_vec()),
    );
    Ok(serde_json::from_value(value)?)
}

/// Serialize a document, always stamped with [`API_VERSION`]
pub fn to_json_string(doc: &Pandoc) -> AstResult<String> {
    if doc.api_version == API_VERSION {
        return Ok(serde_json::to_string(doc)?);
    }
    let mut doc = doc.clone();
    doc.api_version = API_VERSION.to_vec();
    Ok(serde_json::to_string(&doc)?)
}
