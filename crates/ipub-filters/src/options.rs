//! Filter options
//!
//! Options are read from the `ipub.pandoc` metadata namespace. Values set in
//! the document win over caller supplied layers, which win over defaults.

use ipub_ast::{Meta, MetaValue};
use serde::{Deserialize, Serialize};

use crate::definitions::IPUB_META_ROUTE;

/// Resolved options for one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    /// Run the filters at all
    pub apply_filters: bool,
    /// Convert raw LaTeX/RST/HTML markup into format agnostic containers
    pub convert_raw: bool,
    /// Drop raw content written for a different format than the target
    pub hide_raw: bool,
    /// Use `:numref:` in RST rather than downgrading to `:ref:`
    pub use_numref: bool,
    /// Interpret `@label` prefixes and attribute blocks
    pub at_notation: bool,
    /// LaTeX command for internal markdown links (`[text](#label)`)
    pub reftag: String,
    /// Remove all metadata from the output document
    pub strip_meta: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            apply_filters: true,
            convert_raw: true,
            hide_raw: false,
            use_numref: false,
            at_notation: true,
            reftag: "cref".to_string(),
            strip_meta: false,
        }
    }
}

/// A partial set of options; unset fields defer to lower layers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionOverrides {
    pub apply_filters: Option<bool>,
    pub convert_raw: Option<bool>,
    pub hide_raw: Option<bool>,
    pub use_numref: Option<bool>,
    pub at_notation: Option<bool>,
    pub reftag: Option<String>,
    pub strip_meta: Option<bool>,
}

impl OptionOverrides {
    /// Read the options set under `ipub.pandoc` in document metadata
    pub fn from_meta(meta: &Meta) -> Self {
        let get = |key: &str| meta.get_path(&format!("{IPUB_META_ROUTE}.{key}"));
        let flag = |key: &str| get(key).and_then(MetaValue::as_bool);
        Self {
            apply_filters: flag("apply_filters"),
            convert_raw: flag("convert_raw"),
            hide_raw: flag("hide_raw"),
            use_numref: flag("use_numref"),
            at_notation: flag("at_notation"),
            reftag: get("reftag")
                .and_then(MetaValue::as_string)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            strip_meta: flag("strip_meta"),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the fields that are set on top of `options`
    pub fn apply_to(&self, options: &mut FilterOptions) {
        if let Some(v) = self.apply_filters {
            options.apply_filters = v;
        }
        if let Some(v) = self.convert_raw {
            options.convert_raw = v;
        }
        if let Some(v) = self.hide_raw {
            options.hide_raw = v;
        }
        if let Some(v) = self.use_numref {
            options.use_numref = v;
        }
        if let Some(v) = self.at_notation {
            options.at_notation = v;
        }
        if let Some(v) = &self.reftag {
            options.reftag = v.clone();
        }
        if let Some(v) = self.strip_meta {
            options.strip_meta = v;
        }
    }
}

impl FilterOptions {
    /// Resolve options for a document.
    ///
    /// `layers` are ordered from highest to lowest precedence; document
    /// metadata always takes precedence over all of them.
    pub fn resolve(meta: &Meta, layers: &[OptionOverrides]) -> Self {
        let mut options = FilterOptions::default();
        for layer in layers.iter().rev() {
            layer.apply_to(&mut options);
        }
        OptionOverrides::from_meta(meta).apply_to(&mut options);
        options
    }
}
