//! Class names, metadata keys and reference prefixes shared by the passes

use std::fmt;

/// Metadata namespace holding the filter options
pub const IPUB_META_ROUTE: &str = "ipub.pandoc";

/// Metadata naming a bibliography file for HTML citations
pub const BIBLIOGRAPHY_META_ROUTE: &str = "ipub.bibliography";

/// Metadata key of the label table
pub const REFERENCES_KEY: &str = "$$references";

/// Span wrapping a citation that carries a prefix, classes or attributes
pub const ATTRIBUTE_CITE_CLASS: &str = "attribute-Cite";

/// Inline container created from raw markup
pub const RAW_SPAN_CLASS: &str = "raw-span-content";
/// Block container created from raw markup
pub const RAW_DIV_CLASS: &str = "raw-div-content";
/// Raw markup that was a reference (`\cref{..}`, `:ref:`, `<cite>`, `[..](#..)`)
pub const CONVERTED_CITE_CLASS: &str = "converted-Cite";
/// Raw markup kept for passthrough rendering
pub const CONVERTED_OTHER_CLASS: &str = "converted-Other";
/// Raw output that has to stand as its own block
pub const BLOCK_RAW_CLASS: &str = "raw-block-output";
/// An RST directive and its body
pub const CONVERTED_DIRECTIVE_CLASS: &str = "converted-rst-dir";

pub const LABELLED_MATH_CLASS: &str = "labelled-Math";
pub const LABELLED_IMAGE_CLASS: &str = "labelled-Image";
pub const LABELLED_TABLE_CLASS: &str = "labelled-Table";

/// Capitalise the HTML reference name (`Fig.` rather than `fig.`)
pub const CAPITAL_CLASS: &str = "capital";

/// Characters recognized as citation prefixes directly before `@label`
pub const PREFIX_MARKERS: [char; 7] = ['+', '?', '^', '!', '=', '&', '%'];

/// Kind of labelled element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RefType {
    Math,
    Image,
    Table,
}

impl RefType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefType::Math => "Math",
            RefType::Image => "Image",
            RefType::Table => "Table",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Math" => Some(RefType::Math),
            "Image" => Some(RefType::Image),
            "Table" => Some(RefType::Table),
            _ => None,
        }
    }

    /// Name used before the number in HTML references
    pub fn html_name(&self) -> &'static str {
        match self {
            RefType::Math => "eqn.",
            RefType::Image => "fig.",
            RefType::Table => "tbl.",
        }
    }

    /// Class of the container wrapping an element of this type
    pub fn labelled_class(&self) -> &'static str {
        match self {
            RefType::Math => LABELLED_MATH_CLASS,
            RefType::Image => LABELLED_IMAGE_CLASS,
            RefType::Table => LABELLED_TABLE_CLASS,
        }
    }
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference style selected by a citation prefix.
///
/// | marker | LaTeX   | RST      |
/// |--------|---------|----------|
/// | (none) | `cite`  | `cite`   |
/// | `+`    | `cref`  | `numref` |
/// | `?` `^`| `Cref`  | `numref` |
/// | `!`    | `ref`   | `ref`    |
/// | `=`    | `eqref` | `eq`     |
/// | `&`    | `gls`   | `gls`    |
/// | `%`    | `Gls`   | `glsc`   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefPrefix {
    Cite,
    Cref,
    CrefCapital,
    Ref,
    Eqref,
    Gls,
    GlsCapital,
}

impl RefPrefix {
    /// Parse a prefix marker; the empty string is a plain citation
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "" => Some(RefPrefix::Cite),
            "+" => Some(RefPrefix::Cref),
            "?" | "^" => Some(RefPrefix::CrefCapital),
            "!" => Some(RefPrefix::Ref),
            "=" => Some(RefPrefix::Eqref),
            "&" => Some(RefPrefix::Gls),
            "%" => Some(RefPrefix::GlsCapital),
            _ => None,
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            RefPrefix::Cite => "",
            RefPrefix::Cref => "+",
            RefPrefix::CrefCapital => "?",
            RefPrefix::Ref => "!",
            RefPrefix::Eqref => "=",
            RefPrefix::Gls => "&",
            RefPrefix::GlsCapital => "%",
        }
    }

    pub fn latex_command(&self) -> &'static str {
        match self {
            RefPrefix::Cite => "cite",
            RefPrefix::Cref => "cref",
            RefPrefix::CrefCapital => "Cref",
            RefPrefix::Ref => "ref",
            RefPrefix::Eqref => "eqref",
            RefPrefix::Gls => "gls",
            RefPrefix::GlsCapital => "Gls",
        }
    }

    pub fn rst_role(&self) -> &'static str {
        match self {
            RefPrefix::Cite => "cite",
            RefPrefix::Cref | RefPrefix::CrefCapital => "numref",
            RefPrefix::Ref => "ref",
            RefPrefix::Eqref => "eq",
            RefPrefix::Gls => "gls",
            RefPrefix::GlsCapital => "glsc",
        }
    }

    /// Reverse lookup of a LaTeX reference command
    pub fn from_latex(tag: &str) -> Option<Self> {
        match tag {
            "cite" => Some(RefPrefix::Cite),
            "cref" => Some(RefPrefix::Cref),
            "Cref" => Some(RefPrefix::CrefCapital),
            "ref" => Some(RefPrefix::Ref),
            "eqref" => Some(RefPrefix::Eqref),
            "gls" => Some(RefPrefix::Gls),
            "Gls" => Some(RefPrefix::GlsCapital),
            _ => None,
        }
    }

    /// Reverse lookup of an RST cross-reference role
    pub fn from_rst(role: &str) -> Option<Self> {
        match role {
            "cite" => Some(RefPrefix::Cite),
            "numref" => Some(RefPrefix::Cref),
            "ref" => Some(RefPrefix::Ref),
            "eq" => Some(RefPrefix::Eqref),
            "gls" => Some(RefPrefix::Gls),
            "glsc" => Some(RefPrefix::GlsCapital),
            _ => None,
        }
    }
}

/// RST roles converted to generic raw containers
pub const RST_KNOWN_ROLES: [&str; 5] = ["py:attr", "py:meth", "py:class", "py:func", "py:mod"];
