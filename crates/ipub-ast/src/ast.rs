//! Pandoc document model
//!
//! Mirrors the pandoc JSON API (1.17 series): every node serializes as
//! `{"t": "<Constructor>", "c": <contents>}` so documents round-trip through
//! `pandoc -t json` / `pandoc -f json` unchanged.

use serde::{Deserialize, Serialize};

use crate::meta::Meta;

/// API version stamped on every document this crate writes
pub const API_VERSION: [u32; 4] = [1, 17, 5, 4];

/// A complete pandoc document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pandoc {
    #[serde(rename = "pandoc-api-version")]
    pub api_version: Vec<u32>,
    pub meta: Meta,
    pub blocks: Vec<Block>,
}

impl Pandoc {
    pub fn new(meta: Meta, blocks: Vec<Block>) -> Self {
        Self {
            api_version: API_VERSION.to_vec(),
            meta,
            blocks,
        }
    }
}

/// Identifier, classes and key/value pairs attached to a node.
///
/// Serialized as pandoc's `[id, [classes], [[key, value]]]` triple.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "AttrRepr", into = "AttrRepr")]
pub struct Attr {
    pub identifier: String,
    pub classes: Vec<String>,
    pub attributes: Vec<(String, String)>,
}

type AttrRepr = (String, Vec<String>, Vec<(String, String)>);

impl From<AttrRepr> for Attr {
    fn from((identifier, classes, attributes): AttrRepr) -> Self {
        Self {
            identifier,
            classes,
            attributes,
        }
    }
}

impl From<Attr> for AttrRepr {
    fn from(attr: Attr) -> Self {
        (attr.identifier, attr.classes, attr.attributes)
    }
}

impl Attr {
    pub fn new(
        identifier: impl Into<String>,
        classes: Vec<String>,
        attributes: Vec<(String, String)>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            classes,
            attributes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.identifier.is_empty() && self.classes.is_empty() && self.attributes.is_empty()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Add a class unless it is already present
    pub fn add_class(&mut self, class: impl Into<String>) {
        let class = class.into();
        if !self.has_class(&class) {
            self.classes.push(class);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a key, replacing an existing value in place
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(k, _)| k == key)?;
        Some(self.attributes.remove(pos).1)
    }
}

/// Raw content format tag (`latex`, `tex`, `rst`, `html`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Format(pub String);

impl Format {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn latex() -> Self {
        Self::new("latex")
    }

    pub fn rst() -> Self {
        Self::new("rst")
    }

    pub fn html() -> Self {
        Self::new("html")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_latex(&self) -> bool {
        matches!(self.0.as_str(), "latex" | "tex")
    }

    pub fn is_html(&self) -> bool {
        matches!(self.0.as_str(), "html" | "html4" | "html5")
    }

    pub fn is_rst(&self) -> bool {
        self.0 == "rst"
    }
}

/// Link or image target: `(url, title)`
pub type Target = (String, String);

/// A table cell is a list of blocks
pub type TableCell = Vec<Block>;

/// Block-level nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "c")]
pub enum Block {
    Plain(Vec<Inline>),
    Para(Vec<Inline>),
    LineBlock(Vec<Vec<Inline>>),
    CodeBlock(Attr, String),
    RawBlock(Format, String),
    BlockQuote(Vec<Block>),
    OrderedList(ListAttributes, Vec<Vec<Block>>),
    BulletList(Vec<Vec<Block>>),
    DefinitionList(Vec<(Vec<Inline>, Vec<Vec<Block>>)>),
    Header(i32, Attr, Vec<Inline>),
    HorizontalRule,
    Table(Table),
    Div(Attr, Vec<Block>),
    Null,
}

/// Inline nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "c")]
pub enum Inline {
    Str(String),
    Emph(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikeout(Vec<Inline>),
    Superscript(Vec<Inline>),
    Subscript(Vec<Inline>),
    SmallCaps(Vec<Inline>),
    Quoted(QuoteType, Vec<Inline>),
    Cite(Vec<Citation>, Vec<Inline>),
    Code(Attr, String),
    Space,
    SoftBreak,
    LineBreak,
    Math(MathType, String),
    RawInline(Format, String),
    Link(Attr, Vec<Inline>, Target),
    Image(Attr, Vec<Inline>, Target),
    Note(Vec<Block>),
    Span(Attr, Vec<Inline>),
}

/// Simple (1.17-style) table.
///
/// Serialized as `[caption, aligns, widths, head, rows]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "TableRepr", into = "TableRepr")]
pub struct Table {
    pub caption: Vec<Inline>,
    pub aligns: Vec<Alignment>,
    /// Relative column widths; all zero when unspecified
    pub widths: Vec<f64>,
    pub head: Vec<TableCell>,
    pub rows: Vec<Vec<TableCell>>,
}

type TableRepr = (
    Vec<Inline>,
    Vec<Alignment>,
    Vec<f64>,
    Vec<TableCell>,
    Vec<Vec<TableCell>>,
);

impl From<TableRepr> for Table {
    fn from((caption, aligns, widths, head, rows): TableRepr) -> Self {
        Self {
            caption,
            aligns,
            widths,
            head,
            rows,
        }
    }
}

impl From<Table> for TableRepr {
    fn from(t: Table) -> Self {
        (t.caption, t.aligns, t.widths, t.head, t.rows)
    }
}

impl Table {
    /// Number of columns, taken from the widest of head and rows
    pub fn columns(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.head.len()))
            .chain(std::iter::once(self.aligns.len()))
            .max()
            .unwrap_or(0)
    }

    /// Whether explicit (non-zero) widths were given
    pub fn has_widths(&self) -> bool {
        self.widths.iter().any(|w| *w > 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", content = "c")]
pub enum Alignment {
    AlignLeft,
    AlignRight,
    AlignCenter,
    AlignDefault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", content = "c")]
pub enum MathType {
    DisplayMath,
    InlineMath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", content = "c")]
pub enum QuoteType {
    SingleQuote,
    DoubleQuote,
}

/// `(start, style, delimiter)`
pub type ListAttributes = (i32, ListNumberStyle, ListNumberDelim);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", content = "c")]
pub enum ListNumberStyle {
    DefaultStyle,
    Example,
    Decimal,
    LowerRoman,
    UpperRoman,
    LowerAlpha,
    UpperAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", content = "c")]
pub enum ListNumberDelim {
    DefaultDelim,
    Period,
    OneParen,
    TwoParens,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", content = "c")]
pub enum CitationMode {
    AuthorInText,
    SuppressAuthor,
    NormalCitation,
}

/// A single citation inside a `Cite` node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub citation_id: String,
    pub citation_prefix: Vec<Inline>,
    pub citation_suffix: Vec<Inline>,
    pub citation_mode: CitationMode,
    pub citation_note_num: i32,
    pub citation_hash: i32,
}

impl Citation {
    pub fn new(id: impl Into<String>, mode: CitationMode) -> Self {
        Self {
            citation_id: id.into(),
            citation_prefix: Vec::new(),
            citation_suffix: Vec::new(),
            citation_mode: mode,
            citation_note_num: 0,
            citation_hash: 0,
        }
    }
}

// Helper functions for creating nodes
impl Inline {
    pub fn str(s: impl Into<String>) -> Self {
        Inline::Str(s.into())
    }

    pub fn raw(format: Format, s: impl Into<String>) -> Self {
        Inline::RawInline(format, s.into())
    }

    pub fn span(attr: Attr, content: Vec<Inline>) -> Self {
        Inline::Span(attr, content)
    }

    pub fn inline_math(s: impl Into<String>) -> Self {
        Inline::Math(MathType::InlineMath, s.into())
    }

    pub fn display_math(s: impl Into<String>) -> Self {
        Inline::Math(MathType::DisplayMath, s.into())
    }

    pub fn is_space(&self) -> bool {
        matches!(self, Inline::Space | Inline::SoftBreak | Inline::LineBreak)
    }

    /// Text of a `Str`, if this is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Inline::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl Block {
    pub fn para(content: Vec<Inline>) -> Self {
        Block::Para(content)
    }

    pub fn raw(format: Format, s: impl Into<String>) -> Self {
        Block::RawBlock(format, s.into())
    }

    pub fn div(attr: Attr, content: Vec<Block>) -> Self {
        Block::Div(attr, content)
    }

    /// Inline content of a paragraph-like block
    pub fn inlines(&self) -> Option<&[Inline]> {
        match self {
            Block::Para(c) | Block::Plain(c) => Some(c),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_set_replaces_in_place() {
        let mut attr = Attr::new(
            "x",
            vec![],
            vec![("a".into(), "1".into()), ("b".into(), "2".into())],
        );
        attr.set("a", "3");
        assert_eq!(attr.get("a"), Some("3"));
        assert_eq!(attr.attributes[0].0, "a");
        attr.set("c", "4");
        assert_eq!(attr.attributes.len(), 3);
        assert_eq!(attr.remove("b"), Some("2".to_string()));
        assert_eq!(attr.get("b"), None);
    }

    #[test]
    fn test_add_class_dedups() {
        let mut attr = Attr::default();
        attr.add_class("a");
        attr.add_class("a");
        assert_eq!(attr.classes, vec!["a".to_string()]);
        assert!(attr.has_class("a"));
    }

    #[test]
    fn test_format_aliases() {
        assert!(Format::new("tex").is_latex());
        assert!(Format::new("html5").is_html());
        assert!(!Format::rst().is_latex());
    }

    #[test]
    fn test_table_columns() {
        let table = Table {
            head: vec![vec![], vec![]],
            rows: vec![vec![vec![], vec![], vec![]]],
            ..Default::default()
        };
        assert_eq!(table.columns(), 3);
        assert!(!table.has_widths());
    }
}
