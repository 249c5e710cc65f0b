//! Attribute blocks written as plain text next to an element
//!
//! Pandoc only parses `{#id .class key=value}` after a few constructs. After
//! math, citations and table captions the block arrives as ordinary `Str`
//! and `Space` tokens, which are found and read here.
//!
//! Parsing is regex based: nested braces and escaped quotes are not
//! supported.

use std::ops::Range;
use std::sync::LazyLock;

use ipub_ast::{Inline, stringify};
use regex::Regex;

static CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)\.([\-_a-zA-Z]+)").unwrap());

static KEY_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|\s)([\-_a-zA-Z]+)\s*=\s*("[^"]*"|'[^']*'|[^\s"']+)"#).unwrap()
});

/// `{` + optional `#id` + the rest up to the first `}`
static BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{(#[^\s\}]+|)([^\}]*)\}").unwrap());

/// A `Str` opening a block that is closed in the same token
static OPEN_CLOSED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\{[^\}]*\}").unwrap());

/// A `Str` closing a block opened in an earlier token
static CLOSING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^\{]*\}").unwrap());

/// Parse `.class-one .class-two key1=val1 key2="quoted value"`
pub fn parse_attribute_str(text: &str) -> (Vec<String>, Vec<(String, String)>) {
    let classes = CLASS_RE
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect();
    let mut attributes: Vec<(String, String)> = Vec::new();
    for caps in KEY_VALUE_RE.captures_iter(text) {
        let key = caps[1].to_string();
        let value = strip_quotes(&caps[2]).to_string();
        match attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => attributes.push((key, value)),
        }
    }
    (classes, attributes)
}

fn strip_quotes(s: &str) -> &str {
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// An attribute block found among sibling inlines
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeBlock {
    /// Label (without `#`); empty when the block has none
    pub id: String,
    pub classes: Vec<String>,
    pub attributes: Vec<(String, String)>,
    /// Sibling indices the block was read from, including skipped spaces
    pub consumed: Range<usize>,
    /// Text following the closing brace in the last consumed token
    pub remainder: Option<String>,
}

impl AttributeBlock {
    /// Read a block from its text form (`{#id .a k=v}trailing`)
    pub fn parse(text: &str, consumed: Range<usize>) -> Option<Self> {
        let caps = BLOCK_RE.captures(text)?;
        let whole = caps.get(0)?;
        let (classes, attributes) = parse_attribute_str(&caps[2]);
        let remainder = &text[whole.end()..];
        Some(Self {
            id: caps[1].trim_start_matches('#').to_string(),
            classes,
            attributes,
            consumed,
            remainder: (!remainder.is_empty()).then(|| remainder.to_string()),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty() && self.classes.is_empty() && self.attributes.is_empty()
    }
}

/// Find an attribute block starting at `items[start]`.
///
/// Leading spaces are skipped. The first text token must open the block
/// (`{#` when `require_id` is set); if it does not also close it, any tokens
/// up to the first `Str` holding a closing brace are taken in.
pub fn scan_right(items: &[Inline], start: usize, require_id: bool) -> Option<AttributeBlock> {
    let mut idx = start;
    while items.get(idx).is_some_and(Inline::is_space) {
        idx += 1;
    }
    let opening = items.get(idx)?.as_str()?;
    let opens = if require_id {
        opening.starts_with("{#")
    } else {
        opening.starts_with('{')
    };
    if !opens {
        return None;
    }
    let mut end = idx;
    if !OPEN_CLOSED_RE.is_match(opening) {
        end = (idx + 1..items.len())
            .find(|&i| items[i].as_str().is_some_and(|s| CLOSING_RE.is_match(s)))?;
    }
    let text = block_text(&items[idx..=end]);
    AttributeBlock::parse(&text, start..end + 1)
}

/// Find an attribute block ending the list (`Caption {#tbl:id .a}`).
///
/// Trailing spaces and the spaces before the block are included in
/// `consumed`. The block must start with `{#` when `require_id` is set.
pub fn scan_left(items: &[Inline], require_id: bool) -> Option<AttributeBlock> {
    let mut end = items.len();
    while end > 0 && items[end - 1].is_space() {
        end -= 1;
    }
    let closing = items.get(end.checked_sub(1)?)?.as_str()?;
    if !closing.ends_with('}') {
        return None;
    }
    let mut start = end - 1;
    while !items[start].as_str().is_some_and(|s| s.starts_with('{')) {
        start = start.checked_sub(1)?;
    }
    let text = block_text(&items[start..end]);
    if require_id && !text.starts_with("{#") {
        return None;
    }
    let block = AttributeBlock::parse(&text, start..items.len())?;
    if block.remainder.is_some() {
        return None;
    }
    let mut first = start;
    while first > 0 && items[first - 1].is_space() {
        first -= 1;
    }
    Some(AttributeBlock {
        consumed: first..items.len(),
        ..block
    })
}

fn block_text(items: &[Inline]) -> String {
    stringify(items).replace('\n', " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Inline {
        Inline::str(text)
    }

    #[test]
    fn test_parse_attribute_str() {
        let (classes, attributes) =
            parse_attribute_str(".class-name .other a=1 b=\"some text\" c='x'");
        assert_eq!(classes, vec!["class-name", "other"]);
        assert_eq!(
            attributes,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "some text".to_string()),
                ("c".to_string(), "x".to_string()),
            ]
        );
    }

    #[test]
    fn test_escaped_quotes_are_not_supported() {
        let (_, attributes) = parse_attribute_str(r#"a="say \"hi\"""#);
        assert_eq!(attributes, vec![("a".to_string(), r"say \".to_string())]);
    }

    #[test]
    fn test_scan_right_single_token() {
        let items = vec![Inline::display_math("a"), Inline::Space, s("{#eq:a}")];
        let block = scan_right(&items, 1, true).unwrap();
        assert_eq!(block.id, "eq:a");
        assert_eq!(block.consumed, 1..3);
        assert_eq!(block.remainder, None);
    }

    #[test]
    fn test_scan_right_spanning_tokens() {
        let items = vec![
            Inline::inline_math("a=1"),
            Inline::Space,
            s("{#a"),
            Inline::Space,
            s("b="),
            Inline::inline_math("2"),
            s("})."),
        ];
        let block = scan_right(&items, 1, true).unwrap();
        assert_eq!(block.id, "a");
        assert_eq!(block.attributes, vec![("b".to_string(), "2".to_string())]);
        assert_eq!(block.consumed, 1..7);
        assert_eq!(block.remainder.as_deref(), Some(")."));
    }

    #[test]
    fn test_scan_right_requires_label() {
        let items = vec![Inline::Space, s("{.a}")];
        assert!(scan_right(&items, 0, true).is_none());
        assert_eq!(scan_right(&items, 0, false).unwrap().classes, vec!["a"]);
    }

    #[test]
    fn test_scan_right_unclosed() {
        let items = vec![s("{#a"), Inline::Space, s("b")];
        assert!(scan_right(&items, 0, true).is_none());
    }

    #[test]
    fn test_scan_left() {
        let items = vec![
            s("Caption"),
            Inline::Space,
            s("{#tbl:id"),
            Inline::Space,
            s(".class"),
            Inline::Space,
            s("align=\"rc\"}"),
        ];
        let block = scan_left(&items, true).unwrap();
        assert_eq!(block.id, "tbl:id");
        assert_eq!(block.classes, vec!["class"]);
        assert_eq!(block.attributes, vec![("align".to_string(), "rc".to_string())]);
        assert_eq!(block.consumed, 1..7);
    }

    #[test]
    fn test_scan_left_needs_trailing_block() {
        let items = vec![s("{#tbl:id}"), Inline::Space, s("Caption")];
        assert!(scan_left(&items, true).is_none());
        assert!(scan_left(&[s("{.a}")], true).is_none());
    }
}
