//! Citation decoration
//!
//! Pandoc reads `+@label{.class key=val}` as a `Str`, a `Cite` and more
//! `Str` tokens. This pass moves the prefix marker and the attribute block
//! onto a Span wrapping the citation:
//!
//! ```text
//! +@label{.b x=1}   =>  Span(.attribute-Cite .b, prefix=+ x=1)[Cite]
//! +{@label .b}      =>  Span(.attribute-Cite .b, prefix=+)[Cite]
//! @label            =>  Cite (unchanged)
//! ```

use ipub_ast::{Attr, Inline, Pandoc, Parent, stringify, walk_inlines_mut};

use crate::attributes::{AttributeBlock, scan_right};
use crate::context::FilterContext;
use crate::definitions::{ATTRIBUTE_CITE_CLASS, PREFIX_MARKERS};
use crate::error::Result;
use crate::pipeline::{Pass, Stage};

/// Citation decoration pass
#[derive(Debug, Clone, Copy, Default)]
pub struct PrepareCites;

impl Pass for PrepareCites {
    fn name(&self) -> &str {
        "prepare-cites"
    }

    fn stage(&self) -> Stage {
        Stage::PrepareCites
    }

    fn run(&self, doc: &mut Pandoc, _ctx: &mut FilterContext) -> Result<()> {
        walk_inlines_mut(&mut doc.blocks, &mut |list, parent| {
            if let Parent::Span(attr) = parent
                && attr.has_class(ATTRIBUTE_CITE_CLASS)
            {
                return;
            }
            decorate_citations(list);
        });
        Ok(())
    }
}

/// Decoration found around one citation
#[derive(Default)]
struct Decoration {
    prefix: Option<char>,
    block: Option<AttributeBlock>,
}

impl Decoration {
    fn is_empty(&self) -> bool {
        self.prefix.is_none() && self.block.as_ref().is_none_or(AttributeBlock::is_empty)
    }

    fn wrap(self, cite: Inline) -> Inline {
        let mut classes = vec![ATTRIBUTE_CITE_CLASS.to_string()];
        let mut attributes = Vec::new();
        let mut id = String::new();
        if let Some(prefix) = self.prefix {
            attributes.push(("prefix".to_string(), prefix.to_string()));
        }
        if let Some(block) = self.block {
            id = block.id;
            classes.extend(block.classes.into_iter().filter(|c| c != ATTRIBUTE_CITE_CLASS));
            attributes.extend(block.attributes.into_iter().filter(|(k, _)| k != "prefix"));
        }
        Inline::Span(Attr::new(id, classes, attributes), vec![cite])
    }
}

fn is_marker(c: char) -> bool {
    PREFIX_MARKERS.contains(&c)
}

/// Rewrite one inline list, wrapping decorated citations
fn decorate_citations(list: &mut Vec<Inline>) {
    if !list.iter().any(|i| matches!(i, Inline::Cite(..))) {
        return;
    }
    let mut items = std::mem::take(list);
    let mut i = 0;
    while i < items.len() {
        let item = std::mem::replace(&mut items[i], Inline::Space);
        i += 1;
        if !matches!(item, Inline::Cite(..)) {
            list.push(item);
            continue;
        }

        let mut decoration = Decoration::default();
        let opens_block = matches!(list.last(), Some(Inline::Str(prev)) if prev.ends_with('{'));
        if opens_block && let Some(block) = scan_enclosing(&items, i) {
            // `+{@label .class}`: the marker sits before the brace
            if let Some(Inline::Str(prev)) = list.last_mut() {
                prev.pop();
                if prev.ends_with(is_marker) {
                    decoration.prefix = prev.pop();
                }
            }
            i = block.consumed.end;
            decoration.block = Some(block);
        } else {
            if let Some(Inline::Str(prev)) = list.last_mut()
                && prev.ends_with(is_marker)
            {
                decoration.prefix = prev.pop();
            }
            if let Some(block) = scan_right(&items, i, false) {
                i = block.consumed.end;
                decoration.block = Some(block);
            }
        }
        if matches!(list.last(), Some(Inline::Str(prev)) if prev.is_empty()) {
            list.pop();
        }

        let remainder = decoration
            .block
            .as_mut()
            .and_then(|b| b.remainder.take())
            .map(Inline::Str);
        if decoration.is_empty() {
            list.push(item);
        } else {
            list.push(decoration.wrap(item));
        }
        list.extend(remainder);
    }
}

/// Read the rest of a block opened before the citation (`{@label .a}`)
fn scan_enclosing(items: &[Inline], start: usize) -> Option<AttributeBlock> {
    let mut end = start;
    loop {
        match items.get(end)? {
            Inline::Str(s) if s.contains('}') => break,
            Inline::Str(_) | Inline::Space | Inline::SoftBreak => end += 1,
            _ => return None,
        }
    }
    let text = format!("{{{}", stringify(&items[start..=end]).trim_start());
    AttributeBlock::parse(&text, start..end + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::FilterOptions;
    use ipub_ast::{Block, Citation, CitationMode, OutputFormat};

    fn cite(id: &str) -> Inline {
        Inline::Cite(
            vec![Citation::new(id, CitationMode::AuthorInText)],
            vec![Inline::str(format!("@{id}"))],
        )
    }

    fn run(content: Vec<Inline>) -> Vec<Inline> {
        let mut doc = Pandoc::new(Default::default(), vec![Block::Para(content)]);
        let mut ctx = FilterContext::new(OutputFormat::Html, FilterOptions::default());
        PrepareCites.run(&mut doc, &mut ctx).unwrap();
        match doc.blocks.remove(0) {
            Block::Para(content) => content,
            other => panic!("expected para, got {other:?}"),
        }
    }

    fn attr_of(inline: &Inline) -> &Attr {
        match inline {
            Inline::Span(attr, _) => attr,
            other => panic!("expected span, got {other:?}"),
        }
    }

    #[test]
    fn test_prefix_and_trailing_block() {
        let out = run(vec![
            Inline::str("+"),
            cite("label"),
            Inline::str("{.class"),
            Inline::Space,
            Inline::str("a=1}"),
            Inline::Space,
            Inline::str("xyz"),
        ]);
        assert_eq!(out.len(), 3);
        let attr = attr_of(&out[0]);
        assert_eq!(attr.classes, vec!["attribute-Cite", "class"]);
        assert_eq!(
            attr.attributes,
            vec![
                ("prefix".to_string(), "+".to_string()),
                ("a".to_string(), "1".to_string())
            ]
        );
        assert_eq!(out[2], Inline::str("xyz"));
    }

    #[test]
    fn test_bare_citation_is_left_alone() {
        let input = vec![Inline::str("see"), Inline::Space, cite("a")];
        assert_eq!(run(input.clone()), input);
    }

    #[test]
    fn test_prefix_trimmed_from_longer_text() {
        let out = run(vec![Inline::str("(="), cite("eq:a"), Inline::str(")")]);
        assert_eq!(out[0], Inline::str("("));
        assert_eq!(attr_of(&out[1]).get("prefix"), Some("="));
        assert_eq!(out[2], Inline::str(")"));
    }

    #[test]
    fn test_empty_block_removed() {
        let out = run(vec![Inline::str("("), cite("label4"), Inline::str("{})")]);
        assert_eq!(out, vec![Inline::str("("), cite("label4"), Inline::str(")")]);
    }

    #[test]
    fn test_enclosing_block() {
        let out = run(vec![
            Inline::str("^{"),
            cite("fig:a"),
            Inline::Space,
            Inline::str(".capital}"),
        ]);
        assert_eq!(out.len(), 1);
        let attr = attr_of(&out[0]);
        assert_eq!(attr.get("prefix"), Some("^"));
        assert!(attr.has_class("capital"));
    }

    #[test]
    fn test_multiple_citations_in_one_list() {
        let out = run(vec![
            Inline::str("+"),
            cite("a"),
            Inline::Space,
            Inline::str("and"),
            Inline::Space,
            cite("b"),
            Inline::str("{.b}"),
        ]);
        assert_eq!(attr_of(&out[0]).get("prefix"), Some("+"));
        assert_eq!(attr_of(&out[4]).classes, vec!["attribute-Cite", "b"]);
        assert_eq!(attr_of(&out[4]).get("prefix"), None);
    }

    #[test]
    fn test_running_twice_is_stable() {
        let once = run(vec![Inline::str("+"), cite("a"), Inline::str("{.x}")]);
        assert_eq!(run(once.clone()), once);
    }
}
