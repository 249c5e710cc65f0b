//! Raw markup extraction
//!
//! Finds references and other commands written directly in LaTeX, RST or
//! HTML and replaces them with format agnostic containers:
//!
//! - `\cref{a,b}`, `:ref:`a``, `<cite data-cite="a">..</cite>` and internal
//!   links `[text](#a)` become a `converted-Cite` Span around a `Cite`, so
//!   they render like `@a` citations;
//! - any other `\tag[options]{content}` and the documentation roles
//!   (`:py:class:` and friends) become a `converted-Other` Span keeping the
//!   original text;
//! - top-level RST directives (`.. name:: text` plus an indented body) and
//!   link targets (`.. _label:`) become a Div.

use std::collections::VecDeque;
use std::sync::LazyLock;

use ipub_ast::{
    Attr, Block, Citation, CitationMode, Format, Inline, Pandoc, Parent, stringify,
    walk_blocks_mut, walk_inlines_mut,
};
use regex::Regex;

use crate::context::FilterContext;
use crate::definitions::{
    ATTRIBUTE_CITE_CLASS, CONVERTED_CITE_CLASS, CONVERTED_DIRECTIVE_CLASS, CONVERTED_OTHER_CLASS,
    RAW_DIV_CLASS, RAW_SPAN_CLASS, RST_KNOWN_ROLES, RefPrefix,
};
use crate::error::Result;
use crate::pipeline::{Pass, Stage};

/// `\tag{content}`
static LATEX_NOOPTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\\([^\{\[]+)\{([^\}]+)\}\s*$").unwrap());

/// `\tag[options]{content}`
static LATEX_WOPTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\\([^\{\[]+)\[([^\]]*)\]\{([^\}]+)\}\s*$").unwrap());

/// Commands embedded in ordinary text
static LATEX_IN_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\[a-zA-Z]+\*?(?:\[[^\]]*\])?\{[^\}]+\}").unwrap());

/// A `:role:` token directly followed by inline code
static ROLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:([a-zA-Z][\w:\-]*):$").unwrap());

/// A complete role in raw RST
static RAW_ROLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*:([a-zA-Z][\w:\-]*):`([^`]+)`\s*$").unwrap());

static HTML_CITE_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<cite\s*data-cite\s*=\s*"?([^>"]*)"?>"#).unwrap());

static HTML_CITE_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*</cite>\s*$").unwrap());

static INTERNAL_LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#(.+)$").unwrap());

/// Raw markup extraction pass
#[derive(Debug, Clone, Copy, Default)]
pub struct PrepareRaw;

impl Pass for PrepareRaw {
    fn name(&self) -> &str {
        "prepare-raw"
    }

    fn stage(&self) -> Stage {
        Stage::PrepareRaw
    }

    fn run(&self, doc: &mut Pandoc, ctx: &mut FilterContext) -> Result<()> {
        let link_prefix = RefPrefix::from_latex(&ctx.options().reftag).unwrap_or(RefPrefix::Cref);
        wrap_directives(&mut doc.blocks);
        walk_blocks_mut(&mut doc.blocks, &mut convert_raw_blocks);
        for block in doc.blocks.iter_mut() {
            if let Block::Div(attr, _) = block
                && attr.has_class(RAW_DIV_CLASS)
            {
                continue;
            }
            walk_inlines_mut(std::slice::from_mut(block), &mut |list, parent| {
                if let Parent::Span(attr) = parent
                    && attr.has_class(RAW_SPAN_CLASS)
                {
                    return;
                }
                convert_inlines(list, link_prefix);
            });
        }
        Ok(())
    }
}

/// Container for a reference written in raw markup
fn cite_span(
    ids: Vec<String>,
    format: &str,
    prefix: RefPrefix,
    content: Vec<Inline>,
    alt: Option<String>,
) -> Inline {
    let citations = ids
        .into_iter()
        .map(|id| Citation::new(id, CitationMode::NormalCitation))
        .collect();
    let mut attributes = vec![
        ("format".to_string(), format.to_string()),
        ("prefix".to_string(), prefix.marker().to_string()),
    ];
    if let Some(alt) = alt {
        attributes.push(("alt".to_string(), alt));
    }
    let classes = [RAW_SPAN_CLASS, CONVERTED_CITE_CLASS, ATTRIBUTE_CITE_CLASS]
        .map(String::from)
        .to_vec();
    Inline::Span(
        Attr::new("", classes, attributes),
        vec![Inline::Cite(citations, content)],
    )
}

/// Container for raw markup kept as is
fn other_span(format: Format, attributes: Vec<(&str, &str)>, original: &str) -> Inline {
    let mut attrs = vec![("format".to_string(), normalized(&format).to_string())];
    attrs.extend(attributes.into_iter().map(|(k, v)| (k.to_string(), v.to_string())));
    attrs.push(("original".to_string(), original.to_string()));
    let classes = [RAW_SPAN_CLASS, CONVERTED_OTHER_CLASS].map(String::from).to_vec();
    Inline::Span(
        Attr::new("", classes, attrs),
        vec![Inline::RawInline(format, original.to_string())],
    )
}

fn normalized(format: &Format) -> &str {
    if format.is_latex() {
        "latex"
    } else if format.is_html() {
        "html"
    } else {
        format.as_str()
    }
}

fn split_ids(content: &str) -> Vec<String> {
    content
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}

/// Convert a complete LaTeX command
fn convert_latex(format: &Format, text: &str) -> Option<Inline> {
    if let Some(caps) = LATEX_NOOPTS_RE.captures(text) {
        let tag = caps[1].trim();
        let content = &caps[2];
        if let Some(prefix) = RefPrefix::from_latex(tag) {
            return Some(cite_span(split_ids(content), "latex", prefix, vec![], None));
        }
        return Some(other_span(
            format.clone(),
            vec![("tag", tag), ("content", content)],
            text,
        ));
    }
    let caps = LATEX_WOPTS_RE.captures(text)?;
    Some(other_span(
        format.clone(),
        vec![("tag", caps[1].trim()), ("content", &caps[3]), ("options", &caps[2])],
        text,
    ))
}

/// Convert an RST role with its content
fn convert_role(role: &str, content: &str, original: &str) -> Option<Inline> {
    if let Some(prefix) = RefPrefix::from_rst(role) {
        return Some(cite_span(split_ids(content), "rst", prefix, vec![], None));
    }
    if RST_KNOWN_ROLES.contains(&role) {
        return Some(other_span(
            Format::rst(),
            vec![("role", role), ("content", content)],
            original,
        ));
    }
    None
}

fn is_html_cite_close(inline: &Inline) -> bool {
    matches!(inline, Inline::RawInline(format, text)
        if format.is_html() && HTML_CITE_CLOSE_RE.is_match(text))
}

/// Rewrite one inline list; tokens that belong to a match are taken from `rest`
fn convert_inlines(list: &mut Vec<Inline>, link_prefix: RefPrefix) {
    let mut rest: VecDeque<Inline> = std::mem::take(list).into();
    while let Some(inline) = rest.pop_front() {
        match convert_one(&inline, &mut rest, link_prefix) {
            Some(converted) => list.extend(converted),
            None => list.push(inline),
        }
    }
}

fn convert_one(
    inline: &Inline,
    rest: &mut VecDeque<Inline>,
    link_prefix: RefPrefix,
) -> Option<Vec<Inline>> {
    match inline {
        Inline::RawInline(format, text) if format.is_html() => {
            let key = HTML_CITE_OPEN_RE.captures(text)?.get(1)?.as_str().to_string();
            let Some(close) = rest.iter().position(is_html_cite_close) else {
                tracing::warn!(key, "Unclosed <cite> tag left as raw HTML");
                return None;
            };
            let content: Vec<Inline> = rest.drain(..close).collect();
            rest.pop_front();
            Some(vec![cite_span(
                split_ids(&key),
                "html",
                RefPrefix::Cite,
                content,
                None,
            )])
        }
        Inline::RawInline(format, text) if format.is_latex() => {
            convert_latex(format, text).map(|span| vec![span])
        }
        Inline::RawInline(format, text) if format.is_rst() => {
            let caps = RAW_ROLE_RE.captures(text)?;
            convert_role(&caps[1], &caps[2], text.trim()).map(|span| vec![span])
        }
        Inline::Str(text) if ROLE_RE.is_match(text) => {
            let Some(Inline::Code(_, content)) = rest.front() else {
                return None;
            };
            let role = text.trim_matches(':');
            let original = format!("{text}`{content}`");
            let span = convert_role(role, content, &original)?;
            rest.pop_front();
            Some(vec![span])
        }
        Inline::Str(text) if text.contains('\\') => split_latex_text(text),
        Inline::Link(_, content, (url, _)) => {
            let label = INTERNAL_LINK_RE.captures(url)?.get(1)?.as_str().to_string();
            let alt = stringify(content).trim().to_string();
            Some(vec![cite_span(
                vec![label],
                "markdown",
                link_prefix,
                content.clone(),
                Some(alt),
            )])
        }
        _ => None,
    }
}

/// Split LaTeX commands out of a text token (`see\cref{a}.`)
fn split_latex_text(text: &str) -> Option<Vec<Inline>> {
    let mut out = Vec::new();
    let mut last = 0;
    for m in LATEX_IN_TEXT_RE.find_iter(text) {
        let Some(span) = convert_latex(&Format::latex(), m.as_str()) else {
            continue;
        };
        if m.start() > last {
            out.push(Inline::str(&text[last..m.start()]));
        }
        out.push(span);
        last = m.end();
    }
    if out.is_empty() {
        return None;
    }
    if last < text.len() {
        out.push(Inline::str(&text[last..]));
    }
    Some(out)
}

/// Block-level raw markup: whole raw blocks and `<cite>` pairs spanning blocks
fn convert_raw_blocks(blocks: &mut Vec<Block>) {
    let needs_work = blocks
        .iter()
        .any(|b| matches!(b, Block::RawBlock(format, _) if format.is_latex() || format.is_rst() || format.is_html()));
    if !needs_work {
        return;
    }
    let mut rest: VecDeque<Block> = std::mem::take(blocks).into();
    while let Some(block) = rest.pop_front() {
        let converted = match &block {
            Block::RawBlock(format, text) if format.is_latex() => convert_latex(format, text),
            Block::RawBlock(format, text) if format.is_rst() => RAW_ROLE_RE
                .captures(text)
                .and_then(|caps| convert_role(&caps[1], &caps[2], text.trim())),
            Block::RawBlock(format, text) if format.is_html() => html_block_cite(text, &mut rest),
            _ => None,
        };
        match converted {
            Some(span) => blocks.push(Block::Plain(vec![span])),
            None => blocks.push(block),
        }
    }
}

fn html_block_cite(text: &str, rest: &mut VecDeque<Block>) -> Option<Inline> {
    let key = HTML_CITE_OPEN_RE.captures(text)?.get(1)?.as_str().to_string();
    let is_close =
        |b: &Block| matches!(b, Block::RawBlock(f, t) if f.is_html() && HTML_CITE_CLOSE_RE.is_match(t));
    let Some(close) = rest.iter().position(is_close) else {
        tracing::warn!(key, "Unclosed <cite> tag left as raw HTML");
        return None;
    };
    let mut content = Vec::new();
    for block in rest.drain(..close) {
        if let Some(inlines) = block.inlines() {
            if !content.is_empty() {
                content.push(Inline::Space);
            }
            content.extend(inlines.iter().cloned());
        }
    }
    rest.pop_front();
    Some(cite_span(split_ids(&key), "html", RefPrefix::Cite, content, None))
}

/// Start of a top-level paragraph written as an RST directive
enum DirectiveHeader {
    /// `.. _label:`
    Target(String),
    /// `.. name:: inline text`
    Directive { name: String, inline: String },
}

fn directive_header(block: &Block) -> Option<DirectiveHeader> {
    let [Inline::Str(dots), space, Inline::Str(word), tail @ ..] = block.inlines()? else {
        return None;
    };
    if dots != ".." || !matches!(space, Inline::Space) {
        return None;
    }
    if let Some(name) = word.strip_suffix("::")
        && !name.is_empty()
    {
        let line_end = tail
            .iter()
            .position(|i| matches!(i, Inline::SoftBreak | Inline::LineBreak))
            .unwrap_or(tail.len());
        return Some(DirectiveHeader::Directive {
            name: name.to_string(),
            inline: stringify(&tail[..line_end]).trim().to_string(),
        });
    }
    let label = word.strip_prefix('_')?.strip_suffix(':')?;
    (tail.is_empty() && !label.is_empty()).then(|| DirectiveHeader::Target(label.to_string()))
}

/// Source text of a directive paragraph, keeping its line breaks
fn source_text(inlines: &[Inline]) -> String {
    inlines
        .iter()
        .map(|inline| match inline {
            Inline::SoftBreak | Inline::LineBreak => "\n".to_string(),
            Inline::Code(_, code) => format!("`{code}`"),
            other => stringify(std::slice::from_ref(other)),
        })
        .collect()
}

/// Wrap top-level RST directives (and their indented body) in Divs.
///
/// This changes sibling structure, so it runs before the other conversions.
fn wrap_directives(blocks: &mut Vec<Block>) {
    if !blocks.iter().any(|b| directive_header(b).is_some()) {
        return;
    }
    let mut rest: VecDeque<Block> = std::mem::take(blocks).into();
    while let Some(block) = rest.pop_front() {
        let Some(header) = directive_header(&block) else {
            blocks.push(block);
            continue;
        };
        let original = source_text(block.inlines().unwrap_or_default());
        match header {
            DirectiveHeader::Target(label) => {
                let attr = Attr::new(
                    "",
                    [RAW_DIV_CLASS, CONVERTED_OTHER_CLASS].map(String::from).to_vec(),
                    vec![
                        ("format".to_string(), "rst".to_string()),
                        ("target".to_string(), label),
                        ("original".to_string(), original),
                    ],
                );
                blocks.push(Block::Div(attr, vec![block]));
            }
            DirectiveHeader::Directive { name, inline } => {
                let body = match rest.front() {
                    Some(Block::CodeBlock(..)) => rest.pop_front(),
                    _ => None,
                };
                let attr = Attr::new(
                    "",
                    [RAW_DIV_CLASS, CONVERTED_DIRECTIVE_CLASS]
                        .map(String::from)
                        .to_vec(),
                    vec![
                        ("format".to_string(), "rst".to_string()),
                        ("directive".to_string(), name),
                        ("inline".to_string(), inline),
                        ("has_body".to_string(), body.is_some().to_string()),
                        ("original".to_string(), original),
                    ],
                );
                let mut content = vec![block];
                content.extend(body);
                blocks.push(Block::Div(attr, content));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::FilterOptions;
    use ipub_ast::{Meta, OutputFormat};

    fn run(blocks: Vec<Block>) -> Vec<Block> {
        let mut doc = Pandoc::new(Meta::new(), blocks);
        let mut ctx = FilterContext::new(OutputFormat::Latex, FilterOptions::default());
        PrepareRaw.run(&mut doc, &mut ctx).unwrap();
        doc.blocks
    }

    fn para_of(blocks: &[Block]) -> &[Inline] {
        blocks[0].inlines().unwrap()
    }

    fn cite_ids(inline: &Inline) -> Vec<String> {
        match inline {
            Inline::Span(_, content) => match &content[0] {
                Inline::Cite(citations, _) => {
                    citations.iter().map(|c| c.citation_id.clone()).collect()
                }
                other => panic!("expected cite, got {other:?}"),
            },
            other => panic!("expected span, got {other:?}"),
        }
    }

    fn span_attr(inline: &Inline) -> &Attr {
        match inline {
            Inline::Span(attr, _) => attr,
            other => panic!("expected span, got {other:?}"),
        }
    }

    #[test]
    fn test_latex_reference() {
        let blocks = run(vec![Block::Para(vec![Inline::raw(
            Format::new("tex"),
            "\\cref{fig:a, fig:b}",
        )])]);
        let span = &para_of(&blocks)[0];
        assert_eq!(cite_ids(span), vec!["fig:a", "fig:b"]);
        let attr = span_attr(span);
        assert!(attr.has_class(CONVERTED_CITE_CLASS) && attr.has_class(ATTRIBUTE_CITE_CLASS));
        assert_eq!(attr.get("prefix"), Some("+"));
        assert_eq!(attr.get("format"), Some("latex"));
    }

    #[test]
    fn test_latex_other_with_options() {
        let blocks = run(vec![Block::Para(vec![Inline::raw(
            Format::new("tex"),
            "\\todo[inline]{check}",
        )])]);
        let attr = span_attr(&para_of(&blocks)[0]);
        assert!(attr.has_class(CONVERTED_OTHER_CLASS));
        assert_eq!(attr.get("tag"), Some("todo"));
        assert_eq!(attr.get("content"), Some("check"));
        assert_eq!(attr.get("options"), Some("inline"));
        assert_eq!(attr.get("original"), Some("\\todo[inline]{check}"));
    }

    #[test]
    fn test_reference_command_with_options_is_other() {
        let blocks = run(vec![Block::Para(vec![Inline::raw(
            Format::latex(),
            "\\cite[p. 3]{key}",
        )])]);
        assert!(span_attr(&para_of(&blocks)[0]).has_class(CONVERTED_OTHER_CLASS));
    }

    #[test]
    fn test_rst_role() {
        let blocks = run(vec![Block::Para(vec![
            Inline::str("a"),
            Inline::Space,
            Inline::str(":ref:"),
            Inline::Code(Attr::default(), "label".into()),
            Inline::Space,
            Inline::str("b"),
        ])]);
        let para = para_of(&blocks);
        assert_eq!(para.len(), 5);
        assert_eq!(cite_ids(&para[2]), vec!["label"]);
        assert_eq!(span_attr(&para[2]).get("prefix"), Some("!"));
    }

    #[test]
    fn test_unknown_role_untouched() {
        let input = vec![Block::Para(vec![
            Inline::str(":kbd:"),
            Inline::Code(Attr::default(), "C-x".into()),
        ])];
        assert_eq!(run(input.clone()), input);
    }

    #[test]
    fn test_documentation_role_is_other() {
        let blocks = run(vec![Block::Para(vec![
            Inline::str(":py:class:"),
            Inline::Code(Attr::default(), "a.B".into()),
        ])]);
        let attr = span_attr(&para_of(&blocks)[0]);
        assert_eq!(attr.get("role"), Some("py:class"));
        assert_eq!(attr.get("original"), Some(":py:class:`a.B`"));
    }

    #[test]
    fn test_html_cite_pair() {
        let blocks = run(vec![Block::Para(vec![
            Inline::raw(Format::html(), "<cite data-cite=\"cite_key\">"),
            Inline::str("text"),
            Inline::raw(Format::html(), "</cite>"),
            Inline::Space,
            Inline::str("after"),
        ])]);
        let para = para_of(&blocks);
        assert_eq!(para.len(), 3);
        assert_eq!(cite_ids(&para[0]), vec!["cite_key"]);
        match &para[0] {
            Inline::Span(_, content) => {
                assert!(matches!(&content[0], Inline::Cite(_, c) if c == &vec![Inline::str("text")]))
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_unclosed_html_cite_untouched() {
        let input = vec![Block::Para(vec![
            Inline::raw(Format::html(), "<cite data-cite=\"k\">"),
            Inline::str("text"),
        ])];
        assert_eq!(run(input.clone()), input);
    }

    #[test]
    fn test_internal_link() {
        let blocks = run(vec![Block::Para(vec![Inline::Link(
            Attr::default(),
            vec![Inline::str("some"), Inline::Space, Inline::str("text")],
            ("#alabel".into(), String::new()),
        )])]);
        let span = &para_of(&blocks)[0];
        assert_eq!(cite_ids(span), vec!["alabel"]);
        let attr = span_attr(span);
        assert_eq!(attr.get("format"), Some("markdown"));
        assert_eq!(attr.get("prefix"), Some("+"));
        assert_eq!(attr.get("alt"), Some("some text"));
    }

    #[test]
    fn test_latex_inside_text() {
        let blocks = run(vec![Block::Para(vec![Inline::str("(see\\ref{a}).")])]);
        let para = para_of(&blocks);
        assert_eq!(para.len(), 3);
        assert_eq!(para[0], Inline::str("(see"));
        assert_eq!(cite_ids(&para[1]), vec!["a"]);
        assert_eq!(para[2], Inline::str(")."));
    }

    #[test]
    fn test_directive_with_body() {
        let blocks = run(vec![
            Block::Para(vec![
                Inline::str(".."),
                Inline::Space,
                Inline::str("note::"),
                Inline::Space,
                Inline::str("Title"),
            ]),
            Block::CodeBlock(Attr::default(), "body text".into()),
            Block::Para(vec![Inline::str("after")]),
        ]);
        assert_eq!(blocks.len(), 2);
        match &blocks[0] {
            Block::Div(attr, content) => {
                assert!(attr.has_class(CONVERTED_DIRECTIVE_CLASS));
                assert_eq!(attr.get("directive"), Some("note"));
                assert_eq!(attr.get("inline"), Some("Title"));
                assert_eq!(attr.get("has_body"), Some("true"));
                assert_eq!(content.len(), 2);
            }
            other => panic!("expected div, got {other:?}"),
        }
    }

    #[test]
    fn test_link_target() {
        let blocks = run(vec![Block::Para(vec![
            Inline::str(".."),
            Inline::Space,
            Inline::str("_my-label:"),
        ])]);
        match &blocks[0] {
            Block::Div(attr, _) => {
                assert!(attr.has_class(CONVERTED_OTHER_CLASS));
                assert_eq!(attr.get("target"), Some("my-label"));
            }
            other => panic!("expected div, got {other:?}"),
        }
    }

    #[test]
    fn test_raw_block_command() {
        let blocks = run(vec![Block::raw(Format::latex(), "\\Cref{tbl:a}")]);
        match &blocks[0] {
            Block::Plain(content) => assert_eq!(cite_ids(&content[0]), vec!["tbl:a"]),
            other => panic!("expected plain, got {other:?}"),
        }
    }

    #[test]
    fn test_running_twice_is_stable() {
        let once = run(vec![Block::Para(vec![
            Inline::raw(Format::new("tex"), "\\ref{a}"),
            Inline::Space,
            Inline::raw(Format::new("tex"), "\\todo{x}"),
        ])]);
        assert_eq!(run(once.clone()), once);
    }
}
