//! Helpers shared by the format passes

use ipub_ast::{Attr, Block, Format, Inline, OutputFormat, walk_blocks_mut, walk_inlines_mut};

use crate::definitions::BLOCK_RAW_CLASS;

/// Whether raw content in `format` is understood by the target writer
pub fn matches_target(format: &Format, target: OutputFormat) -> bool {
    match target {
        OutputFormat::Latex => format.is_latex(),
        OutputFormat::Rst => format.is_rst(),
        OutputFormat::Html => format.is_html(),
    }
}

/// Join as `a`, `a and b`, `a, b and c`
pub fn and_join(parts: &[String]) -> String {
    match parts {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

/// Opening HTML anchor for a labelled element
pub fn anchor_start(label: &str) -> String {
    format!(r##"<a id="{label}" class="anchor-link" name="#{label}">"##)
}

pub const ANCHOR_END: &str = "</a>";

/// Raw content that has to stand as its own block.
///
/// The content is marked with a [`BLOCK_RAW_CLASS`] Span; [`split_raw_blocks`]
/// later lifts it out of the surrounding paragraph.
pub fn block_raw(format: Format, body: &str) -> Inline {
    Inline::Span(
        Attr::new("", vec![BLOCK_RAW_CLASS.to_string()], vec![]),
        vec![Inline::RawInline(format, body.to_string())],
    )
}

fn is_block_raw(inline: &Inline) -> bool {
    matches!(inline, Inline::Span(attr, _) if attr.has_class(BLOCK_RAW_CLASS))
}

/// Whether block-level raw content sits anywhere in `content`
fn contains_block_raw(content: &[Inline]) -> bool {
    content.iter().any(|inline| {
        is_block_raw(inline)
            || match inline {
                Inline::Emph(c)
                | Inline::Strong(c)
                | Inline::Strikeout(c)
                | Inline::Superscript(c)
                | Inline::Subscript(c)
                | Inline::SmallCaps(c)
                | Inline::Quoted(_, c)
                | Inline::Span(_, c)
                | Inline::Link(_, c, _) => contains_block_raw(c),
                _ => false,
            }
    })
}

type Rewrap = Box<dyn Fn(Vec<Inline>) -> Inline>;

/// Take an inline container apart into its content and a constructor that
/// rebuilds it around part of that content
fn open(inline: Inline) -> Result<(Vec<Inline>, Rewrap), Inline> {
    Ok(match inline {
        Inline::Emph(c) => (c, Box::new(Inline::Emph) as Rewrap),
        Inline::Strong(c) => (c, Box::new(Inline::Strong) as Rewrap),
        Inline::Strikeout(c) => (c, Box::new(Inline::Strikeout) as Rewrap),
        Inline::Superscript(c) => (c, Box::new(Inline::Superscript) as Rewrap),
        Inline::Subscript(c) => (c, Box::new(Inline::Subscript) as Rewrap),
        Inline::SmallCaps(c) => (c, Box::new(Inline::SmallCaps) as Rewrap),
        Inline::Quoted(quote, c) => (c, Box::new(move |part: Vec<Inline>| Inline::Quoted(quote, part)) as Rewrap),
        Inline::Span(attr, c) => (c, Box::new(move |part: Vec<Inline>| Inline::Span(attr.clone(), part)) as Rewrap),
        Inline::Link(attr, c, target) => (
            c,
            Box::new(move |part: Vec<Inline>| Inline::Link(attr.clone(), part, target.clone())) as Rewrap,
        ),
        other => return Err(other),
    })
}

enum Piece {
    Inlines(Vec<Inline>),
    Raw(Format, String),
}

/// Cut `content` at every block-level raw marker.
///
/// A container the cut goes through is rebuilt around each side, so
/// `*a <raw> b*` gives `*a*`, the raw block and `*b*`.
fn split_inlines(content: Vec<Inline>) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut current = Vec::new();
    for inline in content {
        match inline {
            Inline::Span(attr, inner) if attr.has_class(BLOCK_RAW_CLASS) => {
                pieces.push(Piece::Inlines(std::mem::take(&mut current)));
                for raw in inner {
                    if let Inline::RawInline(format, text) = raw {
                        pieces.push(Piece::Raw(format, text));
                    }
                }
            }
            other => match open(other) {
                Ok((inner, rewrap)) if contains_block_raw(&inner) => {
                    for piece in split_inlines(inner) {
                        match piece {
                            Piece::Inlines(part) => {
                                let part = trim_spaces(part);
                                if !part.is_empty() {
                                    current.push(rewrap(part));
                                }
                            }
                            raw @ Piece::Raw(..) => {
                                pieces.push(Piece::Inlines(std::mem::take(&mut current)));
                                pieces.push(raw);
                            }
                        }
                    }
                }
                Ok((inner, rewrap)) => current.push(rewrap(inner)),
                Err(other) => current.push(other),
            },
        }
    }
    pieces.push(Piece::Inlines(current));
    pieces
}

/// Split paragraphs around block-level raw content.
///
/// `a <raw> b` becomes a paragraph, a raw block and a paragraph; spaces at
/// the split edges are dropped, as are paragraphs left empty. Markers in
/// places that hold no paragraph (headers, captions, notes) are unwrapped
/// and render inline.
pub fn split_raw_blocks(blocks: &mut Vec<Block>) {
    walk_blocks_mut(blocks, &mut |list: &mut Vec<Block>| {
        let needs_split = list
            .iter()
            .any(|b| matches!(b, Block::Para(c) | Block::Plain(c) if contains_block_raw(c)));
        if !needs_split {
            return;
        }
        for block in std::mem::take(list) {
            match block {
                Block::Para(content) if contains_block_raw(&content) => {
                    split_into(list, content, Block::Para)
                }
                Block::Plain(content) if contains_block_raw(&content) => {
                    split_into(list, content, Block::Plain)
                }
                other => list.push(other),
            }
        }
    });
    walk_inlines_mut(blocks, &mut |list, _| {
        if !list.iter().any(is_block_raw) {
            return;
        }
        for inline in std::mem::take(list) {
            match inline {
                Inline::Span(attr, inner) if attr.has_class(BLOCK_RAW_CLASS) => list.extend(inner),
                other => list.push(other),
            }
        }
    });
}

fn split_into(out: &mut Vec<Block>, content: Vec<Inline>, wrap: fn(Vec<Inline>) -> Block) {
    for piece in split_inlines(content) {
        match piece {
            Piece::Inlines(inlines) => {
                let inlines = trim_spaces(inlines);
                if !inlines.is_empty() {
                    out.push(wrap(inlines));
                }
            }
            Piece::Raw(format, text) => out.push(Block::RawBlock(format, text)),
        }
    }
}

fn trim_spaces(mut inlines: Vec<Inline>) -> Vec<Inline> {
    while inlines.last().is_some_and(Inline::is_space) {
        inlines.pop();
    }
    let start = inlines.iter().take_while(|i| i.is_space()).count();
    inlines.drain(..start);
    inlines
}
