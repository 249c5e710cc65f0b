//! Plain-text flattening of inline and block content

use crate::ast::{Block, Inline, QuoteType};

/// Concatenate the textual content of inlines
pub fn stringify(inlines: &[Inline]) -> String {
    let mut out = String::new();
    push_inlines(&mut out, inlines);
    out
}

/// Concatenate the textual content of blocks, one line per block
pub fn stringify_blocks(blocks: &[Block]) -> String {
    let mut parts = Vec::new();
    for block in blocks {
        let mut out = String::new();
        push_block(&mut out, block);
        if !out.is_empty() {
            parts.push(out);
        }
    }
    parts.join("\n")
}

fn push_inlines(out: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        push_inline(out, inline);
    }
}

fn push_inline(out: &mut String, inline: &Inline) {
    match inline {
        Inline::Str(s) => out.push_str(s),
        Inline::Space | Inline::SoftBreak | Inline::LineBreak => out.push(' '),
        Inline::Code(_, s) | Inline::Math(_, s) => out.push_str(s),
        Inline::RawInline(..) | Inline::Note(_) => {}
        Inline::Quoted(kind, content) => {
            let q = match kind {
                QuoteType::SingleQuote => '\'',
                QuoteType::DoubleQuote => '"',
            };
            out.push(q);
            push_inlines(out, content);
            out.push(q);
        }
        Inline::Emph(c)
        | Inline::Strong(c)
        | Inline::Strikeout(c)
        | Inline::Superscript(c)
        | Inline::Subscript(c)
        | Inline::SmallCaps(c)
        | Inline::Cite(_, c)
        | Inline::Link(_, c, _)
        | Inline::Image(_, c, _)
        | Inline::Span(_, c) => push_inlines(out, c),
    }
}

fn push_block(out: &mut String, block: &Block) {
    match block {
        Block::Plain(c) | Block::Para(c) | Block::Header(_, _, c) => push_inlines(out, c),
        Block::CodeBlock(_, s) => out.push_str(s),
        Block::LineBlock(lines) => {
            let lines: Vec<String> = lines.iter().map(|l| stringify(l)).collect();
            out.push_str(&lines.join("\n"));
        }
        Block::BlockQuote(blocks) | Block::Div(_, blocks) => {
            out.push_str(&stringify_blocks(blocks))
        }
        Block::OrderedList(_, items) | Block::BulletList(items) => {
            let items: Vec<String> = items.iter().map(|i| stringify_blocks(i)).collect();
            out.push_str(&items.join("\n"));
        }
        Block::DefinitionList(items) => {
            for (term, defs) in items {
                push_inlines(out, term);
                for def in defs {
                    out.push('\n');
                    out.push_str(&stringify_blocks(def));
                }
            }
        }
        Block::Table(table) => push_inlines(out, &table.caption),
        Block::RawBlock(..) | Block::HorizontalRule | Block::Null => {}
    }
}
