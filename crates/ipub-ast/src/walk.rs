//! Bottom-up traversal over inline and block lists
//!
//! Nested lists are always visited before the list that contains them, so a
//! callback may rewrite its list freely without invalidating the traversal.

use crate::ast::{Attr, Block, Inline};

/// Where an inline list sits in the tree
#[derive(Debug, Clone, Copy)]
pub enum Parent<'a> {
    /// Content of a paragraph-like block (Para, Plain, Header, ...)
    Block,
    /// Caption of a table
    TableCaption,
    /// Content of a span
    Span(&'a Attr),
    /// Content of any other inline container (emphasis, link text, ...)
    Inline,
}

/// Visit every inline list below `blocks`, children first
pub fn walk_inlines_mut<F>(blocks: &mut [Block], f: &mut F)
where
    F: FnMut(&mut Vec<Inline>, Parent<'_>),
{
    for block in blocks {
        walk_block_inlines(block, f);
    }
}

fn walk_block_inlines<F>(block: &mut Block, f: &mut F)
where
    F: FnMut(&mut Vec<Inline>, Parent<'_>),
{
    match block {
        Block::Plain(content) | Block::Para(content) | Block::Header(_, _, content) => {
            walk_inline_list(content, Parent::Block, f)
        }
        Block::LineBlock(lines) => {
            for line in lines {
                walk_inline_list(line, Parent::Block, f);
            }
        }
        Block::BlockQuote(blocks) | Block::Div(_, blocks) => walk_inlines_mut(blocks, f),
        Block::OrderedList(_, items) | Block::BulletList(items) => {
            for item in items {
                walk_inlines_mut(item, f);
            }
        }
        Block::DefinitionList(items) => {
            for (term, defs) in items {
                walk_inline_list(term, Parent::Block, f);
                for def in defs {
                    walk_inlines_mut(def, f);
                }
            }
        }
        Block::Table(table) => {
            walk_inline_list(&mut table.caption, Parent::TableCaption, f);
            for cell in &mut table.head {
                walk_inlines_mut(cell, f);
            }
            for row in &mut table.rows {
                for cell in row {
                    walk_inlines_mut(cell, f);
                }
            }
        }
        Block::CodeBlock(..) | Block::RawBlock(..) | Block::HorizontalRule | Block::Null => {}
    }
}

fn walk_inline_list<F>(list: &mut Vec<Inline>, parent: Parent<'_>, f: &mut F)
where
    F: FnMut(&mut Vec<Inline>, Parent<'_>),
{
    for inline in list.iter_mut() {
        match inline {
            Inline::Span(attr, content) => walk_inline_list(content, Parent::Span(attr), f),
            Inline::Emph(c)
            | Inline::Strong(c)
            | Inline::Strikeout(c)
            | Inline::Superscript(c)
            | Inline::Subscript(c)
            | Inline::SmallCaps(c)
            | Inline::Quoted(_, c)
            | Inline::Cite(_, c)
            | Inline::Link(_, c, _)
            | Inline::Image(_, c, _) => walk_inline_list(c, Parent::Inline, f),
            Inline::Note(blocks) => walk_inlines_mut(blocks, f),
            _ => {}
        }
    }
    f(list, parent);
}

/// Visit every block list below and including `blocks`, children first
pub fn walk_blocks_mut<F>(blocks: &mut Vec<Block>, f: &mut F)
where
    F: FnMut(&mut Vec<Block>),
{
    for block in blocks.iter_mut() {
        match block {
            Block::BlockQuote(children) | Block::Div(_, children) => walk_blocks_mut(children, f),
            Block::OrderedList(_, items) | Block::BulletList(items) => {
                for item in items {
                    walk_blocks_mut(item, f);
                }
            }
            Block::DefinitionList(items) => {
                for (_, defs) in items {
                    for def in defs {
                        walk_blocks_mut(def, f);
                    }
                }
            }
            Block::Table(table) => {
                for cell in table.head.iter_mut().chain(table.rows.iter_mut().flatten()) {
                    walk_blocks_mut(cell, f);
                }
            }
            _ => {}
        }
    }
    f(blocks);
}
