//! Label numbering
//!
//! Reads `{#label ...}` blocks written after math and at the end of table
//! captions, wraps the element in a `labelled-*` container and numbers it.
//! Images carry their label in their own attributes and are only numbered.
//!
//! Elements are numbered per type in document order, so this pass does its
//! own traversal instead of using the bottom-up walkers.

use ipub_ast::{Attr, Block, Inline, Pandoc};

use crate::attributes::{AttributeBlock, scan_left, scan_right};
use crate::context::FilterContext;
use crate::definitions::{LABELLED_MATH_CLASS, LABELLED_TABLE_CLASS, RefType};
use crate::error::Result;
use crate::pipeline::{Pass, Stage};

/// Label numbering pass
#[derive(Debug, Clone, Copy, Default)]
pub struct PrepareLabels;

impl Pass for PrepareLabels {
    fn name(&self) -> &str {
        "prepare-labels"
    }

    fn stage(&self) -> Stage {
        Stage::PrepareLabels
    }

    fn run(&self, doc: &mut Pandoc, ctx: &mut FilterContext) -> Result<()> {
        label_blocks(&mut doc.blocks, ctx);
        tracing::debug!(
            math = ctx.count(RefType::Math),
            images = ctx.count(RefType::Image),
            tables = ctx.count(RefType::Table),
            "Labelled elements"
        );
        Ok(())
    }
}

fn labelled_attr(ref_type: RefType, block: AttributeBlock) -> Attr {
    let mut classes = vec![ref_type.labelled_class().to_string()];
    classes.extend(block.classes);
    Attr::new(block.id, classes, block.attributes)
}

fn label_blocks(blocks: &mut [Block], ctx: &mut FilterContext) {
    for block in blocks.iter_mut() {
        let mut wrapped = false;
        if let Block::Table(table) = block
            && let Some(attrs) = scan_left(&table.caption, true)
        {
            table.caption.truncate(attrs.consumed.start);
            ctx.register(&attrs.id, RefType::Table);
            let table = std::mem::replace(block, Block::Null);
            *block = Block::Div(labelled_attr(RefType::Table, attrs), vec![table]);
            wrapped = true;
        }
        match block {
            Block::Plain(content) | Block::Para(content) | Block::Header(_, _, content) => {
                label_inlines(content, ctx)
            }
            Block::LineBlock(lines) => {
                for line in lines {
                    label_inlines(line, ctx);
                }
            }
            Block::Div(attr, children) => {
                if !wrapped && attr.has_class(LABELLED_TABLE_CLASS) && !attr.identifier.is_empty() {
                    ctx.register(&attr.identifier, RefType::Table);
                }
                label_blocks(children, ctx);
            }
            Block::BlockQuote(children) => label_blocks(children, ctx),
            Block::OrderedList(_, items) | Block::BulletList(items) => {
                for item in items {
                    label_blocks(item, ctx);
                }
            }
            Block::DefinitionList(items) => {
                for (term, defs) in items {
                    label_inlines(term, ctx);
                    for def in defs {
                        label_blocks(def, ctx);
                    }
                }
            }
            Block::Table(table) => {
                label_inlines(&mut table.caption, ctx);
                for cell in table.head.iter_mut().chain(table.rows.iter_mut().flatten()) {
                    label_blocks(cell, ctx);
                }
            }
            Block::CodeBlock(..) | Block::RawBlock(..) | Block::HorizontalRule | Block::Null => {}
        }
    }
}

fn label_inlines(list: &mut Vec<Inline>, ctx: &mut FilterContext) {
    let mut i = 0;
    while i < list.len() {
        if matches!(list[i], Inline::Math(..))
            && let Some(mut attrs) = scan_right(list, i + 1, true)
        {
            list.drain(attrs.consumed.clone());
            if let Some(rest) = attrs.remainder.take() {
                list.insert(attrs.consumed.start, Inline::Str(rest));
            }
            ctx.register(&attrs.id, RefType::Math);
            let math = std::mem::replace(&mut list[i], Inline::Space);
            list[i] = Inline::Span(labelled_attr(RefType::Math, attrs), vec![math]);
            i += 1;
            continue;
        }
        match &mut list[i] {
            Inline::Image(attr, caption, _) => {
                if !attr.identifier.is_empty() {
                    ctx.register(&attr.identifier, RefType::Image);
                }
                label_inlines(caption, ctx);
            }
            Inline::Span(attr, _) if attr.has_class(LABELLED_MATH_CLASS) => {
                if !attr.identifier.is_empty() {
                    ctx.register(&attr.identifier, RefType::Math);
                }
            }
            Inline::Emph(c)
            | Inline::Strong(c)
            | Inline::Strikeout(c)
            | Inline::Superscript(c)
            | Inline::Subscript(c)
            | Inline::SmallCaps(c)
            | Inline::Quoted(_, c)
            | Inline::Cite(_, c)
            | Inline::Link(_, c, _)
            | Inline::Span(_, c) => label_inlines(c, ctx),
            Inline::Note(blocks) => label_blocks(blocks, ctx),
            _ => {}
        }
        i += 1;
    }
}
