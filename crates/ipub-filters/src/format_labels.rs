//! Rendering of labelled math, images and tables
//!
//! Reads the `labelled-*` containers left by the label pass (and plain
//! display math and images) and writes each element the way the target
//! format numbers and anchors it: `\label` in LaTeX, `.. math::` / link
//! targets in RST and anchors in HTML. The containers are removed.

use std::sync::LazyLock;

use ipub_ast::{
    Alignment, Attr, Block, Format, Inline, MathType, OutputFormat, Pandoc, Parent, Table, Target,
    render_blocks, render_inlines, walk_blocks_mut, walk_inlines_mut,
};
use regex::Regex;

use crate::context::FilterContext;
use crate::definitions::{LABELLED_IMAGE_CLASS, LABELLED_MATH_CLASS, LABELLED_TABLE_CLASS};
use crate::error::{FilterError, Result};
use crate::pipeline::{Pass, Stage};
use crate::render::{ANCHOR_END, anchor_start, block_raw, split_raw_blocks};
use crate::units::{Unit, convert_units};

static WIDTH_SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,\s]+").unwrap());

/// Labelled element rendering pass
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatLabels;

impl Pass for FormatLabels {
    fn name(&self) -> &str {
        "format-labels"
    }

    fn stage(&self) -> Stage {
        Stage::FormatLabels
    }

    fn run(&self, doc: &mut Pandoc, ctx: &mut FilterContext) -> Result<()> {
        let format = ctx.format();
        let mut failure = None;
        walk_inlines_mut(&mut doc.blocks, &mut |list, parent| {
            if failure.is_some() || is_labelled_parent(&parent) {
                return;
            }
            if let Err(err) = format_inlines(list, format) {
                failure = Some(err);
            }
        });
        walk_blocks_mut(&mut doc.blocks, &mut |list| {
            if failure.is_some() {
                return;
            }
            if let Err(err) = format_tables(list, format) {
                failure = Some(err);
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }
        strip_labelled_spans(doc);
        split_raw_blocks(&mut doc.blocks);
        Ok(())
    }
}

/// Replace `labelled-*` Spans and Divs by their content
pub fn strip_labelled_spans(doc: &mut Pandoc) {
    walk_inlines_mut(&mut doc.blocks, &mut |list, _| {
        if !list.iter().any(is_labelled_span) {
            return;
        }
        for inline in std::mem::take(list) {
            match inline {
                Inline::Span(attr, content) if is_labelled(&attr) => list.extend(content),
                other => list.push(other),
            }
        }
    });
    walk_blocks_mut(&mut doc.blocks, &mut |list| {
        let wrapped = |b: &Block| matches!(b, Block::Div(attr, _) if attr.has_class(LABELLED_TABLE_CLASS));
        if !list.iter().any(wrapped) {
            return;
        }
        for block in std::mem::take(list) {
            match block {
                Block::Div(attr, content) if attr.has_class(LABELLED_TABLE_CLASS) => {
                    list.extend(content)
                }
                other => list.push(other),
            }
        }
    });
}

fn is_labelled(attr: &Attr) -> bool {
    attr.has_class(LABELLED_MATH_CLASS) || attr.has_class(LABELLED_IMAGE_CLASS)
}

fn is_labelled_span(inline: &Inline) -> bool {
    matches!(inline, Inline::Span(attr, _) if is_labelled(attr))
}

fn is_labelled_parent(parent: &Parent<'_>) -> bool {
    matches!(parent, Parent::Span(attr) if is_labelled(attr))
}

fn format_inlines(list: &mut Vec<Inline>, format: OutputFormat) -> Result<()> {
    let needs_work = list.iter().any(|i| {
        matches!(i, Inline::Math(MathType::DisplayMath, _) | Inline::Image(..)) || is_labelled_span(i)
    });
    if !needs_work {
        return Ok(());
    }
    for inline in std::mem::take(list) {
        match inline {
            Inline::Span(attr, content) if is_labelled(&attr) => {
                for inner in content {
                    list.extend(format_element(inner, Some(&attr), format)?);
                }
            }
            other => list.extend(format_element(other, None, format)?),
        }
    }
    Ok(())
}

fn format_element(inline: Inline, span: Option<&Attr>, format: OutputFormat) -> Result<Vec<Inline>> {
    match inline {
        Inline::Math(MathType::DisplayMath, tex) => Ok(format_math(tex, span, format)),
        Inline::Image(attr, caption, target) => format_image(attr, caption, target, span, format),
        other => Ok(vec![other]),
    }
}

fn format_math(tex: String, span: Option<&Attr>, format: OutputFormat) -> Vec<Inline> {
    let label = span.map(|s| s.identifier.as_str()).filter(|l| !l.is_empty());
    let env = span.and_then(|s| s.get("env")).unwrap_or("equation");
    let star = if span.is_some_and(|s| s.has_class("unnumbered")) {
        "*"
    } else {
        ""
    };
    let label_tag = match (label, format) {
        (Some(label), OutputFormat::Latex) => format!("\\label{{{label}}}"),
        _ => String::new(),
    };
    let body = format!("\\begin{{{env}{star}}}{tex}{label_tag}\\end{{{env}{star}}}");

    match format {
        OutputFormat::Latex => vec![Inline::RawInline(Format::new("tex"), body)],
        OutputFormat::Rst => {
            let options = match label {
                Some(label) => format!("   :nowrap:\n   :label: {label}"),
                None => "   :nowrap:".to_string(),
            };
            vec![block_raw(
                Format::rst(),
                &format!(".. math::\n{options}\n\n   {body}"),
            )]
        }
        OutputFormat::Html => match label {
            Some(label) => vec![
                Inline::RawInline(Format::html(), anchor_start(label)),
                Inline::Math(MathType::DisplayMath, body),
                Inline::RawInline(Format::html(), ANCHOR_END.to_string()),
            ],
            None => vec![Inline::Math(MathType::DisplayMath, tex)],
        },
    }
}

fn format_image(
    mut attr: Attr,
    caption: Vec<Inline>,
    target: Target,
    span: Option<&Attr>,
    format: OutputFormat,
) -> Result<Vec<Inline>> {
    let source = span.unwrap_or(&attr);
    let label = source.identifier.clone();
    match format {
        OutputFormat::Latex => {
            let options = source.get("placement").unwrap_or_default();
            let size = if let Some(width) = source.get("width") {
                format!("width={}\\linewidth", convert_units(width, Unit::Fraction)?)
            } else if let Some(height) = source.get("height") {
                format!("height={}\\paperheight", convert_units(height, Unit::Fraction)?)
            } else {
                String::new()
            };
            let caption = render_inlines(&caption, OutputFormat::Latex).trim().to_string();
            let image = format!(
                "\\begin{{center}}\n\\adjustimage{{max size={{0.9\\linewidth}}{{0.9\\paperheight}},{size}}}{{{}}}\n\\end{{center}}",
                target.0
            );
            let figure = if label.is_empty() {
                format!(
                    "\\begin{{figure}}[{options}]\n{image}\n\\caption{{{caption}}}\n\\end{{figure}}"
                )
            } else {
                format!(
                    "\\begin{{figure}}[{options}]\n\\hypertarget{{{label}}}{{%\n{image}\n\\caption{{{caption}}}\\label{{{label}}}\n}}\n\\end{{figure}}"
                )
            };
            Ok(vec![Inline::RawInline(Format::new("tex"), figure)])
        }
        // TODO: convert width/height to percentages for the RST figure options
        OutputFormat::Rst => Ok(vec![Inline::Image(attr, caption, target)]),
        OutputFormat::Html if !label.is_empty() => {
            attr.identifier.clear();
            Ok(vec![
                Inline::RawInline(Format::html(), anchor_start(&label)),
                Inline::Image(attr, caption, target),
                Inline::RawInline(Format::html(), ANCHOR_END.to_string()),
            ])
        }
        OutputFormat::Html => Ok(vec![Inline::Image(attr, caption, target)]),
    }
}

fn format_tables(list: &mut Vec<Block>, format: OutputFormat) -> Result<()> {
    let labelled = |b: &Block| matches!(b, Block::Div(attr, _) if attr.has_class(LABELLED_TABLE_CLASS));
    if !list.iter().any(labelled) {
        return Ok(());
    }
    for block in std::mem::take(list) {
        match block {
            Block::Div(attr, content) if attr.has_class(LABELLED_TABLE_CLASS) => {
                for inner in content {
                    match inner {
                        Block::Table(table) => list.extend(format_table(&attr, table, format)?),
                        other => list.push(other),
                    }
                }
            }
            other => list.push(other),
        }
    }
    Ok(())
}

fn parse_alignments(label: &str, spec: &str) -> Result<Vec<Alignment>> {
    spec.chars()
        .map(|c| match c {
            'l' => Ok(Alignment::AlignLeft),
            'r' => Ok(Alignment::AlignRight),
            'c' => Ok(Alignment::AlignCenter),
            _ => Err(FilterError::TableFormat {
                label: label.to_string(),
                message: format!("alignment must contain only l, r or c: {spec}"),
            }),
        })
        .collect()
}

fn parse_widths(label: &str, spec: &str) -> Result<Vec<f64>> {
    let inner = spec.trim().trim_start_matches('[').trim_end_matches(']');
    WIDTH_SEPARATOR_RE
        .split(inner.trim())
        .filter(|w| !w.is_empty())
        .map(|w| {
            w.parse::<f64>().map_err(|_| FilterError::TableFormat {
                label: label.to_string(),
                message: format!("widths must be a list of numbers: {spec}"),
            })
        })
        .collect()
}

fn format_table(attr: &Attr, mut table: Table, format: OutputFormat) -> Result<Vec<Block>> {
    let label = attr.identifier.as_str();
    if let Some(spec) = attr.get("align") {
        table.aligns = parse_alignments(label, spec)?;
    }
    let widths = attr.get("widths").map(|spec| parse_widths(label, spec)).transpose()?;
    if let Some(widths) = &widths {
        table.widths = widths.clone();
    }

    match format {
        OutputFormat::Latex => {
            table
                .caption
                .push(Inline::RawInline(Format::new("tex"), format!("\\label{{{label}}}")));
            Ok(vec![Block::Table(table)])
        }
        OutputFormat::Rst => {
            let target = Block::Para(vec![Inline::RawInline(
                Format::rst(),
                format!(".. _`{label}`:"),
            )]);
            if attr.attributes.is_empty() {
                return Ok(vec![target, Block::Table(table)]);
            }
            // The RST writer has no table options, so they are added to its output
            let rendered = render_blocks(&[Block::Table(table)], OutputFormat::Rst);
            let mut lines: Vec<String> = rendered.lines().map(String::from).collect();
            if lines.get(1).is_some_and(|l| l.trim().is_empty()) {
                lines.insert(1, "   :align: center".to_string());
                if let Some(widths) = &widths {
                    let widths: Vec<String> = widths
                        .iter()
                        .map(|w| ((w * 10.0).round() as i64).to_string())
                        .collect();
                    lines.insert(1, format!("   :widths: {}", widths.join(" ")));
                }
            }
            Ok(vec![target, Block::RawBlock(Format::rst(), lines.join("\n"))])
        }
        OutputFormat::Html => Ok(vec![
            Block::RawBlock(Format::html(), anchor_start(label)),
            Block::Table(table),
            Block::RawBlock(Format::html(), ANCHOR_END.to_string()),
        ]),
    }
}
