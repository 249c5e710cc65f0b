//! Rendering of raw markup containers
//!
//! `converted-Other` Spans go back to their original markup, or are
//! translated where the target has an equivalent (`\todo{..}` becomes an
//! RST `todo` directive, Python roles become inline code outside RST).
//! Directive and link target Divs are written for RST, shown as a
//! highlighted block in HTML and unwrapped or labelled in LaTeX.
//!
//! With `hide_raw`, markup written for another format is dropped.

use ipub_ast::{
    Attr, Block, Format, Inline, OutputFormat, Pandoc, Parent, escape_html, stringify_blocks,
    walk_blocks_mut, walk_inlines_mut,
};

use crate::context::FilterContext;
use crate::definitions::{
    CONVERTED_DIRECTIVE_CLASS, CONVERTED_OTHER_CLASS, RAW_DIV_CLASS, RAW_SPAN_CLASS,
    RST_KNOWN_ROLES,
};
use crate::error::Result;
use crate::pipeline::{Pass, Stage};
use crate::render::{ANCHOR_END, anchor_start, block_raw, matches_target, split_raw_blocks};

const DIRECTIVE_STYLE: &str = "background-color:rgba(10, 225, 10, .2)";

/// Raw markup rendering pass
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatRaw;

impl Pass for FormatRaw {
    fn name(&self) -> &str {
        "format-raw"
    }

    fn stage(&self) -> Stage {
        Stage::FormatRaw
    }

    fn run(&self, doc: &mut Pandoc, ctx: &mut FilterContext) -> Result<()> {
        let target = ctx.format();
        let hide_raw = ctx.options().hide_raw;
        walk_inlines_mut(&mut doc.blocks, &mut |list, parent| {
            if let Parent::Span(attr) = parent
                && attr.has_class(RAW_SPAN_CLASS)
            {
                return;
            }
            if !list.iter().any(is_other_span) {
                return;
            }
            for inline in std::mem::take(list) {
                match inline {
                    Inline::Span(attr, _) if attr.has_class(CONVERTED_OTHER_CLASS) => {
                        list.extend(render_span(&attr, target, hide_raw))
                    }
                    other => list.push(other),
                }
            }
        });
        walk_blocks_mut(&mut doc.blocks, &mut |list| {
            if !list.iter().any(is_raw_div) {
                return;
            }
            for block in std::mem::take(list) {
                match block {
                    Block::Div(attr, content) if is_raw_div_attr(&attr) => {
                        list.extend(render_div(&attr, content, target, hide_raw))
                    }
                    other => list.push(other),
                }
            }
        });
        split_raw_blocks(&mut doc.blocks);
        Ok(())
    }
}

fn is_other_span(inline: &Inline) -> bool {
    matches!(inline, Inline::Span(attr, _) if attr.has_class(CONVERTED_OTHER_CLASS))
}

fn is_raw_div_attr(attr: &Attr) -> bool {
    attr.has_class(RAW_DIV_CLASS)
        && (attr.has_class(CONVERTED_DIRECTIVE_CLASS) || attr.has_class(CONVERTED_OTHER_CLASS))
}

fn is_raw_div(block: &Block) -> bool {
    matches!(block, Block::Div(attr, _) if is_raw_div_attr(attr))
}

fn source_format(attr: &Attr) -> Format {
    Format::new(attr.get("format").unwrap_or_default())
}

fn render_span(attr: &Attr, target: OutputFormat, hide_raw: bool) -> Vec<Inline> {
    let format = source_format(attr);
    let content = attr.get("content").unwrap_or_default();
    let original = attr.get("original").unwrap_or_default();

    if format.is_latex() && target == OutputFormat::Rst && attr.get("tag") == Some("todo") {
        return vec![block_raw(Format::rst(), &format!(".. todo:: {content}"))];
    }
    if format.is_rst()
        && target != OutputFormat::Rst
        && attr.get("role").is_some_and(|role| RST_KNOWN_ROLES.contains(&role))
    {
        return vec![Inline::Code(Attr::default(), content.to_string())];
    }
    if hide_raw && !matches_target(&format, target) {
        return Vec::new();
    }
    vec![Inline::RawInline(format, original.to_string())]
}

fn render_div(attr: &Attr, content: Vec<Block>, target: OutputFormat, hide_raw: bool) -> Vec<Block> {
    let format = source_format(attr);
    if hide_raw && !matches_target(&format, target) {
        return Vec::new();
    }
    let original = attr.get("original").unwrap_or_default();

    if let Some(label) = attr.get("target") {
        return match target {
            OutputFormat::Rst => vec![Block::RawBlock(Format::rst(), original.to_string())],
            OutputFormat::Latex => vec![Block::RawBlock(
                Format::new("tex"),
                format!("\\label{{{label}}}"),
            )],
            OutputFormat::Html => vec![Block::RawBlock(
                Format::html(),
                format!("{}{ANCHOR_END}", anchor_start(label)),
            )],
        };
    }

    let body = directive_body(&content);
    match target {
        OutputFormat::Rst => {
            let mut text = original.to_string();
            if let Some(body) = body {
                text.push_str("\n\n");
                text.push_str(&body);
            }
            vec![Block::RawBlock(Format::rst(), text)]
        }
        OutputFormat::Html => {
            let directive = attr.get("directive").unwrap_or_default();
            let mut html = format!(
                r#"<div class="{}" style="{DIRECTIVE_STYLE}">"#,
                escape_html(directive)
            );
            html.push_str(&format!("<p>{}</p>", escape_html(original)));
            if let Some(body) = body {
                html.push_str(&format!("<p>{}</p>", escape_html(&body)));
            }
            html.push_str("</div>");
            vec![Block::RawBlock(Format::html(), html)]
        }
        OutputFormat::Latex => content,
    }
}

/// The directive body, indented by four spaces
fn directive_body(content: &[Block]) -> Option<String> {
    let rest = content.get(1..).filter(|rest| !rest.is_empty())?;
    let text = match rest {
        [Block::CodeBlock(_, code)] => code.clone(),
        blocks => stringify_blocks(blocks),
    };
    let indented = text
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("    {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    Some(indented)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::FilterOptions;
    use ipub_ast::{Meta, render_blocks};

    fn other_span(attributes: &[(&str, &str)]) -> Inline {
        Inline::Span(
            Attr::new(
                "",
                vec![RAW_SPAN_CLASS.into(), CONVERTED_OTHER_CLASS.into()],
                attributes
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            vec![],
        )
    }

    fn todo() -> Inline {
        other_span(&[
            ("format", "latex"),
            ("tag", "todo"),
            ("content", "something todo"),
            ("original", "\\todo{something todo}"),
        ])
    }

    fn directive(with_body: bool) -> Block {
        let mut content = vec![Block::Para(vec![
            Inline::str(".."),
            Inline::Space,
            Inline::str("note::"),
            Inline::Space,
            Inline::str("Title"),
        ])];
        if with_body {
            content.push(Block::CodeBlock(Attr::default(), "line one\n\nline two".into()));
        }
        Block::Div(
            Attr::new(
                "",
                vec![RAW_DIV_CLASS.into(), CONVERTED_DIRECTIVE_CLASS.into()],
                vec![
                    ("format".into(), "rst".into()),
                    ("directive".into(), "note".into()),
                    ("original".into(), ".. note:: Title".into()),
                ],
            ),
            content,
        )
    }

    fn render_with(blocks: Vec<Block>, format: OutputFormat, hide_raw: bool) -> String {
        let options = FilterOptions {
            hide_raw,
            ..Default::default()
        };
        let mut doc = Pandoc::new(Meta::new(), blocks);
        let mut ctx = FilterContext::new(format, options);
        FormatRaw.run(&mut doc, &mut ctx).unwrap();
        render_blocks(&doc.blocks, format)
    }

    fn render(blocks: Vec<Block>, format: OutputFormat) -> String {
        render_with(blocks, format, false)
    }

    #[test]
    fn test_todo_becomes_directive_in_rst() {
        let out = render(
            vec![Block::Para(vec![Inline::str("a"), Inline::Space, todo()])],
            OutputFormat::Rst,
        );
        insta::assert_snapshot!(out, @r"
        a

        .. todo:: something todo
        ");
    }

    #[test]
    fn test_latex_passthrough() {
        let out = render(vec![Block::Para(vec![todo()])], OutputFormat::Latex);
        insta::assert_snapshot!(out, @r"\todo{something todo}");
    }

    #[test]
    fn test_hide_raw_drops_foreign_markup() {
        let para = || Block::Para(vec![Inline::str("a"), Inline::Space, todo()]);
        let kept = Inline::RawInline(Format::new("latex"), "\\todo{something todo}".into());
        let mut doc = Pandoc::new(Meta::new(), vec![para()]);
        let mut ctx = FilterContext::new(OutputFormat::Html, FilterOptions::default());
        FormatRaw.run(&mut doc, &mut ctx).unwrap();
        assert_eq!(
            doc.blocks,
            vec![Block::Para(vec![Inline::str("a"), Inline::Space, kept])]
        );
        insta::assert_snapshot!(render_with(vec![para()], OutputFormat::Html, true), @"<p>a </p>");
    }

    #[test]
    fn test_python_role_as_code() {
        let span = other_span(&[
            ("format", "rst"),
            ("role", "py:class"),
            ("content", "a.B"),
            ("original", ":py:class:`a.B`"),
        ]);
        insta::assert_snapshot!(render(vec![Block::Para(vec![span.clone()])], OutputFormat::Latex), @r"\texttt{a.B}");
        insta::assert_snapshot!(render(vec![Block::Para(vec![span])], OutputFormat::Rst), @":py:class:`a.B`");
    }

    #[test]
    fn test_directive_in_rst() {
        let out = render(vec![directive(true)], OutputFormat::Rst);
        insta::assert_snapshot!(out, @r"
        .. note:: Title

            line one

            line two
        ");
    }

    #[test]
    fn test_directive_in_html() {
        let out = render(vec![directive(false)], OutputFormat::Html);
        insta::assert_snapshot!(out, @r#"<div class="note" style="background-color:rgba(10, 225, 10, .2)"><p>.. note:: Title</p></div>"#);
    }

    #[test]
    fn test_directive_hidden_outside_rst() {
        assert_eq!(render_with(vec![directive(true)], OutputFormat::Latex, true), "");
    }

    #[test]
    fn test_link_target() {
        let target = Block::Div(
            Attr::new(
                "",
                vec![RAW_DIV_CLASS.into(), CONVERTED_OTHER_CLASS.into()],
                vec![
                    ("format".into(), "rst".into()),
                    ("target".into(), "intro".into()),
                    ("original".into(), ".. _intro:".into()),
                ],
            ),
            vec![],
        );
        insta::assert_snapshot!(render(vec![target.clone()], OutputFormat::Rst), @".. _intro:");
        insta::assert_snapshot!(render(vec![target.clone()], OutputFormat::Latex), @r"\label{intro}");
        insta::assert_snapshot!(render(vec![target], OutputFormat::Html), @r##"<a id="intro" class="anchor-link" name="#intro"></a>"##);
    }
}
