//! Citation rendering
//!
//! Turns every citation, bare or wrapped in an `attribute-Cite` Span, into
//! raw content for the target format:
//!
//! | target | output                                                   |
//! |--------|----------------------------------------------------------|
//! | LaTeX  | `\cref{a,b}` or `\ref{a}, \ref{b} and \ref{c}`           |
//! | RST    | `:numref:`a``, `:cite:`a,b`` or joined roles             |
//! | HTML   | links to numbered elements and bibliography entries      |

use std::collections::VecDeque;

use ipub_ast::{
    Attr, Citation, Format, Inline, OutputFormat, Pandoc, Parent, escape_html, walk_inlines_mut,
};

use crate::context::FilterContext;
use crate::definitions::{
    ATTRIBUTE_CITE_CLASS, CAPITAL_CLASS, CONVERTED_CITE_CLASS, RAW_SPAN_CLASS, RefPrefix,
};
use crate::error::Result;
use crate::pipeline::{Pass, Stage};
use crate::render::and_join;

const UNKNOWN_STYLE: &str = "background-color:rgba(225, 0, 0, .5)";

/// Classes that steer rendering rather than belong to the output
const INTERNAL_CLASSES: [&str; 4] = [
    ATTRIBUTE_CITE_CLASS,
    CONVERTED_CITE_CLASS,
    RAW_SPAN_CLASS,
    CAPITAL_CLASS,
];

/// Attributes that steer rendering rather than belong to the output
const STYLE_KEYS: [&str; 6] = ["prefix", "latex", "rst", "format", "alt", "original"];

/// Citation rendering pass
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatCites;

impl Pass for FormatCites {
    fn name(&self) -> &str {
        "format-cites"
    }

    fn stage(&self) -> Stage {
        Stage::FormatCites
    }

    fn run(&self, doc: &mut Pandoc, ctx: &mut FilterContext) -> Result<()> {
        walk_inlines_mut(&mut doc.blocks, &mut |list, parent| {
            if let Parent::Span(attr) = parent
                && attr.has_class(ATTRIBUTE_CITE_CLASS)
            {
                return;
            }
            format_list(list, ctx);
        });
        Ok(())
    }
}

/// Replace `attribute-Cite` Spans by their content.
///
/// Only needed when citations were prepared but not rendered.
pub fn strip_cite_spans(doc: &mut Pandoc) {
    walk_inlines_mut(&mut doc.blocks, &mut |list, _| {
        if !list.iter().any(is_cite_span) {
            return;
        }
        for inline in std::mem::take(list) {
            match inline {
                Inline::Span(attr, content) if attr.has_class(ATTRIBUTE_CITE_CLASS) => {
                    list.extend(content)
                }
                other => list.push(other),
            }
        }
    });
}

fn is_cite_span(inline: &Inline) -> bool {
    matches!(inline, Inline::Span(attr, _) if attr.has_class(ATTRIBUTE_CITE_CLASS))
}

fn format_list(list: &mut Vec<Inline>, ctx: &mut FilterContext) {
    let needs_work = list
        .iter()
        .any(|i| matches!(i, Inline::Cite(..)) || is_cite_span(i));
    if !needs_work {
        return;
    }
    let mut rest: VecDeque<Inline> = std::mem::take(list).into();
    while let Some(inline) = rest.pop_front() {
        let (attr, citations, content) = match inline {
            Inline::Cite(citations, content) => (Attr::default(), citations, content),
            Inline::Span(attr, content) if attr.has_class(ATTRIBUTE_CITE_CLASS) => {
                match split_cite(content) {
                    Ok((citations, cite_content)) => (attr, citations, cite_content),
                    Err(content) => {
                        list.extend(content);
                        continue;
                    }
                }
            }
            other => {
                list.push(other);
                continue;
            }
        };
        let ids: Vec<String> = citations.into_iter().map(|c| c.citation_id).collect();
        let style = CiteStyle::new(&attr, ctx.options().use_numref);
        match ctx.format() {
            OutputFormat::Latex => list.push(style.latex(&ids)),
            OutputFormat::Rst => {
                let raw = style.rst(&ids);
                if style.role == "cite" {
                    let spaced_before = list.last().is_none_or(Inline::is_space);
                    let spaced_after = rest.front().is_none_or(Inline::is_space);
                    if !spaced_before {
                        list.push(Inline::Space);
                    }
                    list.push(raw);
                    if !spaced_after {
                        list.push(Inline::Space);
                    }
                } else {
                    list.push(raw);
                }
            }
            OutputFormat::Html if attr.has_class(CONVERTED_CITE_CLASS) => {
                list.push(html(format!(
                    r#"<cite data-cite="{}">"#,
                    escape_html(&ids.join(","))
                )));
                list.extend(converted_content(&attr, &ids, content));
                list.push(html("</cite>".to_string()));
            }
            OutputFormat::Html => {
                let rendered = style.html(&ids, ctx);
                match user_attributes(&attr) {
                    Some(open) => {
                        list.push(html(format!("<span{open}>")));
                        list.extend(rendered);
                        list.push(html("</span>".to_string()));
                    }
                    None => list.extend(rendered),
                }
            }
        }
    }
}

/// Take the Cite out of a wrapper's content; hands the content back if it has none
fn split_cite(content: Vec<Inline>) -> std::result::Result<(Vec<Citation>, Vec<Inline>), Vec<Inline>> {
    let Some(pos) = content.iter().position(|i| matches!(i, Inline::Cite(..))) else {
        return Err(content);
    };
    match content.into_iter().nth(pos) {
        Some(Inline::Cite(citations, inner)) => Ok((citations, inner)),
        _ => Err(Vec::new()),
    }
}

/// Text shown inside the `<cite>` of a reference written in raw markup:
/// the tag's own content, a link's text, or the ids
fn converted_content(attr: &Attr, ids: &[String], content: Vec<Inline>) -> Vec<Inline> {
    if !content.is_empty() {
        content
    } else if let Some(alt) = attr.get("alt").filter(|alt| !alt.is_empty()) {
        vec![Inline::str(alt)]
    } else {
        vec![Inline::str(ids.join(", "))]
    }
}

/// Classes and attributes written by the author on an `attribute-Cite`
/// wrapper, as HTML attributes
fn user_attributes(attr: &Attr) -> Option<String> {
    let mut out = String::new();
    if !attr.identifier.is_empty() {
        out.push_str(&format!(r#" id="{}""#, escape_html(&attr.identifier)));
    }
    let classes: Vec<&str> = attr
        .classes
        .iter()
        .map(String::as_str)
        .filter(|c| !INTERNAL_CLASSES.contains(c))
        .collect();
    if !classes.is_empty() {
        out.push_str(&format!(r#" class="{}""#, escape_html(&classes.join(" "))));
    }
    for (key, value) in &attr.attributes {
        if !STYLE_KEYS.contains(&key.as_str()) {
            out.push_str(&format!(r#" data-{key}="{}""#, escape_html(value)));
        }
    }
    (!out.is_empty()).then_some(out)
}

fn html(text: String) -> Inline {
    Inline::RawInline(Format::html(), text)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Command, role and casing chosen for one citation group
struct CiteStyle {
    tag: String,
    role: String,
    capital: bool,
}

impl CiteStyle {
    fn new(attr: &Attr, use_numref: bool) -> Self {
        let prefix = attr
            .get("prefix")
            .and_then(RefPrefix::from_marker)
            .unwrap_or(RefPrefix::Cite);
        let tag = attr.get("latex").unwrap_or(prefix.latex_command()).to_string();
        let mut role = attr.get("rst").unwrap_or(prefix.rst_role()).to_string();
        if role == "numref" && !use_numref {
            role = "ref".to_string();
        }
        let capital = attr.has_class(CAPITAL_CLASS)
            || matches!(prefix, RefPrefix::CrefCapital | RefPrefix::GlsCapital);
        Self { tag, role, capital }
    }

    fn latex(&self, ids: &[String]) -> Inline {
        let tag = &self.tag;
        let tex = if matches!(tag.as_str(), "cite" | "cref" | "Cref") || ids.len() == 1 {
            format!("\\{tag}{{{}}}", ids.join(","))
        } else {
            let parts: Vec<String> = ids.iter().map(|id| format!("\\{tag}{{{id}}}")).collect();
            and_join(&parts)
        };
        Inline::RawInline(Format::new("tex"), tex)
    }

    fn rst(&self, ids: &[String]) -> Inline {
        let role = &self.role;
        let text = if ids.len() == 1 || role == "cite" {
            format!(":{role}:`{}`", ids.join(","))
        } else {
            let parts: Vec<String> = ids.iter().map(|id| format!(":{role}:`{id}`")).collect();
            and_join(&parts)
        };
        Inline::RawInline(Format::rst(), text)
    }

    /// Bibliography numbers, then numbered elements grouped by type, then
    /// anything that could not be resolved
    fn html(&self, ids: &[String], ctx: &mut FilterContext) -> Vec<Inline> {
        let mut bib: Vec<String> = Vec::new();
        let mut names: Vec<(String, Vec<String>)> = Vec::new();
        let mut unknown: Vec<&str> = Vec::new();
        for id in ids {
            if let Some(reference) = ctx.reference(id) {
                let name = reference.ref_type.html_name();
                let name = if self.capital {
                    capitalize(name)
                } else {
                    name.to_string()
                };
                let link = format!(r##"<a href="#{id}">{}</a>"##, reference.number);
                match names.iter_mut().find(|(n, _)| *n == name) {
                    Some((_, links)) if links.contains(&link) => {}
                    Some((_, links)) => links.push(link),
                    None => names.push((name, vec![link])),
                }
            } else if let Some(href) = ctx.bibliography().get(id).map(|e| e.href()) {
                let number = ctx.bib_number(id);
                let entry = match href {
                    Some(href) => format!(r#"<a href="{href}">{number}</a>"#),
                    None => number.to_string(),
                };
                if !bib.contains(&entry) {
                    bib.push(entry);
                }
            } else if !unknown.contains(&id.as_str()) {
                tracing::debug!(label = %id, "No reference or bibliography entry");
                unknown.push(id);
            }
        }

        let mut out = Vec::new();
        if !bib.is_empty() {
            out.push(html(format!("<span>[{}]</span>", bib.join(","))));
        }
        for (name, links) in names {
            out.push(html(format!("<span>{name} {}</span>", links.join(","))));
        }
        if !unknown.is_empty() {
            out.push(html(format!(
                r#"<span style="{UNKNOWN_STYLE}">{}</span>"#,
                unknown.join(", ")
            )));
        }
        out
    }
}
