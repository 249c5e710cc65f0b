//! HTML writer

use crate::ast::{Alignment, Attr, Block, Inline, MathType, QuoteType, Table};
use crate::stringify::stringify;
use crate::writer::sole_image;

/// Attribute keys written as-is; anything else gets a `data-` prefix
const PLAIN_ATTRIBUTES: [&str; 7] = ["style", "title", "lang", "dir", "width", "height", "href"];

#[derive(Debug, Default)]
pub struct HtmlWriter {
    notes: Vec<String>,
}

impl HtmlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_document(mut self, blocks: &[Block]) -> String {
        let mut out = self.blocks(blocks);
        if !self.notes.is_empty() {
            out.push_str("\n<section class=\"footnotes\">\n<hr />\n<ol>\n");
            for (i, note) in self.notes.iter().enumerate() {
                let n = i + 1;
                out.push_str(&format!(
                    "<li id=\"fn{n}\">{note}<a href=\"#fnref{n}\" class=\"footnote-back\">↩</a></li>\n"
                ));
            }
            out.push_str("</ol>\n</section>");
        }
        out
    }

    pub fn blocks(&mut self, blocks: &[Block]) -> String {
        blocks
            .iter()
            .map(|b| self.block(b))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn block(&mut self, block: &Block) -> String {
        match block {
            Block::Plain(content) => self.inlines(content),
            Block::Para(content) => match sole_image(content) {
                Some(Inline::Image(attr, caption, (url, _))) => {
                    let alt = escape_html(&stringify(caption));
                    format!(
                        "<figure>\n<img src=\"{}\" alt=\"{alt}\"{} />\n<figcaption>{}</figcaption>\n</figure>",
                        escape_html(url),
                        attributes(attr),
                        self.inlines(caption)
                    )
                }
                _ => format!("<p>{}</p>", self.inlines(content)),
            },
            Block::LineBlock(lines) => {
                let lines: Vec<String> = lines.iter().map(|l| self.inlines(l)).collect();
                format!("<div class=\"line-block\">{}</div>", lines.join("<br />\n"))
            }
            Block::CodeBlock(attr, code) => {
                format!("<pre{}><code>{}</code></pre>", attributes(attr), escape_html(code))
            }
            Block::RawBlock(format, text) if format.is_html() => text.clone(),
            Block::RawBlock(..) => String::new(),
            Block::BlockQuote(blocks) => {
                format!("<blockquote>\n{}\n</blockquote>", self.blocks(blocks))
            }
            Block::OrderedList((start, _, _), items) => {
                let open = if *start == 1 {
                    "<ol>".to_string()
                } else {
                    format!("<ol start=\"{start}\">")
                };
                format!("{open}\n{}\n</ol>", self.items(items))
            }
            Block::BulletList(items) => format!("<ul>\n{}\n</ul>", self.items(items)),
            Block::DefinitionList(items) => {
                let mut out = String::from("<dl>\n");
                for (term, defs) in items {
                    out.push_str(&format!("<dt>{}</dt>\n", self.inlines(term)));
                    for def in defs {
                        out.push_str(&format!("<dd>\n{}\n</dd>\n", self.blocks(def)));
                    }
                }
                out.push_str("</dl>");
                out
            }
            Block::Header(level, attr, content) => {
                let level = (*level).clamp(1, 6);
                format!(
                    "<h{level}{}>{}</h{level}>",
                    attributes(attr),
                    self.inlines(content)
                )
            }
            Block::HorizontalRule => "<hr />".to_string(),
            Block::Table(table) => self.table(table),
            Block::Div(attr, blocks) => {
                format!("<div{}>\n{}\n</div>", attributes(attr), self.blocks(blocks))
            }
            Block::Null => String::new(),
        }
    }

    fn items(&mut self, items: &[Vec<Block>]) -> String {
        items
            .iter()
            .map(|item| format!("<li>{}</li>", self.blocks(item)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn table(&mut self, table: &Table) -> String {
        let mut out = String::from("<table>\n");
        if !table.caption.is_empty() {
            out.push_str(&format!("<caption>{}</caption>\n", self.inlines(&table.caption)));
        }
        if table.has_widths() {
            out.push_str("<colgroup>\n");
            for w in &table.widths {
                out.push_str(&format!("<col style=\"width: {:.0}%\" />\n", w * 100.0));
            }
            out.push_str("</colgroup>\n");
        }
        if table.head.iter().any(|c| !c.is_empty()) {
            out.push_str("<thead>\n<tr class=\"header\">\n");
            for (i, cell) in table.head.iter().enumerate() {
                out.push_str(&self.cell("th", table.aligns.get(i), cell));
            }
            out.push_str("</tr>\n</thead>\n");
        }
        out.push_str("<tbody>\n");
        for (r, row) in table.rows.iter().enumerate() {
            let parity = if r % 2 == 0 { "odd" } else { "even" };
            out.push_str(&format!("<tr class=\"{parity}\">\n"));
            for (i, cell) in row.iter().enumerate() {
                out.push_str(&self.cell("td", table.aligns.get(i), cell));
            }
            out.push_str("</tr>\n");
        }
        out.push_str("</tbody>\n</table>");
        out
    }

    fn cell(&mut self, tag: &str, align: Option<&Alignment>, blocks: &[Block]) -> String {
        let style = match align {
            Some(Alignment::AlignLeft) => " style=\"text-align: left;\"",
            Some(Alignment::AlignRight) => " style=\"text-align: right;\"",
            Some(Alignment::AlignCenter) => " style=\"text-align: center;\"",
            _ => "",
        };
        format!("<{tag}{style}>{}</{tag}>\n", self.blocks(blocks))
    }

    pub fn inlines(&mut self, inlines: &[Inline]) -> String {
        inlines.iter().map(|i| self.inline(i)).collect()
    }

    fn inline(&mut self, inline: &Inline) -> String {
        match inline {
            Inline::Str(s) => escape_html(s),
            Inline::Emph(c) => format!("<em>{}</em>", self.inlines(c)),
            Inline::Strong(c) => format!("<strong>{}</strong>", self.inlines(c)),
            Inline::Strikeout(c) => format!("<del>{}</del>", self.inlines(c)),
            Inline::Superscript(c) => format!("<sup>{}</sup>", self.inlines(c)),
            Inline::Subscript(c) => format!("<sub>{}</sub>", self.inlines(c)),
            Inline::SmallCaps(c) => format!("<span class=\"smallcaps\">{}</span>", self.inlines(c)),
            Inline::Quoted(QuoteType::DoubleQuote, c) => format!("“{}”", self.inlines(c)),
            Inline::Quoted(QuoteType::SingleQuote, c) => format!("‘{}’", self.inlines(c)),
            Inline::Cite(citations, c) => {
                let ids: Vec<&str> = citations.iter().map(|c| c.citation_id.as_str()).collect();
                format!(
                    "<span class=\"citation\" data-cites=\"{}\">{}</span>",
                    escape_html(&ids.join(" ")),
                    self.inlines(c)
                )
            }
            Inline::Code(attr, code) => {
                format!("<code{}>{}</code>", attributes(attr), escape_html(code))
            }
            Inline::Space => " ".to_string(),
            Inline::SoftBreak => "\n".to_string(),
            Inline::LineBreak => "<br />\n".to_string(),
            Inline::Math(MathType::InlineMath, tex) => {
                format!("<span class=\"math inline\">\\({}\\)</span>", escape_html(tex))
            }
            Inline::Math(MathType::DisplayMath, tex) => {
                format!("<span class=\"math display\">\\[{}\\]</span>", escape_html(tex))
            }
            Inline::RawInline(format, text) if format.is_html() => text.clone(),
            Inline::RawInline(..) => String::new(),
            Inline::Link(attr, c, (url, title)) => format!(
                "<a href=\"{}\"{}{}>{}</a>",
                escape_html(url),
                title_attr(title),
                attributes(attr),
                self.inlines(c)
            ),
            Inline::Image(attr, alt, (url, title)) => format!(
                "<img src=\"{}\"{} alt=\"{}\"{} />",
                escape_html(url),
                title_attr(title),
                escape_html(&stringify(alt)),
                attributes(attr)
            ),
            Inline::Note(blocks) => {
                let note = self.blocks(blocks);
                self.notes.push(note);
                let n = self.notes.len();
                format!(
                    "<a href=\"#fn{n}\" class=\"footnote-ref\" id=\"fnref{n}\"><sup>{n}</sup></a>"
                )
            }
            Inline::Span(attr, c) => format!("<span{}>{}</span>", attributes(attr), self.inlines(c)),
        }
    }
}

fn title_attr(title: &str) -> String {
    if title.is_empty() {
        String::new()
    } else {
        format!(" title=\"{}\"", escape_html(title))
    }
}

/// Render an [`Attr`] as HTML attributes, with a leading space when non-empty
pub fn attributes(attr: &Attr) -> String {
    let mut out = String::new();
    if !attr.identifier.is_empty() {
        out.push_str(&format!(" id=\"{}\"", escape_html(&attr.identifier)));
    }
    if !attr.classes.is_empty() {
        out.push_str(&format!(" class=\"{}\"", escape_html(&attr.classes.join(" "))));
    }
    for (key, value) in &attr.attributes {
        let key = if PLAIN_ATTRIBUTES.contains(&key.as_str()) || key.starts_with("data-") {
            key.clone()
        } else {
            format!("data-{key}")
        };
        out.push_str(&format!(" {key}=\"{}\"", escape_html(value)));
    }
    out
}

/// Escape `&`, `<`, `>` and `"`
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Format;

    #[test]
    fn test_span_attributes() {
        let span = Inline::Span(
            Attr::new(
                "",
                vec!["attribute-Cite".into()],
                vec![("prefix".into(), "+".into())],
            ),
            vec![Inline::str("x")],
        );
        assert_eq!(
            HtmlWriter::new().inline(&span),
            "<span class=\"attribute-Cite\" data-prefix=\"+\">x</span>"
        );
    }

    #[test]
    fn test_image_attribute_order() {
        let image = Inline::Image(
            Attr::new(
                "label1",
                vec!["class-name".into()],
                vec![("a".into(), "5".into())],
            ),
            vec![Inline::str("a"), Inline::Space, Inline::str("title")],
            ("path/to/image.png".into(), "fig:".into()),
        );
        assert_eq!(
            HtmlWriter::new().inline(&image),
            "<img src=\"path/to/image.png\" title=\"fig:\" alt=\"a title\" id=\"label1\" class=\"class-name\" data-a=\"5\" />"
        );
    }

    #[test]
    fn test_raw_filtering() {
        let para = Block::Para(vec![
            Inline::raw(Format::html(), "<b>"),
            Inline::str("x"),
            Inline::raw(Format::latex(), "\\y"),
            Inline::raw(Format::html(), "</b>"),
        ]);
        assert_eq!(HtmlWriter::new().write_document(&[para]), "<p><b>x</b></p>");
    }
}
