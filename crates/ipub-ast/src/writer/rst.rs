//! reStructuredText writer

use tabled::builder::Builder;
use tabled::settings::Style;

use crate::ast::{Attr, Block, Inline, MathType, QuoteType, Table};
use crate::stringify::stringify;
use crate::writer::{indent, join_blocks, sole_image};

const HEADER_CHARS: [char; 6] = ['=', '-', '~', '^', '\'', '`'];

/// reStructuredText writer state
///
/// Inline images and footnotes cannot be written in place, so they are
/// collected while rendering and appended after the body.
#[derive(Debug, Default)]
pub struct RstWriter {
    substitutions: Vec<(String, String)>,
    notes: Vec<String>,
}

impl RstWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_document(mut self, blocks: &[Block]) -> String {
        let body = self.blocks(blocks);
        let mut parts = vec![body];
        for note in std::mem::take(&mut self.notes) {
            parts.push(format!(".. [#]\n{}", indent(&note, 3)));
        }
        for (name, url) in std::mem::take(&mut self.substitutions) {
            parts.push(format!(".. |{name}| image:: {url}"));
        }
        join_blocks(parts)
    }

    pub fn blocks(&mut self, blocks: &[Block]) -> String {
        join_blocks(blocks.iter().map(|b| self.block(b)))
    }

    fn block(&mut self, block: &Block) -> String {
        match block {
            Block::Plain(content) => self.inlines(content),
            Block::Para(content) => match sole_image(content) {
                Some(Inline::Image(attr, caption, (url, _))) => self.figure(attr, caption, url),
                _ => self.inlines(content),
            },
            Block::LineBlock(lines) => lines
                .iter()
                .map(|l| format!("| {}", self.inlines(l)))
                .collect::<Vec<_>>()
                .join("\n"),
            Block::CodeBlock(attr, code) => match attr.classes.first() {
                Some(lang) => format!(".. code:: {lang}\n\n{}", indent(code, 3)),
                None => format!("::\n\n{}", indent(code, 3)),
            },
            Block::RawBlock(format, text) if format.is_rst() => text.clone(),
            Block::RawBlock(format, text) => {
                format!(".. raw:: {}\n\n{}", format.as_str(), indent(text, 3))
            }
            Block::BlockQuote(blocks) => indent(&self.blocks(blocks), 3),
            Block::OrderedList((start, _, _), items) => {
                let mut out = Vec::new();
                for (i, item) in items.iter().enumerate() {
                    let marker = format!("{}. ", *start as usize + i);
                    out.push(self.list_item(&marker, item));
                }
                out.join("\n")
            }
            Block::BulletList(items) => items
                .iter()
                .map(|item| self.list_item("-  ", item))
                .collect::<Vec<_>>()
                .join("\n"),
            Block::DefinitionList(items) => {
                let mut out = Vec::new();
                for (term, defs) in items {
                    let mut entry = self.inlines(term);
                    for def in defs {
                        entry.push('\n');
                        entry.push_str(&indent(&self.blocks(def), 3));
                    }
                    out.push(entry);
                }
                out.join("\n\n")
            }
            Block::Header(level, attr, content) => {
                let text = self.inlines(content);
                let idx = (*level).clamp(1, 6) as usize - 1;
                let underline: String = std::iter::repeat_n(HEADER_CHARS[idx], text.chars().count())
                    .collect();
                if attr.identifier.is_empty() {
                    format!("{text}\n{underline}")
                } else {
                    format!(".. _{}:\n\n{text}\n{underline}", attr.identifier)
                }
            }
            Block::HorizontalRule => "--------------".to_string(),
            Block::Table(table) => self.table(table),
            Block::Div(_, blocks) => self.blocks(blocks),
            Block::Null => String::new(),
        }
    }

    fn list_item(&mut self, marker: &str, blocks: &[Block]) -> String {
        let body = indent(&self.blocks(blocks), marker.len());
        format!("{marker}{}", body.trim_start())
    }

    fn figure(&mut self, attr: &Attr, caption: &[Inline], url: &str) -> String {
        let caption = self.inlines(caption);
        let mut out = format!(".. figure:: {url}\n   :alt: {caption}\n");
        if !attr.classes.is_empty() {
            out.push_str(&format!("   :figclass: {}\n", attr.classes.join(" ")));
        }
        if !attr.identifier.is_empty() {
            out.push_str(&format!("   :name: {}\n", attr.identifier));
        }
        for key in ["width", "height"] {
            if let Some(value) = attr.get(key) {
                out.push_str(&format!("   :{key}: {value}\n"));
            }
        }
        out.push('\n');
        out.push_str(&indent(&caption, 3));
        out
    }

    fn table(&mut self, table: &Table) -> String {
        let mut builder = Builder::default();
        if table.head.iter().any(|c| !c.is_empty()) {
            let head: Vec<String> = table.head.iter().map(|c| self.cell(c)).collect();
            builder.push_record(head);
        }
        for row in &table.rows {
            let cells: Vec<String> = row.iter().map(|c| self.cell(c)).collect();
            builder.push_record(cells);
        }
        let mut grid = builder.build();
        grid.with(Style::re_structured_text());
        let grid = grid
            .to_string()
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n");

        if table.caption.is_empty() {
            grid
        } else {
            let caption = self.inlines(&table.caption);
            format!(".. table:: {}\n\n{}", caption.trim_end(), indent(&grid, 3))
        }
    }

    fn cell(&mut self, blocks: &[Block]) -> String {
        let text = self.blocks(blocks);
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() { "..".to_string() } else { text }
    }

    pub fn inlines(&mut self, inlines: &[Inline]) -> String {
        inlines.iter().map(|i| self.inline(i)).collect()
    }

    fn inline(&mut self, inline: &Inline) -> String {
        match inline {
            Inline::Str(s) => escape_rst(s),
            Inline::Emph(c) => format!("*{}*", self.inlines(c)),
            Inline::Strong(c) => format!("**{}**", self.inlines(c)),
            Inline::Strikeout(c) => format!("[STRIKEOUT:{}]", self.inlines(c)),
            Inline::Superscript(c) => format!(":sup:`{}`", self.inlines(c)),
            Inline::Subscript(c) => format!(":sub:`{}`", self.inlines(c)),
            Inline::Quoted(QuoteType::DoubleQuote, c) => format!("\"{}\"", self.inlines(c)),
            Inline::Quoted(QuoteType::SingleQuote, c) => format!("'{}'", self.inlines(c)),
            Inline::SmallCaps(c) | Inline::Cite(_, c) | Inline::Span(_, c) => self.inlines(c),
            Inline::Code(_, code) => format!("``{code}``"),
            Inline::Space | Inline::SoftBreak | Inline::LineBreak => " ".to_string(),
            Inline::Math(MathType::InlineMath, tex) => format!(":math:`{tex}`"),
            Inline::Math(MathType::DisplayMath, tex) => format!(":math:`\\displaystyle {tex}`"),
            Inline::RawInline(format, text) if format.is_rst() => text.clone(),
            Inline::RawInline(..) => String::new(),
            Inline::Link(_, c, (url, _)) => {
                let text = self.inlines(c);
                if text == *url {
                    url.clone()
                } else {
                    format!("`{text} <{url}>`__")
                }
            }
            Inline::Image(_, alt, (url, _)) => {
                let name = self.substitution_name(&stringify(alt));
                self.substitutions.push((name.clone(), url.clone()));
                format!("|{name}|")
            }
            Inline::Note(blocks) => {
                let note = self.blocks(blocks);
                self.notes.push(note);
                "[#]_".to_string()
            }
        }
    }

    fn substitution_name(&self, alt: &str) -> String {
        let base = if alt.trim().is_empty() {
            "image".to_string()
        } else {
            alt.trim().to_string()
        };
        let taken = |name: &str| self.substitutions.iter().any(|(n, _)| n == name);
        if !taken(&base) {
            return base;
        }
        (1..)
            .map(|i| format!("{base}{i}"))
            .find(|name| !taken(name))
            .unwrap_or(base)
    }
}

/// Escape characters with inline-markup meaning in reStructuredText
pub fn escape_rst(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '*' | '`' | '|') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Alignment, Format};

    #[test]
    fn test_header_with_target() {
        let blocks = vec![Block::Header(
            1,
            Attr::new("intro", vec![], vec![]),
            vec![Inline::str("Intro")],
        )];
        assert_eq!(
            RstWriter::new().write_document(&blocks),
            ".. _intro:\n\nIntro\n====="
        );
    }

    #[test]
    fn test_figure_options() {
        let image = Inline::Image(
            Attr::new("label1", vec!["class-name".into()], vec![]),
            vec![Inline::str("a"), Inline::Space, Inline::str("title")],
            ("path/to/image.png".into(), "fig:".into()),
        );
        let out = RstWriter::new().write_document(&[Block::Para(vec![image])]);
        assert_eq!(
            out,
            ".. figure:: path/to/image.png\n   :alt: a title\n   :figclass: class-name\n   :name: label1\n\n   a title"
        );
    }

    #[test]
    fn test_inline_image_substitution() {
        let para = Block::Para(vec![
            Inline::str("see"),
            Inline::Space,
            Inline::Image(Attr::default(), vec![], ("x.png".into(), String::new())),
        ]);
        let out = RstWriter::new().write_document(&[para]);
        assert_eq!(out, "see |image|\n\n.. |image| image:: x.png");
    }

    #[test]
    fn test_raw_block_other_format() {
        let out = RstWriter::new()
            .write_document(&[Block::raw(Format::html(), "<p>x</p>")]);
        assert_eq!(out, ".. raw:: html\n\n   <p>x</p>");
    }

    #[test]
    fn test_table_directive() {
        let table = Table {
            caption: vec![Inline::str("Caption.")],
            aligns: vec![Alignment::AlignDefault; 2],
            widths: vec![0.0; 2],
            head: vec![
                vec![Block::Plain(vec![Inline::str("a")])],
                vec![Block::Plain(vec![Inline::str("b")])],
            ],
            rows: vec![vec![
                vec![Block::Plain(vec![Inline::str("1")])],
                vec![Block::Plain(vec![Inline::str("2")])],
            ]],
        };
        let out = RstWriter::new().write_document(&[Block::Table(table)]);
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some(".. table:: Caption."));
        assert_eq!(lines.next(), Some(""));
        assert!(out.lines().skip(2).all(|l| l.starts_with("   ")));
        assert!(out.contains('a') && out.contains('2'));
    }
}
