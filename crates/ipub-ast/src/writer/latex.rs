//! LaTeX writer

use crate::ast::{Alignment, Block, Inline, MathType, QuoteType, Table};
use crate::writer::{join_blocks, sole_image};

/// LaTeX writer state
#[derive(Debug, Default)]
pub struct LatexWriter {
    output: String,
}

impl LatexWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_document(mut self, blocks: &[Block]) -> String {
        self.output = self.blocks(blocks);
        self.output
    }

    pub fn blocks(&mut self, blocks: &[Block]) -> String {
        join_blocks(blocks.iter().map(|b| self.block(b)))
    }

    fn block(&mut self, block: &Block) -> String {
        match block {
            Block::Plain(content) => self.inlines(content),
            Block::Para(content) => match sole_image(content) {
                Some(Inline::Image(_, caption, (url, _))) => format!(
                    "\\begin{{figure}}\n\\centering\n\\includegraphics{{{url}}}\n\\caption{{{}}}\n\\end{{figure}}",
                    self.inlines(caption)
                ),
                _ => self.inlines(content),
            },
            Block::LineBlock(lines) => lines
                .iter()
                .map(|l| self.inlines(l))
                .collect::<Vec<_>>()
                .join("\\\\\n"),
            Block::CodeBlock(_, code) => format!("\\begin{{verbatim}}\n{code}\n\\end{{verbatim}}"),
            Block::RawBlock(format, text) if format.is_latex() => text.clone(),
            Block::RawBlock(..) => String::new(),
            Block::BlockQuote(blocks) => {
                format!("\\begin{{quote}}\n{}\n\\end{{quote}}", self.blocks(blocks))
            }
            Block::OrderedList(_, items) => self.list("enumerate", items),
            Block::BulletList(items) => self.list("itemize", items),
            Block::DefinitionList(items) => {
                let mut out = String::from("\\begin{description}\n");
                for (term, defs) in items {
                    out.push_str(&format!("\\item[{}]", self.inlines(term)));
                    for def in defs {
                        out.push('\n');
                        out.push_str(&self.blocks(def));
                    }
                    out.push('\n');
                }
                out.push_str("\\end{description}");
                out
            }
            Block::Header(level, attr, content) => {
                let command = match level {
                    1 => "section",
                    2 => "subsection",
                    3 => "subsubsection",
                    4 => "paragraph",
                    _ => "subparagraph",
                };
                let mut out = format!("\\{command}{{{}}}", self.inlines(content));
                if !attr.identifier.is_empty() {
                    out.push_str(&format!("\\label{{{}}}", attr.identifier));
                }
                out
            }
            Block::HorizontalRule => {
                "\\begin{center}\\rule{0.5\\linewidth}{0.5pt}\\end{center}".to_string()
            }
            Block::Table(table) => self.table(table),
            Block::Div(_, blocks) => self.blocks(blocks),
            Block::Null => String::new(),
        }
    }

    fn list(&mut self, env: &str, items: &[Vec<Block>]) -> String {
        let mut out = format!("\\begin{{{env}}}\n");
        for item in items {
            out.push_str("\\item\n");
            out.push_str(&self.blocks(item));
            out.push('\n');
        }
        out.push_str(&format!("\\end{{{env}}}"));
        out
    }

    fn table(&mut self, table: &Table) -> String {
        let columns = table.columns();
        let spec: String = (0..columns)
            .map(|i| {
                let align = table.aligns.get(i).copied().unwrap_or(Alignment::AlignDefault);
                match table.widths.get(i) {
                    Some(w) if *w > 0.0 => format!("p{{{w:.2}\\linewidth}}"),
                    _ => match align {
                        Alignment::AlignRight => "r".to_string(),
                        Alignment::AlignCenter => "c".to_string(),
                        Alignment::AlignLeft | Alignment::AlignDefault => "l".to_string(),
                    },
                }
            })
            .collect();

        let mut out = format!("\\begin{{longtable}}[]{{@{{}}{spec}@{{}}}}\n");
        if !table.caption.is_empty() {
            out.push_str(&format!(
                "\\caption{{{}}}\\tabularnewline\n",
                self.inlines(&table.caption)
            ));
        }
        out.push_str("\\toprule\n");
        if table.head.iter().any(|c| !c.is_empty()) {
            out.push_str(&self.row(&table.head));
            out.push_str("\\midrule\n");
        }
        out.push_str("\\endhead\n");
        for row in &table.rows {
            out.push_str(&self.row(row));
        }
        out.push_str("\\bottomrule\n\\end{longtable}");
        out
    }

    fn row(&mut self, cells: &[Vec<Block>]) -> String {
        let cells: Vec<String> = cells.iter().map(|c| self.blocks(c)).collect();
        format!("{}\\tabularnewline\n", cells.join(" & "))
    }

    pub fn inlines(&mut self, inlines: &[Inline]) -> String {
        inlines.iter().map(|i| self.inline(i)).collect()
    }

    fn inline(&mut self, inline: &Inline) -> String {
        match inline {
            Inline::Str(s) => escape_latex(s),
            Inline::Emph(c) => format!("\\emph{{{}}}", self.inlines(c)),
            Inline::Strong(c) => format!("\\textbf{{{}}}", self.inlines(c)),
            Inline::Strikeout(c) => format!("\\sout{{{}}}", self.inlines(c)),
            Inline::Superscript(c) => format!("\\textsuperscript{{{}}}", self.inlines(c)),
            Inline::Subscript(c) => format!("\\textsubscript{{{}}}", self.inlines(c)),
            Inline::SmallCaps(c) => format!("\\textsc{{{}}}", self.inlines(c)),
            Inline::Quoted(QuoteType::DoubleQuote, c) => format!("``{}''", self.inlines(c)),
            Inline::Quoted(QuoteType::SingleQuote, c) => format!("`{}'", self.inlines(c)),
            Inline::Cite(_, c) | Inline::Span(_, c) => self.inlines(c),
            Inline::Code(_, code) => format!("\\texttt{{{}}}", escape_latex(code)),
            Inline::Space => " ".to_string(),
            Inline::SoftBreak => "\n".to_string(),
            Inline::LineBreak => "\\\\\n".to_string(),
            Inline::Math(MathType::InlineMath, tex) => format!("\\({tex}\\)"),
            Inline::Math(MathType::DisplayMath, tex) => format!("\\[{tex}\\]"),
            Inline::RawInline(format, text) if format.is_latex() => text.clone(),
            Inline::RawInline(..) => String::new(),
            Inline::Link(_, c, (url, _)) => match url.strip_prefix('#') {
                Some(anchor) => format!("\\hyperref[{anchor}]{{{}}}", self.inlines(c)),
                None => format!("\\href{{{url}}}{{{}}}", self.inlines(c)),
            },
            Inline::Image(_, _, (url, _)) => format!("\\includegraphics{{{url}}}"),
            Inline::Note(blocks) => format!("\\footnote{{{}}}", self.blocks(blocks)),
        }
    }
}

/// Escape LaTeX special characters in text
pub fn escape_latex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '{' | '}' | '$' | '&' | '%' | '#' | '_' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            _ => out.push(c),
        }
    }
    out
}
