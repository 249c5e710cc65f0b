//! Markdown block parser
//!
//! Recursive descent over classified lines. Containers (lists, block
//! quotes, fenced divs) collect their lines and parse them with a nested
//! parser.

use ipub_ast::{Alignment, Attr, Block, Format, Inline, Pandoc, Table};
use thiserror::Error;

use crate::front_matter;
use crate::inline::{parse_attributes, parse_inlines};
use crate::lexer::{Line, LineKind, tokenize};

/// Parser errors
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid YAML front matter: {message}")]
    FrontMatter { message: String },

    #[error("YAML front matter must be a mapping")]
    FrontMatterNotMapping,
}

/// Parse result type
pub type ParseResult<T> = Result<T, ParseError>;

/// Parse a markdown document, including its front matter
pub fn parse(input: &str) -> ParseResult<Pandoc> {
    let (yaml, body, offset) = front_matter::split(input);
    let meta = match yaml {
        Some(yaml) => front_matter::parse(yaml)?,
        None => Default::default(),
    };
    let blocks = Parser::with_offset(body, offset).parse()?;
    Ok(Pandoc::new(meta, blocks))
}

/// Parse markdown blocks without front matter handling
pub fn parse_blocks(input: &str) -> ParseResult<Vec<Block>> {
    Parser::new(input).parse()
}

/// Markdown block parser
pub struct Parser {
    lines: Vec<Line>,
    pos: usize,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        Self::with_offset(input, 0)
    }

    /// Create a parser whose reported line numbers start after `offset` lines
    pub fn with_offset(input: &str, offset: usize) -> Self {
        let mut lines = tokenize(input);
        for line in &mut lines {
            line.number += offset;
        }
        Self { lines, pos: 0 }
    }

    fn current(&self) -> Option<&Line> {
        self.lines.get(self.pos)
    }

    fn kind_at(&self, pos: usize) -> Option<&LineKind> {
        self.lines.get(pos).map(|l| &l.kind)
    }

    fn skip_blank(&mut self) {
        while matches!(self.kind_at(self.pos), Some(LineKind::Blank)) {
            self.pos += 1;
        }
    }

    /// Parse all remaining lines into blocks
    pub fn parse(&mut self) -> ParseResult<Vec<Block>> {
        let mut blocks = Vec::new();
        loop {
            self.skip_blank();
            let Some(line) = self.current() else {
                break;
            };
            let block = match line.kind.clone() {
                LineKind::Blank => continue,
                LineKind::Heading { level, content } => {
                    self.pos += 1;
                    heading(level, &content)
                }
                LineKind::Fence { marker, len, info } => self.fenced_code(marker, len, &info),
                LineKind::DivFence { attributes } if !attributes.is_empty() => {
                    self.fenced_div(&attributes)?
                }
                LineKind::Quote(_) => self.block_quote()?,
                LineKind::Bullet { .. } | LineKind::Ordered { .. } => self.list()?,
                LineKind::ThematicBreak => {
                    self.pos += 1;
                    Block::HorizontalRule
                }
                LineKind::Rule(_) => {
                    self.pos += 1;
                    Block::HorizontalRule
                }
                LineKind::Caption(_) if self.caption_precedes_table() => {
                    let caption = self.caption();
                    self.skip_blank();
                    let mut table = self.simple_table();
                    if let Block::Table(t) = &mut table {
                        t.caption = caption;
                    }
                    table
                }
                LineKind::Text if indentation(&line.text) >= 4 => self.indented_code(),
                LineKind::Text if raw_environment(&line.text).is_some() => self.raw_latex(),
                LineKind::Text => match self.kind_at(self.pos + 1) {
                    Some(LineKind::Rule(groups)) if groups.len() > 1 => {
                        self.table_with_caption(false)
                    }
                    Some(LineKind::PipeRule(_)) => self.table_with_caption(true),
                    Some(LineKind::Rule(_)) => self.setext(2),
                    Some(LineKind::Equals) => self.setext(1),
                    _ => self.paragraph(),
                },
                _ => self.paragraph(),
            };
            blocks.push(block);
        }
        Ok(blocks)
    }

    fn paragraph(&mut self) -> Block {
        let mut text = Vec::new();
        while let Some(line) = self.current() {
            match line.kind {
                LineKind::Blank
                | LineKind::Heading { .. }
                | LineKind::Fence { .. }
                | LineKind::DivFence { .. }
                | LineKind::Quote(_)
                | LineKind::ThematicBreak
                    if !text.is_empty() =>
                {
                    break;
                }
                _ => {
                    text.push(line.text.clone());
                    self.pos += 1;
                }
            }
        }
        paragraph_block(parse_inlines(&text.join("\n")))
    }

    fn setext(&mut self, level: usize) -> Block {
        let content = self.lines[self.pos].text.clone();
        self.pos += 2;
        heading(level, &content)
    }

    fn fenced_code(&mut self, marker: char, len: usize, info: &str) -> Block {
        self.pos += 1;
        let mut code = Vec::new();
        while let Some(line) = self.current() {
            let closing = matches!(
                &line.kind,
                LineKind::Fence { marker: m, len: l, info: i }
                    if *m == marker && *l >= len && i.is_empty()
            );
            let text = line.text.clone();
            self.pos += 1;
            if closing {
                break;
            }
            code.push(text);
        }
        let code = code.join("\n");

        if let Some(format) = info
            .strip_prefix("{=")
            .and_then(|f| f.strip_suffix('}'))
        {
            return Block::RawBlock(Format::new(format.trim()), code);
        }
        let attr = if info.starts_with('{') {
            parse_attributes(info).unwrap_or_else(|| {
                // `{python}`: a language name in braces
                let lang = info.trim_matches(|c| c == '{' || c == '}').trim();
                match lang.split_whitespace().next() {
                    Some(lang) => Attr::new("", vec![lang.to_string()], vec![]),
                    None => Attr::default(),
                }
            })
        } else if info.is_empty() {
            Attr::default()
        } else {
            let lang = info.split_whitespace().next().unwrap_or_default();
            Attr::new("", vec![lang.to_string()], vec![])
        };
        Block::CodeBlock(attr, code)
    }

    fn fenced_div(&mut self, attributes: &str) -> ParseResult<Block> {
        let open = self.lines[self.pos].number;
        let attr = if attributes.starts_with('{') {
            parse_attributes(attributes).unwrap_or_default()
        } else {
            Attr::new("", vec![attributes.to_string()], vec![])
        };
        self.pos += 1;
        let start = self.pos;
        let mut depth = 1;
        while let Some(line) = self.current() {
            if let LineKind::DivFence { attributes } = &line.kind {
                if attributes.is_empty() {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                } else {
                    depth += 1;
                }
            }
            self.pos += 1;
        }
        if depth != 0 {
            // an unclosed fence is ordinary text
            self.pos = start - 1;
            return Ok(self.paragraph());
        }
        let inner: Vec<&str> = self.lines[start..self.pos]
            .iter()
            .map(|l| l.text.as_str())
            .collect();
        let offset = self.lines.get(start).map_or(open, |l| l.number - 1);
        self.pos += 1;
        let content = Parser::with_offset(&inner.join("\n"), offset).parse()?;
        Ok(Block::Div(attr, content))
    }

    fn block_quote(&mut self) -> ParseResult<Block> {
        let mut text = Vec::new();
        while let Some(line) = self.current() {
            match &line.kind {
                LineKind::Quote(content) => text.push(content.clone()),
                LineKind::Blank => break,
                _ if !text.is_empty() => text.push(line.text.clone()),
                _ => break,
            }
            self.pos += 1;
        }
        Ok(Block::BlockQuote(parse_blocks(&text.join("\n"))?))
    }

    fn list(&mut self) -> ParseResult<Block> {
        let (ordered, base_indent, start) = match self.current().map(|l| &l.kind) {
            Some(LineKind::Ordered { indent, start, .. }) => (true, *indent, *start),
            Some(LineKind::Bullet { indent, .. }) => (false, *indent, 1),
            _ => return Ok(Block::Null),
        };
        let mut items = Vec::new();
        let mut loose = false;

        loop {
            let Some(width) = self.item_marker(ordered, base_indent) else {
                break;
            };
            let content_indent = base_indent + width;
            let first = &self.lines[self.pos].text;
            let mut text = vec![first.chars().skip(content_indent).collect::<String>()];
            self.pos += 1;

            while let Some(line) = self.current() {
                let indent = line.text.len() - line.text.trim_start().len();
                match &line.kind {
                    LineKind::Blank => {
                        let next_indented = self.lines[self.pos..]
                            .iter()
                            .find(|l| l.kind != LineKind::Blank)
                            .is_some_and(|l| {
                                l.text.len() - l.text.trim_start().len() >= content_indent
                            });
                        if !next_indented {
                            break;
                        }
                        text.push(String::new());
                    }
                    _ if indent >= content_indent => {
                        text.push(line.text.chars().skip(content_indent).collect());
                    }
                    LineKind::Text if text.last().is_some_and(|t| !t.is_empty()) => {
                        text.push(line.text.trim_start().to_string());
                    }
                    _ => break,
                }
                self.pos += 1;
            }
            if text.iter().any(String::is_empty) {
                loose = true;
            }
            items.push(parse_blocks(&text.join("\n"))?);

            let resume = self.pos;
            self.skip_blank();
            if self.item_marker(ordered, base_indent).is_some() {
                if self.pos > resume {
                    loose = true;
                }
            } else {
                self.pos = resume;
                break;
            }
        }

        if !loose {
            for item in &mut items {
                for block in item.iter_mut() {
                    if let Block::Para(content) = block {
                        *block = Block::Plain(std::mem::take(content));
                    }
                }
            }
        }
        Ok(if ordered {
            Block::OrderedList(
                (start, ipub_ast::ListNumberStyle::Decimal, ipub_ast::ListNumberDelim::Period),
                items,
            )
        } else {
            Block::BulletList(items)
        })
    }

    /// Marker width if the current line starts an item of the current list
    fn item_marker(&self, ordered: bool, base_indent: usize) -> Option<usize> {
        match self.current().map(|l| &l.kind)? {
            LineKind::Bullet { indent, width } if !ordered && *indent == base_indent => {
                Some(*width)
            }
            LineKind::Ordered { indent, width, .. } if ordered && *indent == base_indent => {
                Some(*width)
            }
            _ => None,
        }
    }

    fn caption_precedes_table(&self) -> bool {
        let mut pos = self.pos + 1;
        while matches!(self.kind_at(pos), Some(LineKind::Text)) {
            pos += 1;
        }
        while matches!(self.kind_at(pos), Some(LineKind::Blank)) {
            pos += 1;
        }
        matches!(self.kind_at(pos), Some(LineKind::Text))
            && matches!(self.kind_at(pos + 1), Some(LineKind::Rule(g)) if g.len() > 1)
    }

    fn caption(&mut self) -> Vec<Inline> {
        let mut text = match self.current().map(|l| &l.kind) {
            Some(LineKind::Caption(first)) => vec![first.clone()],
            _ => return Vec::new(),
        };
        self.pos += 1;
        while let Some(line) = self.current() {
            if line.kind != LineKind::Text {
                break;
            }
            text.push(line.text.trim().to_string());
            self.pos += 1;
        }
        parse_inlines(&text.join("\n"))
    }

    fn indented_code(&mut self) -> Block {
        let mut code = Vec::new();
        while let Some(line) = self.current() {
            match line.kind {
                LineKind::Blank => code.push(String::new()),
                _ if indentation(&line.text) >= 4 => {
                    code.push(line.text.chars().skip(4).collect());
                }
                _ => break,
            }
            self.pos += 1;
        }
        while code.last().is_some_and(String::is_empty) {
            code.pop();
        }
        Block::CodeBlock(Attr::default(), code.join("\n"))
    }

    /// `\begin{env}` ... `\end{env}` kept verbatim as a raw LaTeX block
    fn raw_latex(&mut self) -> Block {
        let env = raw_environment(&self.lines[self.pos].text).unwrap_or_default();
        let end = format!("\\end{{{env}}}");
        let mut text = Vec::new();
        while let Some(line) = self.current() {
            let done = line.text.contains(&end);
            text.push(line.text.clone());
            self.pos += 1;
            if done {
                break;
            }
        }
        Block::RawBlock(Format::latex(), text.join("\n"))
    }

    fn table_with_caption(&mut self, pipe: bool) -> Block {
        let mut table = if pipe {
            self.pipe_table()
        } else {
            self.simple_table()
        };
        let resume = self.pos;
        self.skip_blank();
        if matches!(self.kind_at(self.pos), Some(LineKind::Caption(_))) {
            let caption = self.caption();
            if let Block::Table(t) = &mut table {
                t.caption = caption;
            }
        } else {
            self.pos = resume;
        }
        table
    }

    /// Header line, dash rule, then rows until a blank line
    fn simple_table(&mut self) -> Block {
        let header = self.lines[self.pos].text.clone();
        let Some(LineKind::Rule(groups)) = self.kind_at(self.pos + 1).cloned() else {
            return self.paragraph();
        };
        self.pos += 2;

        let mut rows = Vec::new();
        while let Some(line) = self.current() {
            match line.kind {
                LineKind::Blank => break,
                LineKind::Rule(_) => {
                    self.pos += 1;
                    break;
                }
                _ => {
                    rows.push(split_columns(&line.text, &groups));
                    self.pos += 1;
                }
            }
        }

        let head_cells = split_columns(&header, &groups);
        let aligns = groups
            .iter()
            .map(|&(start, end)| column_alignment(&header, start, end))
            .collect();
        Block::Table(Table {
            caption: Vec::new(),
            aligns,
            widths: vec![0.0; groups.len()],
            head: head_cells.into_iter().map(cell).collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(cell).collect())
                .collect(),
        })
    }

    /// `| a | b |` header, alignment rule, then rows until a blank line
    fn pipe_table(&mut self) -> Block {
        let header = self.lines[self.pos].text.clone();
        let Some(LineKind::PipeRule(aligns)) = self.kind_at(self.pos + 1).cloned() else {
            return self.paragraph();
        };
        self.pos += 2;
        let mut rows = Vec::new();
        while let Some(line) = self.current() {
            if line.kind == LineKind::Blank || !line.text.contains('|') {
                break;
            }
            rows.push(split_pipes(&line.text, aligns.len()));
            self.pos += 1;
        }
        Block::Table(Table {
            caption: Vec::new(),
            widths: vec![0.0; aligns.len()],
            head: split_pipes(&header, aligns.len())
                .into_iter()
                .map(cell)
                .collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(cell).collect())
                .collect(),
            aligns,
        })
    }
}

fn indentation(text: &str) -> usize {
    text.len() - text.trim_start().len()
}

/// Environment name of a line opening a LaTeX environment
fn raw_environment(text: &str) -> Option<String> {
    let rest = text.trim_start().strip_prefix("\\begin{")?;
    let close = rest.find('}')?;
    Some(rest[..close].to_string())
}

/// Cells of a pipe table row, padded or truncated to `columns`
fn split_pipes(line: &str, columns: usize) -> Vec<String> {
    let inner = line.trim();
    let inner = inner.strip_prefix('|').unwrap_or(inner);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    let mut cells: Vec<String> = inner.split('|').map(|c| c.trim().to_string()).collect();
    cells.resize(columns, String::new());
    cells
}

fn cell(text: String) -> Vec<Block> {
    let inlines = parse_inlines(&text);
    if inlines.is_empty() {
        Vec::new()
    } else {
        vec![Block::Plain(inlines)]
    }
}

/// Cut a row into column texts using the dash groups of the rule line
fn split_columns(line: &str, groups: &[(usize, usize)]) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    (0..groups.len())
        .map(|i| {
            let start = if i == 0 { 0 } else { groups[i].0 };
            let end = groups.get(i + 1).map_or(chars.len(), |g| g.0);
            let start = start.min(chars.len());
            let end = end.clamp(start, chars.len());
            chars[start..end].iter().collect::<String>().trim().to_string()
        })
        .collect()
}

fn column_alignment(header: &str, start: usize, end: usize) -> Alignment {
    let chars: Vec<char> = header.chars().collect();
    let segment_end = end.min(chars.len());
    let segment_start = start.min(segment_end);
    let segment = &chars[segment_start..segment_end];
    let flush_left = segment.first().is_some_and(|c| !c.is_whitespace());
    let flush_right = chars.len() >= end
        && chars.get(end - 1).is_some_and(|c| !c.is_whitespace())
        && chars.get(end).is_none_or(|c| c.is_whitespace());
    match (flush_left, flush_right) {
        (true, true) => Alignment::AlignDefault,
        (true, false) => Alignment::AlignLeft,
        (false, true) => Alignment::AlignRight,
        (false, false) => Alignment::AlignCenter,
    }
}

fn heading(level: usize, content: &str) -> Block {
    let (text, attr) = split_trailing_attributes(content);
    let mut attr = attr.unwrap_or_default();
    let inlines = parse_inlines(text);
    if attr.identifier.is_empty() {
        attr.identifier = auto_identifier(&ipub_ast::stringify(&inlines));
    }
    Block::Header(level as i32, attr, inlines)
}

fn split_trailing_attributes(content: &str) -> (&str, Option<Attr>) {
    let trimmed = content.trim_end();
    if trimmed.ends_with('}')
        && let Some(open) = trimmed.rfind('{')
        && let Some(attr) = parse_attributes(&trimmed[open..])
    {
        return (trimmed[..open].trim_end(), Some(attr));
    }
    (trimmed, None)
}

/// Identifier derived from header text: lowercase words joined by hyphens
fn auto_identifier(text: &str) -> String {
    let id: String = text
        .trim()
        .chars()
        .skip_while(|c| !c.is_alphabetic())
        .filter_map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                Some(c.to_lowercase().next().unwrap_or(c))
            } else if c.is_whitespace() {
                Some('-')
            } else {
                None
            }
        })
        .collect();
    if id.is_empty() { "section".to_string() } else { id }
}

/// A paragraph holding only a captioned image is an implicit figure
fn paragraph_block(mut inlines: Vec<Inline>) -> Block {
    if let [Inline::Image(_, alt, (_, title))] = inlines.as_mut_slice()
        && !alt.is_empty()
        && !title.starts_with("fig:")
    {
        *title = format!("fig:{title}");
    }
    Block::Para(inlines)
}
