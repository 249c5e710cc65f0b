//! Inline parser
//!
//! Turns the text of a paragraph (lines joined with `\n`) into inline nodes,
//! following pandoc's markdown tokenization: words become `Str`, runs of
//! whitespace become `Space`/`SoftBreak`, and citations, raw TeX commands,
//! HTML tags and math are split out as their own nodes.

use ipub_ast::{Attr, Block, Citation, CitationMode, Format, Inline, MathType};

/// Characters allowed inside a citation key when followed by a key character
const KEY_PUNCTUATION: &str = ":.#$%&-+?<>~/";

/// Parse inline markdown
pub fn parse_inlines(text: &str) -> Vec<Inline> {
    InlineParser::new(text).parse()
}

struct InlineParser {
    chars: Vec<char>,
    pos: usize,
    out: Vec<Inline>,
    buf: String,
}

impl InlineParser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.trim().chars().collect(),
            pos: 0,
            out: Vec::new(),
            buf: String::new(),
        }
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn prev(&self) -> Option<char> {
        self.pos.checked_sub(1).and_then(|i| self.chars.get(i).copied())
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    fn flush(&mut self) {
        if !self.buf.is_empty() {
            self.out.push(Inline::Str(std::mem::take(&mut self.buf)));
        }
    }

    fn push(&mut self, inline: Inline) {
        self.flush();
        self.out.push(inline);
    }

    fn parse(mut self) -> Vec<Inline> {
        while let Some(c) = self.peek_at(0) {
            let handled = match c {
                ' ' | '\t' | '\n' => {
                    self.whitespace();
                    true
                }
                '\\' => self.backslash(),
                '$' => self.math(),
                '`' => self.code(),
                '*' | '_' => self.emphasis(c),
                '~' if self.peek_at(1) == Some('~') => self.strikeout(),
                '^' if self.peek_at(1) == Some('[') => self.footnote(),
                '[' => self.bracket(false),
                '!' if self.peek_at(1) == Some('[') => self.bracket(true),
                '@' => self.citation(),
                '<' => self.angle(),
                _ => false,
            };
            if !handled {
                self.buf.push(c);
                self.pos += 1;
            }
        }
        self.flush();
        while matches!(self.out.last(), Some(i) if i.is_space()) {
            self.out.pop();
        }
        self.out
    }

    fn whitespace(&mut self) {
        self.flush();
        let mut spaces = 0;
        let mut newline = false;
        while let Some(c) = self.peek_at(0) {
            match c {
                ' ' | '\t' if !newline => spaces += 1,
                ' ' | '\t' => {}
                '\n' => newline = true,
                _ => break,
            }
            self.pos += 1;
        }
        let node = match (newline, spaces) {
            (true, n) if n >= 2 => Inline::LineBreak,
            (true, _) => Inline::SoftBreak,
            (false, _) => Inline::Space,
        };
        if !self.out.is_empty() {
            self.out.push(node);
        }
    }

    fn backslash(&mut self) -> bool {
        match self.peek_at(1) {
            Some('\n') => {
                self.push(Inline::LineBreak);
                self.pos += 2;
                true
            }
            Some(c) if c.is_ascii_punctuation() => {
                self.buf.push(c);
                self.pos += 2;
                true
            }
            Some(c) if c.is_ascii_alphabetic() => {
                let end = self.tex_command_end(self.pos + 1);
                let raw = self.slice(self.pos, end);
                self.push(Inline::RawInline(Format::new("tex"), raw));
                self.pos = end;
                true
            }
            _ => false,
        }
    }

    /// End of a TeX command starting at `start` (just after the backslash),
    /// including any bracket and brace arguments
    fn tex_command_end(&self, start: usize) -> usize {
        let mut end = start;
        while self.chars.get(end).is_some_and(|c| c.is_ascii_alphabetic()) {
            end += 1;
        }
        if self.chars.get(end) == Some(&'*') {
            end += 1;
        }
        loop {
            match self.chars.get(end) {
                Some('{') => match self.matching(end, '{', '}') {
                    Some(close) => end = close + 1,
                    None => break,
                },
                Some('[') => match self.matching(end, '[', ']') {
                    Some(close) if self.chars.get(close + 1) == Some(&'{') => end = close + 1,
                    _ => break,
                },
                _ => break,
            }
        }
        end
    }

    /// Index of the delimiter closing the one at `open`, honouring nesting
    fn matching(&self, open: usize, left: char, right: char) -> Option<usize> {
        let mut depth = 0usize;
        let mut i = open;
        while let Some(&c) = self.chars.get(i) {
            if c == '\\' {
                i += 2;
                continue;
            }
            if c == left {
                depth += 1;
            } else if c == right {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            i += 1;
        }
        None
    }

    fn math(&mut self) -> bool {
        if self.peek_at(1) == Some('$') {
            let start = self.pos + 2;
            let close = (start..self.chars.len().saturating_sub(1))
                .find(|&i| self.chars[i] == '$' && self.chars[i + 1] == '$');
            let Some(close) = close else {
                return false;
            };
            let tex = self.slice(start, close);
            self.push(Inline::Math(MathType::DisplayMath, tex));
            self.pos = close + 2;
            return true;
        }

        let start = self.pos + 1;
        if self.chars.get(start).is_none_or(|c| c.is_whitespace()) {
            return false;
        }
        let mut i = start;
        while i < self.chars.len() {
            match self.chars[i] {
                '\\' => i += 1,
                '$' if !self.chars[i - 1].is_whitespace()
                    && !self.chars.get(i + 1).is_some_and(|c| c.is_ascii_digit()) =>
                {
                    let tex = self.slice(start, i);
                    self.push(Inline::Math(MathType::InlineMath, tex));
                    self.pos = i + 1;
                    return true;
                }
                _ => {}
            }
            i += 1;
        }
        false
    }

    fn run_length(&self, at: usize, c: char) -> usize {
        self.chars[at..].iter().take_while(|&&x| x == c).count()
    }

    fn code(&mut self) -> bool {
        let ticks = self.run_length(self.pos, '`');
        let start = self.pos + ticks;
        let mut i = start;
        while i < self.chars.len() {
            if self.chars[i] == '`' {
                let run = self.run_length(i, '`');
                if run == ticks {
                    let content = self.slice(start, i);
                    let content = content.strip_prefix(' ').unwrap_or(&content);
                    let content = content.strip_suffix(' ').unwrap_or(content).replace('\n', " ");
                    self.pos = i + run;
                    let attr = self.trailing_attributes().unwrap_or_default();
                    self.push(Inline::Code(attr, content));
                    return true;
                }
                i += run;
            } else {
                i += 1;
            }
        }
        self.buf.push_str(&"`".repeat(ticks));
        self.pos += ticks;
        true
    }

    fn emphasis(&mut self, c: char) -> bool {
        if c == '_' && self.prev().is_some_and(|p| p.is_alphanumeric()) {
            return false;
        }
        let run = self.run_length(self.pos, c).min(3);
        let start = self.pos + run;
        if self.chars.get(start).is_none_or(|n| n.is_whitespace()) {
            return false;
        }
        let mut i = start + 1;
        while i < self.chars.len() {
            match self.chars[i] {
                '\\' => i += 1,
                '`' => {
                    // code spans hide delimiters
                    let ticks = self.run_length(i, '`');
                    i += ticks;
                    continue;
                }
                x if x == c => {
                    let close = self.run_length(i, c);
                    if close >= run && !self.chars[i - 1].is_whitespace() {
                        let content = parse_inlines(&self.slice(start, i));
                        let node = match run {
                            1 => Inline::Emph(content),
                            2 => Inline::Strong(content),
                            _ => Inline::Strong(vec![Inline::Emph(content)]),
                        };
                        self.push(node);
                        self.pos = i + run;
                        return true;
                    }
                    i += close;
                    continue;
                }
                _ => {}
            }
            i += 1;
        }
        false
    }

    fn strikeout(&mut self) -> bool {
        let start = self.pos + 2;
        let close = (start..self.chars.len().saturating_sub(1))
            .find(|&i| self.chars[i] == '~' && self.chars[i + 1] == '~');
        match close {
            Some(close) if close > start => {
                let content = parse_inlines(&self.slice(start, close));
                self.push(Inline::Strikeout(content));
                self.pos = close + 2;
                true
            }
            _ => false,
        }
    }

    fn footnote(&mut self) -> bool {
        let Some(close) = self.matching(self.pos + 1, '[', ']') else {
            return false;
        };
        let content = parse_inlines(&self.slice(self.pos + 2, close));
        self.push(Inline::Note(vec![Block::Para(content)]));
        self.pos = close + 1;
        true
    }

    /// Links, images, spans and bracketed citations
    fn bracket(&mut self, image: bool) -> bool {
        let open = if image { self.pos + 1 } else { self.pos };
        let Some(close) = self.matching(open, '[', ']') else {
            return false;
        };
        let inner = self.slice(open + 1, close);

        match self.chars.get(close + 1) {
            Some('(') => {
                let Some(paren) = self.matching(close + 1, '(', ')') else {
                    return false;
                };
                let target = parse_destination(&self.slice(close + 2, paren));
                self.pos = paren + 1;
                let attr = self.trailing_attributes().unwrap_or_default();
                let content = parse_inlines(&inner);
                let node = if image {
                    Inline::Image(attr, content, target)
                } else {
                    Inline::Link(attr, content, target)
                };
                self.push(node);
                true
            }
            Some('{') if !image => {
                let Some(brace) = self.matching(close + 1, '{', '}') else {
                    return false;
                };
                let Some(attr) = parse_attributes(&self.slice(close + 1, brace + 1)) else {
                    return false;
                };
                self.push(Inline::Span(attr, parse_inlines(&inner)));
                self.pos = brace + 1;
                true
            }
            _ if !image => match bracketed_citations(&inner) {
                Some(citations) => {
                    let content = plain_words(&format!("[{inner}]"));
                    self.push(Inline::Cite(citations, content));
                    self.pos = close + 1;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    /// In-text citation `@key`
    fn citation(&mut self) -> bool {
        if self.prev().is_some_and(|p| p.is_alphanumeric()) {
            return false;
        }
        let rest: String = self.chars[self.pos + 1..].iter().collect();
        let Some(key) = citation_key(&rest) else {
            return false;
        };
        let len = key.chars().count();
        self.push(Inline::Cite(
            vec![Citation::new(key.clone(), CitationMode::AuthorInText)],
            vec![Inline::Str(format!("@{key}"))],
        ));
        self.pos += len + 1;
        true
    }

    /// HTML tags and autolinks
    fn angle(&mut self) -> bool {
        let Some(close) = (self.pos + 1..self.chars.len()).find(|&i| self.chars[i] == '>') else {
            return false;
        };
        let inner = self.slice(self.pos + 1, close);
        if inner.contains("://") && !inner.contains(char::is_whitespace) {
            self.push(Inline::Link(
                Attr::new("", vec!["uri".into()], vec![]),
                vec![Inline::Str(inner.clone())],
                (inner, String::new()),
            ));
            self.pos = close + 1;
            return true;
        }
        let name = inner.strip_prefix('/').unwrap_or(&inner);
        if name.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
            let tag = self.slice(self.pos, close + 1);
            self.push(Inline::RawInline(Format::html(), tag));
            self.pos = close + 1;
            return true;
        }
        false
    }

    /// A `{...}` attribute block directly at the current position
    fn trailing_attributes(&mut self) -> Option<Attr> {
        if self.peek_at(0) != Some('{') {
            return None;
        }
        let close = self.matching(self.pos, '{', '}')?;
        let attr = parse_attributes(&self.slice(self.pos, close + 1))?;
        self.pos = close + 1;
        Some(attr)
    }
}

/// Read a citation key from the start of `s`
fn citation_key(s: &str) -> Option<String> {
    let chars: Vec<char> = s.chars().collect();
    let is_key = |c: char| c.is_alphanumeric() || c == '_';
    if !chars.first().is_some_and(|&c| is_key(c)) {
        return None;
    }
    let mut end = 1;
    while end < chars.len() {
        let c = chars[end];
        if is_key(c) {
            end += 1;
        } else if KEY_PUNCTUATION.contains(c) && chars.get(end + 1).is_some_and(|&n| is_key(n)) {
            end += 2;
        } else {
            break;
        }
    }
    Some(chars[..end].iter().collect())
}

/// Parse `[see @a, p. 1; -@b]` contents into citations
fn bracketed_citations(inner: &str) -> Option<Vec<Citation>> {
    let mut citations = Vec::new();
    for chunk in inner.split(';') {
        let at = chunk.find('@')?;
        let (prefix, rest) = chunk.split_at(at);
        let key = citation_key(&rest[1..])?;
        let suffix = &rest[1 + key.len()..];
        let prefix = prefix.trim();
        let (prefix, mode) = match prefix.strip_suffix('-') {
            Some(p) => (p.trim(), CitationMode::SuppressAuthor),
            None => (prefix, CitationMode::NormalCitation),
        };
        let mut citation = Citation::new(key, mode);
        citation.citation_prefix = plain_words(prefix);
        citation.citation_suffix = plain_words(suffix.trim());
        citations.push(citation);
    }
    (!citations.is_empty()).then_some(citations)
}

/// Split text into `Str` words separated by `Space`
fn plain_words(text: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(Inline::Space);
        }
        out.push(Inline::str(word));
    }
    out
}

fn parse_destination(inner: &str) -> (String, String) {
    let inner = inner.trim();
    let (url, title) = match inner.find(char::is_whitespace) {
        Some(i) => (&inner[..i], inner[i..].trim()),
        None => (inner, ""),
    };
    let url = url.trim_start_matches('<').trim_end_matches('>');
    let title = title
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(title);
    (url.to_string(), title.to_string())
}

/// Parse a `{#id .class key=value}` block.
///
/// Returns `None` when the braces do not hold a well-formed attribute list.
/// Every entry must be `#id`, `.class` or `key=value`; a bare word (as in
/// the argument of `\todo{fix}`) is not an attribute.
pub fn parse_attributes(block: &str) -> Option<Attr> {
    let inner = block.trim().strip_prefix('{')?.strip_suffix('}')?;
    let mut attr = Attr::default();
    let chars: Vec<char> = inner.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        if c == '#' || c == '.' {
            while i < chars.len() && !chars[i].is_whitespace() {
                i += 1;
            }
            let word: String = chars[start + 1..i].iter().collect();
            if word.is_empty() {
                return None;
            }
            if c == '#' {
                attr.identifier = word;
            } else {
                attr.classes.push(word);
            }
            continue;
        }
        while i < chars.len() && chars[i] != '=' && !chars[i].is_whitespace() {
            i += 1;
        }
        let key: String = chars[start..i].iter().collect();
        if chars.get(i) != Some(&'=') || key.is_empty() {
            return None;
        }
        i += 1;
        let value = match chars.get(i) {
            Some(&q @ ('"' | '\'')) => {
                let vstart = i + 1;
                let vend = (vstart..chars.len()).find(|&j| chars[j] == q)?;
                i = vend + 1;
                chars[vstart..vend].iter().collect()
            }
            _ => {
                let vstart = i;
                while i < chars.len() && !chars[i].is_whitespace() {
                    i += 1;
                }
                chars[vstart..i].iter().collect()
            }
        };
        attr.attributes.push((key, value));
    }
    Some(attr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Inline {
        Inline::str(text)
    }

    fn cite(key: &str) -> Inline {
        Inline::Cite(
            vec![Citation::new(key, CitationMode::AuthorInText)],
            vec![Inline::Str(format!("@{key}"))],
        )
    }

    #[test]
    fn test_words_and_spaces() {
        assert_eq!(
            parse_inlines("a  b\nc"),
            vec![s("a"), Inline::Space, s("b"), Inline::SoftBreak, s("c")]
        );
    }

    #[test]
    fn test_prefixed_citations() {
        assert_eq!(
            parse_inlines("+@label{.class a=1} xyz"),
            vec![
                s("+"),
                cite("label"),
                s("{.class"),
                Inline::Space,
                s("a=1}"),
                Inline::Space,
                s("xyz"),
            ]
        );
        assert_eq!(parse_inlines("(@label4{})"), vec![s("("), cite("label4"), s("{})")]);
        assert_eq!(parse_inlines("me@example.com"), vec![s("me@example.com")]);
    }

    #[test]
    fn test_bracketed_citation() {
        let parsed = parse_inlines("+[@fig:id; @tbl:id; @eq:id1]");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], s("+"));
        match &parsed[1] {
            Inline::Cite(citations, content) => {
                let ids: Vec<&str> = citations.iter().map(|c| c.citation_id.as_str()).collect();
                assert_eq!(ids, vec!["fig:id", "tbl:id", "eq:id1"]);
                assert_eq!(content[0], s("[@fig:id;"));
                assert_eq!(citations[0].citation_mode, CitationMode::NormalCitation);
            }
            other => panic!("expected cite, got {other:?}"),
        }
    }

    #[test]
    fn test_raw_tex_and_html() {
        assert_eq!(
            parse_inlines("\\cref{label1} \\Cref{label2}"),
            vec![
                Inline::RawInline(Format::new("tex"), "\\cref{label1}".into()),
                Inline::Space,
                Inline::RawInline(Format::new("tex"), "\\Cref{label2}".into()),
            ]
        );
        assert_eq!(
            parse_inlines("<cite data-cite=\"k\">text</cite>"),
            vec![
                Inline::RawInline(Format::html(), "<cite data-cite=\"k\">".into()),
                s("text"),
                Inline::RawInline(Format::html(), "</cite>".into()),
            ]
        );
        assert_eq!(parse_inlines("\\*x"), vec![s("*x")]);
    }

    #[test]
    fn test_math_and_attribute_text() {
        assert_eq!(
            parse_inlines("$a=1$ {#a b=$2$}"),
            vec![
                Inline::inline_math("a=1"),
                Inline::Space,
                s("{#a"),
                Inline::Space,
                s("b="),
                Inline::inline_math("2"),
                s("}"),
            ]
        );
        assert_eq!(
            parse_inlines("$$a = b$$ {#eq:id1}"),
            vec![Inline::display_math("a = b"), Inline::Space, s("{#eq:id1}")]
        );
        assert_eq!(parse_inlines("costs $5 and $6"), vec![
            s("costs"),
            Inline::Space,
            s("$5"),
            Inline::Space,
            s("and"),
            Inline::Space,
            s("$6"),
        ]);
    }

    #[test]
    fn test_role_then_code() {
        assert_eq!(
            parse_inlines("a :ref:`label` b"),
            vec![
                s("a"),
                Inline::Space,
                s(":ref:"),
                Inline::Code(Attr::default(), "label".into()),
                Inline::Space,
                s("b"),
            ]
        );
    }

    #[test]
    fn test_links_images_spans() {
        assert_eq!(
            parse_inlines("[some text](#alabel)"),
            vec![Inline::Link(
                Attr::default(),
                vec![s("some"), Inline::Space, s("text")],
                ("#alabel".into(), String::new()),
            )]
        );
        assert_eq!(
            parse_inlines("![a title](path/to/image.png){#label1 .class-name a=5}"),
            vec![Inline::Image(
                Attr::new(
                    "label1",
                    vec!["class-name".into()],
                    vec![("a".into(), "5".into())]
                ),
                vec![s("a"), Inline::Space, s("title")],
                ("path/to/image.png".into(), String::new()),
            )]
        );
        assert_eq!(
            parse_inlines("[x]{.note}"),
            vec![Inline::Span(
                Attr::new("", vec!["note".into()], vec![]),
                vec![s("x")]
            )]
        );
    }

    #[test]
    fn test_emphasis() {
        assert_eq!(
            parse_inlines("*@label2* **b** snake_case"),
            vec![
                Inline::Emph(vec![cite("label2")]),
                Inline::Space,
                Inline::Strong(vec![s("b")]),
                Inline::Space,
                s("snake_case"),
            ]
        );
    }

    #[test]
    fn test_parse_attributes() {
        let attr = parse_attributes("{#a env=align .unnumbered title=\"x y\"}").unwrap();
        assert_eq!(attr.identifier, "a");
        assert_eq!(attr.classes, vec!["unnumbered".to_string()]);
        assert_eq!(attr.get("env"), Some("align"));
        assert_eq!(attr.get("title"), Some("x y"));
        assert!(parse_attributes("{# }").is_none());
        assert!(parse_attributes("not braces").is_none());
        assert!(parse_attributes("{fix}").is_none());
        assert!(parse_attributes("{.a fix}").is_none());
        assert!(parse_attributes("{=x}").is_none());
    }
}
