//! Line lexer
//!
//! Classifies each source line by the block construct it can start. The
//! parser decides what a line actually is from its neighbours (a dash line
//! under a text line is a table rule, on its own it is a horizontal rule).

use ipub_ast::Alignment;

/// A classified source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub kind: LineKind,
    /// The line without its trailing newline
    pub text: String,
    /// Line number (1-indexed)
    pub number: usize,
}

/// What a line looks like
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// Only whitespace
    Blank,
    /// `# Title {#id}`
    Heading { level: usize, content: String },
    /// Code fence (three or more backticks or tildes)
    Fence { marker: char, len: usize, info: String },
    /// `:::` with optional attributes; closing fences have none
    DivFence { attributes: String },
    /// `> content`
    Quote(String),
    /// `- item`, `* item`, `+ item`
    Bullet { indent: usize, width: usize },
    /// `1. item`, `1) item`
    Ordered { indent: usize, width: usize, start: i32 },
    /// Dashes and spaces only; column groups as `(start, end)` character offsets
    Rule(Vec<(usize, usize)>),
    /// Pipe table separator (`|---|:--:|`) with per-column alignment
    PipeRule(Vec<Alignment>),
    /// Only `=` characters (setext level 1 underline)
    Equals,
    /// `***` or `___`
    ThematicBreak,
    /// `Table: caption` or `: caption`
    Caption(String),
    /// Anything else
    Text,
}

/// Split input into classified lines
pub fn tokenize(input: &str) -> Vec<Line> {
    input
        .lines()
        .enumerate()
        .map(|(i, text)| Line {
            kind: classify(text),
            text: text.trim_end_matches('\r').to_string(),
            number: i + 1,
        })
        .collect()
}

/// Classify a single line
pub fn classify(line: &str) -> LineKind {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    let indent = line.len() - line.trim_start().len();
    let trimmed = line.trim_start();

    if indent < 4 {
        if let Some(kind) = heading(trimmed) {
            return kind;
        }
        if let Some(kind) = fence(trimmed) {
            return kind;
        }
        if let Some(rest) = trimmed.strip_prefix(":::") {
            return LineKind::DivFence {
                attributes: rest.trim_start_matches(':').trim().to_string(),
            };
        }
        if let Some(rest) = trimmed.strip_prefix('>') {
            return LineKind::Quote(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        }
        if let Some(groups) = rule_groups(line) {
            return LineKind::Rule(groups);
        }
        if let Some(aligns) = pipe_rule(trimmed) {
            return LineKind::PipeRule(aligns);
        }
        if trimmed.chars().all(|c| c == '=') {
            return LineKind::Equals;
        }
        if is_thematic_break(trimmed) {
            return LineKind::ThematicBreak;
        }
        if let Some(rest) = trimmed.strip_prefix("Table:") {
            return LineKind::Caption(rest.trim().to_string());
        }
        if let Some(rest) = trimmed.strip_prefix(": ") {
            return LineKind::Caption(rest.trim().to_string());
        }
        if let Some(kind) = list_marker(trimmed, indent) {
            return kind;
        }
    }
    LineKind::Text
}

fn heading(trimmed: &str) -> Option<LineKind> {
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(' ') {
        return None;
    }
    let content = rest.trim().trim_end_matches('#').trim_end().to_string();
    Some(LineKind::Heading { level, content })
}

fn fence(trimmed: &str) -> Option<LineKind> {
    let marker = trimmed.chars().next()?;
    if marker != '`' && marker != '~' {
        return None;
    }
    let len = trimmed.chars().take_while(|c| *c == marker).count();
    if len < 3 {
        return None;
    }
    let info = trimmed[len..].trim().to_string();
    if marker == '`' && info.contains('`') {
        return None;
    }
    Some(LineKind::Fence { marker, len, info })
}

fn rule_groups(line: &str) -> Option<Vec<(usize, usize)>> {
    if !line.contains('-') || !line.chars().all(|c| c == '-' || c == ' ') {
        return None;
    }
    let mut groups = Vec::new();
    let mut start = None;
    for (i, c) in line.chars().enumerate() {
        match (c, start) {
            ('-', None) => start = Some(i),
            (' ', Some(s)) => {
                groups.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        groups.push((s, line.chars().count()));
    }
    Some(groups)
}

fn pipe_rule(trimmed: &str) -> Option<Vec<Alignment>> {
    if !trimmed.contains('|') || !trimmed.chars().all(|c| matches!(c, '|' | '-' | ':' | ' ')) {
        return None;
    }
    let inner = trimmed.trim_matches('|');
    let aligns = inner
        .split('|')
        .map(|cell| {
            let cell = cell.trim();
            if !cell.contains('-') {
                return None;
            }
            Some(match (cell.starts_with(':'), cell.ends_with(':')) {
                (true, true) => Alignment::AlignCenter,
                (true, false) => Alignment::AlignLeft,
                (false, true) => Alignment::AlignRight,
                (false, false) => Alignment::AlignDefault,
            })
        })
        .collect::<Option<Vec<_>>>()?;
    Some(aligns)
}

fn is_thematic_break(trimmed: &str) -> bool {
    let compact: String = trimmed.chars().filter(|c| *c != ' ').collect();
    compact.len() >= 3
        && (compact.chars().all(|c| c == '*') || compact.chars().all(|c| c == '_'))
}

fn list_marker(trimmed: &str, indent: usize) -> Option<LineKind> {
    let mut chars = trimmed.chars();
    let first = chars.next()?;
    if matches!(first, '-' | '*' | '+') {
        return match chars.next() {
            Some(' ') | None => Some(LineKind::Bullet {
                indent,
                width: marker_width(trimmed, 1),
            }),
            _ => None,
        };
    }
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 || digits > 9 {
        return None;
    }
    let rest = &trimmed[digits..];
    let mut rest_chars = rest.chars();
    match (rest_chars.next(), rest_chars.next()) {
        (Some('.' | ')'), Some(' ') | None) => Some(LineKind::Ordered {
            indent,
            width: marker_width(trimmed, digits + 1),
            start: trimmed[..digits].parse().ok()?,
        }),
        _ => None,
    }
}

/// Width of a list marker plus the spaces following it
fn marker_width(trimmed: &str, marker_len: usize) -> usize {
    let spaces = trimmed[marker_len..]
        .chars()
        .take_while(|c| *c == ' ')
        .count();
    marker_len + spaces.clamp(1, 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings() {
        assert_eq!(
            classify("## Title {#id}"),
            LineKind::Heading {
                level: 2,
                content: "Title {#id}".into()
            }
        );
        assert_eq!(classify("#hashtag"), LineKind::Text);
    }

    #[test]
    fn test_rules_and_tables() {
        assert_eq!(classify("- -"), LineKind::Rule(vec![(0, 1), (2, 3)]));
        assert_eq!(classify("---"), LineKind::Rule(vec![(0, 3)]));
        assert_eq!(classify("==="), LineKind::Equals);
        assert_eq!(classify("* * *"), LineKind::ThematicBreak);
    }

    #[test]
    fn test_cite_prefixes_are_not_lists() {
        assert_eq!(classify("+@label"), LineKind::Text);
        assert_eq!(classify("*@label2*"), LineKind::Text);
        assert_eq!(classify(":ref:`x`"), LineKind::Text);
        assert_eq!(
            classify("- item"),
            LineKind::Bullet {
                indent: 0,
                width: 2
            }
        );
        assert_eq!(
            classify("3. item"),
            LineKind::Ordered {
                indent: 0,
                width: 3,
                start: 3
            }
        );
    }

    #[test]
    fn test_pipe_rule() {
        assert_eq!(
            classify("|:--|--:|:-:|---|"),
            LineKind::PipeRule(vec![
                Alignment::AlignLeft,
                Alignment::AlignRight,
                Alignment::AlignCenter,
                Alignment::AlignDefault,
            ])
        );
        assert_eq!(classify("| a | b |"), LineKind::Text);
    }

    #[test]
    fn test_fences_and_captions() {
        assert_eq!(
            classify("```{=latex}"),
            LineKind::Fence {
                marker: '`',
                len: 3,
                info: "{=latex}".into()
            }
        );
        assert_eq!(
            classify("::: {.note}"),
            LineKind::DivFence {
                attributes: "{.note}".into()
            }
        );
        assert_eq!(
            classify("Table: Caption +@label"),
            LineKind::Caption("Caption +@label".into())
        );
    }
}
