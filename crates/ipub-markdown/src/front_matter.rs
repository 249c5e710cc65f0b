//! YAML front matter

use std::collections::BTreeMap;

use ipub_ast::{Meta, MetaValue};
use saphyr::{LoadableYamlNode, Yaml};

use crate::inline::parse_inlines;
use crate::parser::{ParseError, ParseResult};

/// Split a leading `---` ... `---` (or `...`) block from the body.
///
/// Returns the YAML text (if any), the body, and the number of lines the
/// front matter occupied.
pub fn split(input: &str) -> (Option<&str>, &str, usize) {
    let Some(rest) = input
        .strip_prefix("---\n")
        .or_else(|| input.strip_prefix("---\r\n"))
    else {
        return (None, input, 0);
    };
    let mut offset = 0;
    for (i, line) in rest.split_inclusive('\n').enumerate() {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body, i + 2);
        }
        offset += line.len();
    }
    (None, input, 0)
}

/// Convert front matter YAML to document metadata.
///
/// Strings are read as inline markdown, as pandoc does.
pub fn parse(yaml: &str) -> ParseResult<Meta> {
    let docs = Yaml::load_from_str(yaml).map_err(|e| ParseError::FrontMatter {
        message: e.to_string(),
    })?;
    let mut meta = Meta::new();
    let Some(doc) = docs.first() else {
        return Ok(meta);
    };
    if doc.is_null() {
        return Ok(meta);
    }
    match to_meta(doc) {
        Some(MetaValue::MetaMap(map)) => {
            for (key, value) in map {
                meta.insert(key, value);
            }
            Ok(meta)
        }
        _ => Err(ParseError::FrontMatterNotMapping),
    }
}

fn to_meta(node: &Yaml) -> Option<MetaValue> {
    if let Some(mapping) = node.as_mapping() {
        let mut map = BTreeMap::new();
        for (key, value) in mapping {
            let Some(key) = scalar_text(key) else {
                continue;
            };
            if let Some(value) = to_meta(value) {
                map.insert(key, value);
            }
        }
        return Some(MetaValue::MetaMap(map));
    }
    if let Some(items) = node.as_sequence() {
        return Some(MetaValue::MetaList(items.iter().filter_map(to_meta).collect()));
    }
    if let Some(b) = node.as_bool() {
        return Some(MetaValue::MetaBool(b));
    }
    if let Some(s) = node.as_str() {
        return Some(MetaValue::MetaInlines(parse_inlines(s)));
    }
    scalar_text(node).map(MetaValue::MetaString)
}

fn scalar_text(node: &Yaml) -> Option<String> {
    if let Some(s) = node.as_str() {
        return Some(s.to_string());
    }
    if let Some(i) = node.as_integer() {
        return Some(i.to_string());
    }
    if let Some(f) = node.as_floating_point() {
        return Some(f.to_string());
    }
    node.as_bool().map(|b| b.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split() {
        let (yaml, body, lines) = split("---\na: 1\n---\nbody\n");
        assert_eq!(yaml, Some("a: 1\n"));
        assert_eq!(body, "body\n");
        assert_eq!(lines, 3);

        let (yaml, body, _) = split("---\n\nnot closed");
        assert!(yaml.is_none());
        assert_eq!(body, "---\n\nnot closed");
    }

    #[test]
    fn test_nested_options() {
        let meta = parse("ipub:\n  pandoc:\n    use_numref: true\n    reftag: other\n").unwrap();
        assert_eq!(
            meta.get_path("ipub.pandoc.use_numref")
                .and_then(MetaValue::as_bool),
            Some(true)
        );
        assert_eq!(
            meta.get_path("ipub.pandoc.reftag")
                .and_then(MetaValue::as_string),
            Some("other".to_string())
        );
    }

    #[test]
    fn test_lists_and_numbers() {
        let meta = parse("bibliography: [a.json, b.json]\nyear: 2019\n").unwrap();
        let list = meta.get("bibliography").and_then(MetaValue::as_list).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(
            meta.get("year").and_then(MetaValue::as_string),
            Some("2019".to_string())
        );
    }

    #[test]
    fn test_not_a_mapping() {
        assert!(matches!(
            parse("- a\n- b\n"),
            Err(ParseError::FrontMatterNotMapping)
        ));
    }
}
