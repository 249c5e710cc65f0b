//! Reader tests: markdown in, pandoc JSON out
//!
//! Each case checks the exact node shape the filters rely on.

use ipub_ast::{OutputFormat, render};
use ipub_markdown::parse;
use serde_json::json;

fn blocks_json(source: &str) -> serde_json::Value {
    let doc = parse(source).expect("Failed to parse markdown");
    serde_json::to_value(&doc.blocks).expect("Failed to serialize blocks")
}

#[test]
fn citation_with_attribute_block() {
    assert_eq!(
        blocks_json("+@label{.class a=1}\n"),
        json!([{"t": "Para", "c": [
            {"t": "Str", "c": "+"},
            {"t": "Cite", "c": [
                [{
                    "citationId": "label",
                    "citationPrefix": [],
                    "citationSuffix": [],
                    "citationMode": {"t": "AuthorInText"},
                    "citationNoteNum": 0,
                    "citationHash": 0
                }],
                [{"t": "Str", "c": "@label"}]
            ]},
            {"t": "Str", "c": "{.class"},
            {"t": "Space"},
            {"t": "Str", "c": "a=1}"}
        ]}])
    );
}

#[test]
fn html_cite_tags_are_raw() {
    assert_eq!(
        blocks_json("surrounding <cite data-cite=\"cite_key\">text</cite> text\n"),
        json!([{"t": "Para", "c": [
            {"t": "Str", "c": "surrounding"},
            {"t": "Space"},
            {"t": "RawInline", "c": ["html", "<cite data-cite=\"cite_key\">"]},
            {"t": "Str", "c": "text"},
            {"t": "RawInline", "c": ["html", "</cite>"]},
            {"t": "Space"},
            {"t": "Str", "c": "text"}
        ]}])
    );
}

#[test]
fn math_with_trailing_label() {
    assert_eq!(
        blocks_json("$$a = b$$ {#eq:id1}\n"),
        json!([{"t": "Para", "c": [
            {"t": "Math", "c": [{"t": "DisplayMath"}, "a = b"]},
            {"t": "Space"},
            {"t": "Str", "c": "{#eq:id1}"}
        ]}])
    );
}

#[test]
fn front_matter_becomes_meta() {
    let doc = parse("---\nipub:\n  pandoc:\n    reftag: other\n---\n\nx\n").unwrap();
    let meta = serde_json::to_value(&doc.meta).unwrap();
    assert_eq!(
        meta,
        json!({"ipub": {"t": "MetaMap", "c": {
            "pandoc": {"t": "MetaMap", "c": {
                "reftag": {"t": "MetaInlines", "c": [{"t": "Str", "c": "other"}]}
            }}
        }}})
    );
}

#[test]
fn renders_through_html_writer() {
    let doc = parse("Hello *world*, see [the docs](http://example.org).\n").unwrap();
    insta::assert_snapshot!(
        render(&doc, OutputFormat::Html).trim_end(),
        @r#"<p>Hello <em>world</em>, see <a href="http://example.org">the docs</a>.</p>"#
    );
}
