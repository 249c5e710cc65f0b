//! Integration tests for the ipubpandoc binary

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::tempdir;

const DOCUMENT: &str = "\
---
title: Example
---

$$a = b$$ {#eq:ab}

See =@eq:ab, +[@fig:a; @tbl:b] and @smith2020
";

fn ipubpandoc_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ipubpandoc"))
}

fn run(dir: &Path, args: &[&str]) -> Output {
    let output = Command::new(ipubpandoc_binary())
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to run ipubpandoc");
    assert!(
        output.status.success(),
        "ipubpandoc failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

/// Write `DOCUMENT` to a temporary directory, convert it and return the output
fn convert(args: &[&str], out_name: &str) -> String {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("doc.md"), DOCUMENT).unwrap();
    let mut all = vec!["doc.md", "-o", out_name, "-q"];
    all.extend_from_slice(args);
    run(dir.path(), &all);
    fs::read_to_string(dir.path().join(out_name)).unwrap()
}

#[test]
fn test_latex_is_the_default() {
    let output = convert(&[], "doc.tex");
    insta::assert_snapshot!(output, @r"
    \begin{equation}a = b\label{eq:ab}\end{equation}

    See \eqref{eq:ab}, \cref{fig:a,tbl:b} and \cite{smith2020}
    ");
}

#[test]
fn test_rst_output() {
    let output = convert(&["-t", "rst"], "doc.rst");
    insta::assert_snapshot!(output, @r"
    .. math::
       :nowrap:
       :label: eq:ab

       \begin{equation}a = b\end{equation}

    See :eq:`eq:ab`, :ref:`fig:a` and :ref:`tbl:b` and :cite:`smith2020`
    ");
}

#[test]
fn test_numref_flag() {
    let output = convert(&["-t", "rst", "--use-numref"], "doc.rst");
    assert!(output.contains(":numref:`fig:a` and :numref:`tbl:b`"), "{output}");
}

#[test]
fn test_default_output_path() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("doc.md"), DOCUMENT).unwrap();
    let output = run(dir.path(), &["doc.md", "-t", "html"]);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "doc.html");
    let html = fs::read_to_string(dir.path().join("doc.html")).unwrap();
    assert!(html.contains(r##"<a href="#eq:ab">1</a>"##), "{html}");
}

#[test]
fn test_json_output_keeps_references() {
    let output = convert(&["--json"], "doc.json");
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(
        value["meta"]["$$references"]["c"]["eq:ab"]["c"]["number"]["c"],
        "1"
    );
}

#[test]
fn test_strip_meta_flag() {
    let output = convert(&["--json", "--strip-meta"], "doc.json");
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["meta"], serde_json::json!({}));
}

#[test]
fn test_config_file_is_used() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("doc.md"), DOCUMENT).unwrap();
    fs::write(
        dir.path().join("_ipubpandoc.toml"),
        "[output]\nformat = \"rst\"\n\n[pandoc]\nuse_numref = true\n",
    )
    .unwrap();
    run(dir.path(), &["doc.md", "-q"]);
    let output = fs::read_to_string(dir.path().join("doc.rst")).unwrap();
    assert!(output.contains(":numref:`fig:a`"), "{output}");
}

#[test]
fn test_bibliography_numbers_html_citations() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("doc.md"), "See @smith2020.\n").unwrap();
    fs::write(
        dir.path().join("refs.json"),
        r#"[{"id": "smith2020", "DOI": "10.1000/xyz"}]"#,
    )
    .unwrap();
    run(
        dir.path(),
        &["doc.md", "-t", "html", "--bibliography", "refs.json", "-q"],
    );
    let html = fs::read_to_string(dir.path().join("doc.html")).unwrap();
    insta::assert_snapshot!(html, @r#"<p>See <span>[<a href="https://doi.org/10.1000/xyz">1</a>]</span>.</p>"#);
}

#[test]
fn test_directory_conversion() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    fs::write(input.path().join("a.md"), "see +@fig:a\n").unwrap();
    fs::write(input.path().join("b.md"), "see !@fig:b\n").unwrap();

    let out_dir = output.path().to_str().unwrap();
    run(input.path(), &[".", "-o", out_dir, "-q", "-j", "2"]);

    assert_eq!(
        fs::read_to_string(output.path().join("a.tex")).unwrap(),
        "see \\cref{fig:a}\n"
    );
    assert_eq!(
        fs::read_to_string(output.path().join("b.tex")).unwrap(),
        "see \\ref{fig:b}\n"
    );
}

#[test]
fn test_directory_failure_exit_code() {
    let input = tempdir().unwrap();
    fs::write(
        input.path().join("bad.md"),
        "a b\n- -\nx y\n\nTable: Caption {#tbl:a align=q}\n",
    )
    .unwrap();
    let status = Command::new(ipubpandoc_binary())
        .current_dir(input.path())
        .args([".", "-q"])
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn test_init_writes_config() {
    let dir = tempdir().unwrap();
    run(dir.path(), &["init"]);
    let content = fs::read_to_string(dir.path().join("_ipubpandoc.toml")).unwrap();
    assert!(content.starts_with("#:schema"));
    assert!(content.contains("[pandoc]"));

    let again = Command::new(ipubpandoc_binary())
        .current_dir(dir.path())
        .arg("init")
        .status()
        .unwrap();
    assert!(!again.success());
}

#[test]
fn test_schema_subcommand() {
    let dir = tempdir().unwrap();
    let output = run(dir.path(), &["schema"]);
    let schema: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(schema["title"], "Config");
}

#[test]
fn test_missing_input() {
    let dir = tempdir().unwrap();
    let output = Command::new(ipubpandoc_binary())
        .current_dir(dir.path())
        .arg("missing.md")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}
