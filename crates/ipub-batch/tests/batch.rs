use std::fs;

use ipub_ast::OutputFormat;
use ipub_batch::{BatchOptions, convert_directory};
use tempfile::tempdir;

const BAD_TABLE: &str = "a b\n- -\nx y\n\nTable: Caption {#tbl:a align=q}\n";

#[test]
fn test_each_document_gets_its_own_numbering() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    fs::write(
        input.path().join("one.md"),
        "$$a$$ {#eq:a}\n\nSee =@eq:a.\n",
    )
    .unwrap();
    fs::write(
        input.path().join("two.md"),
        "$$b$$ {#eq:b}\n\nSee +@eq:b.\n",
    )
    .unwrap();

    let options = BatchOptions {
        output_dir: output.path().to_path_buf(),
        format: OutputFormat::Html,
        parallel_jobs: Some(2),
        ..Default::default()
    };
    let result = convert_directory(input.path(), &options).unwrap();
    assert!(result.is_success(), "{:?}", result.failed);
    assert_eq!(result.converted.len(), 2);

    let one = fs::read_to_string(output.path().join("one.html")).unwrap();
    let two = fs::read_to_string(output.path().join("two.html")).unwrap();
    assert!(one.contains(r##"<a href="#eq:a">1</a>"##), "{one}");
    assert!(two.contains(r##"<a href="#eq:b">1</a>"##), "{two}");
}

#[test]
fn test_failure_does_not_stop_other_documents() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    fs::write(input.path().join("bad.md"), BAD_TABLE).unwrap();
    fs::write(input.path().join("good.md"), "see +@fig:a\n").unwrap();

    let options = BatchOptions {
        output_dir: output.path().to_path_buf(),
        format: OutputFormat::Latex,
        ..Default::default()
    };
    let result = convert_directory(input.path(), &options).unwrap();

    assert_eq!(result.converted, vec![output.path().join("good.tex")]);
    assert_eq!(result.failed.len(), 1);
    assert!(result.failed[0].0.ends_with("bad.md"));
    assert!(result.failed[0].1.contains("tbl:a"), "{}", result.failed[0].1);
    assert_eq!(
        fs::read_to_string(output.path().join("good.tex")).unwrap(),
        "see \\cref{fig:a}\n"
    );
    assert!(!output.path().join("bad.tex").exists());
}

#[test]
fn test_recursive_mirrors_directories() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    fs::create_dir(input.path().join("part")).unwrap();
    fs::write(input.path().join("part").join("ch.md"), "text\n").unwrap();

    let options = BatchOptions {
        output_dir: output.path().to_path_buf(),
        format: OutputFormat::Rst,
        recursive: true,
        json: true,
        ..Default::default()
    };
    let result = convert_directory(input.path(), &options).unwrap();
    let expected = output.path().join("part").join("ch.json");
    assert_eq!(result.converted, vec![expected.clone()]);
    let json = fs::read_to_string(expected).unwrap();
    assert!(json.contains("\"pandoc-api-version\""));
}
