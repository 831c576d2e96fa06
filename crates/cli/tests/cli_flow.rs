use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[allow(deprecated)]
fn chunkit(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("chunkit").expect("binary");
    cmd.current_dir(workdir)
        .env("CHUNKIT_EMBEDDING_MODE", "stub")
        .env("CHUNKIT_DIMENSION", "64")
        .env("CHUNKIT_INDEX_DIR", workdir.join("index"))
        .env_remove("CHUNKIT_RERANK_URL")
        .env_remove("CHUNKIT_RERANK_MODE")
        .env_remove("RUST_LOG");
    cmd
}

fn run_json(workdir: &Path, args: &[&str]) -> Value {
    let output = chunkit(workdir).args(args).output().expect("command run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

fn setup_docs() -> tempfile::TempDir {
    let temp = tempdir().unwrap();
    let docs = temp.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(
        docs.join("gym.txt"),
        "The campus gym opens at six in the morning and closes at ten at night.",
    )
    .unwrap();
    fs::write(
        docs.join("mail.md"),
        "# Mail\n\nStudent mail is available at mail.campus.edu with your student number.",
    )
    .unwrap();
    temp
}

fn add_caption_manifest(root: &Path) {
    fs::write(
        root.join("docs").join("processed_images.json"),
        r#"[{
            "source_file": "guide.docx",
            "context_before": "The library is in the north building.",
            "context_after": "",
            "original_description": "a building",
            "enhanced_description": "a campus library photo with tall shelves",
            "image_data_base64": "aGVsbG8="
        }]"#,
    )
    .unwrap();
}

#[test]
fn build_then_retrieve_text() {
    let temp = setup_docs();
    let root = temp.path();

    let stats = run_json(root, &["build", "docs", "--json"]);
    assert_eq!(stats["documents"], 2);
    assert_eq!(stats["images"], 0);

    let items = run_json(
        root,
        &[
            "retrieve",
            "when does the gym open",
            "-n",
            "1",
            "--rerank",
            "bm25",
            "--json",
        ],
    );
    let items = items.as_array().expect("results array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["type"], 0);
    assert_eq!(items[0]["source"], "");
    assert!(items[0]["document"]
        .as_str()
        .expect("document")
        .contains("gym opens at six"));
}

#[test]
fn image_captions_come_back_as_images() {
    let temp = setup_docs();
    let root = temp.path();
    add_caption_manifest(root);

    let stats = run_json(root, &["build", "docs", "--json"]);
    assert_eq!(stats["images"], 1);
    assert!(root.join("processed_images/guide.docx_image_1.jpg").exists());
    assert!(root.join("image_mapping.json").exists());

    let items = run_json(
        root,
        &[
            "retrieve",
            "library photo shelves",
            "-n",
            "1",
            "--rerank",
            "bm25",
            "--json",
        ],
    );
    let item = &items[0];
    assert_eq!(item["type"], 1);
    assert_eq!(item["document"], "a campus library photo with tall shelves");
    assert!(item["source"]
        .as_str()
        .expect("source")
        .ends_with("guide.docx_image_1.jpg"));
}

#[test]
fn insert_replaces_existing_document() {
    let temp = setup_docs();
    let root = temp.path();

    run_json(root, &["build", "docs", "--json"]);
    let before = run_json(root, &["stats", "--json"]);

    let stats = run_json(root, &["insert", "docs", "--json"]);
    assert_eq!(stats["documents"], 2);

    let after = run_json(root, &["stats", "--json"]);
    assert_eq!(after["live"], before["live"]);
    assert!(after["index_size"].as_u64() > before["index_size"].as_u64());
}

#[test]
fn clear_empties_collection() {
    let temp = setup_docs();
    let root = temp.path();

    run_json(root, &["build", "docs", "--json"]);
    let cleared = run_json(root, &["clear", "--json"]);
    assert_eq!(cleared["live"], 0);
    assert_eq!(cleared["index_size"], 0);
}

#[test]
fn empty_collection_reports_no_content() {
    let temp = tempdir().unwrap();

    chunkit(temp.path())
        .args(["retrieve", "anything at all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No relevant content found"));
}

#[test]
fn blank_query_fails_with_reason() {
    let temp = tempdir().unwrap();

    chunkit(temp.path())
        .args(["retrieve", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please enter a question."));
}

#[test]
fn missing_source_directory_fails() {
    let temp = tempdir().unwrap();

    chunkit(temp.path())
        .args(["build", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to ingest"));
}

#[test]
fn prompt_includes_persona_and_passages() {
    let temp = setup_docs();
    let root = temp.path();
    run_json(root, &["build", "docs", "--json"]);

    chunkit(root)
        .args([
            "prompt",
            "when does the gym open",
            "--persona",
            "campus",
            "--stream",
            "--rerank",
            "bm25",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("senior student"))
        .stdout(predicate::str::contains("gym opens at six"))
        .stdout(predicate::str::contains("[NEW_PARAGRAPH]"));
}

#[test]
fn default_retrieval_keeps_vector_order() {
    let temp = setup_docs();
    let root = temp.path();
    fs::write(
        root.join("docs").join("hours.txt"),
        "Library hours: the library opens at eight. The pool opens at seven.",
    )
    .unwrap();
    run_json(root, &["build", "docs", "--json"]);

    let query = "when does the gym open";
    let default = run_json(root, &["retrieve", query, "-n", "2", "--json"]);
    let vector_only = run_json(
        root,
        &["retrieve", query, "-n", "2", "--rerank", "off", "--json"],
    );
    assert_eq!(default.as_array().map(Vec::len), Some(2));
    assert_eq!(default, vector_only);
}

#[test]
fn config_file_sets_collection() {
    let temp = setup_docs();
    let root = temp.path();
    fs::write(root.join("chunkit.toml"), "collection = \"campus\"\n").unwrap();

    run_json(root, &["build", "docs", "--json"]);
    assert!(root.join("index").join("campus.index").exists());
    assert!(root.join("index").join("campus_metadata.json").exists());
}
