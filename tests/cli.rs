mod common;

use assert_cmd::Command;
use common::{png_bytes, sample_response, MockAde};
use predicates::prelude::*;
use tempfile::TempDir;

/// The binary with a clean environment: no key exported, no `.env`, and a
/// throwaway home so no remembered key is picked up.
fn findoc(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("findoc").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env_remove("LANDINGAI_API_KEY")
        .env_remove("LANDINGAI_BASE_URL")
        .env_remove("LANDINGAI_MODEL")
        .env_remove("FINDOC_ADDR")
        .env_remove("FINDOC_TIMEOUT_SECS")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_banner_without_key() {
    let home = TempDir::new().unwrap();
    findoc(&home)
        .assert()
        .success()
        .stdout(predicate::str::contains("Financial Document Extractor PoC"))
        .stdout(predicate::str::contains("No LandingAI API key found"));
}

#[test]
fn test_banner_with_key_from_dotenv() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join(".env"), "LANDINGAI_API_KEY=from-dotenv\n").unwrap();

    findoc(&home)
        .assert()
        .success()
        .stdout(predicate::str::contains("LandingAI API key configured"))
        .stdout(predicate::str::contains("from-dotenv").not());
}

#[test]
fn test_banner_with_remembered_key() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join(".findoc_api_key"), "remembered-key\n").unwrap();

    findoc(&home)
        .assert()
        .success()
        .stdout(predicate::str::contains("LandingAI API key configured"))
        .stdout(predicate::str::contains("remembered-key").not());
}

#[test]
fn test_parse_rejects_unsupported_extension() {
    let home = TempDir::new().unwrap();
    findoc(&home)
        .args(["parse", "notes.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported document type"));
}

#[test]
fn test_parse_missing_file() {
    let home = TempDir::new().unwrap();
    findoc(&home)
        .args(["parse", "missing.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_parse_without_key() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("scan.png"), png_bytes(8, 8)).unwrap();

    findoc(&home)
        .args(["parse", "scan.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("LANDINGAI_API_KEY"));
}

#[test]
fn test_parse_prints_pages_and_fields() {
    let mock = MockAde::start(200, &sample_response());
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("statement.png"), png_bytes(40, 20)).unwrap();

    findoc(&home)
        .env("LANDINGAI_BASE_URL", &mock.base_url)
        .args(["parse", "statement.png", "--api-key", "cli-key"])
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Page 1 ==="))
        .stdout(predicate::str::contains("(2 bounding boxes)"))
        .stdout(predicate::str::contains("Closing balance: 1,024.00"));

    findoc(&home)
        .env("LANDINGAI_BASE_URL", &mock.base_url)
        .env("LANDINGAI_API_KEY", "env-key")
        .args(["parse", "statement.png", "--format", "fields"])
        .assert()
        .success()
        .stdout(predicate::str::contains("metadata.credit_usage: 3"))
        .stdout(predicate::str::contains("chunks[1].type: table"));

    let requests = mock.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer cli-key"));
    assert_eq!(requests[1].authorization.as_deref(), Some("Bearer env-key"));
}

#[test]
fn test_parse_writes_annotations() {
    let mock = MockAde::start(200, &sample_response());
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("statement.png"), png_bytes(40, 20)).unwrap();
    let out_dir = home.path().join("annotated");

    findoc(&home)
        .env("LANDINGAI_BASE_URL", &mock.base_url)
        .env("LANDINGAI_API_KEY", "k")
        .args(["parse", "statement.png", "--format", "markdown", "--annotate"])
        .arg(&out_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("# ACME Bank statement"));

    assert!(out_dir.join("page-1.png").exists());
}
