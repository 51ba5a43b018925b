// this_file: tests/cli.rs
//! CLI integration tests for the quotecard binary

use assert_cmd::Command;
use image::{GenericImageView, ImageFormat, Rgb, RgbImage};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to run the `quotecard` binary with a clean environment
fn bin() -> Command {
    let mut cmd = Command::cargo_bin("quotecard").expect("binary exists");
    cmd.env_remove("RUST_LOG")
        .env_remove("UNSPLASH_ACCESS_KEY")
        .env_remove("PORT")
        .env_remove("QUOTECARD_FALLBACK_IMAGE");
    cmd
}

fn font_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fonts")
        .join("DejaVuSansMono.ttf")
}

/// Write a small gradient PNG and a local-mode config that uses it.
fn local_setup(dir: &TempDir, font: &Path) -> PathBuf {
    let photo = dir.path().join("fallback.png");
    RgbImage::from_fn(64, 48, |x, y| Rgb([(x * 4) as u8, (y * 5) as u8, 128]))
        .save(&photo)
        .unwrap();

    let config = serde_json::json!({
        "fonts": [{"family": "DejaVu Sans Mono", "weight": "regular", "path": font}],
        "source": {"mode": "local", "fallback_path": photo},
    });
    let config_path = dir.path().join("config.json");
    fs::write(&config_path, config.to_string()).unwrap();
    config_path
}

#[test]
fn test_cli_version_prints() {
    bin()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("quotecard version"));
}

#[test]
fn test_cli_log_level_option() {
    for level in ["debug", "trace"] {
        bin()
            .args(["-l", level, "version"])
            .assert()
            .success()
            .stdout(predicate::str::contains("quotecard version"));
    }
}

#[test]
fn test_cli_render_with_bundled_defaults() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("quote.jpg");
    bin()
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args(["render", "--local", "-o"])
        .arg(&output)
        .assert()
        .success();

    let bytes = fs::read(&output).unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
}

#[test]
fn test_cli_render_without_key_fails() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("quote.jpg");
    bin()
        .args(["render", "Hello", "World", "-o"])
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("UNSPLASH_ACCESS_KEY"));
    assert!(!output.exists());
}

#[test]
fn test_cli_render_with_missing_font_fails() {
    let dir = TempDir::new().unwrap();
    let config = local_setup(&dir, &dir.path().join("missing.ttf"));
    let output = dir.path().join("quote.jpg");
    bin()
        .arg("-c")
        .arg(&config)
        .args(["render", "Hello", "-o"])
        .arg(&output)
        .assert()
        .failure();
    assert!(!output.exists());
}

#[test]
fn test_cli_bad_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, r#"{"layout": {"max_width": "wide"}}"#).unwrap();
    bin()
        .arg("-c")
        .arg(&config)
        .args(["render", "--local"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON error"));
}

#[test]
fn test_cli_batch_rejects_invalid_spec() {
    bin()
        .args(["batch", "--local"])
        .write_stdin(r#"{"version": "1.0", "jobs": [{"id": "a"}]}"#)
        .assert()
        .failure();
}

#[test]
fn test_cli_render_local_writes_jpeg() {
    let font = font_path();
    let dir = TempDir::new().unwrap();
    let config = local_setup(&dir, &font);
    let output = dir.path().join("cards").join("quote.jpg");

    bin()
        .arg("-c")
        .arg(&config)
        .args(["render", "Stay hungry, stay foolish.", "Steve Jobs", "-o"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Image saved to"));

    let bytes = fs::read(&output).unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    assert_eq!(image::load_from_memory(&bytes).unwrap().dimensions(), (1080, 1080));
}

#[test]
fn test_cli_batch_emits_jsonl() {
    let font = font_path();
    let dir = TempDir::new().unwrap();
    let config = local_setup(&dir, &font);
    let out_dir = dir.path().join("out");
    let spec = r#"{
        "version": "1.0",
        "jobs": [
            {"id": "job1", "quote": "Hello"},
            {"id": "job2", "quote": "World", "author": "Anonymous", "output": "nested/two.jpg"}
        ]
    }"#;

    let output = bin()
        .arg("-c")
        .arg(&config)
        .args(["batch", "-o"])
        .arg(&out_dir)
        .write_stdin(spec)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let out = String::from_utf8_lossy(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2, "{}", out);
    assert!(lines[0].contains("\"id\":\"job1\""), "{}", out);
    assert!(lines[1].contains("\"id\":\"job2\""), "{}", out);
    assert!(out.contains("\"processing_time_ms\":"));

    assert!(out_dir.join("job1.jpg").exists());
    assert!(out_dir.join("nested").join("two.jpg").exists());
}
