//! End-to-end tests of the `showshelf` binary against `fixtures/site`.
//!
//! Run with: cargo test --test cli_build

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;
use walkdir::WalkDir;

fn fixture_copy() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    for entry in WalkDir::new(&fixtures) {
        let entry = entry.unwrap();
        let dest = tmp.path().join(entry.path().strip_prefix(&fixtures).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).unwrap();
        } else {
            fs::copy(entry.path(), &dest).unwrap();
        }
    }
    tmp
}

fn showshelf(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_showshelf"))
        .arg("--root")
        .arg(root)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(out: &Output) -> String {
    assert!(
        out.status.success(),
        "showshelf failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn site(root: &Path) -> PathBuf {
    root.join("_site")
}

#[test]
fn build_writes_the_whole_site() {
    let tmp = fixture_copy();
    let text = stdout(&showshelf(tmp.path(), &["build"]));

    assert!(text.contains("002 index.njk \u{2192} index.html"));
    assert!(text.contains("Monster \u{2192} posts/monster-2/index.html"));
    assert!(text.contains("Passthrough (2 copied)"));
    assert!(text.contains("Missing: images, assets"));
    assert!(text.contains("Built 3 pages, 6 post pages"));

    for file in [
        "index.html",
        "about/index.html",
        "search-data.json",
        "posts/dandadan/index.html",
        "posts/your-name/index.html",
        "css/style.css",
        "js/app.js",
    ] {
        assert!(site(tmp.path()).join(file).is_file(), "missing {file}");
    }
}

#[test]
fn build_warns_about_missing_passthrough_on_stderr() {
    let tmp = fixture_copy();
    let out = showshelf(tmp.path(), &["build"]);
    stdout(&out);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("passthrough path not found"));
}

#[test]
fn rebuild_reuses_passthrough_until_no_cache() {
    let tmp = fixture_copy();
    stdout(&showshelf(tmp.path(), &["build"]));

    let text = stdout(&showshelf(tmp.path(), &["build"]));
    assert!(text.contains("Passthrough (2 unchanged, 0 copied (2 total))"));

    let text = stdout(&showshelf(tmp.path(), &["build", "--no-cache"]));
    assert!(text.contains("Passthrough (2 copied)"));
}

#[test]
fn output_flag_overrides_config() {
    let tmp = fixture_copy();
    stdout(&showshelf(tmp.path(), &["--output", "public", "build"]));
    assert!(tmp.path().join("public/index.html").is_file());
    assert!(!site(tmp.path()).exists());
}

#[test]
fn broken_catalog_still_builds() {
    let tmp = fixture_copy();
    fs::write(tmp.path().join("src/_data/posts.json"), "[{ nope").unwrap();
    let out = showshelf(tmp.path(), &["build"]);
    let text = stdout(&out);
    assert!(text.contains("Built 3 pages, 0 post pages"));
    assert!(String::from_utf8_lossy(&out.stderr).contains("catalog unavailable"));
}

#[test]
fn check_validates_without_writing() {
    let tmp = fixture_copy();
    let text = stdout(&showshelf(tmp.path(), &["check"]));
    assert!(text.contains("Catalog: 6 posts"));
    assert!(text.contains("    hero: 2"));
    assert!(text.contains("    top_airing: 3"));
    assert!(text.contains("OK: 9 files would be written"));
    assert!(!site(tmp.path()).exists());
}

#[test]
fn check_fails_on_template_error() {
    let tmp = fixture_copy();
    fs::write(tmp.path().join("src/broken.njk"), "{% for %}").unwrap();
    let out = showshelf(tmp.path(), &["check"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("broken.njk"));
}

#[test]
fn collections_json_lists_named_collections() {
    let tmp = fixture_copy();
    let text = stdout(&showshelf(tmp.path(), &["collections", "--json"]));
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();

    let hero: Vec<&str> = value["hero"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["slug"].as_str().unwrap())
        .collect();
    assert_eq!(hero, vec!["frieren-beyond-journey-s-end", "dandadan"]);
    assert_eq!(value["all"].as_array().unwrap().len(), 6);
    let top_airing: Vec<&str> = value["top_airing"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["slug"].as_str().unwrap())
        .collect();
    assert_eq!(
        top_airing,
        vec![
            "frieren-beyond-journey-s-end",
            "dandadan",
            "frieren-beyond-journey-s-end-season-2"
        ]
    );
    assert_eq!(value["all"][2]["watchLink"], "/watch/monster/");
}

#[test]
fn gen_config_prints_stock_config() {
    let tmp = TempDir::new().unwrap();
    let text = stdout(&showshelf(tmp.path(), &["gen-config"]));
    assert!(text.starts_with("# showshelf configuration"));
    assert!(text.contains("[post_pages]"));
}
