use std::collections::BTreeMap;
use std::path::Path;

use envkeep::{EnvStore, Error, ParseErrorKind, ParseMode, TargetEnv};
use tempfile::TempDir;

#[test]
fn comments_and_blank_lines_load_nothing() {
    let dir = make_temp_dir();
    let file = dir.path().join(".env");
    write_file(&file, "# header\n\n   \n\t# indented = comment\r\n\n");

    let store = EnvStore::new().path(&file);
    let report = store.load().expect("load should succeed");

    assert!(report.file_found);
    assert_eq!(report.loaded, 0);
    assert_eq!(report.skipped, 5);
    assert!(store.is_empty());
    assert_eq!(store.mirror_snapshot(), Some(BTreeMap::new()));
}

#[test]
fn well_formed_lines_reach_store_and_target() {
    let dir = make_temp_dir();
    let file = dir.path().join(".env");
    write_file(&file, "HOST=localhost\nPORT=8080\nDSN=postgres://u:p@h/db?sslmode=disable\n");

    let store = EnvStore::new().path(&file);
    store.load().expect("load should succeed");

    for (key, value) in [
        ("HOST", "localhost"),
        ("PORT", "8080"),
        ("DSN", "postgres://u:p@h/db?sslmode=disable"),
    ] {
        assert_eq!(store.get(key), value);
        assert_eq!(store.mirrored(key).as_deref(), Some(value));
    }
}

#[test]
fn later_lines_win() {
    let dir = make_temp_dir();
    let file = dir.path().join(".env");
    write_file(&file, "A=1\nA=2\n");

    let store = EnvStore::new().path(&file);
    let report = store.load().expect("load should succeed");

    assert_eq!(report.loaded, 1);
    assert_eq!(store.get("A"), "2");
}

#[test]
fn spacing_around_separator_is_kept() {
    let dir = make_temp_dir();
    let file = dir.path().join(".env");
    write_file(&file, " # comment\n\nFOO = bar \nBAZ=qux\n");

    let store = EnvStore::new().path(&file);
    store.load().expect("load should succeed");

    assert!(!store.contains_key("FOO"));
    assert_eq!(store.get_opt("FOO ").as_deref(), Some(" bar"));
    assert_eq!(store.get("BAZ"), "qux");
    assert_eq!(store.len(), 2);
}

#[test]
fn missing_file_leaves_target_untouched() {
    let dir = make_temp_dir();

    let mut initial = BTreeMap::new();
    initial.insert("KEEP".to_string(), "existing".to_string());
    let store = EnvStore::new()
        .path(dir.path().join("missing.env"))
        .target(TargetEnv::from_memory(initial.clone()));

    let report = store.load().expect("missing file is not an error");

    assert!(!report.file_found);
    assert!(store.is_empty());
    assert_eq!(store.mirror_snapshot(), Some(initial));
}

#[test]
fn load_overwrites_target_values() {
    let dir = make_temp_dir();
    let file = dir.path().join(".env");
    write_file(&file, "A=from_file\n");

    let mut initial = BTreeMap::new();
    initial.insert("A".to_string(), "existing".to_string());
    let store = EnvStore::new()
        .path(&file)
        .target(TargetEnv::from_memory(initial));

    store.load().expect("load should succeed");

    assert_eq!(store.mirrored("A").as_deref(), Some("from_file"));
}

#[test]
fn directory_path_returns_io_error() {
    let dir = make_temp_dir();

    let store = EnvStore::new().path(dir.path());
    let err = store.load().expect_err("expected I/O error");

    match err {
        Error::Io(_) => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn strict_mode_returns_parse_error() {
    let dir = make_temp_dir();
    let file = dir.path().join(".env");
    write_file(&file, "A=ok\nBAD LINE\n=nokey\n");

    let store = EnvStore::new().path(&file).parse_mode(ParseMode::Strict);
    let err = store.load().expect_err("expected parse error");

    match err {
        Error::Parse(parse_err) => {
            assert_eq!(parse_err.lines(), vec![2, 3]);
            assert_eq!(parse_err.issues[0].kind, ParseErrorKind::MissingSeparator);
            assert_eq!(parse_err.issues[1].kind, ParseErrorKind::EmptyKey);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.mirrored("A"), None);
}

#[test]
fn lenient_mode_skips_malformed_lines() {
    let dir = make_temp_dir();
    let file = dir.path().join(".env");
    write_file(&file, "A=ok\nBAD LINE\nB=ok");

    let store = EnvStore::new().path(&file);
    let report = store.load().expect("load should succeed");

    assert_eq!(report.loaded, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(store.get("B"), "ok");
}

fn make_temp_dir() -> TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}

fn write_file(path: &Path, content: &str) {
    std::fs::write(path, content).expect("failed to write test file");
}
