//! Filesystem fixtures shared by the CLI tests.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

/// Preferences ranking food first, education second and health last.
pub(super) const CATEGORIES_JSON: &str = r#"{
    "food_and_drinks": {"rank": 10, "enabled": true, "amenities": {"cafe": {"enabled": true}}},
    "education": {"rank": 20, "enabled": true, "amenities": {"library": {"enabled": true}}},
    "health": {"rank": 30, "enabled": true, "amenities": {"pharmacy": {"enabled": true}}}
}"#;

pub(super) fn utf8_tempdir() -> (TempDir, Utf8PathBuf) {
    let tmp = TempDir::new().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf-8 workspace");
    (tmp, root)
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    fs::write(path.as_std_path(), contents).expect("write fixture file");
}
