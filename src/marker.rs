//! The `--` unmatched marker.
//!
//! A video without a caption is renamed on disk to carry a `--` prefix so
//! the state survives restarts without a separate state file. The prefix
//! is only ever added or removed through a rename.

use crate::media::{base_name, file_stem, parent_dir};
use crate::{MatcherError, Result};
use std::fs;
use std::io;
use std::path::Path;
use tracing::info;

pub const MARKER: &str = "--";

/// Whether the final path component carries the marker
pub fn has_marker(name: &str) -> bool {
    base_name(name).starts_with(MARKER)
}

/// Name with the marker prepended to its final component
pub fn add_marker(name: &str) -> String {
    if has_marker(name) {
        return name.to_string();
    }
    with_base(name, &format!("{}{}", MARKER, base_name(name)))
}

/// Name with the marker removed from its final component
pub fn strip_marker(name: &str) -> String {
    match base_name(name).strip_prefix(MARKER) {
        Some(logical) => with_base(name, logical),
        None => name.to_string(),
    }
}

/// Stem used for matching: extension and marker removed
pub fn logical_stem(name: &str) -> &str {
    let stem = file_stem(name);
    stem.strip_prefix(MARKER).unwrap_or(stem)
}

fn with_base(name: &str, base: &str) -> String {
    match parent_dir(name) {
        "" => base.to_string(),
        parent => format!("{}/{}", parent, base),
    }
}

/// Rename `name` under `folder` to carry the marker; returns the new name
pub fn apply_marker(folder: &Path, name: &str) -> Result<String> {
    let marked = add_marker(name);
    if marked != name {
        rename_within(folder, name, &marked)?;
        info!("🏷️ Marked unmatched: {} -> {}", name, marked);
    }
    Ok(marked)
}

/// Rename `name` under `folder` to drop the marker; returns the new name
pub fn clear_marker(folder: &Path, name: &str) -> Result<String> {
    let logical = strip_marker(name);
    if logical != name {
        rename_within(folder, name, &logical)?;
        info!("🏷️ Cleared marker: {} -> {}", name, logical);
    }
    Ok(logical)
}

/// Rename without clobbering an existing file
fn rename_within(folder: &Path, from: &str, to: &str) -> Result<()> {
    let from = folder.join(from);
    let to = folder.join(to);

    if to.exists() {
        return Err(MatcherError::Rename {
            source: io::Error::new(io::ErrorKind::AlreadyExists, "target already exists"),
            from,
            to,
        });
    }

    fs::rename(&from, &to).map_err(|source| MatcherError::Rename { from, to, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_name_helpers() {
        assert!(has_marker("--Show.mkv"));
        assert!(has_marker("season1/--Show.mkv"));
        assert!(!has_marker("--dir/Show.mkv"));

        assert_eq!(add_marker("Show.mkv"), "--Show.mkv");
        assert_eq!(add_marker("--Show.mkv"), "--Show.mkv");
        assert_eq!(add_marker("season1/Show.mkv"), "season1/--Show.mkv");

        assert_eq!(strip_marker("--Show.mkv"), "Show.mkv");
        assert_eq!(strip_marker("Show.mkv"), "Show.mkv");
        assert_eq!(strip_marker("season1/--Show.mkv"), "season1/Show.mkv");

        assert_eq!(logical_stem("--Show.S01E01.mkv"), "Show.S01E01");
        assert_eq!(logical_stem("a/Show.mkv"), "Show");
    }

    #[test]
    fn test_marker_round_trip_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("Show.mkv"), b"v").unwrap();

        let marked = apply_marker(temp_dir.path(), "Show.mkv").unwrap();
        assert_eq!(marked, "--Show.mkv");
        assert!(temp_dir.path().join("--Show.mkv").exists());
        assert!(!temp_dir.path().join("Show.mkv").exists());

        // already marked: no-op
        assert_eq!(apply_marker(temp_dir.path(), &marked).unwrap(), "--Show.mkv");

        let cleared = clear_marker(temp_dir.path(), &marked).unwrap();
        assert_eq!(cleared, "Show.mkv");
        assert!(temp_dir.path().join("Show.mkv").exists());
    }

    #[test]
    fn test_marker_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("Show.mkv"), b"a").unwrap();
        fs::write(temp_dir.path().join("--Show.mkv"), b"b").unwrap();

        let result = apply_marker(temp_dir.path(), "Show.mkv");
        assert!(matches!(result, Err(MatcherError::Rename { .. })));
        assert_eq!(fs::read(temp_dir.path().join("--Show.mkv")).unwrap(), b"b");
    }

    #[test]
    fn test_missing_file_is_a_rename_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = clear_marker(temp_dir.path(), "--Missing.mkv");
        assert!(matches!(result, Err(MatcherError::Rename { .. })));
    }
}
