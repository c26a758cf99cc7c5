//! Commit: rename each matched caption after its video

use crate::media::{file_stem, parent_dir, split_extension};
use crate::store::Match;
use crate::MatcherError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Suffix given to a file displaced by a commit
pub const BACKUP_SUFFIX: &str = ".bak";

/// Outcome of one commit run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReport {
    /// Captions renamed into place
    pub renamed: usize,

    /// Captions already carrying their target name
    pub skipped: usize,

    /// One description per pair that could not be committed
    pub errors: Vec<String>,
}

impl CommitReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Caption name that pairs with `m.primary`: the video's stem with the
/// caption's extension, in the video's directory
pub fn target_name(m: &Match) -> String {
    let (_, extension) = split_extension(&m.auxiliary);
    let base = format!("{}{}", file_stem(&m.primary), extension);
    match parent_dir(&m.primary) {
        "" => base,
        parent => format!("{}/{}", parent, base),
    }
}

/// Rename every matched caption in order.
///
/// A file already at the target is moved to `<target>.bak` first; when
/// that file is itself a caption of a later pair, the later pair is
/// renamed from the backup. Failures are collected per pair and earlier
/// renames are never rolled back.
pub fn commit(matches: &[Match], folder: &Path) -> CommitReport {
    let mut report = CommitReport::default();
    let mut displaced: HashMap<String, String> = HashMap::new();

    for m in matches {
        let target = target_name(m);
        let current = displaced
            .get(&m.auxiliary)
            .cloned()
            .unwrap_or_else(|| m.auxiliary.clone());
        if target == current {
            debug!("Already named: {}", target);
            report.skipped += 1;
            continue;
        }

        let from = folder.join(&current);
        let to = folder.join(&target);

        if to.exists() {
            let backup_name = format!("{}{}", target, BACKUP_SUFFIX);
            let backup = folder.join(&backup_name);
            if let Err(source) = fs::rename(&to, &backup) {
                let error = MatcherError::Rename { from: to, to: backup, source };
                warn!("⚠️ Backup failed, skipping {}: {}", m.auxiliary, error);
                report.errors.push(format!("{}: {}", m.auxiliary, error));
                continue;
            }
            info!("📦 Backed up {} -> {}", target, backup_name);
            displaced.insert(target.clone(), backup_name);
        }

        match fs::rename(&from, &to) {
            Ok(()) => {
                info!("✅ Renamed {} -> {}", current, target);
                report.renamed += 1;
            }
            Err(source) => {
                let error = MatcherError::Rename { from, to, source };
                warn!("⚠️ {}", error);
                report.errors.push(format!("{}: {}", m.auxiliary, error));
            }
        }
    }

    info!(
        "📝 Commit finished: {} renamed, {} already named, {} errors",
        report.renamed,
        report.skipped,
        report.errors.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_target_name() {
        assert_eq!(target_name(&Match::new("Movie.mkv", "Old.srt")), "Movie.srt");
        assert_eq!(target_name(&Match::new("Movie.2019.mkv", "x.en.ass")), "Movie.2019.ass");
        assert_eq!(target_name(&Match::new("s1/Show.mkv", "subs/Show.srt")), "s1/Show.srt");
    }

    #[test]
    fn test_commit_backs_up_occupant() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("Movie.mkv"), b"video").unwrap();
        fs::write(temp_dir.path().join("Old.srt"), b"new captions").unwrap();
        fs::write(temp_dir.path().join("Movie.srt"), b"old captions").unwrap();

        let report = commit(&[Match::new("Movie.mkv", "Old.srt")], temp_dir.path());

        assert_eq!(report.renamed, 1);
        assert!(report.is_clean());
        assert!(!temp_dir.path().join("Old.srt").exists());
        assert_eq!(fs::read(temp_dir.path().join("Movie.srt")).unwrap(), b"new captions");
        assert_eq!(fs::read(temp_dir.path().join("Movie.srt.bak")).unwrap(), b"old captions");
    }

    #[test]
    fn test_commit_skips_correct_names() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("Movie.srt"), b"c").unwrap();

        let report = commit(&[Match::new("Movie.mkv", "Movie.srt")], temp_dir.path());
        assert_eq!(report, CommitReport { renamed: 0, skipped: 1, errors: vec![] });
        assert!(!temp_dir.path().join("Movie.srt.bak").exists());
    }

    #[test]
    fn test_commit_continues_past_failures() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.srt"), b"c").unwrap();

        let report = commit(
            &[Match::new("A.mkv", "missing.srt"), Match::new("B.mkv", "b.srt")],
            temp_dir.path(),
        );
        assert_eq!(report.renamed, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("missing.srt"));
        assert!(temp_dir.path().join("B.srt").exists());
    }

    #[test]
    fn test_commit_failed_backup_aborts_only_that_pair() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("Old.srt"), b"new captions").unwrap();
        fs::write(temp_dir.path().join("A.srt"), b"occupant").unwrap();
        fs::create_dir(temp_dir.path().join("A.srt.bak")).unwrap();
        fs::write(temp_dir.path().join("A.srt.bak").join("keep"), b"x").unwrap();
        fs::write(temp_dir.path().join("b.srt"), b"captions for B").unwrap();

        let report = commit(
            &[Match::new("A.mkv", "Old.srt"), Match::new("B.mkv", "b.srt")],
            temp_dir.path(),
        );

        assert_eq!(report.renamed, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Old.srt"));
        assert_eq!(fs::read(temp_dir.path().join("A.srt")).unwrap(), b"occupant");
        assert_eq!(fs::read(temp_dir.path().join("Old.srt")).unwrap(), b"new captions");
        assert_eq!(fs::read(temp_dir.path().join("B.srt")).unwrap(), b"captions for B");
    }

    #[test]
    fn test_commit_follows_displaced_captions() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("A.srt"), b"for B").unwrap();
        fs::write(temp_dir.path().join("B.srt"), b"for A").unwrap();

        let report = commit(
            &[Match::new("A.mkv", "B.srt"), Match::new("B.mkv", "A.srt")],
            temp_dir.path(),
        );
        assert_eq!(report.renamed, 2);
        assert!(report.is_clean());
        assert_eq!(fs::read(temp_dir.path().join("A.srt")).unwrap(), b"for A");
        assert_eq!(fs::read(temp_dir.path().join("B.srt")).unwrap(), b"for B");
        assert!(!temp_dir.path().join("A.srt.bak").exists());
    }
}
