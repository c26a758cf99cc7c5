//! Current video/caption pairing and the operations that edit it

use crate::marker::{self, add_marker, has_marker, strip_marker};
use crate::{MatcherError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A committed video → caption correspondence
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Match {
    pub primary: String,
    pub auxiliary: String,
}

impl Match {
    pub fn new(primary: impl Into<String>, auxiliary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            auxiliary: auxiliary.into(),
        }
    }
}

/// Ordered matches plus the files discovered in one folder.
///
/// Each video and each caption appears in at most one match. Names are
/// relative to `folder` and always reflect what is on disk.
#[derive(Debug, Clone, Serialize)]
pub struct MatchStore {
    folder: PathBuf,
    primaries: Vec<String>,
    auxiliaries: Vec<String>,

    /// Videos excluded from matching by the skip prefix
    ignored: Vec<String>,

    matches: Vec<Match>,
    markers_enabled: bool,

    /// Marker renames that failed, one line per file
    marker_errors: Vec<String>,
}

impl MatchStore {
    pub fn new(folder: impl Into<PathBuf>, primaries: Vec<String>, auxiliaries: Vec<String>) -> Self {
        Self {
            folder: folder.into(),
            primaries,
            auxiliaries,
            ignored: Vec::new(),
            matches: Vec::new(),
            markers_enabled: true,
            marker_errors: Vec::new(),
        }
    }

    pub fn with_ignored(mut self, ignored: Vec<String>) -> Self {
        self.ignored = ignored;
        self
    }

    pub fn with_markers(mut self, enabled: bool) -> Self {
        self.markers_enabled = enabled;
        self
    }

    /// Seed the store with assignment output; pairs naming unknown files
    /// or reusing a file are dropped
    pub fn with_matches(mut self, matches: Vec<Match>) -> Self {
        for m in matches {
            let known = self.primaries.contains(&m.primary) && self.auxiliaries.contains(&m.auxiliary);
            let taken = self
                .matches
                .iter()
                .any(|e| e.primary == m.primary || e.auxiliary == m.auxiliary);
            if known && !taken {
                self.matches.push(m);
            } else {
                warn!("Dropping inconsistent match {} -> {}", m.primary, m.auxiliary);
            }
        }
        debug_assert!(self.is_consistent());
        self
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn primaries(&self) -> &[String] {
        &self.primaries
    }

    pub fn auxiliaries(&self) -> &[String] {
        &self.auxiliaries
    }

    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn markers_enabled(&self) -> bool {
        self.markers_enabled
    }

    pub fn marker_errors(&self) -> &[String] {
        &self.marker_errors
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn match_for_primary(&self, primary: &str) -> Option<&Match> {
        self.matches.iter().find(|m| m.primary == primary)
    }

    pub fn match_for_auxiliary(&self, auxiliary: &str) -> Option<&Match> {
        self.matches.iter().find(|m| m.auxiliary == auxiliary)
    }

    pub fn unmatched_primaries(&self) -> Vec<&str> {
        self.primaries
            .iter()
            .filter(|p| self.match_for_primary(p).is_none())
            .map(String::as_str)
            .collect()
    }

    pub fn unmatched_auxiliaries(&self) -> Vec<&str> {
        self.auxiliaries
            .iter()
            .filter(|a| self.match_for_auxiliary(a).is_none())
            .map(String::as_str)
            .collect()
    }

    /// Current on-disk name of a video given either its marked or its
    /// logical name
    pub fn resolve_primary(&self, name: &str) -> Option<String> {
        [name.to_string(), strip_marker(name), add_marker(name)]
            .into_iter()
            .find(|candidate| self.primaries.contains(candidate))
    }

    fn require_primary(&self, name: &str) -> Result<String> {
        self.resolve_primary(name)
            .ok_or_else(|| MatcherError::UnknownFile(name.to_string()))
    }

    fn require_auxiliary(&self, name: &str) -> Result<String> {
        if self.auxiliaries.iter().any(|a| a == name) {
            Ok(name.to_string())
        } else {
            Err(MatcherError::UnknownFile(name.to_string()))
        }
    }

    /// Pair `primary` with `auxiliary`, replacing any match either had.
    ///
    /// A marked video is renamed off its marker first; if that rename
    /// fails nothing changes.
    pub fn create(&mut self, primary: &str, auxiliary: &str) -> Result<()> {
        let mut primary = self.require_primary(primary)?;
        let auxiliary = self.require_auxiliary(auxiliary)?;

        if has_marker(&primary) {
            let cleared = marker::clear_marker(&self.folder, &primary)?;
            self.rename_primary(&primary, &cleared);
            primary = cleared;
        }

        self.matches
            .retain(|m| m.primary != primary && m.auxiliary != auxiliary);
        info!("🔗 Matched {} -> {}", primary, auxiliary);
        self.matches.push(Match::new(primary, auxiliary));

        debug_assert!(self.is_consistent());
        Ok(())
    }

    /// Delete the exact pair if present and mark the video unmatched.
    ///
    /// A failed marker rename is recorded in [`Self::marker_errors`]; the
    /// pair stays removed.
    pub fn remove(&mut self, primary: &str, auxiliary: &str) -> bool {
        let Some(primary) = self.resolve_primary(primary) else {
            return false;
        };
        let Some(index) = self
            .matches
            .iter()
            .position(|m| m.primary == primary && m.auxiliary == auxiliary)
        else {
            return false;
        };

        self.matches.remove(index);
        info!("✂️ Unmatched {} -> {}", primary, auxiliary);

        if self.markers_enabled {
            self.mark(&primary);
        }

        debug_assert!(self.is_consistent());
        true
    }

    /// Exchange the captions of two existing pairs without touching disk
    pub fn swap(
        &mut self,
        primary_a: &str,
        auxiliary_a: &str,
        primary_b: &str,
        auxiliary_b: &str,
    ) -> Result<()> {
        let primary_a = self.require_primary(primary_a)?;
        let primary_b = self.require_primary(primary_b)?;

        for (primary, auxiliary) in [(&primary_a, auxiliary_a), (&primary_b, auxiliary_b)] {
            if !self
                .matches
                .iter()
                .any(|m| &m.primary == primary && m.auxiliary == auxiliary)
            {
                return Err(MatcherError::MatchNotFound(primary.clone(), auxiliary.to_string()));
            }
        }

        for m in self.matches.iter_mut() {
            if m.primary == primary_a && m.auxiliary == auxiliary_a {
                m.auxiliary = auxiliary_b.to_string();
            } else if m.primary == primary_b && m.auxiliary == auxiliary_b {
                m.auxiliary = auxiliary_a.to_string();
            }
        }
        info!(
            "🔀 Swapped captions: {} <-> {}, {} <-> {}",
            primary_a, auxiliary_b, primary_b, auxiliary_a
        );

        debug_assert!(self.is_consistent());
        Ok(())
    }

    /// Bring on-disk markers in line with the pairing: matched videos lose
    /// the marker, unmatched ones gain it when markers are enabled
    pub fn reconcile_markers(&mut self) {
        let snapshot = self.primaries.clone();
        for primary in snapshot {
            let matched = self.match_for_primary(&primary).is_some();
            if matched && has_marker(&primary) {
                match marker::clear_marker(&self.folder, &primary) {
                    Ok(cleared) => self.rename_primary(&primary, &cleared),
                    Err(e) => self.record_marker_error(&primary, e),
                }
            } else if !matched && self.markers_enabled {
                self.mark(&primary);
            }
        }
        debug_assert!(self.is_consistent());
    }

    fn mark(&mut self, primary: &str) {
        if has_marker(primary) {
            return;
        }
        match marker::apply_marker(&self.folder, primary) {
            Ok(marked) => self.rename_primary(primary, &marked),
            Err(e) => self.record_marker_error(primary, e),
        }
    }

    fn record_marker_error(&mut self, primary: &str, error: MatcherError) {
        warn!("⚠️ Marker rename failed for {}: {}", primary, error);
        self.marker_errors.push(format!("{}: {}", primary, error));
    }

    /// Reflect a rename of a video in the file list and its match
    fn rename_primary(&mut self, old: &str, new: &str) {
        if old == new {
            return;
        }
        for p in self.primaries.iter_mut().filter(|p| p.as_str() == old) {
            *p = new.to_string();
        }
        for m in self.matches.iter_mut().filter(|m| m.primary == old) {
            m.primary = new.to_string();
        }
        debug!("Store renamed {} -> {}", old, new);
    }

    /// No video and no caption appears in two matches
    pub fn is_consistent(&self) -> bool {
        let mut primaries = HashSet::new();
        let mut auxiliaries = HashSet::new();
        self.matches
            .iter()
            .all(|m| primaries.insert(&m.primary) && auxiliaries.insert(&m.auxiliary))
    }
}
