use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::Config;
use crate::marker::strip_marker;
use crate::matching::Assigner;
use crate::media::base_name;
use crate::rename::{self, CommitReport};
use crate::store::MatchStore;

/// Outcome category of a directory scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ScanStatus {
    /// Folder missing or not a directory
    InvalidDirectory(String),

    /// No video or caption files found
    NoFiles,

    Scanned {
        primaries: usize,
        auxiliaries: usize,
        matched: usize,
        ignored: usize,
    },
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanStatus::InvalidDirectory(reason) => write!(f, "Invalid folder: {}", reason),
            ScanStatus::NoFiles => write!(f, "No video or subtitle files found"),
            ScanStatus::Scanned {
                primaries,
                auxiliaries,
                matched,
                ignored,
            } => write!(
                f,
                "Found {} videos and {} subtitles, matched {} pairs ({} videos skipped)",
                primaries, auxiliaries, matched, ignored
            ),
        }
    }
}

/// Result of one scan: the fresh store plus what happened
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub status: ScanStatus,
    pub store: MatchStore,
}

impl ScanReport {
    pub fn marker_errors(&self) -> &[String] {
        self.store.marker_errors()
    }
}

/// Drives the discover → match → mark → commit cycle for one folder
pub struct Processor {
    config: Config,
}

impl Processor {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Discover files, build a fresh pairing and reconcile markers on disk.
    ///
    /// Input problems are reported through [`ScanStatus`], never as errors.
    pub fn scan(&self, folder: &Path) -> ScanReport {
        let start_time = Instant::now();
        info!("🔍 Scanning {}", folder.display());

        let found = match self.config.scanner().scan_directory(folder) {
            Ok(found) => found,
            Err(e) => {
                warn!("⚠️ {}", e);
                return ScanReport {
                    status: ScanStatus::InvalidDirectory(e.to_string()),
                    store: MatchStore::new(folder, Vec::new(), Vec::new()),
                };
            }
        };

        if found.is_empty() {
            return ScanReport {
                status: ScanStatus::NoFiles,
                store: MatchStore::new(folder, Vec::new(), Vec::new()),
            };
        }

        let (candidates, ignored): (Vec<String>, Vec<String>) = found
            .primaries
            .into_iter()
            .partition(|name| !self.is_skipped(name));

        let mut assigner = Assigner::new(self.config.scorer()).with_threshold(self.config.matching.threshold);
        if self.config.performance.parallel_scoring {
            assigner = assigner.with_workers(self.config.performance.max_workers);
        }
        let matches = assigner.assign(&candidates, &found.auxiliaries);

        let mut store = MatchStore::new(folder, candidates, found.auxiliaries)
            .with_ignored(ignored)
            .with_markers(self.config.markers.enabled)
            .with_matches(matches);
        store.reconcile_markers();

        let status = ScanStatus::Scanned {
            primaries: store.primaries().len(),
            auxiliaries: store.auxiliaries().len(),
            matched: store.matches().len(),
            ignored: store.ignored().len(),
        };
        info!("✅ {} in {:.2?}", status, start_time.elapsed());

        ScanReport { status, store }
    }

    /// Rename matched captions on disk; rescan to observe the result
    pub fn commit(&self, store: &MatchStore) -> CommitReport {
        rename::commit(store.matches(), store.folder())
    }

    /// Base name (marker removed) starts with the skip prefix, ignoring case
    fn is_skipped(&self, name: &str) -> bool {
        match &self.config.discovery.skip_prefix {
            Some(prefix) if !prefix.is_empty() => {
                let logical = strip_marker(name);
                base_name(&logical)
                    .to_lowercase()
                    .starts_with(&prefix.to_lowercase())
            }
            _ => false,
        }
    }
}
