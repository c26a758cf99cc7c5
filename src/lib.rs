/// Video/Subtitle Renamer - Rust Implementation
///
/// Pairs video files with caption files purely from filename text, lets the
/// pairing be edited by hand, and renames captions so players pick them up.

pub mod config;
pub mod marker;
pub mod matching;
pub mod media;
pub mod processing;
pub mod rename;
pub mod settings;
pub mod store;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder};
pub use crate::matching::{assign, normalize, Precedence, Scorer, ScorerRegistry, Strategy};
pub use crate::media::{MediaKind, MediaScanner};
pub use crate::processing::{Processor, ScanReport, ScanStatus};
pub use crate::rename::{commit, CommitReport};
pub use crate::settings::{JsonSettingsStore, Settings, SettingsStore};
pub use crate::store::{Match, MatchStore};

use std::path::PathBuf;

/// Result type for matching and renaming operations
pub type Result<T> = std::result::Result<T, MatcherError>;

/// Error types for matching and renaming operations
#[derive(thiserror::Error, Debug)]
pub enum MatcherError {
    #[error("Failed to rename {} -> {}: {source}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid directory: {0}")]
    InvalidDirectory(String),

    #[error("Unknown file: {0}")]
    UnknownFile(String),

    #[error("Match not found: {0} -> {1}")]
    MatchNotFound(String, String),
}
