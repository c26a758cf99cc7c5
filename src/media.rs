//! Media file discovery and role classification

use crate::{MatcherError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Video extensions that are always recognised.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "wmv"];

/// Video extensions recognised only when extended discovery is enabled.
pub const EXTENDED_VIDEO_EXTENSIONS: &[&str] = &["flv", "webm"];

/// Caption extensions that are always recognised.
pub const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "sub", "idx", "ass", "ssa"];

/// Caption extensions recognised only when extended discovery is enabled.
pub const EXTENDED_SUBTITLE_EXTENSIONS: &[&str] = &["vtt"];

/// Role a file plays in a pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    /// Video-like file that needs a caption
    Primary,

    /// Caption-like file being paired to a video
    Auxiliary,
}

/// Files found in a working directory, partitioned by role.
///
/// Names are relative to the scanned directory and use `/` separators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredFiles {
    pub primaries: Vec<String>,
    pub auxiliaries: Vec<String>,
}

impl DiscoveredFiles {
    pub fn is_empty(&self) -> bool {
        self.primaries.is_empty() && self.auxiliaries.is_empty()
    }
}

/// Directory scanner that filters by the extension allow-lists
#[derive(Debug, Clone)]
pub struct MediaScanner {
    /// Lower-cased video extensions without the dot
    video_extensions: Vec<String>,

    /// Lower-cased caption extensions without the dot
    subtitle_extensions: Vec<String>,

    /// Descend into subdirectories
    recursive: bool,
}

impl Default for MediaScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaScanner {
    /// Create a flat scanner with the base extension lists
    pub fn new() -> Self {
        Self {
            video_extensions: VIDEO_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            subtitle_extensions: SUBTITLE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            recursive: false,
        }
    }

    /// Include the optional extensions (`.flv`, `.webm`, `.vtt`)
    pub fn with_extended(mut self, extended: bool) -> Self {
        if extended {
            self.video_extensions
                .extend(EXTENDED_VIDEO_EXTENSIONS.iter().map(|e| e.to_string()));
            self.subtitle_extensions
                .extend(EXTENDED_SUBTITLE_EXTENSIONS.iter().map(|e| e.to_string()));
        }
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Classify a filename by its extension (case-insensitive)
    pub fn classify(&self, name: &str) -> Option<MediaKind> {
        let (_, ext) = split_extension(name);
        let ext = ext.trim_start_matches('.').to_lowercase();
        if ext.is_empty() {
            return None;
        }

        if self.video_extensions.contains(&ext) {
            Some(MediaKind::Primary)
        } else if self.subtitle_extensions.contains(&ext) {
            Some(MediaKind::Auxiliary)
        } else {
            None
        }
    }

    /// Scan a directory for video and caption files.
    ///
    /// Entries are visited in file-name order so repeated scans of an
    /// unchanged directory produce identical lists.
    pub fn scan_directory(&self, directory: &Path) -> Result<DiscoveredFiles> {
        if !directory.is_dir() {
            return Err(MatcherError::InvalidDirectory(directory.display().to_string()));
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut found = DiscoveredFiles::default();

        for entry in WalkDir::new(directory)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", directory.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = match entry.path().strip_prefix(directory) {
                Ok(relative) => relative_name(relative),
                Err(_) => continue,
            };

            match self.classify(&relative) {
                Some(MediaKind::Primary) => found.primaries.push(relative),
                Some(MediaKind::Auxiliary) => found.auxiliaries.push(relative),
                None => debug!("Ignoring non-media file: {}", relative),
            }
        }

        info!(
            "📁 Found {} video files, {} subtitle files in {}",
            found.primaries.len(),
            found.auxiliaries.len(),
            directory.display()
        );

        Ok(found)
    }
}

/// Join path components with `/` regardless of platform
fn relative_name(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Split a name into `(stem, extension)` the way `splitext` does.
///
/// The extension keeps its dot; leading dots of the final component never
/// start an extension, so `.srt` has no extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    let base_start = name.rfind('/').map_or(0, |i| i + 1);
    let base = &name[base_start..];
    let leading = base.len() - base.trim_start_matches('.').len();

    match base[leading..].rfind('.') {
        Some(i) => {
            let dot = base_start + leading + i;
            (&name[..dot], &name[dot..])
        }
        None => (name, ""),
    }
}

/// Final path component of a relative name
pub fn base_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Base name with its extension removed
pub fn file_stem(name: &str) -> &str {
    let (stem, _) = split_extension(name);
    base_name(stem)
}

/// Directory part of a relative name, empty for top-level files
pub fn parent_dir(name: &str) -> &str {
    name.rfind('/').map_or("", |i| &name[..i])
}
