use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::matching::{Precedence, Scorer, ScorerRegistry, Strategy, DEFAULT_THRESHOLD};
use crate::media::MediaScanner;

/// Configuration for the Video/Subtitle Renamer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scoring and assignment settings
    pub matching: MatchingConfig,

    /// File discovery settings
    pub discovery: DiscoveryConfig,

    /// Unmatched marker settings
    pub markers: MarkerConfig,

    /// Performance and resource settings
    pub performance: PerformanceConfig,

    /// Output and logging settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Strategy id (`default`, `year_word`, `sequence`, `levenshtein`, `hybrid`)
    pub strategy: String,

    /// Scores must strictly exceed this to be considered
    pub threshold: f64,

    /// Override of the strategy's rule ordering
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precedence: Option<Precedence>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Descend into subdirectories
    pub recursive: bool,

    /// Also recognise .flv, .webm and .vtt
    pub extended_extensions: bool,

    /// Videos starting with this prefix are left out of matching
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Rename unmatched videos to carry the `--` prefix
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Score candidate pairs on a worker pool
    pub parallel_scoring: bool,

    /// Maximum number of scoring workers
    pub max_workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Log level
    pub log_level: String,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Default.id().to_string(),
            threshold: DEFAULT_THRESHOLD,
            precedence: None,
        }
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            parallel_scoring: false,
            max_workers: num_cpus::get().min(8), // Use available cores, max 8
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration from the first readable config file, falling
    /// back to defaults plus environment overrides
    pub fn load() -> Result<Self> {
        let mut config_paths = vec![
            PathBuf::from("video-sub-renamer.toml"),
            PathBuf::from("config/video-sub-renamer.toml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            config_paths.push(dir.join("video-sub-renamer").join("config.toml"));
        }

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read config file {}: {}", path.display(), e))?;
        let config = toml::from_str(&config_str)
            .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Override with environment variables
        if let Ok(strategy) = std::env::var("VSR_STRATEGY") {
            config.matching.strategy = strategy;
        }

        if let Ok(threshold) = std::env::var("VSR_THRESHOLD") {
            config.matching.threshold = threshold.parse().unwrap_or(DEFAULT_THRESHOLD);
        }

        if let Ok(recursive) = std::env::var("VSR_RECURSIVE") {
            config.discovery.recursive = parse_flag(&recursive).unwrap_or(false);
        }

        if let Ok(prefix) = std::env::var("VSR_SKIP_PREFIX") {
            config.discovery.skip_prefix = Some(prefix).filter(|p| !p.is_empty());
        }

        if let Ok(markers) = std::env::var("VSR_MARKERS") {
            config.markers.enabled = parse_flag(&markers).unwrap_or(true);
        }

        if let Ok(workers) = std::env::var("VSR_WORKERS") {
            config.performance.max_workers = workers.parse().unwrap_or(4);
        }

        if let Ok(log_level) = std::env::var("VSR_LOG_LEVEL") {
            config.output.log_level = log_level;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let threshold = self.matching.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(anyhow!("threshold must be within [0, 1], got {}", threshold));
        }

        if self.performance.max_workers == 0 {
            return Err(anyhow!("max_workers must be greater than 0"));
        }

        if matches!(self.discovery.skip_prefix.as_deref(), Some("")) {
            return Err(anyhow!("skip_prefix must not be empty when set"));
        }

        if Strategy::from_id(&self.matching.strategy).is_none() {
            tracing::warn!(
                "Unknown strategy '{}', '{}' will be used",
                self.matching.strategy,
                Strategy::Default
            );
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Scorer selected by the configured strategy and precedence
    pub fn scorer(&self) -> Scorer {
        let scorer = ScorerRegistry::standard().select(Some(&self.matching.strategy));
        match self.matching.precedence {
            Some(precedence) => scorer.with_precedence(precedence),
            None => scorer,
        }
    }

    /// Scanner for the configured discovery mode
    pub fn scanner(&self) -> MediaScanner {
        MediaScanner::new()
            .with_extended(self.discovery.extended_extensions)
            .with_recursive(self.discovery.recursive)
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Video/Subtitle Renamer Configuration:\n\
            - Strategy: {}\n\
            - Threshold: {}\n\
            - Precedence: {}\n\
            - Recursive: {}\n\
            - Extended Extensions: {}\n\
            - Skip Prefix: {}\n\
            - Markers Enabled: {}\n\
            - Parallel Scoring: {} ({} workers)",
            self.matching.strategy,
            self.matching.threshold,
            self.matching
                .precedence
                .map_or("strategy default".to_string(), |p| format!("{:?}", p)),
            self.discovery.recursive,
            self.discovery.extended_extensions,
            self.discovery.skip_prefix.as_deref().unwrap_or("-"),
            self.markers.enabled,
            self.performance.parallel_scoring,
            self.performance.max_workers
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: &str) -> Self {
        self.config.matching.strategy = strategy.to_string();
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.config.matching.threshold = threshold;
        self
    }

    pub fn with_precedence(mut self, precedence: Precedence) -> Self {
        self.config.matching.precedence = Some(precedence);
        self
    }

    pub fn with_skip_prefix(mut self, prefix: &str) -> Self {
        self.config.discovery.skip_prefix = Some(prefix.to_string());
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.performance.max_workers = workers;
        self
    }

    pub fn recursive(mut self, enable: bool) -> Self {
        self.config.discovery.recursive = enable;
        self
    }

    pub fn extended_extensions(mut self, enable: bool) -> Self {
        self.config.discovery.extended_extensions = enable;
        self
    }

    pub fn enable_markers(mut self, enable: bool) -> Self {
        self.config.markers.enabled = enable;
        self
    }

    pub fn enable_parallel_scoring(mut self, enable: bool) -> Self {
        self.config.performance.parallel_scoring = enable;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.matching.strategy, "default");
        assert_eq!(config.matching.threshold, 0.5);
        assert!(config.markers.enabled);
        assert!(!config.discovery.recursive);
        assert!(config.performance.max_workers >= 1);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_strategy("hybrid")
            .with_threshold(0.7)
            .with_workers(2)
            .enable_markers(false)
            .build();

        assert_eq!(config.matching.strategy, "hybrid");
        assert_eq!(config.matching.threshold, 0.7);
        assert_eq!(config.performance.max_workers, 2);
        assert!(!config.markers.enabled);
        assert_eq!(config.scorer().strategy(), Strategy::Hybrid);
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());
        assert!(ConfigBuilder::new().with_threshold(1.5).build().validate().is_err());
        assert!(ConfigBuilder::new().with_workers(0).build().validate().is_err());
        assert!(ConfigBuilder::new().with_skip_prefix("").build().validate().is_err());
        // unknown strategies fall back rather than fail
        assert!(ConfigBuilder::new().with_strategy("bogus").build().validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [matching]
            strategy = "year_word"
            precedence = "episode_first"

            [discovery]
            skip_prefix = "x"
            "#,
        )
        .unwrap();

        assert_eq!(config.matching.threshold, 0.5);
        assert_eq!(config.discovery.skip_prefix.as_deref(), Some("x"));
        assert!(config.markers.enabled);
        let scorer = config.scorer();
        assert_eq!(scorer.strategy(), Strategy::YearWord);
        assert_eq!(scorer.precedence(), Precedence::EpisodeFirst);
    }

    #[test]
    fn test_save_and_load_from() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let config = ConfigBuilder::new()
            .with_strategy("sequence")
            .recursive(true)
            .build();

        config.save(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.matching.strategy, "sequence");
        assert!(loaded.discovery.recursive);
    }
}
