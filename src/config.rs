// src/config.rs

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::temporal::DEFAULT_WINDOW;

pub const CONFIG_ENV: &str = "VIDEO_MODERATOR_CONFIG";
const CONFIG_DIR: &str = "video-moderator";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FastFilterConfig {
    pub motion_threshold: f64,   // Default: 22
    pub darkness_threshold: f64, // Default: 60 (mean grayscale)
    pub dark_ratio: f64,         // Default: 0.4
}

impl Default for FastFilterConfig {
    fn default() -> Self {
        FastFilterConfig {
            motion_threshold: 22.0,
            darkness_threshold: 60.0,
            dark_ratio: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameSelectionConfig {
    pub motion_threshold: f64, // Default: 15 (mean grayscale difference)
    pub min_gap: usize,        // Default: 2 candidate frames
    pub max_candidates: usize, // Default: 1500
}

impl Default for FrameSelectionConfig {
    fn default() -> Self {
        FrameSelectionConfig {
            motion_threshold: 15.0,
            min_gap: 2,
            max_candidates: 1500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeratorConfig {
    // Temporal
    pub window_size: usize, // Default: 5 frames

    // Perception pool
    pub max_workers: usize,      // Default: 4
    pub frame_timeout_ms: u64,   // Default: 10s per frame

    // Sampling
    pub sample_interval_secs: f64, // Default: 0.2s between candidate frames
    pub max_frames: usize,         // Default: 15, raised for long clips
    pub ffmpeg_path: PathBuf,      // Default: "ffmpeg" on PATH
    pub extract_audio: bool,       // Default: true

    pub selection: FrameSelectionConfig,
    pub fast_filter: FastFilterConfig,
}

impl Default for ModeratorConfig {
    fn default() -> Self {
        ModeratorConfig {
            window_size: DEFAULT_WINDOW,
            max_workers: 4,
            frame_timeout_ms: 10_000,
            sample_interval_secs: 0.2,
            max_frames: 15,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            extract_audio: true,
            selection: FrameSelectionConfig::default(),
            fast_filter: FastFilterConfig::default(),
        }
    }
}

impl ModeratorConfig {
    /// Loads configuration from, in order: the explicit path, the
    /// `VIDEO_MODERATOR_CONFIG` variable, the per-user config file if it
    /// exists, or the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, String> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }
        match Self::user_config_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn from_file(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;
        Self::from_json(&raw)
            .map_err(|e| format!("Failed to parse config {}: {}", path.display(), e))
    }

    pub fn from_json(raw: &str) -> Result<Self, String> {
        let config: ModeratorConfig = serde_json::from_str(raw).map_err(|e| e.to_string())?;
        config.validated()
    }

    fn validated(mut self) -> Result<Self, String> {
        if !(self.sample_interval_secs.is_finite() && self.sample_interval_secs > 0.0) {
            return Err(format!(
                "sample_interval_secs must be positive, got {}",
                self.sample_interval_secs
            ));
        }
        self.window_size = self.window_size.max(1);
        self.max_workers = self.max_workers.max(1);
        self.max_frames = self.max_frames.max(1);
        self.selection.max_candidates = self.selection.max_candidates.max(1);
        Ok(self)
    }

    pub fn frame_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_timeout_ms)
    }
}

// Stage timing for one analysis run
#[derive(Debug, Clone)]
pub struct OperationMetrics {
    pub operation: String,
    pub start_time: Instant,
    last_checkpoint: Duration,
    pub checkpoints: Vec<StageTiming>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub elapsed_ms: u64,
}

impl OperationMetrics {
    pub fn new(operation: impl Into<String>) -> Self {
        OperationMetrics {
            operation: operation.into(),
            start_time: Instant::now(),
            last_checkpoint: Duration::ZERO,
            checkpoints: Vec::new(),
        }
    }

    /// Records the time spent since the previous checkpoint under `stage`.
    pub fn checkpoint(&mut self, stage: &str) {
        let now = self.start_time.elapsed();
        let spent = now.saturating_sub(self.last_checkpoint);
        self.last_checkpoint = now;
        log::debug!("{}: {} took {} ms", self.operation, stage, spent.as_millis());
        self.checkpoints.push(StageTiming {
            stage: stage.to_string(),
            elapsed_ms: spent.as_millis() as u64,
        });
    }

    pub fn complete(self) -> OperationReport {
        OperationReport {
            operation: self.operation,
            total_ms: self.start_time.elapsed().as_millis() as u64,
            stages: self.checkpoints,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationReport {
    pub operation: String,
    pub total_ms: u64,
    pub stages: Vec<StageTiming>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = ModeratorConfig::from_json(r#"{"max_frames": 8, "unknown": true}"#).unwrap();
        assert_eq!(config.max_frames, 8);
        assert_eq!(config.window_size, DEFAULT_WINDOW);
        assert_eq!(config.fast_filter, FastFilterConfig::default());
    }

    #[test]
    fn nested_partial_sections_are_defaulted() {
        let config =
            ModeratorConfig::from_json(r#"{"fast_filter": {"motion_threshold": 30}}"#).unwrap();
        assert_eq!(config.fast_filter.motion_threshold, 30.0);
        assert_eq!(config.fast_filter.dark_ratio, 0.4);
    }

    #[test]
    fn selection_rules_are_configurable() {
        let config = ModeratorConfig::from_json(
            r#"{"selection": {"min_gap": 4, "max_candidates": 0}}"#,
        )
        .unwrap();
        assert_eq!(config.selection.min_gap, 4);
        assert_eq!(config.selection.motion_threshold, 15.0);
        assert_eq!(config.selection.max_candidates, 1);
    }

    #[test]
    fn zero_sizes_are_raised_to_one() {
        let config =
            ModeratorConfig::from_json(r#"{"window_size": 0, "max_workers": 0}"#).unwrap();
        assert_eq!(config.window_size, 1);
        assert_eq!(config.max_workers, 1);
    }

    #[test]
    fn non_positive_interval_is_rejected() {
        assert!(ModeratorConfig::from_json(r#"{"sample_interval_secs": 0}"#).is_err());
    }

    #[test]
    fn explicit_file_is_loaded() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_workers": 2, "frame_timeout_ms": 250}}"#).unwrap();

        let config = ModeratorConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.max_workers, 2);
        assert_eq!(config.frame_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn unreadable_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let err = ModeratorConfig::load(Some(&missing)).unwrap_err();
        assert!(err.contains("nope.json"));
    }

    #[test]
    fn metrics_record_each_stage() {
        let mut metrics = OperationMetrics::new("analyze");
        metrics.checkpoint("sampling");
        metrics.checkpoint("policies");
        let report = metrics.complete();
        let stages: Vec<_> = report.stages.iter().map(|s| s.stage.as_str()).collect();
        assert_eq!(stages, ["sampling", "policies"]);
    }
}
