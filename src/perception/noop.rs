use std::path::Path;

use anyhow::Result;

use super::{AudioScorer, Caption, Captioner, Frame, PoseEstimator};
use crate::signals::PoseSignals;

/// Pose stand-in for deployments without a keypoint model: never sees anyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPose;

impl PoseEstimator for NoPose {
    fn estimate(&self, _frame: &Frame) -> Result<PoseSignals> {
        Ok(PoseSignals::default())
    }
}

/// Captioner stand-in: every frame gets an empty caption.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCaptioner;

impl Captioner for NoCaptioner {
    fn caption(&self, _frame: &Frame) -> Result<Caption> {
        Ok(Caption::default())
    }
}

/// Audio stand-in that always reports silence.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentAudio;

impl AudioScorer for SilentAudio {
    fn score(&self, _audio_path: &Path) -> Result<f64> {
        Ok(0.0)
    }
}
