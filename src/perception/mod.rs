//! Boundary to the perception models. Every collaborator is a trait object
//! handed to the pipeline; the decision core never sees them.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::signals::PoseSignals;

mod audio;
mod color;
mod landmarks;
mod noop;
mod pipeline;

#[cfg(test)]
mod tests;

pub use audio::{score_segments, TranscriptScorer, Transcriber, AUDIO_RISK_WORDS};
pub use color::ColorHeuristics;
pub use landmarks::{Keypoint, LandmarkModel, LandmarkPose, PoseLandmarks};
pub use noop::{NoCaptioner, NoPose, SilentAudio};
pub use pipeline::PerceptionPipeline;

/// One sampled frame, decoded to RGB.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: usize,
    pub image: RgbImage,
}

impl Frame {
    pub fn new(index: usize, image: RgbImage) -> Self {
        Frame { index, image }
    }
}

/// What the colour/segmentation detectors saw in one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualReading {
    pub skin_ratio: f64,
    pub blood_visible: bool,
    pub fire_visible: bool,
    pub human_detected: bool,
}

/// Per-frame perception result. The default value is the neutral reading used
/// whenever a frame could not be analysed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameObservation {
    pub motion: f64,
    pub pose: PoseSignals,
    pub visual: VisualReading,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub text: String,
    pub confidence: f64,
}

impl Caption {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Caption {
            text: text.into(),
            confidence,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Skeleton/hand keypoint model.
pub trait PoseEstimator: Send + Sync {
    fn estimate(&self, frame: &Frame) -> Result<PoseSignals>;
}

/// Skin, blood, fire and person detectors for a single frame.
pub trait FrameDetector: Send + Sync {
    fn inspect(&self, frame: &Frame) -> Result<VisualReading>;
}

/// Image captioning model.
pub trait Captioner: Send + Sync {
    fn caption(&self, frame: &Frame) -> Result<Caption>;

    /// Captions a batch in one call. Must return one caption per frame, in
    /// order; the default captions frames one at a time.
    fn caption_batch(&self, frames: &[Arc<Frame>]) -> Result<Vec<Caption>> {
        frames.iter().map(|frame| self.caption(frame)).collect()
    }
}

/// Scores an extracted audio track in `[0, 1]`.
pub trait AudioScorer: Send + Sync {
    fn score(&self, audio_path: &Path) -> Result<f64>;
}

/// The set of models one analysis run uses.
#[derive(Clone)]
pub struct PerceptionServices {
    pub pose: Arc<dyn PoseEstimator>,
    pub detector: Arc<dyn FrameDetector>,
    pub captioner: Arc<dyn Captioner>,
    pub audio: Arc<dyn AudioScorer>,
}

impl Default for PerceptionServices {
    /// Colour heuristics only: no pose model, no captioner, no audio model.
    fn default() -> Self {
        PerceptionServices {
            pose: Arc::new(NoPose),
            detector: Arc::new(ColorHeuristics::default()),
            captioner: Arc::new(NoCaptioner),
            audio: Arc::new(SilentAudio),
        }
    }
}

impl PerceptionServices {
    pub fn with_pose(mut self, pose: impl PoseEstimator + 'static) -> Self {
        self.pose = Arc::new(pose);
        self
    }

    pub fn with_detector(mut self, detector: impl FrameDetector + 'static) -> Self {
        self.detector = Arc::new(detector);
        self
    }

    pub fn with_captioner(mut self, captioner: impl Captioner + 'static) -> Self {
        self.captioner = Arc::new(captioner);
        self
    }

    pub fn with_audio(mut self, audio: impl AudioScorer + 'static) -> Self {
        self.audio = Arc::new(audio);
        self
    }
}

impl std::fmt::Debug for PerceptionServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerceptionServices").finish_non_exhaustive()
    }
}
