use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::aggregator::{Decision, Explanation};
use crate::config::{ModeratorConfig, OperationMetrics, OperationReport};
use crate::engine::ModerationEngine;
use crate::perception::{Caption, Frame, FrameObservation, PerceptionPipeline, PerceptionServices};
use crate::policy::RiskMap;
use crate::sampling::{FastFilterReport, FrameSampler, SampledClip};
use crate::signals::{
    build_signals, mean_skin_ratio, CaptionEvidence, PoseSignals, RawPerception, SceneLabel,
    SignalBundle,
};
use crate::temporal::TemporalBrain;

/// Everything one run produced, ready to print or serialize.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    pub source: Option<PathBuf>,
    pub frames_sampled: usize,
    pub fast_filter: FastFilterReport,
    pub intent_score: f64,
    pub signals: SignalBundle,
    pub risks: RiskMap,
    pub decision: Decision,
    pub explanation: Explanation,
    pub timings: OperationReport,
}

/// Drives one clip through sampling, perception, signal building and the
/// moderation engine.
#[derive(Debug)]
pub struct VideoAnalyzer {
    config: ModeratorConfig,
    sampler: FrameSampler,
    pipeline: PerceptionPipeline,
    engine: ModerationEngine,
}

impl VideoAnalyzer {
    pub fn new(
        config: ModeratorConfig,
        services: PerceptionServices,
        engine: ModerationEngine,
    ) -> Self {
        VideoAnalyzer {
            sampler: FrameSampler::new(&config),
            pipeline: PerceptionPipeline::new(services, &config),
            engine,
            config,
        }
    }

    pub fn with_defaults(config: ModeratorConfig) -> Self {
        Self::new(config, PerceptionServices::default(), ModerationEngine::default())
    }

    pub fn config(&self) -> &ModeratorConfig {
        &self.config
    }

    /// Samples the file at `path` and analyses it. Fails only if the input
    /// cannot be read at all.
    pub async fn analyze(&self, path: &Path, cancel: &CancellationToken) -> Result<AnalysisReport> {
        let mut metrics = OperationMetrics::new("analyze");

        let sampler = self.sampler.clone();
        let input = path.to_path_buf();
        let clip = task::spawn_blocking(move || sampler.sample(&input))
            .await
            .context("sampling task failed")??;
        metrics.checkpoint("sampling");

        let mut report = self.analyze_clip(&clip, metrics, cancel).await;
        report.source = Some(path.to_path_buf());
        Ok(report)
    }

    /// Analyses frames that are already decoded.
    pub async fn analyze_frames(
        &self,
        clip: &SampledClip,
        cancel: &CancellationToken,
    ) -> AnalysisReport {
        self.analyze_clip(clip, OperationMetrics::new("analyze"), cancel)
            .await
    }

    async fn analyze_clip(
        &self,
        clip: &SampledClip,
        mut metrics: OperationMetrics,
        cancel: &CancellationToken,
    ) -> AnalysisReport {
        let frames = &clip.frames;

        let fast_filter = self.fast_filter(frames).await;
        log::info!(
            "fast filter: suspicious={} motion={:.2} dark_ratio={:.2}",
            fast_filter.suspicious,
            fast_filter.motion_score,
            fast_filter.dark_ratio
        );
        metrics.checkpoint("fast_filter");

        let observations = self.pipeline.observe_frames(frames, cancel).await;
        metrics.checkpoint("perception");

        let captions = if cancel.is_cancelled() {
            vec![Caption::default(); frames.len()]
        } else {
            self.pipeline.caption_frames(frames).await
        };
        metrics.checkpoint("captioning");

        let audio_score = match &clip.audio {
            Some(path) if !cancel.is_cancelled() => self.score_audio(path).await,
            _ => 0.0,
        };
        metrics.checkpoint("audio");

        let mut brain = TemporalBrain::new(self.config.window_size);
        let raw = fuse(
            &mut brain,
            fast_filter.motion_score,
            &observations,
            &captions,
            audio_score,
        );
        let intent_score = brain.intent_score();
        let signals = build_signals(raw);
        metrics.checkpoint("signals");

        let verdict = self.engine.decide(&signals);
        metrics.checkpoint("policies");

        AnalysisReport {
            run_id: Uuid::new_v4(),
            analyzed_at: Utc::now(),
            source: None,
            frames_sampled: frames.len(),
            fast_filter,
            intent_score,
            signals,
            risks: verdict.risks,
            decision: verdict.decision,
            explanation: verdict.explanation,
            timings: metrics.complete(),
        }
    }

    async fn fast_filter(&self, frames: &[Arc<Frame>]) -> FastFilterReport {
        let frames = frames.to_vec();
        let thresholds = self.config.fast_filter.clone();
        match task::spawn_blocking(move || FastFilterReport::compute(&frames, &thresholds)).await {
            Ok(report) => report,
            Err(err) => {
                log::warn!("fast filter failed: {}", err);
                FastFilterReport::default()
            }
        }
    }

    async fn score_audio(&self, path: &Path) -> f64 {
        let scorer = Arc::clone(&self.pipeline.services().audio);
        let audio = path.to_path_buf();
        let limit = self.config.frame_timeout();

        match timeout(limit, task::spawn_blocking(move || scorer.score(&audio))).await {
            Ok(Ok(Ok(score))) => score,
            Ok(Ok(Err(err))) => {
                log::warn!("audio scoring failed: {:#}", err);
                0.0
            }
            Ok(Err(err)) => {
                log::warn!("audio worker panicked: {}", err);
                0.0
            }
            Err(_) => {
                log::warn!("audio scoring timed out");
                0.0
            }
        }
    }
}

/// Folds per-frame observations and captions into the builder's input,
/// feeding the temporal window frame by frame along the way.
fn fuse(
    brain: &mut TemporalBrain,
    clip_motion: f64,
    observations: &[FrameObservation],
    captions: &[Caption],
    audio_score: f64,
) -> RawPerception {
    let mut evidence = CaptionEvidence::default();
    let mut scene_labels = Vec::new();

    for (slot, observation) in observations.iter().enumerate() {
        let caption = captions.get(slot).filter(|caption| !caption.is_empty());
        let frame_evidence = caption
            .map(|caption| CaptionEvidence::from_caption(&caption.text))
            .unwrap_or_default();
        let labels: Vec<SceneLabel> = caption
            .map(|caption| SceneLabel::new(caption.text.clone(), caption.confidence))
            .into_iter()
            .collect();

        brain.add_frame_result(
            observation.motion,
            frame_evidence.risky_objects.len(),
            frame_evidence.safe_objects.len(),
            &labels,
        );

        evidence = evidence.merge(frame_evidence);
        scene_labels.extend(labels);
    }

    let pose = observations
        .iter()
        .map(|observation| observation.pose)
        .fold(PoseSignals::default(), PoseSignals::merge);
    let human_detected = observations
        .iter()
        .any(|observation| observation.visual.human_detected);
    let skin: Vec<f64> = observations
        .iter()
        .map(|observation| observation.visual.skin_ratio)
        .collect();

    RawPerception {
        motion_score: clip_motion,
        risky_objects: evidence.risky_objects,
        safe_objects: evidence.safe_objects,
        scene_labels,
        audio_score,
        temporal: brain.state(),
        pose: PoseSignals {
            human_present: pose.human_present || human_detected,
            ..pose
        },
        skin_ratio: mean_skin_ratio(&skin),
        blood_visible: observations.iter().any(|o| o.visual.blood_visible),
        fire_visible: observations.iter().any(|o| o.visual.fire_visible),
        scene_types: evidence.scene,
    }
}
