#![cfg(test)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};
use tokio_util::sync::CancellationToken;

use super::{
    Caption, Captioner, Frame, FrameDetector, FrameObservation, PerceptionPipeline,
    PerceptionServices, PoseEstimator, VisualReading,
};
use crate::config::ModeratorConfig;
use crate::signals::PoseSignals;

fn frames(values: &[u8]) -> Vec<Arc<Frame>> {
    values
        .iter()
        .enumerate()
        .map(|(index, v)| Arc::new(Frame::new(index, RgbImage::from_pixel(16, 12, Rgb([*v, *v, *v])))))
        .collect()
}

fn config(max_workers: usize, frame_timeout_ms: u64) -> ModeratorConfig {
    ModeratorConfig {
        max_workers,
        frame_timeout_ms,
        ..ModeratorConfig::default()
    }
}

/// Raises arms on every frame and tracks how many calls overlap.
#[derive(Default)]
struct CountingPose {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl PoseEstimator for CountingPose {
    fn estimate(&self, _frame: &Frame) -> Result<PoseSignals> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(PoseSignals {
            human_present: true,
            raised_arms: true,
            ..PoseSignals::default()
        })
    }
}

struct SharedPose(Arc<CountingPose>);

impl PoseEstimator for SharedPose {
    fn estimate(&self, frame: &Frame) -> Result<PoseSignals> {
        self.0.estimate(frame)
    }
}

/// Fails on odd frames, reports skin on even ones.
struct FlakyDetector;

impl FrameDetector for FlakyDetector {
    fn inspect(&self, frame: &Frame) -> Result<VisualReading> {
        if frame.index % 2 == 1 {
            return Err(anyhow!("detector crashed"));
        }
        Ok(VisualReading {
            skin_ratio: 0.5,
            ..VisualReading::default()
        })
    }
}

/// Hangs on frame 1.
struct SlowDetector;

impl FrameDetector for SlowDetector {
    fn inspect(&self, frame: &Frame) -> Result<VisualReading> {
        if frame.index == 1 {
            std::thread::sleep(Duration::from_millis(500));
        }
        Ok(VisualReading {
            fire_visible: true,
            ..VisualReading::default()
        })
    }
}

struct Describe {
    batch_works: bool,
}

impl Captioner for Describe {
    fn caption(&self, frame: &Frame) -> Result<Caption> {
        if frame.index == 2 {
            return Err(anyhow!("caption model out of memory"));
        }
        Ok(Caption::new(format!("frame {}", frame.index), 0.8))
    }

    fn caption_batch(&self, frames: &[Arc<Frame>]) -> Result<Vec<Caption>> {
        if !self.batch_works {
            return Err(anyhow!("batch unsupported"));
        }
        Ok(frames
            .iter()
            .map(|frame| Caption::new(format!("batch {}", frame.index), 0.9))
            .collect())
    }
}

struct ShortBatch;

impl Captioner for ShortBatch {
    fn caption(&self, _frame: &Frame) -> Result<Caption> {
        Ok(Caption::new("single", 0.5))
    }

    fn caption_batch(&self, _frames: &[Arc<Frame>]) -> Result<Vec<Caption>> {
        Ok(vec![Caption::new("only one", 0.5)])
    }
}

#[tokio::test]
async fn observations_keep_frame_order_and_motion() {
    let services = PerceptionServices::default().with_pose(CountingPose::default());
    let pipeline = PerceptionPipeline::new(services, &config(4, 5_000));

    let observed = pipeline
        .observe_frames(&frames(&[10, 40, 40, 100]), &CancellationToken::new())
        .await;

    let motion: Vec<f64> = observed.iter().map(|o| o.motion).collect();
    assert_eq!(motion, vec![0.0, 30.0, 0.0, 60.0]);
    assert!(observed.iter().all(|o| o.pose.raised_arms));
}

#[tokio::test]
async fn worker_pool_is_bounded() {
    let pose = Arc::new(CountingPose::default());
    let services = PerceptionServices::default().with_pose(SharedPose(Arc::clone(&pose)));
    let pipeline = PerceptionPipeline::new(services, &config(2, 5_000));

    let observed = pipeline
        .observe_frames(&frames(&[1, 2, 3, 4, 5, 6]), &CancellationToken::new())
        .await;

    assert_eq!(observed.len(), 6);
    assert!(pose.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn failed_frames_become_neutral() {
    let services = PerceptionServices::default().with_detector(FlakyDetector);
    let pipeline = PerceptionPipeline::new(services, &config(4, 5_000));

    let observed = pipeline
        .observe_frames(&frames(&[50, 50, 50]), &CancellationToken::new())
        .await;

    assert_eq!(observed[0].visual.skin_ratio, 0.5);
    assert_eq!(observed[1], FrameObservation::default());
    assert_eq!(observed[2].visual.skin_ratio, 0.5);
}

#[tokio::test]
async fn slow_frames_time_out_to_neutral() {
    let services = PerceptionServices::default().with_detector(SlowDetector);
    let pipeline = PerceptionPipeline::new(services, &config(4, 100));

    let observed = pipeline
        .observe_frames(&frames(&[0, 0, 0]), &CancellationToken::new())
        .await;

    assert!(observed[0].visual.fire_visible);
    assert_eq!(observed[1], FrameObservation::default());
    assert!(observed[2].visual.fire_visible);
}

#[tokio::test]
async fn cancelled_run_yields_neutral_observations() {
    let services = PerceptionServices::default().with_pose(CountingPose::default());
    let pipeline = PerceptionPipeline::new(services, &config(2, 5_000));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let observed = pipeline.observe_frames(&frames(&[0, 90, 0]), &cancel).await;

    assert_eq!(observed, vec![FrameObservation::default(); 3]);
}

#[tokio::test]
async fn empty_input_is_empty_output() {
    let pipeline = PerceptionPipeline::new(PerceptionServices::default(), &config(4, 100));
    assert!(pipeline
        .observe_frames(&[], &CancellationToken::new())
        .await
        .is_empty());
    assert!(pipeline.caption_frames(&[]).await.is_empty());
}

#[tokio::test]
async fn batch_captions_are_used_when_available() {
    let services = PerceptionServices::default().with_captioner(Describe { batch_works: true });
    let pipeline = PerceptionPipeline::new(services, &config(4, 1_000));

    let captions = pipeline.caption_frames(&frames(&[0, 0])).await;
    let texts: Vec<_> = captions.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, ["batch 0", "batch 1"]);
}

#[tokio::test]
async fn batch_failure_falls_back_per_frame() {
    let services = PerceptionServices::default().with_captioner(Describe { batch_works: false });
    let pipeline = PerceptionPipeline::new(services, &config(2, 1_000));

    let captions = pipeline.caption_frames(&frames(&[0, 0, 0, 0])).await;
    let texts: Vec<_> = captions.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, ["frame 0", "frame 1", "", "frame 3"]);
    assert!(captions[2].is_empty());
}

#[tokio::test]
async fn short_batch_is_rejected() {
    let services = PerceptionServices::default().with_captioner(ShortBatch);
    let pipeline = PerceptionPipeline::new(services, &config(2, 1_000));

    let captions = pipeline.caption_frames(&frames(&[0, 0, 0])).await;
    assert_eq!(captions, vec![Caption::new("single", 0.5); 3]);
}

/// Sleeps well past any test timeout and tracks overlapping calls, batch
/// calls included.
#[derive(Default)]
struct Sluggish {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Sluggish {
    fn work<T>(&self, value: T) -> T {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(300));
        self.active.fetch_sub(1, Ordering::SeqCst);
        value
    }
}

struct SluggishPose(Arc<Sluggish>);

impl PoseEstimator for SluggishPose {
    fn estimate(&self, _frame: &Frame) -> Result<PoseSignals> {
        Ok(self.0.work(PoseSignals {
            human_present: true,
            ..PoseSignals::default()
        }))
    }
}

struct SluggishCaptioner(Arc<Sluggish>);

impl Captioner for SluggishCaptioner {
    fn caption(&self, _frame: &Frame) -> Result<Caption> {
        Ok(self.0.work(Caption::new("late", 0.5)))
    }

    fn caption_batch(&self, frames: &[Arc<Frame>]) -> Result<Vec<Caption>> {
        Ok(self.0.work(vec![Caption::new("late batch", 0.5); frames.len()]))
    }
}

#[tokio::test]
async fn timed_out_frames_keep_their_worker() {
    let pose = Arc::new(Sluggish::default());
    let services = PerceptionServices::default().with_pose(SluggishPose(Arc::clone(&pose)));
    let pipeline = PerceptionPipeline::new(services, &config(2, 20));

    let observed = pipeline
        .observe_frames(&frames(&[0, 0, 0, 0, 0, 0, 0, 0]), &CancellationToken::new())
        .await;

    assert_eq!(observed, vec![FrameObservation::default(); 8]);
    assert!(pose.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn timed_out_batch_blocks_per_frame_fallback() {
    let captioner = Arc::new(Sluggish::default());
    let services =
        PerceptionServices::default().with_captioner(SluggishCaptioner(Arc::clone(&captioner)));
    let pipeline = PerceptionPipeline::new(services, &config(2, 20));

    let captions = pipeline.caption_frames(&frames(&[0, 0, 0])).await;

    assert_eq!(captions, vec![Caption::default(); 3]);
    assert_eq!(captioner.peak.load(Ordering::SeqCst), 1);
}
