use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use crate::config::{FastFilterConfig, ModeratorConfig};
use crate::perception::Frame;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "gif"];
const FRAME_PATTERN: &str = "frame_%04d.png";
const AUDIO_FILE: &str = "audio.wav";

/// Frames pulled from one input plus its extracted audio track. Extracted
/// files live in a private temp directory that is removed on drop.
#[derive(Debug)]
pub struct SampledClip {
    pub frames: Vec<Arc<Frame>>,
    pub audio: Option<PathBuf>,
    _workdir: Option<TempDir>,
}

impl SampledClip {
    pub fn from_frames(frames: Vec<RgbImage>) -> Self {
        SampledClip {
            frames: frames
                .into_iter()
                .enumerate()
                .map(|(index, image)| Arc::new(Frame::new(index, image)))
                .collect(),
            audio: None,
            _workdir: None,
        }
    }
}

/// Picks the frames worth analysing from a stream of candidates: frames
/// that move more than the threshold against their predecessor, plus forced
/// picks so long calm stretches still get coverage.
#[derive(Debug, Clone)]
pub struct FrameSelector {
    motion_threshold: f64,
    min_gap: usize,
    max_frames: usize,
    interval_secs: f64,
}

impl FrameSelector {
    pub fn new(config: &ModeratorConfig) -> Self {
        FrameSelector {
            motion_threshold: config.selection.motion_threshold,
            min_gap: config.selection.min_gap,
            max_frames: config.max_frames.max(1),
            interval_secs: config.sample_interval_secs,
        }
    }

    /// Frame budget for a clip of `candidates` candidate frames. Longer
    /// clips get more frames; the configured maximum is a floor.
    pub fn budget(&self, candidates: usize) -> usize {
        let duration = candidates as f64 * self.interval_secs;
        let target = match duration {
            d if d <= 10.0 => 5,
            d if d <= 30.0 => 8,
            d if d <= 60.0 => 12,
            d if d <= 180.0 => 20,
            _ => 25,
        };
        target.min(candidates).max(self.max_frames)
    }

    /// Selects from `candidates`, which holds `total` frames in clip order.
    /// The first candidate is only used when nothing else qualifies.
    pub fn select<I>(&self, candidates: I, total: usize) -> Vec<RgbImage>
    where
        I: IntoIterator<Item = RgbImage>,
    {
        let budget = self.budget(total);
        let forced_every = (total as f64 / budget as f64).max(1.0);

        let mut selected = Vec::new();
        let mut first = None;
        let mut previous: Option<RgbImage> = None;
        let mut last_selected: Option<usize> = None;

        for (index, frame) in candidates.into_iter().enumerate() {
            if let Some(prev) = &previous {
                let since = last_selected.map_or(index + self.min_gap, |last| index - last);
                let moving = motion_between(prev, &frame) > self.motion_threshold;
                let overdue = since as f64 >= forced_every;
                if (moving || overdue) && since >= self.min_gap {
                    selected.push(frame.clone());
                    last_selected = Some(index);
                }
            } else {
                first = Some(frame.clone());
            }
            previous = Some(frame);

            if selected.len() >= budget {
                break;
            }
        }

        if selected.is_empty() {
            selected.extend(first);
        }
        selected
    }
}

/// Motion-driven sampler. An external `ffmpeg` binary extracts evenly spaced
/// candidate frames, and the [`FrameSelector`] keeps the informative ones.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    ffmpeg: PathBuf,
    interval_secs: f64,
    max_candidates: usize,
    extract_audio: bool,
    selector: FrameSelector,
}

impl FrameSampler {
    pub fn new(config: &ModeratorConfig) -> Self {
        FrameSampler {
            ffmpeg: config.ffmpeg_path.clone(),
            interval_secs: config.sample_interval_secs,
            max_candidates: config.selection.max_candidates.max(1),
            extract_audio: config.extract_audio,
            selector: FrameSelector::new(config),
        }
    }

    /// Samples `path`. Still images become a single frame. A missing or
    /// unreadable input is an error; an ffmpeg failure only logs and yields
    /// an empty clip. Blocking: call from a blocking task.
    pub fn sample(&self, path: &Path) -> Result<SampledClip> {
        if !path.is_file() {
            bail!("input not found: {}", path.display());
        }

        if is_image(path) {
            let image = image::open(path)
                .with_context(|| format!("failed to decode {}", path.display()))?
                .to_rgb8();
            return Ok(SampledClip::from_frames(vec![image]));
        }

        let workdir = tempfile::Builder::new()
            .prefix("video-moderator-")
            .tempdir()
            .context("failed to create frame directory")?;

        let frames = match self.extract_frames(path, workdir.path()) {
            Ok(()) => {
                let candidates = candidate_paths(workdir.path())?;
                let total = candidates.len();
                let frames = self.selector.select(decode_frames(candidates), total);
                log::debug!("kept {} of {} candidate frames", frames.len(), total);
                frames
            }
            Err(err) => {
                log::warn!("frame extraction failed for {}: {:#}", path.display(), err);
                Vec::new()
            }
        };
        log::info!("sampled {} frames from {}", frames.len(), path.display());

        let audio = if self.extract_audio {
            self.extract_audio_track(path, workdir.path())
        } else {
            None
        };

        let mut clip = SampledClip::from_frames(frames);
        clip.audio = audio;
        clip._workdir = Some(workdir);
        Ok(clip)
    }

    fn extract_frames(&self, input: &Path, dir: &Path) -> Result<()> {
        let output = Command::new(&self.ffmpeg)
            .arg("-hide_banner")
            .args(["-loglevel", "error", "-i"])
            .arg(input)
            .args(["-vf", &format!("fps={:.6}", 1.0 / self.interval_secs)])
            .args(["-frames:v", &self.max_candidates.to_string()])
            .args(["-f", "image2"])
            .arg(dir.join(FRAME_PATTERN))
            .output()
            .with_context(|| format!("failed to run {}", self.ffmpeg.display()))?;

        if !output.status.success() {
            return Err(anyhow!(
                "ffmpeg exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(())
    }

    fn extract_audio_track(&self, input: &Path, dir: &Path) -> Option<PathBuf> {
        let target = dir.join(AUDIO_FILE);
        let status = Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
            .arg(input)
            .args(["-vn", "-ac", "1", "-ar", "16000"])
            .arg(&target)
            .output();

        match status {
            Ok(output) if output.status.success() && target.is_file() => Some(target),
            Ok(output) => {
                log::debug!(
                    "no audio track extracted from {}: {}",
                    input.display(),
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                None
            }
            Err(err) => {
                log::debug!("audio extraction unavailable: {}", err);
                None
            }
        }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn candidate_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
        .collect();
    paths.sort();
    Ok(paths)
}

/// Decodes lazily so only the previous candidate and the selection are held
/// in memory.
fn decode_frames(paths: Vec<PathBuf>) -> impl Iterator<Item = RgbImage> {
    paths.into_iter().filter_map(|path| match image::open(&path) {
        Ok(image) => Some(image.to_rgb8()),
        Err(err) => {
            log::warn!("failed to load frame {}: {}", path.display(), err);
            None
        }
    })
}

fn gray_resized(image: &RgbImage, width: u32, height: u32) -> GrayImage {
    let gray = imageops::grayscale(image);
    if gray.dimensions() == (width, height) {
        gray
    } else {
        imageops::resize(&gray, width, height, FilterType::Triangle)
    }
}

/// Mean absolute grayscale difference between two frames, on the 0..255
/// scale. The second frame is resized to the first when they differ.
pub fn motion_between(previous: &RgbImage, current: &RgbImage) -> f64 {
    let (width, height) = previous.dimensions();
    if width == 0 || height == 0 {
        return 0.0;
    }
    let a = imageops::grayscale(previous);
    let b = gray_resized(current, width, height);

    let total: u64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(x, y)| x.abs_diff(*y) as u64)
        .sum();
    total as f64 / a.as_raw().len() as f64
}

fn mean_gray(image: &RgbImage) -> f64 {
    let gray = imageops::grayscale(image);
    let raw = gray.as_raw();
    if raw.is_empty() {
        return 0.0;
    }
    raw.iter().map(|v| *v as u64).sum::<u64>() as f64 / raw.len() as f64
}

/// Cheap clip-level screen run before the models: overall motion and the
/// share of dark frames. Reported for diagnostics; it does not gate the
/// decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FastFilterReport {
    pub suspicious: bool,
    pub motion_score: f64,
    pub dark_ratio: f64,
}

impl FastFilterReport {
    pub fn compute(frames: &[Arc<Frame>], config: &FastFilterConfig) -> Self {
        if frames.is_empty() {
            return FastFilterReport::default();
        }

        let diffs: Vec<f64> = frames
            .windows(2)
            .map(|pair| motion_between(&pair[0].image, &pair[1].image))
            .collect();
        let motion_score = if diffs.is_empty() {
            0.0
        } else {
            diffs.iter().sum::<f64>() / diffs.len() as f64
        };

        let dark = frames
            .iter()
            .filter(|frame| mean_gray(&frame.image) < config.darkness_threshold)
            .count();
        let dark_ratio = dark as f64 / frames.len() as f64;

        FastFilterReport {
            suspicious: motion_score > config.motion_threshold || dark_ratio > config.dark_ratio,
            motion_score,
            dark_ratio,
        }
    }
}
