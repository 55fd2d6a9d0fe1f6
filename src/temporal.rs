use std::collections::VecDeque;

use crate::signals::{round_to, SceneLabel, TemporalState, SUSTAINED_INTENT};

pub const DEFAULT_WINDOW: usize = 5;

const VIOLENT_SCENE_WORDS: &[&str] = &["violent", "abuse", "attack", "fight"];
const SAFE_SCENE_WORDS: &[&str] = &["cooking", "kitchen", "food"];

const MOTION_CAP: f64 = 40.0;
const RISKY_OBJECT_CAP: f64 = 2.0;
const MOTION_WEIGHT: f64 = 0.35;
const RISKY_OBJECT_WEIGHT: f64 = 0.35;
const VIOLENT_SCENE_WEIGHT: f64 = 0.30;
const SAFE_CONTEXT_DAMPING: f64 = 0.25;

const IMPACT_MIN_SAMPLES: usize = 3;
const IMPACT_OVER_AVERAGE: f64 = 1.6;
const IMPACT_OVER_NEIGHBOUR: f64 = 1.4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRecord {
    pub motion: f64,
    pub risky_objects: usize,
    pub safe_objects: usize,
    pub violent_scene: f64,
    pub safe_scene: f64,
}

/// Sliding-window memory of one clip's per-frame statistics.
#[derive(Debug, Clone)]
pub struct TemporalBrain {
    window_size: usize,
    window: VecDeque<FrameRecord>,
    motion_history: Vec<f64>,
}

impl Default for TemporalBrain {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl TemporalBrain {
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        TemporalBrain {
            window_size,
            window: VecDeque::with_capacity(window_size),
            motion_history: Vec::new(),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn add_frame_result(
        &mut self,
        motion: f64,
        risky_objects: usize,
        safe_objects: usize,
        labels: &[SceneLabel],
    ) {
        let mut violent_scene = 0.0;
        let mut safe_scene = 0.0;
        for label in labels {
            let text = label.caption.to_lowercase();
            if VIOLENT_SCENE_WORDS.iter().any(|word| text.contains(word)) {
                violent_scene += label.score;
            }
            if SAFE_SCENE_WORDS.iter().any(|word| text.contains(word)) {
                safe_scene += label.score;
            }
        }

        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(FrameRecord {
            motion,
            risky_objects,
            safe_objects,
            violent_scene,
            safe_scene,
        });
        self.motion_history.push(motion);
    }

    fn window_mean(&self, field: impl Fn(&FrameRecord) -> f64) -> f64 {
        self.window.iter().map(field).sum::<f64>() / self.window_size as f64
    }

    /// Weighted blend of motion, risky objects and violent captions over the
    /// window. Zero until the window has filled.
    pub fn intent_score(&self) -> f64 {
        if self.window.len() < self.window_size {
            return 0.0;
        }

        let motion = self.window_mean(|record| record.motion);
        let risky = self.window_mean(|record| record.risky_objects as f64);
        let violent = self.window_mean(|record| record.violent_scene);
        let safe = self.window_mean(|record| record.safe_scene);

        let mut score = MOTION_WEIGHT * (motion / MOTION_CAP).min(1.0)
            + RISKY_OBJECT_WEIGHT * (risky / RISKY_OBJECT_CAP).min(1.0)
            + VIOLENT_SCENE_WEIGHT * violent.min(1.0);

        if safe > violent {
            score *= SAFE_CONTEXT_DAMPING;
        }

        round_to(score, 3)
    }

    /// Looks for a local motion spike that stands out both from the clip
    /// average and from its immediate neighbours.
    pub fn detect_impact(&self) -> bool {
        let history = &self.motion_history;
        if history.len() < IMPACT_MIN_SAMPLES {
            return false;
        }

        let average = history.iter().sum::<f64>() / history.len() as f64;
        history.windows(3).any(|triple| {
            let (prev, current, next) = (triple[0], triple[1], triple[2]);
            current > average * IMPACT_OVER_AVERAGE
                && current > prev * IMPACT_OVER_NEIGHBOUR
                && current > next * IMPACT_OVER_NEIGHBOUR
        })
    }

    pub fn state(&self) -> TemporalState {
        TemporalState {
            sustained: self.intent_score() > SUSTAINED_INTENT,
            impact_detected: self.detect_impact(),
        }
    }
}
