use serde::{Deserialize, Serialize};

/// Motion above this is treated as aggressive.
pub const AGGRESSIVE_MOTION: f64 = 35.0;
/// Motion above this is treated as sudden.
pub const SUDDEN_MOTION: f64 = 25.0;
/// Motion above this, without a detected impact, hints at a possible accident.
pub const POSSIBLE_ACCIDENT_MOTION: f64 = 20.0;
/// Audio risk above this counts as panic or distress audio.
pub const PANIC_AUDIO: f64 = 0.6;
/// Intent score above this marks the clip's behaviour as sustained.
pub const SUSTAINED_INTENT: f64 = 0.3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitySignals {
    pub knife_present: bool,
    pub weapon_present: bool,
    pub food_present: bool,
    pub vehicle_present: bool,
    pub crash_detected: bool,
    pub fire_present: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanSignals {
    pub human_present: bool,
    pub adult_present: bool,
    // No age classifier is wired in, so the builder always leaves this false.
    pub child_present: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseSignals {
    pub human_present: bool,
    pub hands_detected: bool,
    pub hands_near_face: bool,
    pub hands_near_chest: bool,
    pub raised_arms: bool,
}

impl PoseSignals {
    /// Logical OR of two per-frame readings. Associative and commutative, so
    /// frames can be folded in any order.
    pub fn merge(self, other: PoseSignals) -> PoseSignals {
        PoseSignals {
            human_present: self.human_present || other.human_present,
            hands_detected: self.hands_detected || other.hands_detected,
            hands_near_face: self.hands_near_face || other.hands_near_face,
            hands_near_chest: self.hands_near_chest || other.hands_near_chest,
            raised_arms: self.raised_arms || other.raised_arms,
        }
    }

    pub fn hands_near_body(&self) -> bool {
        self.hands_near_chest || self.hands_near_face
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSignals {
    pub kitchen: bool,
    pub indoor: bool,
    pub outdoor: bool,
    pub public_space: bool,
}

impl SceneSignals {
    pub fn merge(self, other: SceneSignals) -> SceneSignals {
        SceneSignals {
            kitchen: self.kitchen || other.kitchen,
            indoor: self.indoor || other.indoor,
            outdoor: self.outdoor || other.outdoor,
            public_space: self.public_space || other.public_space,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSignals {
    pub motion_score: f64,
    pub aggressive_motion: bool,
    pub sudden_motion: bool,
}

impl MotionSignals {
    pub fn from_score(motion_score: f64) -> Self {
        let motion_score = motion_score.max(0.0);
        MotionSignals {
            motion_score,
            aggressive_motion: motion_score > AGGRESSIVE_MOTION,
            sudden_motion: motion_score > SUDDEN_MOTION,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualState {
    pub blood_visible: bool,
    pub fire_visible: bool,
    pub skin_exposure_ratio: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSignals {
    pub audio_risk: f64,
    pub panic_audio: bool,
}

impl AudioSignals {
    pub fn from_risk(audio_risk: f64) -> Self {
        let audio_risk = audio_risk.clamp(0.0, 1.0);
        AudioSignals {
            audio_risk,
            panic_audio: audio_risk > PANIC_AUDIO,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalSignals {
    pub sustained: bool,
    pub impact_detected: bool,
    pub possible_accident: bool,
}

/// A caption produced for one sampled frame, with the captioner's confidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneLabel {
    pub caption: String,
    pub score: f64,
}

impl SceneLabel {
    pub fn new(caption: impl Into<String>, score: f64) -> Self {
        SceneLabel {
            caption: caption.into(),
            score,
        }
    }
}

/// Typed snapshot of every perceptual measurement for one analysis run.
///
/// Every field deserializes with a default, so a partial document coming from
/// a perception adapter never fails to load: absent flags read as `false` and
/// absent scores as `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalBundle {
    pub entity: EntitySignals,
    pub human: HumanSignals,
    pub pose: PoseSignals,
    pub scene: SceneSignals,
    pub motion: MotionSignals,
    pub visual_state: VisualState,
    pub audio: AudioSignals,
    pub temporal: TemporalSignals,
    pub scene_labels: Vec<SceneLabel>,
}

impl SignalBundle {
    /// Lower-cased concatenation of every caption, used for lexical context.
    pub fn caption_text(&self) -> String {
        self.scene_labels
            .iter()
            .map(|label| label.caption.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Rounds to a fixed number of decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
