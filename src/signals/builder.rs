use std::collections::BTreeSet;

use super::types::{
    AudioSignals, EntitySignals, HumanSignals, MotionSignals, PoseSignals, SceneLabel,
    SceneSignals, SignalBundle, TemporalSignals, VisualState, POSSIBLE_ACCIDENT_MOTION,
};

const CRASH_OBJECTS: &[&str] = &["vehicle_crash", "accident", "crash"];
const FIREARM_OBJECTS: &[&str] = &["gun", "pistol", "rifle"];
const VEHICLE_OBJECTS: &[&str] = &["car", "bus", "truck", "vehicle_crash", "accident"];
const FOOD_CAPTION_WORDS: &[&str] = &[
    "kitchen",
    "cooking",
    "food",
    "vegetable",
    "cutting",
    "chef",
    "recipe",
    "meal",
    "dinner",
    "lunch",
    "breakfast",
    "restaurant",
    "tomato",
    "pepper",
];
const COOKING_OBJECTS: &[&str] = &[
    "knife",
    "cutting_board",
    "pot",
    "pan",
    "stove",
    "oven",
    "grill",
    "mixing_bowl",
    "spatula",
    "fork",
    "spoon",
    "food",
    "vegetable",
];

/// Skin coverage above which a human is assumed present even without a pose.
const HUMAN_SKIN_RATIO: f64 = 0.15;
/// Motion above which a human is assumed present even without a pose.
const HUMAN_MOTION: f64 = 10.0;

/// Temporal Brain output consumed by the builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemporalState {
    pub sustained: bool,
    pub impact_detected: bool,
}

/// Everything the perception collaborators produced for one clip, before
/// normalization.
#[derive(Debug, Clone, Default)]
pub struct RawPerception {
    pub motion_score: f64,
    pub risky_objects: BTreeSet<String>,
    pub safe_objects: BTreeSet<String>,
    pub scene_labels: Vec<SceneLabel>,
    pub audio_score: f64,
    pub temporal: TemporalState,
    pub pose: PoseSignals,
    pub skin_ratio: f64,
    pub blood_visible: bool,
    pub fire_visible: bool,
    pub scene_types: SceneSignals,
}

impl RawPerception {
    fn has_risky(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.risky_objects.contains(*name))
    }

    fn captions_mention(&self, words: &[&str]) -> bool {
        self.scene_labels.iter().any(|label| {
            let caption = label.caption.to_lowercase();
            words.iter().any(|word| caption.contains(word))
        })
    }
}

/// Normalizes raw perception output into the canonical signal bundle.
pub fn build_signals(raw: RawPerception) -> SignalBundle {
    let crash_detected = raw.has_risky(CRASH_OBJECTS);
    let scene_has_food = raw.captions_mention(FOOD_CAPTION_WORDS);
    let objects_have_food = COOKING_OBJECTS
        .iter()
        .any(|object| raw.safe_objects.contains(*object));
    let food_present = !crash_detected && (scene_has_food || objects_have_food);

    let skin_ratio = raw.skin_ratio.clamp(0.0, 1.0);
    let motion = MotionSignals::from_score(raw.motion_score);
    let human_present =
        raw.pose.human_present || skin_ratio > HUMAN_SKIN_RATIO || motion.motion_score > HUMAN_MOTION;

    let entity = EntitySignals {
        knife_present: raw.risky_objects.contains("knife") || raw.captions_mention(&["cutting"]),
        weapon_present: raw.has_risky(FIREARM_OBJECTS),
        food_present,
        vehicle_present: raw.has_risky(VEHICLE_OBJECTS),
        crash_detected,
        fire_present: raw.risky_objects.contains("fire"),
    };

    let temporal = TemporalSignals {
        sustained: raw.temporal.sustained,
        impact_detected: raw.temporal.impact_detected,
        possible_accident: motion.motion_score > POSSIBLE_ACCIDENT_MOTION
            && !raw.temporal.impact_detected,
    };

    SignalBundle {
        entity,
        human: HumanSignals {
            human_present,
            adult_present: true,
            child_present: false,
        },
        pose: raw.pose,
        scene: raw.scene_types,
        motion,
        visual_state: VisualState {
            blood_visible: raw.blood_visible && !raw.fire_visible,
            fire_visible: raw.fire_visible,
            skin_exposure_ratio: skin_ratio,
        },
        audio: AudioSignals::from_risk(raw.audio_score),
        temporal,
        scene_labels: raw.scene_labels,
    }
}

/// Mean of per-frame skin ratios, `0.0` for an empty clip.
pub fn mean_skin_ratio(ratios: &[f64]) -> f64 {
    if ratios.is_empty() {
        return 0.0;
    }
    ratios.iter().sum::<f64>() / ratios.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn objects(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn empty_perception_builds_a_neutral_bundle() {
        let bundle = build_signals(RawPerception::default());
        assert!(!bundle.human.human_present);
        assert!(!bundle.human.child_present);
        assert!(!bundle.entity.food_present);
        assert_eq!(bundle.motion.motion_score, 0.0);
        assert!(!bundle.audio.panic_audio);
        assert!(!bundle.temporal.possible_accident);
    }

    #[test]
    fn crash_overrides_food_context() {
        let raw = RawPerception {
            risky_objects: objects(&["vehicle_crash"]),
            safe_objects: objects(&["food"]),
            ..RawPerception::default()
        };
        let bundle = build_signals(raw);
        assert!(bundle.entity.crash_detected);
        assert!(bundle.entity.vehicle_present);
        assert!(!bundle.entity.food_present);
    }

    #[test]
    fn cutting_caption_implies_knife() {
        let raw = RawPerception {
            scene_labels: vec![SceneLabel::new("Someone CUTTING bread", 0.9)],
            ..RawPerception::default()
        };
        let bundle = build_signals(raw);
        assert!(bundle.entity.knife_present);
        assert!(bundle.entity.food_present);
    }

    #[test]
    fn fire_masks_blood() {
        let raw = RawPerception {
            blood_visible: true,
            fire_visible: true,
            ..RawPerception::default()
        };
        let bundle = build_signals(raw);
        assert!(!bundle.visual_state.blood_visible);
        assert!(bundle.visual_state.fire_visible);
    }

    #[test]
    fn thresholds_derive_motion_audio_and_temporal_flags() {
        let raw = RawPerception {
            motion_score: 36.0,
            audio_score: 0.61,
            temporal: TemporalState {
                sustained: true,
                impact_detected: false,
            },
            ..RawPerception::default()
        };
        let bundle = build_signals(raw);
        assert!(bundle.motion.aggressive_motion);
        assert!(bundle.motion.sudden_motion);
        assert!(bundle.audio.panic_audio);
        assert!(bundle.temporal.sustained);
        assert!(bundle.temporal.possible_accident);
        assert!(bundle.human.human_present);
    }

    #[test]
    fn impact_rules_out_possible_accident() {
        let raw = RawPerception {
            motion_score: 50.0,
            temporal: TemporalState {
                sustained: false,
                impact_detected: true,
            },
            ..RawPerception::default()
        };
        let bundle = build_signals(raw);
        assert!(bundle.temporal.impact_detected);
        assert!(!bundle.temporal.possible_accident);
    }

    #[test]
    fn skin_alone_marks_human_present() {
        let raw = RawPerception {
            skin_ratio: 0.2,
            ..RawPerception::default()
        };
        assert!(build_signals(raw).human.human_present);
    }

    #[test]
    fn mean_skin_ratio_handles_empty_clip() {
        assert_eq!(mean_skin_ratio(&[]), 0.0);
        assert!((mean_skin_ratio(&[0.2, 0.4]) - 0.3).abs() < 1e-9);
    }
}
