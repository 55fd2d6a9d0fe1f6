use crate::signals::{round_to, SignalBundle};

use super::PolicyResult;

/// One step of the safe-context cascade: when `applies` holds, the running
/// score is multiplied by `multiplier` and `reason` is appended.
#[derive(Clone, Copy)]
pub struct OverrideStage {
    pub name: &'static str,
    pub multiplier: f64,
    pub reason: &'static str,
    pub applies: fn(&SignalBundle) -> bool,
}

impl OverrideStage {
    /// Returns the attenuated score, or `None` when the stage does not match.
    pub fn apply(&self, score: f64, signals: &SignalBundle) -> Option<f64> {
        (self.applies)(signals).then(|| score * self.multiplier)
    }
}

impl std::fmt::Debug for OverrideStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverrideStage")
            .field("name", &self.name)
            .field("multiplier", &self.multiplier)
            .finish()
    }
}

const PRESENTATION_MAX_MOTION: f64 = 15.0;
const COOKING_MAX_MOTION: f64 = 40.0;
const SPORTS_MIN_MOTION: f64 = 35.0;
const MEDICAL_MAX_MOTION: f64 = 30.0;
const PUBLIC_SKIN: f64 = 0.3;
const PUBLIC_ACTIVITY_MAX_MOTION: f64 = 30.0;

fn speaking_or_presentation(s: &SignalBundle) -> bool {
    s.motion.motion_score < PRESENTATION_MAX_MOTION
        && !s.entity.weapon_present
        && !s.entity.crash_detected
        && !s.scene.kitchen
}

fn confirmed_cooking(s: &SignalBundle) -> bool {
    s.entity.knife_present
        && s.entity.food_present
        && s.scene.kitchen
        && !s.audio.panic_audio
        && s.motion.motion_score < COOKING_MAX_MOTION
}

fn sports_or_training(s: &SignalBundle) -> bool {
    s.motion.motion_score > SPORTS_MIN_MOTION
        && s.scene.outdoor
        && !s.entity.weapon_present
        && !s.audio.panic_audio
}

fn medical_or_first_aid(s: &SignalBundle) -> bool {
    s.entity.knife_present
        && s.scene.indoor
        && !s.audio.panic_audio
        && s.motion.motion_score < MEDICAL_MAX_MOTION
}

fn public_skin(s: &SignalBundle) -> bool {
    s.visual_state.skin_exposure_ratio > PUBLIC_SKIN
        && s.scene.outdoor
        && s.scene.public_space
        && !s.audio.panic_audio
}

fn controlled_public_activity(s: &SignalBundle) -> bool {
    !s.audio.panic_audio
        && s.scene.public_space
        && s.motion.motion_score < PUBLIC_ACTIVITY_MAX_MOTION
}

/// Stages run in this order; each acts on the already reduced score.
pub const OVERRIDE_STAGES: &[OverrideStage] = &[
    OverrideStage {
        name: "speaking_presentation",
        multiplier: 0.3,
        reason: "Low-motion speaking or presentation context",
        applies: speaking_or_presentation,
    },
    OverrideStage {
        name: "cooking",
        multiplier: 0.3,
        reason: "Safe cooking context",
        applies: confirmed_cooking,
    },
    OverrideStage {
        name: "sports_training",
        multiplier: 0.6,
        reason: "Likely sports or physical activity",
        applies: sports_or_training,
    },
    OverrideStage {
        name: "medical_first_aid",
        multiplier: 0.5,
        reason: "Possible medical or first-aid context",
        applies: medical_or_first_aid,
    },
    OverrideStage {
        name: "public_skin",
        multiplier: 0.4,
        reason: "Public / beach context with normal skin exposure",
        applies: public_skin,
    },
    OverrideStage {
        name: "controlled_public_activity",
        multiplier: 0.7,
        reason: "Controlled public activity",
        applies: controlled_public_activity,
    },
];

const CHILD_SKIN: f64 = 0.1;

/// Blood seen together with aggression, raised arms or a weapon is confirmed
/// harm and is never attenuated. Neither is any exposure involving a child.
pub fn is_hard_blocked(signals: &SignalBundle) -> bool {
    let confirmed_harm = signals.visual_state.blood_visible
        && (signals.motion.aggressive_motion
            || signals.pose.raised_arms
            || signals.entity.weapon_present);
    let child_exposure =
        signals.human.child_present && signals.visual_state.skin_exposure_ratio > CHILD_SKIN;
    confirmed_harm || child_exposure
}

/// Attenuates a policy's raw result using safe contextual signals. Never
/// raises a score.
pub fn apply_safe_overrides(result: PolicyResult, signals: &SignalBundle) -> PolicyResult {
    if result.score <= 0.0 || is_hard_blocked(signals) {
        return result;
    }

    let PolicyResult { mut score, mut reasons } = result;
    for stage in OVERRIDE_STAGES {
        if let Some(reduced) = stage.apply(score, signals) {
            score = reduced;
            reasons.push(stage.reason.to_string());
        }
    }

    PolicyResult {
        score: round_to(score.max(0.0), 3),
        reasons,
    }
}
