use super::{PolicyInput, PolicyResult, SceneContext};

const HAZARD_MOTION: f64 = 40.0;
const CHILD_SKIN: f64 = 0.1;
const MIN_SKIN: f64 = 0.15;
const POSE_SKIN: f64 = 0.35;
const PUBLIC_SKIN: f64 = 0.5;
const PRIVATE_SKIN: f64 = 0.5;
const VERY_HIGH_SKIN: f64 = 0.65;
const FALLBACK_SKIN: f64 = 0.5;
const FALLBACK_CEILING: f64 = 0.3;

/// Nudity requires sexualized context, not just exposed skin.
pub(super) fn evaluate(input: &PolicyInput<'_>) -> PolicyResult {
    let signals = input.signals;
    let motion = &signals.motion;
    let pose = &signals.pose;
    let skin = signals.visual_state.skin_exposure_ratio;

    // Zero tolerance: decided before any other nudity rule.
    if signals.human.child_present && skin > CHILD_SKIN {
        return PolicyResult::new(1.0, vec!["Child nudity risk".into()]);
    }

    if !signals.human.human_present {
        return PolicyResult::clear();
    }

    // Violent movement with heavy motion is a physical hazard, not nudity.
    if motion.aggressive_motion && motion.motion_score > HAZARD_MOTION {
        return PolicyResult::clear();
    }

    if skin < MIN_SKIN {
        return PolicyResult::clear();
    }

    let sexualized = input.context(SceneContext::Sexualized);
    let private = input.context(SceneContext::Private);
    let mut result = PolicyResult::clear();

    if sexualized {
        if input.context(SceneContext::ExplicitNudity) {
            result.raise(0.95, "Explicit sexual content detected");
        } else {
            result.raise(0.8, "Sexualized content detected");
        }
    } else if input.context(SceneContext::Medical) {
        result.raise(0.2, "Medical/educational context");
    } else if input.context(SceneContext::Artistic) {
        result.raise(0.3, "Artistic nudity detected");
    } else if input.context(SceneContext::Recreational) {
        result.raise(0.4, "Recreational nudity (beach/pool)");
    } else if private && skin > PRIVATE_SKIN {
        result.raise(0.7, "High skin exposure in private context");
    }

    if signals.scene.outdoor && skin < PUBLIC_SKIN && !sexualized {
        return PolicyResult::clear();
    }

    if skin > POSE_SKIN && pose.hands_near_body() && !motion.aggressive_motion {
        if sexualized {
            result.raise(0.9, "Sexualized pose with explicit context");
        } else {
            result.raise(0.75, "Sexualized pose with skin exposure");
        }
    }

    if skin > VERY_HIGH_SKIN && signals.scene.indoor && !motion.aggressive_motion {
        if sexualized {
            result.raise(0.95, "Very high skin exposure with sexualized indoor context");
        } else if private {
            result.raise(0.85, "Very high skin exposure in private indoor context");
        } else {
            result.raise(0.7, "Very high skin exposure in indoor context");
        }
    }

    if skin > FALLBACK_SKIN && result.score < FALLBACK_CEILING {
        result.raise(0.4, "High skin exposure - context unclear");
    }

    result.finish()
}
