use super::{PolicyInput, PolicyResult, SceneContext};

const COOKING_BLOOD_MAX_MOTION: f64 = 30.0;
const ESCALATION_FLOOR: f64 = 0.4;
const ESCALATION_STEP: f64 = 0.15;

/// Weapon, hand-to-hand and blood based violence, with staged, cooking and
/// sports captions pulling the score back down.
pub(super) fn evaluate(input: &PolicyInput<'_>) -> PolicyResult {
    let signals = input.signals;
    let motion = &signals.motion;
    let pose = &signals.pose;
    let entity = &signals.entity;

    if !signals.human.human_present {
        return PolicyResult::clear();
    }

    let staged = input.context(SceneContext::Staged);
    let described = input.context(SceneContext::ViolenceDescribed);
    let mut result = PolicyResult::clear();

    if entity.weapon_present {
        if staged {
            result.raise(0.3, "Weapons in staged/movie context");
        } else if described && motion.aggressive_motion {
            result.raise(0.9, "Weapon present with violent intent and aggressive motion");
        } else if motion.aggressive_motion {
            result.raise(0.8, "Weapon present with aggressive motion");
        } else {
            result.raise(0.5, "Weapon detected - context unclear");
        }
    }

    if motion.aggressive_motion && pose.hands_detected && pose.raised_arms && !entity.food_present
    {
        if staged {
            result.raise(0.4, "Fighting in staged context");
        } else if described {
            result.raise(0.85, "Aggressive fighting with violent descriptions");
        } else {
            result.raise(0.7, "Aggressive human motion consistent with fighting");
        }
    }

    // Captions describing food preparation or sport discard any partial risk.
    if input.context(SceneContext::FoodPreparation) {
        return PolicyResult::cleared_because("Cooking/food preparation context - safe");
    }
    if input.context(SceneContext::Sports) {
        return PolicyResult::cleared_because("Sports activity - safe");
    }

    if signals.visual_state.blood_visible {
        let kitchen_blood = entity.food_present
            && signals.scene.kitchen
            && !signals.audio.panic_audio
            && motion.motion_score < COOKING_BLOOD_MAX_MOTION;

        if kitchen_blood || input.context(SceneContext::BloodCooking) {
            result.raise(0.1, "Red fluid in cooking context");
        } else if (motion.aggressive_motion && pose.raised_arms)
            || input.context(SceneContext::Injury)
        {
            if staged {
                result.raise(0.4, "Injury in staged context");
            } else {
                result.raise(0.9, "Visible blood with aggressive intent");
            }
        } else {
            result.raise(0.3, "Blood-like visual detected (requires review)");
        }
    }

    if signals.audio.panic_audio && result.score > ESCALATION_FLOOR {
        result.escalate(ESCALATION_STEP, "Panic or distress audio detected");
    }
    if signals.temporal.sustained && result.score > ESCALATION_FLOOR {
        result.escalate(ESCALATION_STEP, "Sustained violent behavior");
    }

    result.finish()
}
