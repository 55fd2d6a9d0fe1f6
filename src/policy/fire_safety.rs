use super::{PolicyInput, PolicyResult, SceneContext};

const RUNAWAY_MOTION: f64 = 60.0;
const KITCHEN_CAP: f64 = 0.2;
const OUTDOOR_FLOOR: f64 = 0.3;
const OUTDOOR_HIGH: f64 = 0.7;
const PANIC_FLOOR: f64 = 0.3;
const PANIC_STEP: f64 = 0.2;
const HIGH_RISK: f64 = 0.7;
const MODERATE_RISK: f64 = 0.4;

/// Fire near people, graded by how controlled the caption context says it is.
pub(super) fn evaluate(input: &PolicyInput<'_>) -> PolicyResult {
    let signals = input.signals;

    if !signals.human.human_present {
        return PolicyResult::clear();
    }

    let fire_visible = signals.visual_state.fire_visible;
    let fire_object = signals.entity.fire_present;
    if !fire_visible && !fire_object && !input.context(SceneContext::FireMentioned) {
        return PolicyResult::clear();
    }

    let dangerous = input.context(SceneContext::DangerousFire);
    let emergency = input.context(SceneContext::Emergency);
    let controlled = input.context(SceneContext::ControlledFire);
    let mut result = PolicyResult::clear();

    if dangerous || emergency {
        result.raise(0.8, "Dangerous or emergency fire situation detected");
    } else if fire_visible && signals.motion.motion_score > RUNAWAY_MOTION {
        result.raise(0.8, "High motion with fire indicates dangerous situation");
    } else if controlled {
        result.raise(0.2, "Controlled/recreational fire detected");
    } else if input.context(SceneContext::CookingFire) {
        result.raise(0.1, "Cooking fire detected");
    } else if fire_visible || fire_object {
        result.raise(0.4, "Fire detected - context analysis needed");
    }

    if signals.scene.kitchen && result.score > KITCHEN_CAP {
        if !dangerous && !emergency {
            result.score = result.score.min(KITCHEN_CAP);
            result.note("Kitchen fire - likely cooking related");
        }
    } else if signals.scene.outdoor && result.score < OUTDOOR_HIGH {
        if controlled {
            result.raise(OUTDOOR_FLOOR, "Outdoor recreational fire");
        } else if !dangerous {
            result.raise(OUTDOOR_FLOOR, "Outdoor fire - context unclear");
        }
    }

    if signals.audio.panic_audio && result.score > PANIC_FLOOR {
        result.escalate(PANIC_STEP, "Panic audio confirms dangerous fire situation");
    }

    if result.score >= HIGH_RISK {
        result.note("HIGH RISK - Immediate attention needed");
    } else if result.score >= MODERATE_RISK {
        result.note("MODERATE RISK - Human review required");
    }

    result.finish()
}
