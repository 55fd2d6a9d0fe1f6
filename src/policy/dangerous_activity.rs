use super::{PolicyInput, PolicyResult, SceneContext};

const HIGH_RISK_MOTION: f64 = 40.0;
const NEAR_BODY_MOTION: f64 = 35.0;

/// Dangerous but non-violent activity. Weapons belong to the violence policy
/// and fire to the fire-safety policy.
pub(super) fn evaluate(input: &PolicyInput<'_>) -> PolicyResult {
    let signals = input.signals;
    let entity = &signals.entity;
    let motion = &signals.motion;
    let panic = signals.audio.panic_audio;

    if !signals.human.human_present {
        return PolicyResult::clear();
    }

    let cooking_scene = entity.food_present && (signals.scene.kitchen || entity.knife_present);
    let cooking_caption = input.context(SceneContext::FoodPreparation);
    if (cooking_scene || cooking_caption) && !panic {
        return PolicyResult::cleared_because("Safe cooking activity");
    }

    if input
        .contexts
        .any(&[SceneContext::Sports, SceneContext::Recreational])
    {
        return PolicyResult::cleared_because("Sports or recreational activity");
    }

    if input.context(SceneContext::DailyActivity) {
        return PolicyResult::cleared_because("Normal daily activity");
    }

    if entity.weapon_present {
        return PolicyResult::clear();
    }

    let mut result = PolicyResult::clear();

    if motion.motion_score > HIGH_RISK_MOTION && motion.aggressive_motion && !panic {
        result.raise(0.6, "High-risk physical activity detected");
    }

    if signals.pose.hands_near_body() && motion.motion_score > NEAR_BODY_MOTION && !cooking_caption
    {
        result.raise(0.7, "Hazardous activity near body");
    }

    result.finish()
}
