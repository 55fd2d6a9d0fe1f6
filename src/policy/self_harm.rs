use super::{PolicyInput, PolicyResult, SceneContext};

const SUSTAINED_FLOOR: f64 = 0.5;
const SUSTAINED_STEP: f64 = 0.2;

// Captions that put body-directed movement in a benign frame.
const BENIGN_BODY_CONTEXTS: &[SceneContext] = &[
    SceneContext::Artistic,
    SceneContext::Medical,
    SceneContext::Recreational,
];

pub(super) fn evaluate(input: &PolicyInput<'_>) -> PolicyResult {
    let signals = input.signals;
    let pose = &signals.pose;
    let cooking = input.context(SceneContext::FoodPreparation);

    if !signals.human.human_present
        || signals.entity.food_present
        || cooking
        || input.contexts.any(BENIGN_BODY_CONTEXTS)
        || signals.temporal.possible_accident
    {
        return PolicyResult::clear();
    }

    let mut result = PolicyResult::clear();

    if signals.visual_state.blood_visible && pose.hands_near_body() {
        result.raise(0.6, "Blood with self-directed hand movement");
    }

    if signals.entity.knife_present && pose.hands_near_body() && !signals.motion.aggressive_motion {
        result.raise(0.7, "Sharp object used near own body");
    }

    if signals.temporal.sustained && result.score > SUSTAINED_FLOOR {
        result.escalate(SUSTAINED_STEP, "Sustained self-harm behavior over time");
    }

    result.finish()
}
