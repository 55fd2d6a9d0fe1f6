use super::{PolicyInput, PolicyResult, SceneContext};

/// Falls and crashes. Food preparation is never an accident.
pub(super) fn evaluate(input: &PolicyInput<'_>) -> PolicyResult {
    let signals = input.signals;
    let entity = &signals.entity;

    if !signals.human.human_present
        || entity.food_present
        || input.context(SceneContext::FoodPreparation)
    {
        return PolicyResult::clear();
    }

    let staged = input.context(SceneContext::Staged);
    let mut result = PolicyResult::clear();

    if entity.crash_detected {
        if staged {
            result.raise(0.3, "Vehicle crash in staged/movie context");
        } else {
            result.raise(0.8, "Vehicle crash detected");
        }
    } else if signals.motion.sudden_motion
        && signals.temporal.possible_accident
        && !entity.weapon_present
    {
        if staged {
            result.raise(0.2, "Abnormal motion in staged/movie context");
        } else {
            result.raise(0.5, "Possible accident based on abnormal motion");
        }
    }

    result.finish()
}
