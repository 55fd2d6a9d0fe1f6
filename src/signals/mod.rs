mod builder;
mod captions;
mod types;

pub use builder::{build_signals, mean_skin_ratio, RawPerception, TemporalState};
pub use captions::CaptionEvidence;
pub use types::{
    round_to, AudioSignals, EntitySignals, HumanSignals, MotionSignals, PoseSignals, SceneLabel,
    SceneSignals, SignalBundle, TemporalSignals, VisualState, AGGRESSIVE_MOTION, PANIC_AUDIO,
    SUDDEN_MOTION, SUSTAINED_INTENT,
};
