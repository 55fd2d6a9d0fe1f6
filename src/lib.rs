pub mod aggregator;
pub mod analysis;
pub mod config;
pub mod engine;
pub mod perception;
pub mod policy;
pub mod sampling;
pub mod signals;
pub mod temporal;

pub use aggregator::{aggregate, Decision, Explanation};
pub use analysis::{AnalysisReport, VideoAnalyzer};
pub use config::ModeratorConfig;
pub use engine::{ModerationEngine, Verdict};
pub use policy::{evaluate_policies, PolicyKind, PolicyResult, RiskMap};
pub use signals::{build_signals, SignalBundle};
pub use temporal::TemporalBrain;
