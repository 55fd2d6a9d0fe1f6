mod accidents;
mod context;
mod dangerous_activity;
mod fire_safety;
mod nudity;
mod overrides;
mod self_harm;
mod violence;


use std::fmt;

use serde::{Deserialize, Serialize};

use crate::signals::{round_to, SignalBundle};

pub use context::{ContextClassifier, ContextSet, KeywordClassifier, SceneContext};
pub use overrides::{apply_safe_overrides, is_hard_blocked, OverrideStage, OVERRIDE_STAGES};

/// Harm categories, in the order the aggregator walks them. On an exact score
/// tie the earlier category wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Violence,
    Nudity,
    SelfHarm,
    Accidents,
    DangerousActivity,
    FireSafety,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 6] = [
        PolicyKind::Violence,
        PolicyKind::Nudity,
        PolicyKind::SelfHarm,
        PolicyKind::Accidents,
        PolicyKind::DangerousActivity,
        PolicyKind::FireSafety,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Violence => "violence",
            PolicyKind::Nudity => "nudity",
            PolicyKind::SelfHarm => "self_harm",
            PolicyKind::Accidents => "accidents",
            PolicyKind::DangerousActivity => "dangerous_activity",
            PolicyKind::FireSafety => "fire_safety",
        }
    }

    /// Raw rule evaluation, before safe overrides.
    pub fn evaluate(&self, input: &PolicyInput<'_>) -> PolicyResult {
        match self {
            PolicyKind::Violence => violence::evaluate(input),
            PolicyKind::Nudity => nudity::evaluate(input),
            PolicyKind::SelfHarm => self_harm::evaluate(input),
            PolicyKind::Accidents => accidents::evaluate(input),
            PolicyKind::DangerousActivity => dangerous_activity::evaluate(input),
            PolicyKind::FireSafety => fire_safety::evaluate(input),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What every policy sees: the bundle plus the contexts its captions imply.
#[derive(Debug, Clone, Copy)]
pub struct PolicyInput<'a> {
    pub signals: &'a SignalBundle,
    pub contexts: &'a ContextSet,
}

impl<'a> PolicyInput<'a> {
    pub fn new(signals: &'a SignalBundle, contexts: &'a ContextSet) -> Self {
        PolicyInput { signals, contexts }
    }

    fn context(&self, context: SceneContext) -> bool {
        self.contexts.has(context)
    }
}

/// Score in `[0, 1]` plus the reasons that produced it, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyResult {
    pub score: f64,
    pub reasons: Vec<String>,
}

impl PolicyResult {
    pub fn new(score: f64, reasons: Vec<String>) -> Self {
        PolicyResult { score, reasons }.finish()
    }

    pub fn clear() -> Self {
        Self::default()
    }

    /// Zero score with a fixed explanation.
    pub fn cleared_because(reason: impl Into<String>) -> Self {
        PolicyResult {
            score: 0.0,
            reasons: vec![reason.into()],
        }
    }

    /// Raises the score to at least `score`; the worst signal wins.
    pub(crate) fn raise(&mut self, score: f64, reason: impl Into<String>) {
        self.score = self.score.max(score);
        self.reasons.push(reason.into());
    }

    /// Additive escalation, capped at 1.0.
    pub(crate) fn escalate(&mut self, amount: f64, reason: impl Into<String>) {
        self.score = (self.score + amount).min(1.0);
        self.reasons.push(reason.into());
    }

    pub(crate) fn note(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }

    pub(crate) fn finish(mut self) -> Self {
        let score = if self.score.is_finite() { self.score } else { 0.0 };
        self.score = round_to(score.clamp(0.0, 1.0), 3);
        self
    }
}

/// One result per harm category. All six entries always exist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskMap {
    pub violence: PolicyResult,
    pub nudity: PolicyResult,
    pub self_harm: PolicyResult,
    pub accidents: PolicyResult,
    pub dangerous_activity: PolicyResult,
    pub fire_safety: PolicyResult,
}

impl RiskMap {
    pub fn get(&self, kind: PolicyKind) -> &PolicyResult {
        match kind {
            PolicyKind::Violence => &self.violence,
            PolicyKind::Nudity => &self.nudity,
            PolicyKind::SelfHarm => &self.self_harm,
            PolicyKind::Accidents => &self.accidents,
            PolicyKind::DangerousActivity => &self.dangerous_activity,
            PolicyKind::FireSafety => &self.fire_safety,
        }
    }

    pub fn get_mut(&mut self, kind: PolicyKind) -> &mut PolicyResult {
        match kind {
            PolicyKind::Violence => &mut self.violence,
            PolicyKind::Nudity => &mut self.nudity,
            PolicyKind::SelfHarm => &mut self.self_harm,
            PolicyKind::Accidents => &mut self.accidents,
            PolicyKind::DangerousActivity => &mut self.dangerous_activity,
            PolicyKind::FireSafety => &mut self.fire_safety,
        }
    }

    /// Entries in aggregation order.
    pub fn iter(&self) -> impl Iterator<Item = (PolicyKind, &PolicyResult)> + '_ {
        PolicyKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }

    /// Builds a map from bare scores, mostly useful in tests and replays.
    pub fn from_scores(scores: [f64; 6]) -> Self {
        let mut map = RiskMap::default();
        for (kind, score) in PolicyKind::ALL.into_iter().zip(scores) {
            map.get_mut(kind).score = score;
        }
        map
    }
}

/// Runs all six policies and their safe overrides over one bundle.
pub fn evaluate_policies(signals: &SignalBundle, classifier: &dyn ContextClassifier) -> RiskMap {
    let contexts = classifier.classify(&signals.caption_text());
    let input = PolicyInput::new(signals, &contexts);

    let mut risks = RiskMap::default();
    for kind in PolicyKind::ALL {
        let raw = kind.evaluate(&input);
        let result = apply_safe_overrides(raw, signals);
        log::debug!(
            "policy {} scored {:.3} ({} reasons)",
            kind,
            result.score,
            result.reasons.len()
        );
        *risks.get_mut(kind) = result;
    }
    risks
}
