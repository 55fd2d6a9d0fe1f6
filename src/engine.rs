use serde::Serialize;

use crate::aggregator::{aggregate, Decision, Explanation};
use crate::policy::{evaluate_policies, ContextClassifier, KeywordClassifier, RiskMap};
use crate::signals::SignalBundle;

/// Final answer for one bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub risks: RiskMap,
    pub decision: Decision,
    pub explanation: Explanation,
}

/// Policy evaluation plus aggregation, with the context classifier fixed at
/// construction. Synchronous and free of shared state, so one engine can be
/// used from any number of threads.
pub struct ModerationEngine {
    classifier: Box<dyn ContextClassifier>,
}

impl Default for ModerationEngine {
    fn default() -> Self {
        ModerationEngine::new(KeywordClassifier::default())
    }
}

impl ModerationEngine {
    pub fn new(classifier: impl ContextClassifier + 'static) -> Self {
        ModerationEngine {
            classifier: Box::new(classifier),
        }
    }

    pub fn classifier(&self) -> &dyn ContextClassifier {
        self.classifier.as_ref()
    }

    pub fn evaluate(&self, signals: &SignalBundle) -> RiskMap {
        evaluate_policies(signals, self.classifier.as_ref())
    }

    pub fn decide(&self, signals: &SignalBundle) -> Verdict {
        let risks = self.evaluate(signals);
        let (decision, explanation) = aggregate(&risks);
        match explanation.category {
            Some(category) => log::info!(
                "decision {} ({} at {:.2})",
                decision,
                category,
                explanation.max_risk
            ),
            None => log::info!("decision {}", decision),
        }
        Verdict {
            risks,
            decision,
            explanation,
        }
    }
}

impl std::fmt::Debug for ModerationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModerationEngine").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{ContextSet, PolicyKind, SceneContext};
    use crate::signals::{MotionSignals, SceneLabel};

    struct AlwaysStaged;

    impl ContextClassifier for AlwaysStaged {
        fn classify(&self, _caption_text: &str) -> ContextSet {
            [SceneContext::Staged].into_iter().collect()
        }
    }

    fn armed_attacker() -> SignalBundle {
        let mut bundle = SignalBundle::default();
        bundle.human.human_present = true;
        bundle.entity.weapon_present = true;
        bundle.motion = MotionSignals::from_score(40.0);
        bundle.scene_labels = vec![SceneLabel::new("a man attacks another man", 0.9)];
        bundle
    }

    #[test]
    fn armed_attack_is_unsafe() {
        let verdict = ModerationEngine::default().decide(&armed_attacker());
        assert_eq!(verdict.decision, Decision::Unsafe);
        assert_eq!(verdict.explanation.category, Some(PolicyKind::Violence));
        assert_eq!(verdict.explanation.max_risk, 0.9);
    }

    #[test]
    fn classifier_is_swappable() {
        let verdict = ModerationEngine::new(AlwaysStaged).decide(&armed_attacker());
        assert_eq!(verdict.risks.violence.score, 0.3);
        assert_eq!(verdict.decision, Decision::Review);
    }

    #[test]
    fn empty_bundle_is_safe() {
        let verdict = ModerationEngine::default().decide(&SignalBundle::default());
        assert_eq!(verdict.decision, Decision::Safe);
        assert_eq!(verdict.risks, RiskMap::default());
    }
}
