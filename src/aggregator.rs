use std::fmt;

use serde::{Deserialize, Serialize};

use crate::policy::{PolicyKind, RiskMap};
use crate::signals::round_to;

/// Scores below this are safe.
pub const REVIEW_THRESHOLD: f64 = 0.2;
/// Scores at or above this are unsafe.
pub const UNSAFE_THRESHOLD: f64 = 0.6;

const SAFE_REASON: &str = "No harmful signals detected";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Safe,
    Review,
    Unsafe,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Safe => "SAFE",
            Decision::Review => "REVIEW",
            Decision::Unsafe => "UNSAFE",
        }
    }

    pub fn from_score(score: f64) -> Self {
        if score < REVIEW_THRESHOLD {
            Decision::Safe
        } else if score < UNSAFE_THRESHOLD {
            Decision::Review
        } else {
            Decision::Unsafe
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a decision was reached: the winning category and its reasons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub max_risk: f64,
    pub category: Option<PolicyKind>,
    pub reasons: Vec<String>,
}

/// Picks the highest-scoring category and maps it to a decision tier.
///
/// Categories are walked in [`PolicyKind::ALL`] order and only a strictly
/// greater score replaces the current leader, so ties go to the earlier
/// category. The tier is chosen on the unrounded score; `max_risk` in the
/// explanation is rounded to two decimals.
pub fn aggregate(risks: &RiskMap) -> (Decision, Explanation) {
    let mut max_risk = 0.0;
    let mut leader: Option<PolicyKind> = None;

    for (kind, result) in risks.iter() {
        if result.score > max_risk {
            max_risk = result.score;
            leader = Some(kind);
        }
    }

    let decision = Decision::from_score(max_risk);
    let explanation = match (decision, leader) {
        (Decision::Safe, _) | (_, None) => Explanation {
            max_risk: 0.0,
            category: None,
            reasons: vec![SAFE_REASON.to_string()],
        },
        (_, Some(kind)) => Explanation {
            max_risk: round_to(max_risk, 2),
            category: Some(kind),
            reasons: risks.get(kind).reasons.clone(),
        },
    };

    (decision, explanation)
}
