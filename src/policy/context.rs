use std::collections::{BTreeMap, BTreeSet};

use lazy_static::lazy_static;
use serde::Serialize;

/// Scene contexts the policies reason about. Which captions trigger which
/// context is decided by a [`ContextClassifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneContext {
    Staged,
    ViolenceDescribed,
    FoodPreparation,
    Sports,
    BloodCooking,
    Injury,
    Sexualized,
    ExplicitNudity,
    Artistic,
    Medical,
    Recreational,
    Private,
    DangerousFire,
    Emergency,
    ControlledFire,
    CookingFire,
    FireMentioned,
    DailyActivity,
}

/// Set of contexts detected for one clip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContextSet(BTreeSet<SceneContext>);

impl ContextSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, context: SceneContext) {
        self.0.insert(context);
    }

    pub fn has(&self, context: SceneContext) -> bool {
        self.0.contains(&context)
    }

    pub fn any(&self, contexts: &[SceneContext]) -> bool {
        contexts.iter().any(|context| self.has(*context))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = SceneContext> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<SceneContext> for ContextSet {
    fn from_iter<I: IntoIterator<Item = SceneContext>>(iter: I) -> Self {
        ContextSet(iter.into_iter().collect())
    }
}

/// Maps the lower-cased caption text of a clip to the contexts it suggests.
pub trait ContextClassifier: Send + Sync {
    fn classify(&self, caption_text: &str) -> ContextSet;
}

const STAGED: &[&str] = &[
    "movie",
    "film",
    "scene",
    "trailer",
    "actor",
    "actress",
    "stunt",
    "performance",
];
const VIOLENCE_DESCRIBED: &[&str] = &[
    "fight", "fighting", "punch", "hit", "attack", "assault", "beat", "strike", "violent",
];
const FOOD_PREPARATION: &[&str] = &[
    "cooking",
    "food",
    "tomato",
    "vegetable",
    "cutting",
    "preparing",
    "kitchen",
    "pepper",
    "cutting board",
    "wooden",
];
const SPORTS: &[&str] = &[
    "sport",
    "game",
    "playing",
    "athlete",
    "competition",
    "training",
    "exercise",
    "workout",
    "soccer",
    "basketball",
    "football",
    "tennis",
    "running",
    "swimming",
    "gym",
];
const BLOOD_COOKING: &[&str] = &[
    "cooking",
    "food",
    "tomato",
    "sauce",
    "kitchen",
    "cutting",
    "preparing",
];
const INJURY: &[&str] = &[
    "injury", "wound", "bleeding", "hurt", "accident", "cut", "stab",
];
const SEXUALIZED: &[&str] = &[
    "sexual",
    "erotic",
    "intimate",
    "seductive",
    "provocative",
    "explicit",
    "nude",
    "naked",
];
const EXPLICIT_NUDITY: &[&str] = &["explicit", "naked"];
const ARTISTIC: &[&str] = &[
    "art",
    "painting",
    "sculpture",
    "artistic",
    "museum",
    "gallery",
    "classical",
];
const MEDICAL: &[&str] = &[
    "medical",
    "hospital",
    "doctor",
    "examination",
    "procedure",
    "surgery",
];
const RECREATIONAL: &[&str] = &[
    "beach",
    "pool",
    "swimming",
    "bathing",
    "showering",
    "changing",
    "bathing suit",
];
const PRIVATE: &[&str] = &["bedroom", "private", "home", "alone", "intimate"];
const DANGEROUS_FIRE: &[&str] = &[
    "burning",
    "exploding",
    "out of control",
    "spreading",
    "wildfire",
    "emergency",
    "disaster",
];
const EMERGENCY: &[&str] = &[
    "emergency",
    "rescue",
    "firefighter",
    "alarm",
    "evacuation",
    "panic",
];
const CONTROLLED_FIRE: &[&str] = &[
    "campfire",
    "bonfire",
    "fireplace",
    "controlled",
    "contained",
    "recreational",
];
const COOKING_FIRE: &[&str] = &[
    "cooking",
    "stove",
    "oven",
    "grill",
    "kitchen",
    "preparing food",
];
const FIRE_MENTIONED: &[&str] = &["fire"];
const DAILY_ACTIVITY: &[&str] = &[
    "sitting",
    "standing",
    "walking",
    "talking",
    "holding",
    "reading",
    "writing",
    "typing",
    "smiling",
    "posing",
    "looking at",
    "wearing",
    "eating",
    "drinking",
    "laptop",
    "phone",
    "desk",
    "couch",
    "sofa",
];

lazy_static! {
    static ref DEFAULT_LEXICONS: BTreeMap<SceneContext, Vec<String>> = {
        let table: &[(SceneContext, &[&str])] = &[
            (SceneContext::Staged, STAGED),
            (SceneContext::ViolenceDescribed, VIOLENCE_DESCRIBED),
            (SceneContext::FoodPreparation, FOOD_PREPARATION),
            (SceneContext::Sports, SPORTS),
            (SceneContext::BloodCooking, BLOOD_COOKING),
            (SceneContext::Injury, INJURY),
            (SceneContext::Sexualized, SEXUALIZED),
            (SceneContext::ExplicitNudity, EXPLICIT_NUDITY),
            (SceneContext::Artistic, ARTISTIC),
            (SceneContext::Medical, MEDICAL),
            (SceneContext::Recreational, RECREATIONAL),
            (SceneContext::Private, PRIVATE),
            (SceneContext::DangerousFire, DANGEROUS_FIRE),
            (SceneContext::Emergency, EMERGENCY),
            (SceneContext::ControlledFire, CONTROLLED_FIRE),
            (SceneContext::CookingFire, COOKING_FIRE),
            (SceneContext::FireMentioned, FIRE_MENTIONED),
            (SceneContext::DailyActivity, DAILY_ACTIVITY),
        ];
        table
            .iter()
            .map(|(context, words)| (*context, words.iter().map(|w| w.to_string()).collect()))
            .collect()
    };
}

/// Substring lexicon classifier: a context fires when any of its trigger
/// words occurs anywhere in the caption text.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    lexicons: BTreeMap<SceneContext, Vec<String>>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        KeywordClassifier {
            lexicons: DEFAULT_LEXICONS.clone(),
        }
    }
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the trigger words for one context.
    pub fn with_lexicon<I, S>(mut self, context: SceneContext, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words = words
            .into_iter()
            .map(|word| word.into().to_lowercase())
            .collect();
        self.lexicons.insert(context, words);
        self
    }

    pub fn lexicon(&self, context: SceneContext) -> &[String] {
        self.lexicons
            .get(&context)
            .map(|words| words.as_slice())
            .unwrap_or(&[])
    }
}

impl ContextClassifier for KeywordClassifier {
    fn classify(&self, caption_text: &str) -> ContextSet {
        let lower = caption_text.to_lowercase();
        self.lexicons
            .iter()
            .filter(|(_, words)| words.iter().any(|word| lower.contains(word.as_str())))
            .map(|(context, _)| *context)
            .collect()
    }
}
