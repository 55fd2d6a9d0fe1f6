use std::collections::BTreeSet;

use super::types::SceneSignals;

const WEAPON_WORDS: &[&str] = &["gun", "weapon", "knife", "rifle", "pistol"];
const FIREARM_WORDS: &[&str] = &["gun", "rifle", "pistol"];
const VEHICLE_WORDS: &[&str] = &["car", "vehicle", "truck", "automobile"];
const IMPACT_WORDS: &[&str] = &["crash", "accident", "collision", "wreck", "smash", "hit"];
const CRASH_WORDS: &[&str] = &["crash", "accident", "collision", "wreck"];
const FIRE_WORDS: &[&str] = &["fire", "flame", "explosion", "burning"];
const FIGHT_WORDS: &[&str] = &["fight", "attack", "violence", "assault", "punch"];
const FOOD_WORDS: &[&str] = &["tomato", "vegetable", "food", "cooking", "kitchen"];

const KITCHEN_SCENE: &[&str] = &["kitchen", "cooking", "food", "tomatoes", "vegetables"];
const OUTDOOR_SCENE: &[&str] = &[
    "woods", "outdoor", "outside", "nature", "wood", "trees", "mountain", "field",
];
const INDOOR_SCENE: &[&str] = &["kitchen", "room", "inside", "indoor", "home", "building"];
const PUBLIC_SCENE: &[&str] = &[
    "park", "street", "beach", "crowd", "public", "market", "stadium",
];

fn mentions_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|word| text.contains(word))
}

/// Objects and scene types read off one caption.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionEvidence {
    pub risky_objects: BTreeSet<String>,
    pub safe_objects: BTreeSet<String>,
    pub scene: SceneSignals,
}

impl CaptionEvidence {
    pub fn from_caption(caption: &str) -> Self {
        let text = caption.to_lowercase();
        let mut evidence = CaptionEvidence::default();

        if mentions_any(&text, WEAPON_WORDS) {
            if text.contains("knife") && (text.contains("cooking") || text.contains("food")) {
                evidence.safe_objects.insert("knife".into());
            } else {
                evidence.risky_objects.insert("knife".into());
            }
        }
        if mentions_any(&text, FIREARM_WORDS) {
            evidence.risky_objects.insert("gun".into());
        }

        if mentions_any(&text, VEHICLE_WORDS) {
            if mentions_any(&text, IMPACT_WORDS) {
                evidence.risky_objects.insert("vehicle_crash".into());
                evidence.risky_objects.insert("accident".into());
            } else {
                evidence.safe_objects.insert("vehicle".into());
            }
        }

        if mentions_any(&text, FIRE_WORDS) {
            evidence.risky_objects.insert("fire".into());
        }
        if mentions_any(&text, FIGHT_WORDS) {
            evidence.risky_objects.insert("violence".into());
        }

        if !mentions_any(&text, CRASH_WORDS) && mentions_any(&text, FOOD_WORDS) {
            evidence.safe_objects.insert("food".into());
            evidence.safe_objects.insert("vegetable".into());
            if text.contains("cooking") || text.contains("kitchen") {
                evidence.safe_objects.insert("kitchen".into());
            }
        }

        evidence.scene = SceneSignals {
            kitchen: mentions_any(&text, KITCHEN_SCENE),
            indoor: mentions_any(&text, INDOOR_SCENE),
            outdoor: mentions_any(&text, OUTDOOR_SCENE),
            public_space: mentions_any(&text, PUBLIC_SCENE),
        };

        evidence
    }

    /// Union of two readings; scene flags are OR-merged.
    pub fn merge(mut self, other: CaptionEvidence) -> CaptionEvidence {
        self.risky_objects.extend(other.risky_objects);
        self.safe_objects.extend(other.safe_objects);
        self.scene = self.scene.merge(other.scene);
        self
    }

    pub fn from_captions<'a>(captions: impl IntoIterator<Item = &'a str>) -> Self {
        captions
            .into_iter()
            .map(CaptionEvidence::from_caption)
            .fold(CaptionEvidence::default(), CaptionEvidence::merge)
    }
}
