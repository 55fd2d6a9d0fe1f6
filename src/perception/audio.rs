use std::path::Path;

use anyhow::Result;

use super::AudioScorer;

/// Words that count as a risk hit when they appear in transcribed speech.
pub const AUDIO_RISK_WORDS: &[&str] = &[
    "kill", "beat", "hit", "die", "blood", "knife", "gun", "threat", "abuse", "fight", "stab",
    "murder",
];

/// Speech-to-text model. Returns the transcript as ordered segments.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, audio_path: &Path) -> Result<Vec<String>>;
}

/// Maps the number of risk-word hits across all segments to a coarse score.
/// Each (segment, word) pair counts once.
pub fn score_segments<S: AsRef<str>>(segments: &[S]) -> f64 {
    let hits: usize = segments
        .iter()
        .map(|segment| {
            let text = segment.as_ref().to_lowercase();
            AUDIO_RISK_WORDS
                .iter()
                .filter(|word| text.contains(*word))
                .count()
        })
        .sum();

    match hits {
        0 => 0.0,
        1 => 0.3,
        2 => 0.6,
        _ => 0.9,
    }
}

/// Audio scorer backed by a transcriber and the risk-word lexicon.
#[derive(Debug, Clone)]
pub struct TranscriptScorer<T> {
    transcriber: T,
}

impl<T: Transcriber> TranscriptScorer<T> {
    pub fn new(transcriber: T) -> Self {
        TranscriptScorer { transcriber }
    }
}

impl<T: Transcriber> AudioScorer for TranscriptScorer<T> {
    fn score(&self, audio_path: &Path) -> Result<f64> {
        let segments = self.transcriber.transcribe(audio_path)?;
        log::debug!("transcribed {} audio segments", segments.len());
        Ok(score_segments(&segments))
    }
}
