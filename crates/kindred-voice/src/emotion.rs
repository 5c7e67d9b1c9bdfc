//! Lexical emotion scoring of reply text.
//!
//! Each emotion has a fixed set of lowercase cues, and any cue appearing as a
//! substring of the lowercased text sets that emotion to [`CUE_INTENSITY`].
//! Emotions are scored independently, so several may fire at once.

use kindred_types::{EmotionLabel, EmotionVector};

/// Intensity assigned to an emotion when any of its cues matches.
pub const CUE_INTENSITY: f32 = 0.8;

const JOY_CUES: &[&str] = &[
    "happy", "glad", "great", "wonderful", "excellent", "joy", "😊", "😄",
];

const SADNESS_CUES: &[&str] = &[
    "sad", "sorry", "unfortunate", "regret", "unhappy", "😢", "😔",
];

const ANGER_CUES: &[&str] = &["angry", "upset", "frustrat", "annoy", "mad", "😠", "😡"];

const SURPRISE_CUES: &[&str] = &[
    "wow", "amazing", "surpris", "unbelievable", "incredible", "😮", "😲",
];

const EMPHASIS_CUES: &[&str] = &[
    "important", "critical", "essential", "crucial", "key", "vital", "!",
];

/// Cue set for each label.
pub fn cues(label: EmotionLabel) -> &'static [&'static str] {
    match label {
        EmotionLabel::Joy => JOY_CUES,
        EmotionLabel::Sadness => SADNESS_CUES,
        EmotionLabel::Anger => ANGER_CUES,
        EmotionLabel::Surprise => SURPRISE_CUES,
        EmotionLabel::Emphasis => EMPHASIS_CUES,
    }
}

/// Scores `text` into an [`EmotionVector`]. Pure: no I/O, no state.
pub fn infer_emotions(text: &str) -> EmotionVector {
    let lower = text.to_lowercase();
    let mut vector = EmotionVector::default();
    for label in EmotionLabel::ALL {
        if cues(label).iter().any(|cue| lower.contains(cue)) {
            vector.set(label, CUE_INTENSITY);
        }
    }
    vector
}
