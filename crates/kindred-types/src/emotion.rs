//! Emotion labels and intensity vectors.

use serde::{Deserialize, Serialize};

/// The closed set of emotions scored from reply text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionLabel {
    Joy,
    Sadness,
    Anger,
    Surprise,
    Emphasis,
}

impl EmotionLabel {
    /// Every label, in vector order.
    pub const ALL: [EmotionLabel; 5] = [
        Self::Joy,
        Self::Sadness,
        Self::Anger,
        Self::Surprise,
        Self::Emphasis,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Joy => "joy",
            Self::Sadness => "sadness",
            Self::Anger => "anger",
            Self::Surprise => "surprise",
            Self::Emphasis => "emphasis",
        }
    }
}

/// Intensity per emotion label, each in `[0, 1]`.
///
/// The default vector is all zero (neutral).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionVector {
    pub joy: f32,
    pub sadness: f32,
    pub anger: f32,
    pub surprise: f32,
    pub emphasis: f32,
}

impl EmotionVector {
    /// Returns the intensity of `label`.
    pub fn get(&self, label: EmotionLabel) -> f32 {
        match label {
            EmotionLabel::Joy => self.joy,
            EmotionLabel::Sadness => self.sadness,
            EmotionLabel::Anger => self.anger,
            EmotionLabel::Surprise => self.surprise,
            EmotionLabel::Emphasis => self.emphasis,
        }
    }

    /// Sets the intensity of `label`, clamped to `[0, 1]`.
    pub fn set(&mut self, label: EmotionLabel, intensity: f32) {
        let value = intensity.clamp(0.0, 1.0);
        match label {
            EmotionLabel::Joy => self.joy = value,
            EmotionLabel::Sadness => self.sadness = value,
            EmotionLabel::Anger => self.anger = value,
            EmotionLabel::Surprise => self.surprise = value,
            EmotionLabel::Emphasis => self.emphasis = value,
        }
    }

    /// Iterates `(label, intensity)` pairs in label order.
    pub fn iter(&self) -> impl Iterator<Item = (EmotionLabel, f32)> + '_ {
        EmotionLabel::ALL.into_iter().map(|l| (l, self.get(l)))
    }

    /// True when no emotion carries any intensity.
    pub fn is_neutral(&self) -> bool {
        self.iter().all(|(_, v)| v == 0.0)
    }

    /// The strongest emotion, or `None` for a neutral vector. Ties resolve
    /// to the earliest label.
    pub fn dominant(&self) -> Option<EmotionLabel> {
        self.iter()
            .filter(|(_, v)| *v > 0.0)
            .fold(None, |best: Option<(EmotionLabel, f32)>, (l, v)| match best {
                Some((_, bv)) if bv >= v => best,
                _ => Some((l, v)),
            })
            .map(|(l, _)| l)
    }
}
