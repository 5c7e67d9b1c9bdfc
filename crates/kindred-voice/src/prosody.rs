//! Emotion driven synthesis parameters.

use kindred_types::EmotionVector;
use serde::{Deserialize, Serialize};

/// Intensity above which an emotion adjusts delivery.
const ACTIVE_THRESHOLD: f32 = 0.5;
const STEP: f32 = 0.1;
const STYLE_GAIN: f32 = 0.2;

pub const MIN_RATE: f32 = 0.5;
pub const MAX_RATE: f32 = 2.0;

fn default_stability() -> f32 {
    0.5
}

fn default_similarity_boost() -> f32 {
    0.75
}

fn default_rate() -> f32 {
    1.0
}

/// Engine-neutral delivery controls.
///
/// `stability`, `similarity_boost` and `style` follow the hosted engine's
/// voice settings, all in `[0, 1]`. `rate` is a speaking-rate multiplier
/// used by local engines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prosody {
    #[serde(default = "default_stability")]
    pub stability: f32,
    #[serde(default = "default_similarity_boost")]
    pub similarity_boost: f32,
    #[serde(default)]
    pub style: f32,
    #[serde(default = "default_rate")]
    pub rate: f32,
}

impl Default for Prosody {
    fn default() -> Self {
        Self {
            stability: default_stability(),
            similarity_boost: default_similarity_boost(),
            style: 0.0,
            rate: default_rate(),
        }
    }
}

impl Prosody {
    /// Biases `base` by the emotions in `emotions`. Stronger joy, anger and
    /// emphasis make delivery less stable and more stylized.
    pub fn from_emotions(base: Prosody, emotions: &EmotionVector) -> Prosody {
        let active = |v: f32| v > ACTIVE_THRESHOLD;
        let mut p = base;

        if active(emotions.emphasis) {
            p.stability -= STEP;
        }
        if active(emotions.anger) {
            p.stability -= STEP;
        }
        if active(emotions.sadness) {
            p.stability += STEP;
            p.rate -= STEP;
        }
        if active(emotions.joy) {
            p.similarity_boost += STEP;
        }
        if active(emotions.joy) || active(emotions.surprise) {
            p.rate += STEP;
        }
        p.style += STYLE_GAIN * emotions.joy.max(emotions.anger).max(emotions.emphasis);

        p.clamped()
    }

    pub fn clamped(self) -> Prosody {
        Prosody {
            stability: self.stability.clamp(0.0, 1.0),
            similarity_boost: self.similarity_boost.clamp(0.0, 1.0),
            style: self.style.clamp(0.0, 1.0),
            rate: self.rate.clamp(MIN_RATE, MAX_RATE),
        }
    }
}
