use crate::error::VoiceError;
use crate::synthesis::Synthesizer;
use kindred_types::VoiceModel;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Voices advertised when the synthesizer cannot list any.
pub fn default_voices() -> Vec<VoiceModel> {
    vec![
        VoiceModel::new("premade/adam", "Adam", "male"),
        VoiceModel::new("premade/rachel", "Rachel", "female"),
    ]
}

/// Voices advertised when the synthesizer has no credentials configured.
pub fn unconfigured_voices() -> Vec<VoiceModel> {
    let mut voices = default_voices();
    voices.push(VoiceModel::new("premade/antoni", "Antoni", "male"));
    voices.push(VoiceModel::new("premade/elli", "Elli", "female"));
    voices
}

/// Cached voice listing of a [`Synthesizer`].
#[derive(Clone)]
pub struct VoiceCatalog {
    synthesizer: Arc<dyn Synthesizer>,
    cache: Arc<RwLock<Option<Vec<VoiceModel>>>>,
}

impl VoiceCatalog {
    pub fn new(synthesizer: Arc<dyn Synthesizer>) -> Self {
        Self {
            synthesizer,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Lists voices, never empty. A synthesizer without credentials yields
    /// [`unconfigured_voices`]; any other failed or empty listing yields
    /// [`default_voices`]. Neither fallback is cached.
    pub async fn voices(&self, force_refresh: bool) -> Vec<VoiceModel> {
        if !force_refresh {
            if let Some(cached) = self.cache.read().await.as_ref() {
                return cached.clone();
            }
        }

        match self.synthesizer.list_voices().await {
            Ok(voices) if !voices.is_empty() => {
                *self.cache.write().await = Some(voices.clone());
                voices
            }
            Ok(_) => {
                warn!(
                    synthesizer = self.synthesizer.name(),
                    "voice catalog is empty, using defaults"
                );
                default_voices()
            }
            Err(VoiceError::MissingApiKey(service)) => {
                debug!(service, "no API key configured, using premade voices");
                unconfigured_voices()
            }
            Err(e) => {
                warn!(
                    synthesizer = self.synthesizer.name(),
                    error = %e,
                    "voice catalog unavailable, using defaults"
                );
                default_voices()
            }
        }
    }

    /// Drops the cached listing.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }
}
