use async_trait::async_trait;
use kindred_types::{EmotionVector, VoiceModel};
use kindred_voice::{
    infer_emotions, AudioFormat, MemoryAudioStore, Prosody, SynthesisStage, SynthesizedAudio,
    Synthesizer, VoiceCatalog, VoiceError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Succeeds with a fixed clip and records what it was asked for.
#[derive(Default)]
struct RecordingSynthesizer {
    voices: Vec<VoiceModel>,
    calls: Mutex<Vec<(String, Prosody)>>,
    listings: AtomicUsize,
}

#[async_trait]
impl Synthesizer for RecordingSynthesizer {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn list_voices(&self) -> Result<Vec<VoiceModel>, VoiceError> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        Ok(self.voices.clone())
    }

    async fn synthesize(
        &self,
        _text: &str,
        voice_id: &str,
        prosody: &Prosody,
    ) -> Result<SynthesizedAudio, VoiceError> {
        self.calls
            .lock()
            .unwrap()
            .push((voice_id.to_string(), *prosody));
        Ok(SynthesizedAudio {
            bytes: vec![0xff, 0xfb, 0x90],
            format: AudioFormat::Mp3,
        })
    }
}

/// Fails every request as an unreachable service would.
struct UnreachableSynthesizer;

#[async_trait]
impl Synthesizer for UnreachableSynthesizer {
    fn name(&self) -> &'static str {
        "unreachable"
    }

    async fn list_voices(&self) -> Result<Vec<VoiceModel>, VoiceError> {
        Err(VoiceError::Status {
            service: "unreachable",
            status: 503,
            body: "down".to_string(),
        })
    }

    async fn synthesize(
        &self,
        _text: &str,
        _voice_id: &str,
        _prosody: &Prosody,
    ) -> Result<SynthesizedAudio, VoiceError> {
        Err(VoiceError::Tts("connection refused".to_string()))
    }
}

fn stage_with(synth: Arc<dyn Synthesizer>) -> (SynthesisStage, MemoryAudioStore) {
    let store = MemoryAudioStore::new();
    let stage = SynthesisStage::new(
        synth.clone(),
        VoiceCatalog::new(synth),
        Arc::new(store.clone()),
    );
    (stage, store)
}

#[tokio::test]
async fn unreachable_catalog_returns_defaults() {
    let catalog = VoiceCatalog::new(Arc::new(UnreachableSynthesizer));
    let voices = catalog.voices(false).await;
    let ids: Vec<_> = voices.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["premade/adam", "premade/rachel"]);
}

/// Has no credentials, like a hosted engine with an empty key.
struct UnconfiguredSynthesizer;

#[async_trait]
impl Synthesizer for UnconfiguredSynthesizer {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    async fn list_voices(&self) -> Result<Vec<VoiceModel>, VoiceError> {
        Err(VoiceError::MissingApiKey("unconfigured"))
    }

    async fn synthesize(
        &self,
        _text: &str,
        _voice_id: &str,
        _prosody: &Prosody,
    ) -> Result<SynthesizedAudio, VoiceError> {
        Err(VoiceError::MissingApiKey("unconfigured"))
    }
}

#[tokio::test]
async fn missing_key_lists_all_premade_voices() {
    let catalog = VoiceCatalog::new(Arc::new(UnconfiguredSynthesizer));
    let voices = catalog.voices(false).await;
    let ids: Vec<_> = voices.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "premade/adam",
            "premade/rachel",
            "premade/antoni",
            "premade/elli"
        ]
    );
    assert_eq!(voices[2].gender, "male");
    assert_eq!(voices[3].gender, "female");
}

#[tokio::test]
async fn catalog_caches_until_refresh() {
    let synth = Arc::new(RecordingSynthesizer {
        voices: vec![VoiceModel::new("v1", "One", "neutral")],
        ..Default::default()
    });
    let catalog = VoiceCatalog::new(synth.clone());

    catalog.voices(false).await;
    catalog.voices(false).await;
    assert_eq!(synth.listings.load(Ordering::SeqCst), 1);

    catalog.voices(true).await;
    assert_eq!(synth.listings.load(Ordering::SeqCst), 2);

    catalog.invalidate().await;
    catalog.voices(false).await;
    assert_eq!(synth.listings.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn empty_catalog_is_not_cached() {
    let synth = Arc::new(RecordingSynthesizer::default());
    let catalog = VoiceCatalog::new(synth.clone());

    assert_eq!(catalog.voices(false).await.len(), 2);
    assert_eq!(catalog.voices(false).await.len(), 2);
    assert_eq!(synth.listings.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failure_yields_no_url() {
    let (stage, store) = stage_with(Arc::new(UnreachableSynthesizer));
    let url = stage
        .synthesize("Hello there", &EmotionVector::default(), None)
        .await;
    assert_eq!(url, None);
    assert!(store.is_empty());
}

#[tokio::test]
async fn success_stores_clip_with_first_catalog_voice() {
    let synth = Arc::new(RecordingSynthesizer {
        voices: vec![
            VoiceModel::new("first", "First", "female"),
            VoiceModel::new("second", "Second", "male"),
        ],
        ..Default::default()
    });
    let (stage, store) = stage_with(synth.clone());

    let url = stage
        .synthesize("Just a plain reply.", &EmotionVector::default(), None)
        .await
        .unwrap();

    let clip = store.get(&url).unwrap();
    assert_eq!(clip.bytes, vec![0xff, 0xfb, 0x90]);
    let calls = synth.calls.lock().unwrap();
    assert_eq!(calls[0].0, "first");
    assert_eq!(calls[0].1, Prosody::default());
}

#[tokio::test]
async fn preferred_voice_and_emotions_reach_synthesizer() {
    let synth = Arc::new(RecordingSynthesizer {
        voices: vec![VoiceModel::new("first", "First", "female")],
        ..Default::default()
    });
    let (stage, _store) = stage_with(synth.clone());

    let emotions = infer_emotions("That's wonderful! I'm so happy for you!");
    let url = stage.synthesize("reply", &emotions, Some("custom")).await;
    assert!(url.is_some());

    let calls = synth.calls.lock().unwrap();
    assert_eq!(calls[0].0, "custom");
    assert!(calls[0].1.stability < Prosody::default().stability);
    assert!(calls[0].1.style > 0.0);
    assert_eq!(synth.listings.load(Ordering::SeqCst), 0);
}
