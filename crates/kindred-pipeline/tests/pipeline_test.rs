use async_trait::async_trait;
use kindred_conversation::{
    ConversationStore, DialogueError, DialogueRequest, DialogueStage, ReplyGenerator,
};
use kindred_pipeline::{
    PipelineError, PipelineOrchestrator, ProcessOptions, CATASTROPHIC_REPLY, MAX_AUDIO_BYTES,
};
use kindred_types::{PersonaTraits, Role, VoiceModel};
use kindred_voice::{
    AudioFormat, MemoryAudioStore, Prosody, SynthesisStage, SynthesizedAudio, Synthesizer,
    Transcriber, TranscriptionStage, VoiceCatalog, VoiceError, APOLOGY_TRANSCRIPT,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Treats the payload as UTF-8 text. A payload starting with `slow` takes
/// a while.
struct TextTranscriber;

#[async_trait]
impl Transcriber for TextTranscriber {
    fn name(&self) -> &'static str {
        "text"
    }

    async fn transcribe(
        &self,
        audio: &[u8],
        _language: Option<&str>,
    ) -> Result<String, VoiceError> {
        if audio.starts_with(b"slow") {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        String::from_utf8(audio.to_vec()).map_err(|e| VoiceError::Stt(e.to_string()))
    }
}

struct DeafTranscriber;

#[async_trait]
impl Transcriber for DeafTranscriber {
    fn name(&self) -> &'static str {
        "deaf"
    }

    async fn transcribe(
        &self,
        _audio: &[u8],
        _language: Option<&str>,
    ) -> Result<String, VoiceError> {
        Err(VoiceError::Status {
            service: "whisper",
            status: 500,
            body: "internal error".to_string(),
        })
    }
}

struct EchoGenerator;

#[async_trait]
impl ReplyGenerator for EchoGenerator {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn generate(&self, request: &DialogueRequest) -> Result<String, DialogueError> {
        Ok(format!("reply to {}", request.latest_user_text()))
    }
}

struct PanickingGenerator;

#[async_trait]
impl ReplyGenerator for PanickingGenerator {
    fn name(&self) -> &'static str {
        "panicking"
    }

    async fn generate(&self, request: &DialogueRequest) -> Result<String, DialogueError> {
        if request.latest_user_text() == "explode" {
            panic!("generator exploded");
        }
        Ok("fine".to_string())
    }
}

#[derive(Default)]
struct RecordingSynthesizer {
    voices_used: Mutex<Vec<String>>,
}

#[async_trait]
impl Synthesizer for RecordingSynthesizer {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn list_voices(&self) -> Result<Vec<VoiceModel>, VoiceError> {
        Ok(vec![
            VoiceModel::new("first", "First", "female"),
            VoiceModel::new("second", "Second", "male"),
        ])
    }

    async fn synthesize(
        &self,
        _text: &str,
        voice_id: &str,
        _prosody: &Prosody,
    ) -> Result<SynthesizedAudio, VoiceError> {
        self.voices_used.lock().unwrap().push(voice_id.to_string());
        Ok(SynthesizedAudio {
            bytes: b"RIFF....WAVE".to_vec(),
            format: AudioFormat::Wav,
        })
    }
}

struct OfflineSynthesizer;

#[async_trait]
impl Synthesizer for OfflineSynthesizer {
    fn name(&self) -> &'static str {
        "offline"
    }

    async fn list_voices(&self) -> Result<Vec<VoiceModel>, VoiceError> {
        Err(VoiceError::Tts("catalog unreachable".to_string()))
    }

    async fn synthesize(
        &self,
        _text: &str,
        _voice_id: &str,
        _prosody: &Prosody,
    ) -> Result<SynthesizedAudio, VoiceError> {
        Err(VoiceError::Tts("service unreachable".to_string()))
    }
}

fn orchestrator(
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn ReplyGenerator>,
    synthesizer: Arc<dyn Synthesizer>,
) -> (PipelineOrchestrator, MemoryAudioStore) {
    let clips = MemoryAudioStore::new();
    let store = ConversationStore::new();
    let orchestrator = PipelineOrchestrator::new(
        TranscriptionStage::new(transcriber),
        DialogueStage::new(store, generator),
        SynthesisStage::new(
            synthesizer.clone(),
            VoiceCatalog::new(synthesizer),
            Arc::new(clips.clone()),
        ),
    );
    (orchestrator, clips)
}

fn healthy() -> (PipelineOrchestrator, MemoryAudioStore) {
    orchestrator(
        Arc::new(TextTranscriber),
        Arc::new(EchoGenerator),
        Arc::new(RecordingSynthesizer::default()),
    )
}

#[tokio::test]
async fn sequential_requests_record_four_turns_in_order() {
    let (pipeline, clips) = healthy();

    let a = pipeline
        .process("avatar-1", b"audio A".to_vec(), ProcessOptions::default())
        .await;
    let b = pipeline
        .process("avatar-1", b"audio B".to_vec(), ProcessOptions::default())
        .await;

    assert!(a.success && b.success);
    assert_eq!(a.text, "reply to audio A");
    assert_eq!(a.transcription.as_deref(), Some("audio A"));
    assert!(clips.get(a.audio_url.as_deref().unwrap()).is_some());

    let history = pipeline.store().snapshot("avatar-1").history;
    let turns: Vec<_> = history
        .iter()
        .map(|t| (t.role, t.content.as_str()))
        .collect();
    assert_eq!(
        turns,
        vec![
            (Role::User, "audio A"),
            (Role::Assistant, "reply to audio A"),
            (Role::User, "audio B"),
            (Role::Assistant, "reply to audio B"),
        ]
    );
}

#[tokio::test]
async fn transcription_failure_feeds_apology_to_dialogue() {
    let (pipeline, _clips) = orchestrator(
        Arc::new(DeafTranscriber),
        Arc::new(EchoGenerator),
        Arc::new(RecordingSynthesizer::default()),
    );

    let result = pipeline
        .process("a", b"noise".to_vec(), ProcessOptions::default())
        .await;

    assert!(result.success);
    assert_eq!(result.transcription.as_deref(), Some(APOLOGY_TRANSCRIPT));
    assert_eq!(result.text, format!("reply to {APOLOGY_TRANSCRIPT}"));
    let history = pipeline.store().snapshot("a").history;
    assert_eq!(history[0].content, APOLOGY_TRANSCRIPT);
}

#[tokio::test]
async fn synthesis_failure_leaves_audio_url_null() {
    let (pipeline, clips) = orchestrator(
        Arc::new(TextTranscriber),
        Arc::new(EchoGenerator),
        Arc::new(OfflineSynthesizer),
    );

    let result = pipeline
        .process("a", b"hello".to_vec(), ProcessOptions::default())
        .await;

    assert!(result.success);
    assert_eq!(result.audio_url, None);
    assert!(result.needs_local_speech());
    assert!(clips.is_empty());

    let json = serde_json::to_value(&result).unwrap();
    assert!(json["audioUrl"].is_null());
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn panicking_stage_fails_only_that_request() {
    let (pipeline, _clips) = orchestrator(
        Arc::new(TextTranscriber),
        Arc::new(PanickingGenerator),
        Arc::new(RecordingSynthesizer::default()),
    );

    let err = pipeline
        .try_process("a", b"explode".to_vec(), ProcessOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::StagePanicked(msg) if msg == "generator exploded"));

    let result = pipeline
        .process("a", b"explode".to_vec(), ProcessOptions::default())
        .await;
    assert!(!result.success);
    assert_eq!(result.text, CATASTROPHIC_REPLY);
    assert_eq!(result.audio_url, None);

    // The avatar is not left locked.
    let next = tokio::time::timeout(
        Duration::from_secs(2),
        pipeline.process("a", b"hello".to_vec(), ProcessOptions::default()),
    )
    .await
    .unwrap();
    assert!(next.success);
    assert_eq!(next.text, "fine");
}

#[tokio::test]
async fn malformed_input_is_rejected_without_touching_history() {
    let (pipeline, _clips) = healthy();

    let empty = pipeline
        .process("a", Vec::new(), ProcessOptions::default())
        .await;
    assert!(!empty.success);
    assert_eq!(empty.text, CATASTROPHIC_REPLY);
    assert_eq!(empty.audio_url, None);

    let blank = pipeline
        .process("  ", b"hi".to_vec(), ProcessOptions::default())
        .await;
    assert!(!blank.success);

    let err = pipeline
        .try_process("a", vec![0u8; MAX_AUDIO_BYTES + 1], ProcessOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::AudioTooLarge { .. }));

    assert!(pipeline.store().is_empty());
}

#[tokio::test]
async fn concurrent_requests_for_one_avatar_keep_issue_order() {
    let (pipeline, _clips) = healthy();

    let first = pipeline.process("a", b"slow first".to_vec(), ProcessOptions::default());
    let second = pipeline.process("a", b"second".to_vec(), ProcessOptions::default());
    let (first, second) = tokio::join!(first, second);
    assert!(first.success && second.success);

    let contents: Vec<_> = pipeline
        .store()
        .snapshot("a")
        .history
        .iter()
        .map(|t| t.content.clone())
        .collect();
    assert_eq!(
        contents,
        vec![
            "slow first",
            "reply to slow first",
            "second",
            "reply to second"
        ]
    );
}

#[tokio::test]
async fn different_avatars_do_not_wait_on_each_other() {
    let (pipeline, _clips) = healthy();

    let slow = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            pipeline
                .process("slow-avatar", b"slow hello".to_vec(), ProcessOptions::default())
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let fast = tokio::time::timeout(
        Duration::from_millis(150),
        pipeline.process("fast-avatar", b"hi".to_vec(), ProcessOptions::default()),
    )
    .await
    .expect("fast avatar blocked behind slow avatar");
    assert!(fast.success);
    assert!(slow.await.unwrap().success);
}

#[tokio::test]
async fn abandoned_request_still_records_reply() {
    let (pipeline, _clips) = healthy();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        pipeline.process("a", b"slow goodbye".to_vec(), ProcessOptions::default()),
    )
    .await;
    assert!(abandoned.is_err());

    // Waits for the detached exchange to release the avatar.
    drop(pipeline.store().exchange("a").await);
    let history = pipeline.store().snapshot("a").history;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, "reply to slow goodbye");
}

#[tokio::test]
async fn unreachable_catalog_still_lists_voices() {
    let (pipeline, _clips) = orchestrator(
        Arc::new(TextTranscriber),
        Arc::new(EchoGenerator),
        Arc::new(OfflineSynthesizer),
    );

    let voices = pipeline.voice_models(None).await;
    assert!(!voices.is_empty());
    assert!(voices.iter().any(|v| v.id == "premade/adam"));
    assert!(voices.iter().any(|v| v.id == "premade/rachel"));
}

#[tokio::test]
async fn persona_voice_leads_listing_and_is_used() {
    let synth = Arc::new(RecordingSynthesizer::default());
    let (pipeline, _clips) = orchestrator(
        Arc::new(TextTranscriber),
        Arc::new(EchoGenerator),
        synth.clone(),
    );
    pipeline
        .store()
        .set_persona(
            "a",
            PersonaTraits {
                voice_id: Some("second".to_string()),
                ..Default::default()
            },
        )
        .await;

    let voices = pipeline.voice_models(Some("a")).await;
    assert_eq!(voices[0].id, "second");
    assert_eq!(pipeline.voice_models(None).await[0].id, "first");

    let options = ProcessOptions {
        language: None,
        voice_id: Some("first".to_string()),
    };
    pipeline.process("a", b"hi".to_vec(), options).await;
    pipeline
        .process("b", b"hi".to_vec(), ProcessOptions::default())
        .await;
    assert_eq!(*synth.voices_used.lock().unwrap(), vec!["second", "first"]);
}

#[tokio::test]
async fn voice_listing_does_not_create_conversations() {
    let (pipeline, _clips) = healthy();

    for i in 0..100 {
        let voices = pipeline.voice_models(Some(&format!("nobody-{i}"))).await;
        assert_eq!(voices[0].id, "first");
    }
    assert!(!pipeline.store().contains("nobody-0"));
    assert!(pipeline.store().is_empty());
}
