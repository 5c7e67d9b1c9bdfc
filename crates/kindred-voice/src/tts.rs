use crate::config::PiperConfig;
use crate::error::VoiceError;
use crate::prosody::Prosody;
use crate::synthesis::{AudioFormat, SynthesizedAudio, Synthesizer};
use async_trait::async_trait;
use kindred_types::{VoiceModel, VoiceProfile};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::RwLock;

/// Maximum text input size for TTS (64 KiB).
pub const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

/// Timeout for TTS process execution.
const TTS_TIMEOUT: Duration = Duration::from_secs(60);

/// Local synthesis through the piper binary.
///
/// Voices are registered [`VoiceProfile`]s. Piper emits raw s16le mono PCM,
/// which is wrapped into a WAV container before it is returned.
#[derive(Debug, Clone)]
pub struct PiperSynthesizer {
    profiles: Arc<RwLock<HashMap<String, VoiceProfile>>>,
    voices_dir: PathBuf,
    piper_binary: PathBuf,
    sample_rate: u32,
}

impl PiperSynthesizer {
    pub fn new(voices_dir: impl AsRef<Path>, piper_binary: impl AsRef<Path>) -> Self {
        Self {
            profiles: Arc::new(RwLock::new(HashMap::new())),
            voices_dir: voices_dir.as_ref().to_path_buf(),
            piper_binary: piper_binary.as_ref().to_path_buf(),
            sample_rate: 22050,
        }
    }

    /// Builds a synthesizer with every profile in `config` registered.
    pub async fn from_config(config: &PiperConfig) -> Self {
        let synth =
            Self::new(&config.voices_dir, &config.binary).with_sample_rate(config.sample_rate);
        for profile in &config.profiles {
            synth.add_profile(profile.clone()).await;
        }
        synth
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub async fn add_profile(&self, profile: VoiceProfile) {
        self.profiles
            .write()
            .await
            .insert(profile.id.clone(), profile);
    }

    pub async fn get_profile(&self, id: &str) -> Option<VoiceProfile> {
        self.profiles.read().await.get(id).cloned()
    }

    fn resolve(&self, path: &str) -> PathBuf {
        if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.voices_dir.join(path)
        }
    }

    /// Runs piper for `profile` and returns its raw PCM output.
    async fn run_piper(
        &self,
        text: &str,
        profile: &VoiceProfile,
        rate: f32,
    ) -> Result<Vec<u8>, VoiceError> {
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(VoiceError::Tts(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                text.len(),
                MAX_TTS_INPUT_BYTES
            )));
        }

        let model_path = self.resolve(&profile.model_path);
        if !model_path.exists() {
            return Err(VoiceError::Tts(format!(
                "Model file not found: {:?}",
                model_path
            )));
        }

        if profile.speed < 0.1 || profile.speed > 10.0 {
            return Err(VoiceError::Config(
                "Speed must be between 0.1 and 10.0".to_string(),
            ));
        }
        let speed = (profile.speed * rate).clamp(0.1, 10.0);

        let mut command = Command::new(&self.piper_binary);
        command
            .arg("--model")
            .arg(model_path)
            .arg("--output_raw")
            // Length scale is the inverse of speed.
            .arg("--length_scale")
            .arg((1.0 / speed).to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(config) = &profile.config_path {
            command.arg("--config").arg(self.resolve(config));
        }

        if let Some(speaker) = profile.speaker_id {
            command.arg("--speaker").arg(speaker.to_string());
        }

        let mut child = command
            .spawn()
            .map_err(|e| VoiceError::Tts(format!("Failed to spawn piper: {}", e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| VoiceError::Tts("Failed to open stdin".to_string()))?;
        let text_owned = text.to_string();

        // Written from a separate task so a full stdout pipe cannot deadlock us.
        let write_task = tokio::spawn(async move { stdin.write_all(text_owned.as_bytes()).await });

        let output = tokio::time::timeout(TTS_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| {
                VoiceError::Tts(format!(
                    "TTS process timed out after {} seconds",
                    TTS_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| VoiceError::Tts(format!("Failed to wait for piper: {}", e)))?;

        match write_task.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(VoiceError::Tts(format!(
                    "Failed to write to piper stdin: {}",
                    e
                )))
            }
            Err(e) => return Err(VoiceError::Tts(format!("Stdin task failed: {}", e))),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VoiceError::Tts(format!("Piper failed: {}", stderr)));
        }

        Ok(output.stdout)
    }
}

/// Wraps raw s16le mono PCM into a WAV container. A trailing odd byte is dropped.
pub fn pcm_to_wav(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>, VoiceError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Vec::with_capacity(pcm.len() + 44);
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buf), spec)
            .map_err(|e| VoiceError::Tts(format!("WAV header: {e}")))?;
        for chunk in pcm.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))
                .map_err(|e| VoiceError::Tts(format!("WAV write: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| VoiceError::Tts(format!("WAV finalize: {e}")))?;
    }
    Ok(buf)
}

#[async_trait]
impl Synthesizer for PiperSynthesizer {
    fn name(&self) -> &'static str {
        "piper"
    }

    async fn list_voices(&self) -> Result<Vec<VoiceModel>, VoiceError> {
        let profiles = self.profiles.read().await;
        let mut voices: Vec<VoiceModel> = profiles.values().map(VoiceProfile::to_model).collect();
        voices.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(voices)
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        prosody: &Prosody,
    ) -> Result<SynthesizedAudio, VoiceError> {
        let profile = self
            .get_profile(voice_id)
            .await
            .ok_or_else(|| VoiceError::ProfileNotFound(voice_id.to_string()))?;

        let pcm = self.run_piper(text, &profile, prosody.rate).await?;
        Ok(SynthesizedAudio {
            bytes: pcm_to_wav(&pcm, self.sample_rate)?,
            format: AudioFormat::Wav,
        })
    }
}
