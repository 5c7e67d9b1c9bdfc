use crate::error::VoiceError;
use crate::transcription::Transcriber;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Maximum audio input size for STT (10 MiB).
pub const MAX_STT_INPUT_BYTES: usize = 10 * 1024 * 1024;

/// Timeout for STT process execution.
const STT_TIMEOUT: Duration = Duration::from_secs(120);

/// Local transcription through a whisper.cpp compatible binary.
///
/// The binary is invoked as `<binary> -m <model> -nt [-l <lang>] -f -` with the
/// recording on stdin and is expected to print the transcript on stdout.
#[derive(Debug, Clone)]
pub struct WhisperCliTranscriber {
    model_path: PathBuf,
    binary_path: PathBuf,
    timeout: Duration,
}

impl WhisperCliTranscriber {
    pub fn new(model_path: impl Into<PathBuf>, binary_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            binary_path: binary_path.into(),
            timeout: STT_TIMEOUT,
        }
    }

    /// Overrides the limit on the whole binary interaction, including
    /// feeding the recording.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, language: Option<&str>) -> Command {
        let mut command = Command::new(&self.binary_path);
        command.arg("-m").arg(&self.model_path).arg("-nt");
        if let Some(language) = language {
            command.arg("-l").arg(language);
        }
        command
            .arg("-f")
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl Transcriber for WhisperCliTranscriber {
    fn name(&self) -> &'static str {
        "whisper-cli"
    }

    async fn transcribe(
        &self,
        audio: &[u8],
        language: Option<&str>,
    ) -> Result<String, VoiceError> {
        if audio.len() > MAX_STT_INPUT_BYTES {
            return Err(VoiceError::Stt(format!(
                "audio data exceeds maximum size: {} bytes (limit: {} bytes)",
                audio.len(),
                MAX_STT_INPUT_BYTES
            )));
        }

        let mut child = self
            .command(language)
            .spawn()
            .map_err(|e| VoiceError::Stt(format!("Failed to spawn STT binary: {}", e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| VoiceError::Stt("Failed to open stdin".to_string()))?;
        let audio_owned = audio.to_vec();

        // Fed from a separate task so a binary that stops reading cannot stall
        // us outside the timeout. Dropping stdin afterwards signals EOF.
        let write_task = tokio::spawn(async move { stdin.write_all(&audio_owned).await });

        // The child is killed on drop, which also unblocks the writer.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                VoiceError::Stt(format!(
                    "STT process timed out after {} seconds",
                    self.timeout.as_secs_f32()
                ))
            })?
            .map_err(|e| VoiceError::Stt(format!("Failed to read stdout: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VoiceError::Stt(format!("STT binary failed: {}", stderr)));
        }

        match write_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(VoiceError::Stt(format!("Failed to write to stdin: {}", e)))
            }
            Err(e) => return Err(VoiceError::Stt(format!("Stdin task failed: {}", e))),
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
