//! Server configuration loading from file and environment variables.

use kindred_conversation::DialogueConfig;
use kindred_types::VoiceEngine;
use kindred_voice::{ElevenLabsConfig, PiperConfig, WhisperConfig};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Reply generation.
    #[serde(default)]
    pub dialogue: DialogueConfig,

    /// Speech-to-text.
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    /// Text-to-speech.
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Where synthesized clips are written.
    #[serde(default)]
    pub audio: AudioConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally reachable base URL, used to build clip URLs. Defaults to
    /// `http://<host>:<port>`.
    #[serde(default)]
    pub public_url: Option<String>,
}

impl ServerConfig {
    pub fn public_url(&self) -> String {
        match &self.public_url {
            Some(url) if !url.trim().is_empty() => url.trim_end_matches('/').to_string(),
            _ => format!("http://{}:{}", self.host, self.port),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "kindred_pipeline=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Which speech-to-text capability to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionBackend {
    /// Hosted Whisper endpoint.
    #[default]
    WhisperApi,
    /// Local whisper.cpp binary.
    WhisperCli,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptionConfig {
    #[serde(default)]
    pub backend: TranscriptionBackend,

    /// Hosted endpoint settings. An empty key reuses `dialogue.api_key`.
    #[serde(default)]
    pub whisper: WhisperConfig,

    #[serde(default)]
    pub cli: WhisperCliConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhisperCliConfig {
    #[serde(default = "default_whisper_binary")]
    pub binary: String,

    #[serde(default = "default_whisper_model")]
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_engine")]
    pub engine: VoiceEngine,

    #[serde(default)]
    pub elevenlabs: ElevenLabsConfig,

    #[serde(default)]
    pub piper: PiperConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Directory clips are written to and served from under `/audio`.
    #[serde(default = "default_audio_dir")]
    pub dir: String,

    /// Clips older than this many seconds are deleted. `0` keeps them forever.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// Seconds between retention sweeps.
    #[serde(default = "default_retention_interval_secs")]
    pub retention_interval_secs: u64,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_whisper_binary() -> String {
    "assets/whisper/whisper-cli".to_string()
}

fn default_whisper_model() -> String {
    "assets/whisper/ggml-base.bin".to_string()
}

fn default_engine() -> VoiceEngine {
    VoiceEngine::ElevenLabs
}

fn default_audio_dir() -> String {
    "data/audio".to_string()
}

fn default_retention_secs() -> u64 {
    86_400
}

fn default_retention_interval_secs() -> u64 {
    600
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for WhisperCliConfig {
    fn default() -> Self {
        Self {
            binary: default_whisper_binary(),
            model: default_whisper_model(),
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            elevenlabs: ElevenLabsConfig::default(),
            piper: PiperConfig::default(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            dir: default_audio_dir(),
            retention_secs: default_retention_secs(),
            retention_interval_secs: default_retention_interval_secs(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `KINDRED_HOST` overrides `server.host`
/// - `KINDRED_PORT` overrides `server.port`
/// - `KINDRED_PUBLIC_URL` overrides `server.public_url`
/// - `KINDRED_LOG_LEVEL` overrides `logging.level`
/// - `KINDRED_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `KINDRED_OPENAI_API_KEY` overrides `dialogue.api_key` and `transcription.whisper.api_key`
/// - `KINDRED_ELEVENLABS_API_KEY` overrides `synthesis.elevenlabs.api_key`
/// - `KINDRED_AUDIO_DIR` overrides `audio.dir`
/// - `KINDRED_AUDIO_RETENTION_SECS` overrides `audio.retention_secs`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies `KINDRED_*` overrides read through `var`.
pub fn apply_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(host) = var("KINDRED_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = var("KINDRED_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(url) = var("KINDRED_PUBLIC_URL") {
        config.server.public_url = Some(url);
    }
    if let Some(level) = var("KINDRED_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("KINDRED_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(key) = var("KINDRED_OPENAI_API_KEY") {
        config.dialogue.api_key = key.clone();
        config.transcription.whisper.api_key = key;
    }
    if let Some(key) = var("KINDRED_ELEVENLABS_API_KEY") {
        config.synthesis.elevenlabs.api_key = key;
    }
    if let Some(dir) = var("KINDRED_AUDIO_DIR") {
        config.audio.dir = dir;
    }
    if let Some(secs) = var("KINDRED_AUDIO_RETENTION_SECS") {
        if let Ok(parsed) = secs.parse() {
            config.audio.retention_secs = parsed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.synthesis.engine, VoiceEngine::ElevenLabs);
        assert_eq!(config.transcription.backend, TranscriptionBackend::WhisperApi);
        assert_eq!(config.audio.dir, "data/audio");
        assert_eq!(config.audio.retention_secs, 86_400);
        assert_eq!(config.audio.retention_interval_secs, 600);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();
        assert!(matches!(
            load_config(path.to_str()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn nested_sections_parse() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 8080
            public_url = "https://avatar.example.com/"

            [dialogue]
            primary_model = "gpt-4o"

            [transcription]
            backend = "whisper_cli"

            [transcription.cli]
            model = "/models/ggml-small.bin"

            [synthesis]
            engine = "piper"

            [audio]
            retention_secs = 3600

            [[synthesis.piper.profiles]]
            id = "lessac"
            name = "Lessac"
            model_path = "en_US-lessac-medium.onnx"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.public_url(), "https://avatar.example.com");
        assert_eq!(config.dialogue.primary_model, "gpt-4o");
        assert_eq!(config.transcription.backend, TranscriptionBackend::WhisperCli);
        assert_eq!(config.transcription.cli.model, "/models/ggml-small.bin");
        assert_eq!(config.transcription.cli.binary, "assets/whisper/whisper-cli");
        assert_eq!(config.synthesis.engine, VoiceEngine::Piper);
        assert_eq!(config.synthesis.piper.profiles[0].id, "lessac");
        assert_eq!(config.audio.retention_secs, 3600);
        assert_eq!(config.audio.retention_interval_secs, 600);
        assert_eq!(config.audio.dir, "data/audio");
    }

    #[test]
    fn public_url_defaults_to_bind_address() {
        assert_eq!(
            ServerConfig::default().public_url(),
            "http://127.0.0.1:3000"
        );
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("KINDRED_PORT", "9000"),
            ("KINDRED_HOST", "0.0.0.0"),
            ("KINDRED_LOG_JSON", "1"),
            ("KINDRED_OPENAI_API_KEY", "sk-env"),
            ("KINDRED_ELEVENLABS_API_KEY", "xi-env"),
            ("KINDRED_AUDIO_DIR", "/var/lib/kindred/audio"),
            ("KINDRED_AUDIO_RETENTION_SECS", "0"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_overrides(&mut config, |k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert!(config.logging.json);
        assert_eq!(config.dialogue.api_key, "sk-env");
        assert_eq!(config.transcription.whisper.api_key, "sk-env");
        assert_eq!(config.synthesis.elevenlabs.api_key, "xi-env");
        assert_eq!(config.audio.dir, "/var/lib/kindred/audio");
        assert_eq!(config.audio.retention_secs, 0);
    }

    #[test]
    fn unparsable_overrides_are_ignored() {
        let mut config = Config::default();
        apply_overrides(&mut config, |k| {
            (k == "KINDRED_PORT").then(|| "not-a-port".to_string())
        });
        assert_eq!(config.server.port, 3000);
    }
}
