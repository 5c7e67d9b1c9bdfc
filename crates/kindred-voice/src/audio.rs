//! Where synthesized clips are kept and how they are addressed.

use crate::error::VoiceError;
use crate::synthesis::{AudioFormat, SynthesizedAudio};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant, SystemTime};
use uuid::Uuid;

/// Materializes a clip and returns a reference a client can fetch.
#[async_trait]
pub trait AudioStore: Send + Sync {
    async fn put(&self, audio: SynthesizedAudio) -> Result<String, VoiceError>;
}

/// Writes clips as `<uuid>.<ext>` into a directory served over HTTP.
#[derive(Debug, Clone)]
pub struct DirectoryAudioStore {
    dir: PathBuf,
    public_base: String,
}

impl DirectoryAudioStore {
    /// `public_base` is the URL prefix the directory is served under,
    /// e.g. `http://localhost:3000/audio`.
    pub fn new(dir: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deletes clips last modified more than `max_age` ago and returns how
    /// many were removed. Files that are not clips are left alone, and a
    /// missing directory counts as empty.
    pub async fn prune_older_than(&self, max_age: Duration) -> Result<usize, VoiceError> {
        let Some(cutoff) = SystemTime::now().checked_sub(max_age) else {
            return Ok(0);
        };

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_clip(&path) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() || metadata.modified()? >= cutoff {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to delete expired clip"
                    );
                }
            }
        }
        Ok(removed)
    }
}

fn is_clip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| AudioFormat::ALL.iter().any(|f| f.extension() == ext))
}

#[async_trait]
impl AudioStore for DirectoryAudioStore {
    async fn put(&self, audio: SynthesizedAudio) -> Result<String, VoiceError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let file_name = format!("{}.{}", Uuid::new_v4(), audio.format.extension());
        tokio::fs::write(self.dir.join(&file_name), &audio.bytes).await?;
        Ok(format!("{}/{}", self.public_base, file_name))
    }
}

/// Keeps clips in process, addressed as `memory://<id>`.
#[derive(Debug, Clone, Default)]
pub struct MemoryAudioStore {
    // Lock held only for map access, never across an await.
    clips: Arc<RwLock<HashMap<String, (Instant, SynthesizedAudio)>>>,
}

pub const MEMORY_SCHEME: &str = "memory://";

impl MemoryAudioStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks a clip up by id or by the full `memory://` URL.
    pub fn get(&self, id: &str) -> Option<SynthesizedAudio> {
        let id = id.strip_prefix(MEMORY_SCHEME).unwrap_or(id);
        let clips = self.clips.read().unwrap_or_else(|e| e.into_inner());
        clips.get(id).map(|(_, audio)| audio.clone())
    }

    /// Drops clips stored at least `max_age` ago and returns how many went.
    pub fn prune_older_than(&self, max_age: Duration) -> usize {
        let mut clips = self.clips.write().unwrap_or_else(|e| e.into_inner());
        let before = clips.len();
        clips.retain(|_, (stored_at, _)| stored_at.elapsed() < max_age);
        before - clips.len()
    }

    pub fn len(&self) -> usize {
        self.clips.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AudioStore for MemoryAudioStore {
    async fn put(&self, audio: SynthesizedAudio) -> Result<String, VoiceError> {
        let id = Uuid::new_v4().to_string();
        self.clips
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.clone(), (Instant::now(), audio));
        Ok(format!("{MEMORY_SCHEME}{id}"))
    }
}
