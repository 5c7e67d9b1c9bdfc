//! Background task that deletes synthesized clips past their retention age.

use kindred_voice::DirectoryAudioStore;
use std::time::Duration;
use tokio::time::sleep;

/// Starts a background task that periodically deletes expired clips.
///
/// This task runs indefinitely.
///
/// # Arguments
///
/// * `clips` - The directory synthesized replies are written to.
/// * `max_age` - Clips last modified longer ago than this are deleted.
/// * `interval` - Time to wait between sweeps.
pub async fn start_audio_retention_task(
    clips: DirectoryAudioStore,
    max_age: Duration,
    interval: Duration,
) {
    tracing::info!(
        path = %clips.dir().display(),
        max_age_seconds = max_age.as_secs(),
        interval_seconds = interval.as_secs(),
        "starting audio retention task"
    );

    loop {
        sleep(interval).await;

        match clips.prune_older_than(max_age).await {
            Ok(count) if count > 0 => {
                tracing::info!(count, "deleted expired audio clips");
            }
            Ok(_) => {
                tracing::debug!("no expired audio clips to delete");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to sweep audio directory");
            }
        }
    }
}
