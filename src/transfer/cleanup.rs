//! Delayed archive removal
//!
//! Archives are handed to a background task after the response is built and
//! removed once the delay has passed, giving the client time to finish
//! reading the file.

use log::{debug, warn};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::transfer::archive::ArchiveJob;

/// Handle to the background task that removes served archives.
#[derive(Debug, Clone)]
pub struct CleanupQueue {
    sender: mpsc::UnboundedSender<ArchiveJob>,
    delay: Duration,
}

impl CleanupQueue {
    /// Starts the cleanup task. Must be called inside a tokio runtime.
    pub fn spawn(delay: Duration) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<ArchiveJob>();

        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    remove(job).await;
                });
            }
            debug!("Archive cleanup queue closed");
        });

        Self { sender, delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Queues an archive for removal after the configured delay.
    pub fn schedule(&self, job: ArchiveJob) {
        debug!(
            "Scheduling removal of {} in {:?}",
            job.dir().display(),
            self.delay
        );
        if let Err(mpsc::error::SendError(job)) = self.sender.send(job) {
            warn!("Cleanup task is gone, removing {} now", job.dir().display());
            if let Err(e) = job.cleanup() {
                warn!("Failed to remove archive directory: {}", e);
            }
        }
    }
}

async fn remove(job: ArchiveJob) {
    let dir = job.dir().to_path_buf();
    match tokio::task::spawn_blocking(move || job.cleanup()).await {
        Ok(Ok(())) => debug!("Removed archive directory {}", dir.display()),
        Ok(Err(e)) => warn!("Failed to remove archive directory {}: {}", dir.display(), e),
        Err(e) => warn!("Cleanup task for {} panicked: {}", dir.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::validation::Root;
    use crate::transfer::archive::build_zip;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_scheduled_archive_is_removed_after_delay() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        let root = Root::new(dir.path()).unwrap();

        let queue = CleanupQueue::spawn(Duration::from_millis(50));
        let job = build_zip(&root, &["a.txt".to_string()]).unwrap();
        let archive_dir = job.dir().to_path_buf();

        queue.schedule(job);
        assert!(archive_dir.exists());

        for _ in 0..50 {
            if !archive_dir.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!archive_dir.exists());
    }

    #[tokio::test]
    async fn test_queue_clones_share_the_task() {
        let queue = CleanupQueue::spawn(Duration::from_secs(60));
        let other = queue.clone();
        assert_eq!(other.delay(), Duration::from_secs(60));
        assert!(!queue.sender.is_closed());
    }
}
