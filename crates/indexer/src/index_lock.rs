use crate::{IndexerError, Result};
use fs2::FileExt;
use std::path::PathBuf;
use std::time::Instant;

/// Exclusive advisory lock on `{collection}.lock`, released on drop
pub struct IndexWriteLock {
    file: std::fs::File,
}

impl Drop for IndexWriteLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Block (off the runtime) until no other process is writing the collection
pub async fn acquire_index_write_lock(path: PathBuf) -> Result<IndexWriteLock> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    tokio::task::spawn_blocking(move || -> Result<IndexWriteLock> {
        use std::fs::OpenOptions;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| {
                IndexerError::Other(format!("open index lock {}: {err}", path.display()))
            })?;

        let start = Instant::now();
        file.lock_exclusive().map_err(|err| {
            IndexerError::Other(format!("acquire index lock {}: {err}", path.display()))
        })?;
        log::debug!(
            "Acquired index lock {} after {} ms",
            path.display(),
            start.elapsed().as_millis()
        );

        Ok(IndexWriteLock { file })
    })
    .await
    .map_err(|err| IndexerError::Other(format!("join index lock task: {err}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn lock_is_exclusive_until_dropped() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index").join("docs.lock");

        let guard = acquire_index_write_lock(path.clone()).await.unwrap();
        let probe = std::fs::File::open(&path).unwrap();
        assert!(probe.try_lock_exclusive().is_err());

        drop(guard);
        assert!(probe.try_lock_exclusive().is_ok());
        probe.unlock().unwrap();
    }
}
