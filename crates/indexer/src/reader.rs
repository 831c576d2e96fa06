use crate::error::{IndexerError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// File format → plain text
#[async_trait]
pub trait DocumentReader: Send + Sync {
    /// Lowercase extensions (no dot) this reader handles
    fn extensions(&self) -> &[&str];

    async fn read(&self, path: &Path) -> Result<String>;
}

/// UTF-8 text and markdown. Invalid UTF-8 is decoded lossily.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextReader;

#[async_trait]
impl DocumentReader for PlainTextReader {
    fn extensions(&self) -> &[&str] {
        &["txt", "md", "markdown"]
    }

    async fn read(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| IndexerError::unreadable(path, err.to_string()))?;
        match String::from_utf8(bytes) {
            Ok(text) => Ok(text),
            Err(err) => {
                log::warn!("{} is not valid UTF-8, decoding lossily", path.display());
                Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
            }
        }
    }
}

/// Readers looked up by file extension; later registrations win
#[derive(Clone)]
pub struct ReaderRegistry {
    readers: Vec<Arc<dyn DocumentReader>>,
}

impl Default for ReaderRegistry {
    fn default() -> Self {
        Self {
            readers: vec![Arc::new(PlainTextReader)],
        }
    }
}

impl ReaderRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            readers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_reader(mut self, reader: Arc<dyn DocumentReader>) -> Self {
        self.readers.push(reader);
        self
    }

    #[must_use]
    pub fn reader_for(&self, path: &Path) -> Option<&Arc<dyn DocumentReader>> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        self.readers
            .iter()
            .rev()
            .find(|reader| reader.extensions().iter().any(|candidate| *candidate == ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct UpperReader;

    #[async_trait]
    impl DocumentReader for UpperReader {
        fn extensions(&self) -> &[&str] {
            &["md"]
        }

        async fn read(&self, path: &Path) -> Result<String> {
            Ok(tokio::fs::read_to_string(path).await?.to_uppercase())
        }
    }

    #[tokio::test]
    async fn plain_text_reads_utf8_and_lossy() {
        let tmp = TempDir::new().unwrap();
        let good = tmp.path().join("good.txt");
        let bad = tmp.path().join("bad.txt");
        std::fs::write(&good, "校园 mail").unwrap();
        std::fs::write(&bad, [b'o', b'k', 0xff]).unwrap();

        assert_eq!(PlainTextReader.read(&good).await.unwrap(), "校园 mail");
        assert_eq!(PlainTextReader.read(&bad).await.unwrap(), "ok\u{fffd}");
        assert!(matches!(
            PlainTextReader.read(&tmp.path().join("missing.txt")).await,
            Err(IndexerError::Unreadable { .. })
        ));
    }

    #[test]
    fn registry_lookup_by_extension() {
        let registry = ReaderRegistry::default();
        assert!(registry.reader_for(Path::new("a/guide.MD")).is_some());
        assert!(registry.reader_for(Path::new("report.pdf")).is_none());
        assert!(registry.reader_for(Path::new("README")).is_none());
        assert!(ReaderRegistry::empty()
            .reader_for(Path::new("a.txt"))
            .is_none());
    }

    #[tokio::test]
    async fn later_registrations_override() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.md");
        std::fs::write(&path, "hello").unwrap();

        let registry = ReaderRegistry::default().with_reader(Arc::new(UpperReader));
        let reader = registry.reader_for(&path).unwrap();
        assert_eq!(reader.read(&path).await.unwrap(), "HELLO");
    }
}
