use std::path::{Path, PathBuf};

pub const DEFAULT_INDEX_DIR: &str = "./faiss_index1";
pub const DEFAULT_COLLECTION: &str = "document_embeddings";

/// On-disk layout of one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    dir: PathBuf,
    collection: String,
}

impl StorePaths {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, collection: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            collection: collection.into(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// `{collection}.index`
    #[must_use]
    pub fn index_file(&self) -> PathBuf {
        self.dir.join(format!("{}.index", self.collection))
    }

    /// `{collection}_metadata.json`
    #[must_use]
    pub fn metadata_file(&self) -> PathBuf {
        self.dir.join(format!("{}_metadata.json", self.collection))
    }

    /// `{collection}.lock`, held by writers for a whole ingestion run
    #[must_use]
    pub fn lock_file(&self) -> PathBuf {
        self.dir.join(format!("{}.lock", self.collection))
    }
}

/// Write `bytes` to `path` via a sibling temp file and rename
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}
