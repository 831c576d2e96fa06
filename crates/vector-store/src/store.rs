use crate::error::{Result, VectorStoreError};
use crate::flat_index::FlatIndex;
use crate::identity::IdentityMap;
use crate::metadata::MetadataStore;
use crate::paths::{write_atomic, StorePaths};
use crate::types::{ChunkRecord, Metadata, SearchHit, StoreStats};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A store shared between pipelines: many readers, one writer
pub type SharedStore = Arc<RwLock<VectorStore>>;

/// What `load` found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// No persisted files; the store is empty
    Missing,
    /// Files were unreadable; the store was reset to empty
    Recovered(String),
}

/// JSON sidecar next to the binary index
#[derive(Debug, Default, Serialize, Deserialize)]
struct Sidecar {
    #[serde(default)]
    metadata: BTreeMap<String, ChunkRecord>,
    #[serde(default)]
    id_to_idx: BTreeMap<String, usize>,
    #[serde(default)]
    next_idx: usize,
}

/// Vector index, identity map and metadata kept in lockstep and persisted as
/// `{collection}.index` + `{collection}_metadata.json`.
///
/// Deletion is soft: the vector stays at its slot, only the id and record go.
/// `clear` is the only way to reclaim space.
#[derive(Debug)]
pub struct VectorStore {
    index: FlatIndex,
    identities: IdentityMap,
    records: MetadataStore,
    paths: StorePaths,
}

impl VectorStore {
    /// Empty in-memory store; nothing touches disk until the first mutation
    #[must_use]
    pub fn new(paths: StorePaths, dimension: usize) -> Self {
        Self {
            index: FlatIndex::new(dimension),
            identities: IdentityMap::new(),
            records: MetadataStore::new(),
            paths,
        }
    }

    /// Open a collection, loading whatever is on disk
    pub fn open(paths: StorePaths, dimension: usize) -> Result<Self> {
        let mut store = Self::new(paths, dimension);
        match store.load()? {
            LoadOutcome::Loaded => log::info!(
                "Loaded collection '{}' ({} live chunks)",
                store.paths.collection(),
                store.count()
            ),
            LoadOutcome::Missing => log::info!(
                "No collection '{}' in {}, starting empty",
                store.paths.collection(),
                store.paths.dir().display()
            ),
            LoadOutcome::Recovered(_) => {}
        }
        Ok(store)
    }

    #[must_use]
    pub fn into_shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    #[must_use]
    pub const fn paths(&self) -> &StorePaths {
        &self.paths
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.index.dimension()
    }

    /// Add a batch of chunks and persist.
    ///
    /// Lengths, dimensions and id uniqueness are checked for the whole batch
    /// before anything is mutated.
    pub fn add<S, E>(
        &mut self,
        documents: &[S],
        embeddings: &[E],
        ids: &[S],
        metadatas: Option<Vec<Metadata>>,
    ) -> Result<()>
    where
        S: AsRef<str>,
        E: AsRef<[f32]>,
    {
        let expected = documents.len();
        check_len("embeddings", expected, embeddings.len())?;
        check_len("ids", expected, ids.len())?;
        if let Some(metadatas) = &metadatas {
            check_len("metadatas", expected, metadatas.len())?;
        }
        if expected == 0 {
            return Ok(());
        }
        self.index.check_dimensions(embeddings)?;

        let mut seen = HashSet::with_capacity(expected);
        for (offset, id) in ids.iter().enumerate() {
            let id = id.as_ref();
            if let Ok(slot) = self.identities.resolve(id) {
                return Err(VectorStoreError::DuplicateId {
                    id: id.to_string(),
                    slot,
                });
            }
            if !seen.insert(id) {
                return Err(VectorStoreError::DuplicateId {
                    id: id.to_string(),
                    slot: self.identities.next_slot() + offset,
                });
            }
        }

        let start = self.index.append(embeddings)?;
        let mut metadatas = metadatas.map(Vec::into_iter);
        for (offset, (id, document)) in ids.iter().zip(documents).enumerate() {
            let metadata = metadatas
                .as_mut()
                .and_then(Iterator::next)
                .unwrap_or_default();
            self.identities.assign(id.as_ref(), start + offset)?;
            self.records.put(id.as_ref(), document.as_ref(), metadata);
        }

        log::debug!(
            "Added {expected} chunks at slots {start}..{} ({} live)",
            start + expected,
            self.count()
        );
        self.save()
    }

    /// Up to `top_k` live hits, nearest first
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        if top_k == 0 || self.records.is_empty() {
            return Ok(Vec::new());
        }

        let dead = self.index.len().saturating_sub(self.identities.len());
        let fetch = (top_k + dead).min(self.index.len());
        let neighbors = self.index.search(query, fetch)?;

        let hits = neighbors
            .into_iter()
            .filter_map(|(slot, distance)| {
                let id = self.identities.resolve_slot(slot).ok()?;
                let record = self.records.get(id).ok()?;
                Some(SearchHit::new(record.clone(), distance))
            })
            .take(top_k)
            .collect();
        Ok(hits)
    }

    pub fn get(&self, id: &str) -> Result<&ChunkRecord> {
        self.records.get(id)
    }

    /// Stored vector for a live id
    pub fn vector(&self, id: &str) -> Result<&[f32]> {
        let slot = self.identities.resolve(id)?;
        self.index
            .vector(slot)
            .ok_or_else(|| VectorStoreError::corrupt(format!("slot {slot} beyond index")))
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.identities.contains(id)
    }

    /// Soft-delete; unknown ids are skipped. Returns how many were removed.
    pub fn delete<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<usize> {
        let mut removed = 0;
        for id in ids {
            let id = id.as_ref();
            if self.identities.unassign(id).is_some() {
                self.records.remove(id);
                removed += 1;
            }
        }
        if removed > 0 {
            log::debug!("Soft-deleted {removed} chunks");
            self.save()?;
        }
        Ok(removed)
    }

    /// Soft-delete every id starting with `prefix`
    pub fn remove_by_id_prefix(&mut self, prefix: &str) -> Result<usize> {
        let ids: Vec<String> = self
            .records
            .ids()
            .filter(|id| id.starts_with(prefix))
            .map(ToString::to_string)
            .collect();
        let removed = self.delete(&ids)?;
        if removed > 0 {
            log::info!("Removed {removed} chunks with id prefix '{prefix}'");
        }
        Ok(removed)
    }

    /// Live chunks (not physical index size)
    #[must_use]
    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.ids()
    }

    /// Physical vectors, deleted ones included
    #[must_use]
    pub fn index_size(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub const fn next_slot(&self) -> usize {
        self.identities.next_slot()
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let (text, image) = self.records.origin_counts();
        StoreStats {
            live: self.count(),
            text,
            image,
            index_size: self.index_size(),
            next_slot: self.next_slot(),
        }
    }

    /// Reset to empty and persist
    pub fn clear(&mut self) -> Result<()> {
        self.reset();
        log::info!("Cleared collection '{}'", self.paths.collection());
        self.save()
    }

    /// Persist the index, then the sidecar
    pub fn save(&self) -> Result<()> {
        write_atomic(&self.paths.index_file(), &self.index.to_bytes()?)?;

        let sidecar = Sidecar {
            metadata: self.records.as_map().clone(),
            id_to_idx: self.identities.id_to_slot().clone(),
            next_idx: self.identities.next_slot(),
        };
        let json = serde_json::to_vec_pretty(&sidecar)?;
        write_atomic(&self.paths.metadata_file(), &json)?;
        Ok(())
    }

    /// Replace in-memory state with what is on disk.
    ///
    /// Missing files give an empty store. Unreadable or inconsistent files are
    /// logged and also give an empty store; other I/O errors propagate.
    pub fn load(&mut self) -> Result<LoadOutcome> {
        match self.read_persisted() {
            Ok(Some((index, identities, records))) => {
                self.index = index;
                self.identities = identities;
                self.records = records;
                Ok(LoadOutcome::Loaded)
            }
            Ok(None) => {
                self.reset();
                Ok(LoadOutcome::Missing)
            }
            Err(
                err @ (VectorStoreError::CorruptIndex(_)
                | VectorStoreError::SerializationError(_)),
            ) => {
                log::warn!(
                    "Collection '{}' is unreadable, starting empty: {err}",
                    self.paths.collection()
                );
                self.reset();
                Ok(LoadOutcome::Recovered(err.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    fn reset(&mut self) {
        self.index = FlatIndex::new(self.index.dimension());
        self.identities = IdentityMap::new();
        self.records = MetadataStore::new();
    }

    fn read_persisted(&self) -> Result<Option<(FlatIndex, IdentityMap, MetadataStore)>> {
        let index = FlatIndex::read(&self.paths.index_file())?;
        let sidecar = match std::fs::read(self.paths.metadata_file()) {
            Ok(bytes) => Some(serde_json::from_slice::<Sidecar>(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };

        let (index, sidecar) = match (index, sidecar) {
            (None, None) => return Ok(None),
            (Some(index), Some(sidecar)) => (index, sidecar),
            (Some(_), None) => return Err(VectorStoreError::corrupt("metadata sidecar missing")),
            (None, Some(_)) => return Err(VectorStoreError::corrupt("index file missing")),
        };

        if index.dimension() != self.index.dimension() {
            return Err(VectorStoreError::corrupt(format!(
                "index dimension {} does not match configured {}",
                index.dimension(),
                self.index.dimension()
            )));
        }

        let mut identities = IdentityMap::from_parts(sidecar.id_to_idx, sidecar.next_idx)?;
        if identities.next_slot() > index.len() {
            return Err(VectorStoreError::corrupt(format!(
                "next slot {} beyond index size {}",
                identities.next_slot(),
                index.len()
            )));
        }
        identities.reserve_through(index.len());

        let mut records = MetadataStore::from_records(sidecar.metadata);
        let orphan_records: Vec<String> = records
            .ids()
            .filter(|id| !identities.contains(id))
            .map(ToString::to_string)
            .collect();
        let orphan_ids: Vec<String> = identities
            .id_to_slot()
            .keys()
            .filter(|id| records.get(id).is_err())
            .cloned()
            .collect();
        if !orphan_records.is_empty() || !orphan_ids.is_empty() {
            log::warn!(
                "Dropping {} records without a slot and {} slots without a record",
                orphan_records.len(),
                orphan_ids.len()
            );
        }
        for id in &orphan_records {
            records.remove(id);
        }
        for id in &orphan_ids {
            identities.unassign(id);
        }

        Ok(Some((index, identities, records)))
    }
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(VectorStoreError::LengthMismatch {
            field,
            expected,
            actual,
        })
    }
}
