use crate::error::{Result, VectorStoreError};
use ndarray::ArrayView2;
use std::cmp::Ordering;
use std::path::Path;

const MAGIC: &[u8; 4] = b"CKFI";
const VERSION: u16 = 1;
const HEADER_LEN: usize = 4 + 2 + 4 + 8;

/// Exact (brute-force) L2 index over a contiguous f32 slab.
///
/// Append-only: a slot, once written, keeps its vector for the lifetime of the
/// index. Deletion is the caller's business.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors (including ones the owner considers deleted)
    #[must_use]
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check every vector's dimension without touching the index
    pub fn check_dimensions<V: AsRef<[f32]>>(&self, vectors: &[V]) -> Result<()> {
        for vector in vectors {
            let actual = vector.as_ref().len();
            if actual != self.dimension {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: self.dimension,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Append a batch, returning the slot of its first vector.
    ///
    /// The whole batch is validated first; on error nothing is appended.
    pub fn append<V: AsRef<[f32]>>(&mut self, vectors: &[V]) -> Result<usize> {
        self.check_dimensions(vectors)?;
        let start = self.len();
        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector.as_ref());
        }
        Ok(start)
    }

    /// Vector stored at `slot`
    #[must_use]
    pub fn vector(&self, slot: usize) -> Option<&[f32]> {
        let start = slot.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// `k` nearest slots by squared L2 distance, ascending. Ties keep slot order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let matrix = ArrayView2::from_shape((self.len(), self.dimension), &self.data)
            .map_err(|err| VectorStoreError::corrupt(format!("index shape: {err}")))?;
        let query = ndarray::ArrayView1::from(query);

        let mut scored: Vec<(usize, f32)> = matrix
            .rows()
            .into_iter()
            .enumerate()
            .map(|(slot, row)| {
                let diff = &row - &query;
                (slot, diff.dot(&diff))
            })
            .collect();

        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }

    /// Serialize as `CKFI | version u16 | dimension u32 | count u64 | f32 LE slab`
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let dimension = u32::try_from(self.dimension).map_err(|_| {
            VectorStoreError::corrupt(format!(
                "dimension {} does not fit the index header",
                self.dimension
            ))
        })?;
        let count = u64::try_from(self.len()).map_err(|_| {
            VectorStoreError::corrupt(format!(
                "vector count {} does not fit the index header",
                self.len()
            ))
        })?;

        let mut out = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&dimension.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        for value in &self.data {
            out.extend_from_slice(&value.to_le_bytes());
        }
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(VectorStoreError::corrupt("index file truncated"));
        }
        if &bytes[0..4] != MAGIC {
            return Err(VectorStoreError::corrupt("bad index magic"));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(VectorStoreError::corrupt(format!(
                "unsupported index version {version}"
            )));
        }
        let dimension = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
        let dimension = usize::try_from(dimension)
            .map_err(|_| VectorStoreError::corrupt("index dimension overflow"))?;
        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&bytes[10..18]);
        let count = usize::try_from(u64::from_le_bytes(count_bytes))
            .map_err(|_| VectorStoreError::corrupt("index count overflow"))?;

        let body = &bytes[HEADER_LEN..];
        let expected = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| VectorStoreError::corrupt("index header overflow"))?;
        if body.len() != expected {
            return Err(VectorStoreError::corrupt(format!(
                "index body is {} bytes, header promises {expected}",
                body.len()
            )));
        }

        let data = body
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Ok(Self { dimension, data })
    }

    /// Read an index file. `Ok(None)` when the file does not exist.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        match std::fs::read(path) {
            Ok(bytes) => Self::from_bytes(&bytes).map(Some),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn append_returns_starting_slot() {
        let mut index = FlatIndex::new(2);
        assert_eq!(index.append(&[vec![0.0, 0.0], vec![1.0, 0.0]]).unwrap(), 0);
        assert_eq!(index.append(&[vec![0.0, 1.0]]).unwrap(), 2);
        assert_eq!(index.len(), 3);
        assert_eq!(index.vector(2), Some(&[0.0, 1.0][..]));
        assert_eq!(index.vector(3), None);
    }

    #[test]
    fn wrong_dimension_rejects_whole_batch() {
        let mut index = FlatIndex::new(3);
        let err = index
            .append(&[vec![1.0, 2.0, 3.0], vec![1.0, 2.0]])
            .unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn search_orders_by_distance() {
        let mut index = FlatIndex::new(2);
        index
            .append(&[vec![10.0, 0.0], vec![1.0, 0.0], vec![0.0, 3.0]])
            .unwrap();

        let hits = index.search(&[0.0, 0.0], 5).unwrap();
        assert_eq!(hits, vec![(1, 1.0), (2, 9.0), (0, 100.0)]);

        let top = index.search(&[0.0, 0.0], 1).unwrap();
        assert_eq!(top, vec![(1, 1.0)]);
    }

    #[test]
    fn search_on_empty_index_is_empty() {
        let index = FlatIndex::new(4);
        assert!(index.search(&[0.0; 4], 3).unwrap().is_empty());
        assert!(index.search(&[0.0; 3], 3).is_err());
    }

    #[test]
    fn bytes_round_trip_and_corruption() {
        let mut index = FlatIndex::new(3);
        index.append(&[vec![0.5, -1.0, 2.0]]).unwrap();
        let bytes = index.to_bytes().unwrap();
        assert_eq!(FlatIndex::from_bytes(&bytes).unwrap(), index);

        assert!(FlatIndex::from_bytes(b"garbage").is_err());
        assert_eq!(&bytes[6..10], &3u32.to_le_bytes());
        assert_eq!(&bytes[10..18], &1u64.to_le_bytes());
        assert!(FlatIndex::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }
}
