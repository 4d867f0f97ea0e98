//! Vector ingestion: the dense vector store and the id <-> index map.

use hashbrown::HashMap;
use ndarray::{Array1, ArrayView1};

use crate::error::{ForestError, Result};

/// How many ingested items between two progress-observer calls.
pub const PROGRESS_INTERVAL: usize = 1000;

/// Owns the dense array of input vectors.
///
/// Internal indices are assigned in insertion order, `0..n-1`. Every stored
/// vector has length exactly `dim`. The store is populated once during
/// ingestion and read-only afterwards.
#[derive(Debug, Clone)]
pub struct VectorStore {
    dim: usize,
    vectors: Vec<Array1<f32>>,
}

impl VectorStore {
    /// Create an empty store for vectors of dimension `dim`.
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(ForestError::InvalidParameter(
                "dim must be > 0".into(),
            ));
        }
        Ok(Self {
            dim,
            vectors: Vec::new(),
        })
    }

    /// Append a vector, returning its internal index.
    pub fn push(&mut self, vector: &[f32]) -> Result<usize> {
        if vector.len() != self.dim {
            return Err(ForestError::DimensionMismatch {
                expected: self.dim,
                got: vector.len(),
            });
        }
        let index = self.vectors.len();
        self.vectors.push(Array1::from_vec(vector.to_vec()));
        Ok(index)
    }

    /// View of the vector at `index`.
    pub fn get(&self, index: usize) -> Option<ArrayView1<'_, f32>> {
        self.vectors.get(index).map(Array1::view)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Bijective mapping between internal index and external identifier.
#[derive(Debug, Clone, Default)]
pub struct IdIndexMap {
    ids: Vec<String>,
    by_id: HashMap<String, usize>,
}

impl IdIndexMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the external id for the next internal index.
    pub fn push(&mut self, id: String) -> Result<usize> {
        if self.by_id.contains_key(&id) {
            return Err(ForestError::DuplicateId(id));
        }
        let index = self.ids.len();
        self.by_id.insert(id.clone(), index);
        self.ids.push(id);
        Ok(index)
    }

    /// External id for an internal index.
    pub fn id_of(&self, index: usize) -> Option<&str> {
        self.ids.get(index).map(String::as_str)
    }

    /// Internal index for an external id.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterate `(internal index, external id)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.ids.iter().enumerate().map(|(i, id)| (i, id.as_str()))
    }

    /// Rebuild the map from unordered `(index, id)` records.
    ///
    /// Fails unless the records form a bijection over a contiguous `0..n`
    /// index range.
    pub(crate) fn from_records(records: Vec<(usize, String)>) -> Result<Self> {
        let n = records.len();
        let mut ids: Vec<Option<String>> = vec![None; n];
        for (index, id) in records {
            if index >= n {
                return Err(ForestError::InvalidParameter(format!(
                    "id record index {index} out of range for {n} records"
                )));
            }
            if ids[index].is_some() {
                return Err(ForestError::InvalidParameter(format!(
                    "id record index {index} appears twice"
                )));
            }
            ids[index] = Some(id);
        }
        let mut map = Self::new();
        for id in ids {
            // No index can be unmapped here: n slots, n unique indices.
            let id = id.ok_or_else(|| {
                ForestError::InvalidParameter("id record stream has a hole".into())
            })?;
            map.push(id)?;
        }
        Ok(map)
    }
}

/// Ingest `(external_id, vector)` pairs into a store and id map.
///
/// Internal indices are assigned in iteration order.
pub fn ingest<I>(dim: usize, items: I) -> Result<(VectorStore, IdIndexMap)>
where
    I: IntoIterator<Item = (String, Vec<f32>)>,
{
    ingest_with_progress(dim, items, |_| {})
}

/// Like [`ingest`], calling `observer` with the running item count every
/// [`PROGRESS_INTERVAL`] items and once more at the end.
pub fn ingest_with_progress<I, F>(
    dim: usize,
    items: I,
    mut observer: F,
) -> Result<(VectorStore, IdIndexMap)>
where
    I: IntoIterator<Item = (String, Vec<f32>)>,
    F: FnMut(usize),
{
    let mut store = VectorStore::new(dim)?;
    let mut map = IdIndexMap::new();

    for (id, vector) in items {
        if map.index_of(&id).is_some() {
            return Err(ForestError::DuplicateId(id));
        }
        store.push(&vector)?;
        map.push(id)?;
        if store.len() % PROGRESS_INTERVAL == 0 {
            observer(store.len());
        }
    }

    if store.len() % PROGRESS_INTERVAL != 0 {
        observer(store.len());
    }

    Ok((store, map))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_assigns_contiguous_indices() {
        let mut store = VectorStore::new(3).unwrap();
        assert_eq!(store.push(&[1.0, 0.0, 0.0]).unwrap(), 0);
        assert_eq!(store.push(&[0.0, 1.0, 0.0]).unwrap(), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).unwrap()[1], 1.0);
        assert!(store.get(2).is_none());
    }

    #[test]
    fn test_dimension_mismatch_leaves_store_unchanged() {
        let mut store = VectorStore::new(4).unwrap();
        store.push(&[0.0; 4]).unwrap();
        let err = store.push(&[0.0; 3]).unwrap_err();
        assert!(
            matches!(err, ForestError::DimensionMismatch { expected: 4, got: 3 }),
            "expected DimensionMismatch, got: {err:?}"
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_zero_dim_rejected() {
        let err = VectorStore::new(0).unwrap_err();
        assert!(matches!(err, ForestError::InvalidParameter(_)));
    }

    #[test]
    fn test_id_map_bijection() {
        let mut map = IdIndexMap::new();
        map.push("a".into()).unwrap();
        map.push("b".into()).unwrap();
        assert_eq!(map.id_of(0), Some("a"));
        assert_eq!(map.index_of("b"), Some(1));
        assert_eq!(map.index_of("c"), None);

        let err = map.push("a".into()).unwrap_err();
        assert!(matches!(err, ForestError::DuplicateId(id) if id == "a"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_ingest_builds_matching_store_and_map() {
        let items = (0..5).map(|i| (format!("id-{i}"), vec![i as f32, 1.0]));
        let (store, map) = ingest(2, items).unwrap();
        assert_eq!(store.len(), 5);
        assert_eq!(map.len(), 5);
        assert_eq!(map.index_of("id-3"), Some(3));
        assert_eq!(store.get(3).unwrap()[0], 3.0);
    }

    #[test]
    fn test_ingest_progress_intervals() {
        let items = (0..2500).map(|i| (format!("id-{i}"), vec![i as f32]));
        let mut reports = Vec::new();
        let _ = ingest_with_progress(1, items, |n| reports.push(n)).unwrap();
        assert_eq!(reports, vec![1000, 2000, 2500]);
    }

    #[test]
    fn test_ingest_duplicate_id_fails() {
        let items = vec![
            ("x".to_string(), vec![1.0]),
            ("x".to_string(), vec![2.0]),
        ];
        let err = ingest(1, items).unwrap_err();
        assert!(matches!(err, ForestError::DuplicateId(_)));
    }

    #[test]
    fn test_from_records_order_insensitive() {
        let records = vec![
            (2, "c".to_string()),
            (0, "a".to_string()),
            (1, "b".to_string()),
        ];
        let map = IdIndexMap::from_records(records).unwrap();
        assert_eq!(map.id_of(0), Some("a"));
        assert_eq!(map.id_of(2), Some("c"));
    }

    #[test]
    fn test_from_records_rejects_holes() {
        let records = vec![(0, "a".to_string()), (2, "c".to_string())];
        assert!(IdIndexMap::from_records(records).is_err());
    }
}
