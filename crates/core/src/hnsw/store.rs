//! Point store: owns vector payloads and the id mapping.
//!
//! Vectors live in one contiguous f32 arena strided by dimension; external
//! `u64` ids map to dense internal `u32` ids assigned in insertion order.
//! Growth is append-only — points are never removed or mutated.

use crate::error::{IndexError, Result};
use crate::hnsw::distance::DistanceMetric;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Append-only vector storage with external-id lookup and optional tags.
#[derive(Debug, Serialize, Deserialize)]
pub struct PointStore {
    dimension: usize,
    /// Contiguous arena: point `i` occupies `data[i*dimension..(i+1)*dimension]`.
    data: Vec<f32>,
    /// Internal id → external id.
    ids: Vec<u64>,
    /// External id → internal id.
    id_to_internal: HashMap<u64, u32>,
    /// Opaque user tag per point, parallel to `ids`.
    tags: Vec<Option<String>>,
}

impl PointStore {
    /// Empty store for vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
            ids: Vec::new(),
            id_to_internal: HashMap::new(),
            tags: Vec::new(),
        }
    }

    /// Vector dimension every point must match.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored points.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when no point has been inserted.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// True when the external id is present.
    pub fn contains(&self, id: u64) -> bool {
        self.id_to_internal.contains_key(&id)
    }

    /// Register a new point and return its internal id.
    ///
    /// Fails with [`IndexError::DuplicateId`] or
    /// [`IndexError::DimensionMismatch`] without mutating anything.
    pub fn insert(&mut self, id: u64, vector: Vec<f32>, tag: Option<String>) -> Result<u32> {
        if self.id_to_internal.contains_key(&id) {
            return Err(IndexError::DuplicateId { id });
        }
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                found: vector.len(),
            });
        }
        let internal = self.ids.len() as u32;
        self.data.extend_from_slice(&vector);
        self.ids.push(id);
        self.id_to_internal.insert(id, internal);
        self.tags.push(tag);
        Ok(internal)
    }

    /// Vector slice for an internal id. O(1) slice into the arena.
    #[inline]
    pub fn vector(&self, internal: u32) -> &[f32] {
        let start = internal as usize * self.dimension;
        &self.data[start..start + self.dimension]
    }

    /// External id for an internal id.
    #[inline]
    pub fn external_id(&self, internal: u32) -> u64 {
        self.ids[internal as usize]
    }

    /// Internal id for an external id, if present.
    pub fn internal_id(&self, id: u64) -> Option<u32> {
        self.id_to_internal.get(&id).copied()
    }

    /// Stored vector for an external id.
    ///
    /// Fails with [`IndexError::UnknownId`] for ids never inserted.
    pub fn get(&self, id: u64) -> Result<&[f32]> {
        let internal = self
            .internal_id(id)
            .ok_or(IndexError::UnknownId { id })?;
        Ok(self.vector(internal))
    }

    /// Tag for an internal id, if one was supplied at insert.
    pub fn tag(&self, internal: u32) -> Option<&str> {
        self.tags[internal as usize].as_deref()
    }

    /// Distance between two stored points under the given metric.
    #[inline]
    pub fn distance(&self, metric: DistanceMetric, a: u32, b: u32) -> f32 {
        metric.distance(self.vector(a), self.vector(b))
    }

    /// Distance from a stored point to an arbitrary query vector.
    #[inline]
    pub fn distance_to(&self, metric: DistanceMetric, internal: u32, query: &[f32]) -> f32 {
        metric.distance(self.vector(internal), query)
    }

    /// Check arena and mapping consistency. Used after snapshot load.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let n = self.ids.len();
        if self.data.len() != n * self.dimension {
            return Err(format!(
                "vector arena length {} != count({}) * dimension({})",
                self.data.len(),
                n,
                self.dimension
            ));
        }
        if self.tags.len() != n {
            return Err(format!("tags length {} != count {}", self.tags.len(), n));
        }
        if self.id_to_internal.len() != n {
            return Err(format!(
                "id map size {} != count {}",
                self.id_to_internal.len(),
                n
            ));
        }
        for (&id, &internal) in &self.id_to_internal {
            let i = internal as usize;
            if i >= n {
                return Err(format!("id {id} maps to out-of-bounds internal {internal}"));
            }
            if self.ids[i] != id {
                return Err(format!(
                    "asymmetric id mapping: {id} -> {internal} -> {}",
                    self.ids[i]
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> PointStore {
        PointStore::new(3)
    }

    #[test]
    fn test_insert_assigns_dense_internal_ids() {
        let mut s = store();
        assert_eq!(s.insert(100, vec![1.0, 0.0, 0.0], None).unwrap(), 0);
        assert_eq!(s.insert(7, vec![0.0, 1.0, 0.0], None).unwrap(), 1);
        assert_eq!(s.len(), 2);
        assert_eq!(s.external_id(0), 100);
        assert_eq!(s.external_id(1), 7);
        assert_eq!(s.internal_id(7), Some(1));
    }

    #[test]
    fn test_duplicate_id_rejected_without_mutation() {
        let mut s = store();
        s.insert(1, vec![1.0, 2.0, 3.0], None).unwrap();
        let err = s.insert(1, vec![4.0, 5.0, 6.0], None).unwrap_err();
        assert!(matches!(err, IndexError::DuplicateId { id: 1 }));
        assert_eq!(s.len(), 1);
        assert_eq!(s.get(1).unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut s = store();
        let err = s.insert(1, vec![1.0, 2.0], None).unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 3,
                found: 2
            }
        ));
        assert!(s.is_empty());
    }

    #[test]
    fn test_get_unknown_id() {
        let s = store();
        assert!(matches!(
            s.get(9).unwrap_err(),
            IndexError::UnknownId { id: 9 }
        ));
    }

    #[test]
    fn test_tags_round_trip() {
        let mut s = store();
        let a = s
            .insert(1, vec![0.0; 3], Some("alpha".to_string()))
            .unwrap();
        let b = s.insert(2, vec![0.0; 3], None).unwrap();
        assert_eq!(s.tag(a), Some("alpha"));
        assert_eq!(s.tag(b), None);
    }

    #[test]
    fn test_distance_helpers_use_metric() {
        let mut s = store();
        let a = s.insert(1, vec![0.0, 0.0, 0.0], None).unwrap();
        let b = s.insert(2, vec![3.0, 4.0, 0.0], None).unwrap();
        let d = s.distance(DistanceMetric::Euclidean, a, b);
        assert!((d - 25.0).abs() < 1e-6);
        let dq = s.distance_to(DistanceMetric::Euclidean, a, &[1.0, 0.0, 0.0]);
        assert!((dq - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_validate_accepts_consistent_store() {
        let mut s = store();
        s.insert(5, vec![1.0; 3], None).unwrap();
        s.insert(6, vec![2.0; 3], Some("t".into())).unwrap();
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_validate_catches_truncated_arena() {
        let mut s = store();
        s.insert(5, vec![1.0; 3], None).unwrap();
        s.data.pop();
        assert!(s.validate().is_err());
    }
}
