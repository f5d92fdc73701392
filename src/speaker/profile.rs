//! Dual-bucket speaker profile: a core of high-confidence exemplars plus a
//! boundary of weaker admissions that broaden the decision region without
//! shifting the centroid.
//!
//! Grounded on the original `SpeakerProfile`/`SpeakerData` pair
//! (`addEmbedding`, `getAllDistances`, `getBoundaryEmbeddings`,
//! `getCentroid`, `getCoreEmbeddings`, `getStdDev`,
//! `maxSimilarityToBoundary`, `maxSimilarityToCore`, `Companion.fromData`)
//! and on KagiNote's `SpeakerEmbedding::similarity` banding for the
//! threshold values carried in [`crate::config::SpeakerConfig`].

use crate::config::SpeakerConfig;
use crate::error::PipelineError;
use crate::vector_ops::{centroid as compute_centroid, cosine_distance, cosine_similarity, normalize};

/// A single enrolled or provisional speaker.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerProfile {
    pub name: String,
    pub core: Vec<Vec<f32>>,
    pub boundary: Vec<Vec<f32>>,
    pub centroid: Option<Vec<f32>>,
    pub stddev: f32,
    pub all_distances: Vec<f32>,
}

impl SpeakerProfile {
    /// A fresh profile with no embeddings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            core: Vec::new(),
            boundary: Vec::new(),
            centroid: None,
            stddev: 0.0,
            all_distances: Vec::new(),
        }
    }

    /// Reconstruct a profile from its persisted parts, e.g. after
    /// deserialising a library file.
    pub fn from_parts(
        name: String,
        core: Vec<Vec<f32>>,
        boundary: Vec<Vec<f32>>,
        centroid: Option<Vec<f32>>,
        stddev: f32,
        all_distances: Vec<f32>,
    ) -> Self {
        Self {
            name,
            core,
            boundary,
            centroid,
            stddev,
            all_distances,
        }
    }

    pub fn max_similarity_to_core(&self, e: &[f32]) -> f32 {
        max_similarity(&self.core, e)
    }

    pub fn max_similarity_to_boundary(&self, e: &[f32]) -> f32 {
        max_similarity(&self.boundary, e)
    }

    /// Admit `e` (normalised internally) into the core or boundary bucket,
    /// per the diversity-gated admission procedure. Returns a
    /// human-readable tag describing what happened.
    pub fn add_embedding(
        &mut self,
        e: &[f32],
        force_boundary: bool,
        config: &SpeakerConfig,
    ) -> Result<String, PipelineError> {
        let e = normalize(e);

        if self.core.is_empty() && !force_boundary {
            self.centroid = Some(e.clone());
            self.core.push(e.clone());
            self.record_admission_distance(&e)?;
            return Ok("added to core (first exemplar)".to_string());
        }

        let s_core = self.max_similarity_to_core(&e);

        if force_boundary || s_core < config.core_threshold {
            if s_core >= config.boundary_threshold {
                return self.admit_boundary(e, config);
            }
            return Ok("rejected: below boundary threshold".to_string());
        }

        self.admit_core(e, config)
    }

    fn admit_boundary(&mut self, e: Vec<f32>, config: &SpeakerConfig) -> Result<String, PipelineError> {
        if self.boundary.len() < config.max_boundary {
            self.boundary.push(e.clone());
            self.record_admission_distance(&e)?;
            return Ok("added to boundary".to_string());
        }
        self.diversity_replace_boundary(e, config)
    }

    fn admit_core(&mut self, e: Vec<f32>, config: &SpeakerConfig) -> Result<String, PipelineError> {
        if self.core.len() < config.max_core {
            self.core.push(e.clone());
            self.recompute_centroid()?;
            self.record_admission_distance(&e)?;
            return Ok("added to core".to_string());
        }
        self.diversity_replace_core(e, config)
    }

    fn diversity_replace_boundary(&mut self, e: Vec<f32>, config: &SpeakerConfig) -> Result<String, PipelineError> {
        let min_distance = self.min_distance_to(&self.boundary, &e)?;
        if min_distance < config.min_diversity {
            return Ok("rejected: too similar to existing boundary member".to_string());
        }
        let evict = self.most_similar_index(&self.boundary, &e)?;
        self.boundary[evict] = e.clone();
        self.record_admission_distance(&e)?;
        Ok("replaced boundary member (diversity gate)".to_string())
    }

    fn diversity_replace_core(&mut self, e: Vec<f32>, config: &SpeakerConfig) -> Result<String, PipelineError> {
        let min_distance = self.min_distance_to(&self.core, &e)?;
        if min_distance < config.min_diversity {
            return Ok("rejected: too similar to existing core member".to_string());
        }
        let evict = self.most_similar_index(&self.core, &e)?;
        self.core[evict] = e.clone();
        self.recompute_centroid()?;
        self.record_admission_distance(&e)?;
        Ok("replaced core member (diversity gate)".to_string())
    }

    fn min_distance_to(&self, bucket: &[Vec<f32>], e: &[f32]) -> Result<f32, PipelineError> {
        bucket.iter().try_fold(f32::INFINITY, |min, v| {
            Ok(min.min(cosine_distance(v, e)?))
        })
    }

    fn most_similar_index(&self, bucket: &[Vec<f32>], e: &[f32]) -> Result<usize, PipelineError> {
        let mut best_idx = 0;
        let mut best_sim = f32::NEG_INFINITY;
        for (i, v) in bucket.iter().enumerate() {
            let sim = cosine_similarity(v, e)?;
            if sim > best_sim {
                best_sim = sim;
                best_idx = i;
            }
        }
        Ok(best_idx)
    }

    /// Re-examine members against `stddev * factor`; core outliers demote
    /// to boundary (or are evicted if boundary has no room), boundary
    /// outliers are evicted outright. Returns the evicted embeddings, for
    /// the caller to park in the library's Unknown bucket. A no-op
    /// (returns an empty vec) when there's no centroid or no variance yet
    /// to measure against.
    pub fn confirm_outliers(&mut self, factor: f32, max_boundary: usize) -> Result<Vec<Vec<f32>>, PipelineError> {
        let Some(centroid) = self.centroid.clone() else {
            return Ok(Vec::new());
        };
        if self.stddev <= 0.0 {
            return Ok(Vec::new());
        }
        let threshold = self.stddev * factor;
        let mut evicted = Vec::new();

        let mut retained_core = Vec::new();
        for v in std::mem::take(&mut self.core) {
            let d = cosine_distance(&v, &centroid)?;
            if d > threshold {
                if self.boundary.len() < max_boundary {
                    self.boundary.push(v);
                } else {
                    evicted.push(v);
                }
            } else {
                retained_core.push(v);
            }
        }
        self.core = retained_core;

        let mut retained_boundary = Vec::new();
        for v in std::mem::take(&mut self.boundary) {
            let d = cosine_distance(&v, &centroid)?;
            if d > threshold {
                evicted.push(v);
            } else {
                retained_boundary.push(v);
            }
        }
        self.boundary = retained_boundary;

        if self.core.is_empty() {
            self.centroid = None;
            self.all_distances.clear();
            self.stddev = 0.0;
        } else {
            let new_centroid = compute_centroid(&self.core)?;
            let mut distances = Vec::with_capacity(self.core.len() + self.boundary.len());
            for v in self.core.iter().chain(self.boundary.iter()) {
                distances.push(cosine_distance(v, &new_centroid)?);
            }
            self.centroid = Some(new_centroid);
            self.stddev = crate::vector_ops::stddev(&distances);
            self.all_distances = distances;
        }

        Ok(evicted)
    }

    fn recompute_centroid(&mut self) -> Result<(), PipelineError> {
        if self.core.is_empty() {
            self.centroid = None;
        } else {
            self.centroid = Some(compute_centroid(&self.core)?);
        }
        Ok(())
    }

    fn record_admission_distance(&mut self, e: &[f32]) -> Result<(), PipelineError> {
        if let Some(centroid) = self.centroid.clone() {
            let d = cosine_distance(e, &centroid)?;
            self.all_distances.push(d);
        }
        self.stddev = crate::vector_ops::stddev(&self.all_distances);
        Ok(())
    }
}

fn max_similarity(bucket: &[Vec<f32>], e: &[f32]) -> f32 {
    if bucket.is_empty() {
        return -1.0;
    }
    bucket
        .iter()
        .filter_map(|v| cosine_similarity(v, e).ok())
        .fold(f32::NEG_INFINITY, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SpeakerConfig {
        SpeakerConfig {
            core_threshold: 0.75,
            boundary_threshold: 0.55,
            auto_learn_threshold: 0.85,
            conflict_margin: 0.08,
            min_diversity: 0.05,
            max_core: 3,
            max_boundary: 3,
            min_cluster_size: 2,
            outlier_stddev_factor: 3.0,
        }
    }

    #[test]
    fn first_embedding_always_goes_to_core() {
        let mut p = SpeakerProfile::new("Alice");
        let tag = p.add_embedding(&[1.0, 0.0, 0.0], false, &config()).unwrap();
        assert_eq!(p.core.len(), 1);
        assert!(tag.contains("core"));
        assert!(p.centroid.is_some());
    }

    #[test]
    fn max_similarity_to_empty_buckets_is_negative_one() {
        let p = SpeakerProfile::new("Alice");
        assert_eq!(p.max_similarity_to_core(&[1.0, 0.0]), -1.0);
        assert_eq!(p.max_similarity_to_boundary(&[1.0, 0.0]), -1.0);
    }

    #[test]
    fn similar_embedding_extends_core() {
        let mut p = SpeakerProfile::new("Alice");
        p.add_embedding(&[1.0, 0.0, 0.0], false, &config()).unwrap();
        let tag = p.add_embedding(&[0.99, 0.14, 0.0], false, &config()).unwrap();
        assert_eq!(p.core.len(), 2);
        assert!(tag.contains("core"));
    }

    #[test]
    fn dissimilar_but_above_boundary_goes_to_boundary() {
        let mut p = SpeakerProfile::new("Alice");
        p.add_embedding(&[1.0, 0.0, 0.0], false, &config()).unwrap();
        // cos ~ 0.6 with [1,0,0]
        let tag = p.add_embedding(&[0.6, 0.8, 0.0], false, &config()).unwrap();
        assert_eq!(p.boundary.len(), 1);
        assert_eq!(p.core.len(), 1);
        assert!(tag.contains("boundary"));
    }

    #[test]
    fn far_embedding_is_rejected() {
        let mut p = SpeakerProfile::new("Alice");
        p.add_embedding(&[1.0, 0.0, 0.0], false, &config()).unwrap();
        let tag = p.add_embedding(&[0.0, 0.0, 1.0], false, &config()).unwrap();
        assert!(tag.contains("rejected"));
        assert_eq!(p.core.len(), 1);
        assert_eq!(p.boundary.len(), 0);
    }

    #[test]
    fn force_boundary_skips_core_even_when_similar() {
        let mut p = SpeakerProfile::new("Alice");
        p.add_embedding(&[1.0, 0.0, 0.0], false, &config()).unwrap();
        let tag = p.add_embedding(&[1.0, 0.0, 0.0], true, &config()).unwrap();
        assert_eq!(p.core.len(), 1);
        assert_eq!(p.boundary.len(), 1);
        assert!(tag.contains("boundary"));
    }

    #[test]
    fn core_stays_within_capacity_via_diversity_replacement() {
        let cfg = config();
        let mut p = SpeakerProfile::new("Alice");
        p.add_embedding(&[1.0, 0.0, 0.0], false, &cfg).unwrap();
        p.add_embedding(&[0.98, 0.19, 0.0], false, &cfg).unwrap();
        p.add_embedding(&[0.96, 0.27, 0.0], false, &cfg).unwrap();
        assert_eq!(p.core.len(), 3);
        // A fourth close vector must replace rather than grow core past capacity.
        p.add_embedding(&[0.95, 0.31, 0.0], false, &cfg).unwrap();
        assert_eq!(p.core.len(), 3);
    }

    #[test]
    fn all_core_embeddings_remain_unit_norm() {
        let mut p = SpeakerProfile::new("Alice");
        p.add_embedding(&[3.0, 4.0, 0.0], false, &config()).unwrap();
        let norm = crate::vector_ops::l2_norm(&p.core[0]);
        assert!((norm - 1.0).abs() < 1e-4);
    }
}
