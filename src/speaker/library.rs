//! Online voice library: the collection of speaker profiles plus the
//! reserved Unknown bucket, matching/enrollment/auto-learn/clustering and
//! atomic persistence.
//!
//! Grounded on the original `VoiceLibrary`/`LibraryData` pair
//! (`addEmbedding`, `autoLearn`, `enrollSpeaker`, `getSpeakerNames`,
//! `hasSpeaker`, `match`, `save`) and on KagiNote's
//! `ClusteringAlgorithm::Agglomerative` for the unknown-bucket clustering
//! shape.

use std::cmp::Ordering;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::SpeakerConfig;
use crate::error::PipelineError;
use crate::speaker::profile::SpeakerProfile;
use crate::vector_ops::{cosine_distance, normalize};

const RESERVED_UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Medium,
    Low,
    Unknown,
    Conflict,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub name: String,
    pub similarity: f32,
    pub confidence: Confidence,
}

#[derive(Debug, Serialize, Deserialize)]
struct SpeakerRecord {
    name: String,
    core: Vec<Vec<f32>>,
    boundary: Vec<Vec<f32>>,
    centroid: Option<Vec<f32>>,
    #[serde(rename = "stdDev")]
    std_dev: f32,
    #[serde(rename = "allDistances")]
    all_distances: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct LibraryData {
    speakers: Vec<SpeakerRecord>,
}

/// An ordered collection of speaker profiles plus a parking bucket for
/// unmatched embeddings awaiting clustering. Owned exclusively by one
/// live pipeline at a time; not internally synchronised.
pub struct VoiceLibrary {
    speakers: Vec<SpeakerProfile>,
    unknown_bucket: Vec<Vec<f32>>,
    config: SpeakerConfig,
    next_cluster_id: usize,
}

impl VoiceLibrary {
    pub fn new(config: SpeakerConfig) -> Self {
        Self {
            speakers: Vec::new(),
            unknown_bucket: Vec::new(),
            config,
            next_cluster_id: 1,
        }
    }

    pub fn speaker_names(&self) -> Vec<&str> {
        self.speakers.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn has_speaker(&self, name: &str) -> bool {
        self.speakers.iter().any(|p| p.name == name)
    }

    pub fn profile(&self, name: &str) -> Option<&SpeakerProfile> {
        self.speakers.iter().find(|p| p.name == name)
    }

    /// Park an embedding in the Unknown bucket, for later `cluster_unknowns`.
    pub fn park_unknown(&mut self, e: &[f32]) {
        self.unknown_bucket.push(normalize(e));
    }

    /// Create a new profile named `name`, admitting `e` to its core.
    pub fn enroll(&mut self, name: &str, e: &[f32]) -> Result<(), PipelineError> {
        if name.is_empty() || name == RESERVED_UNKNOWN_NAME {
            return Err(PipelineError::InvalidInput {
                kind: format!("invalid speaker name: {name:?}"),
            });
        }
        if self.has_speaker(name) {
            return Err(PipelineError::DuplicateName(name.to_string()));
        }
        let mut profile = SpeakerProfile::new(name);
        profile.add_embedding(e, false, &self.config)?;
        self.speakers.push(profile);
        Ok(())
    }

    /// `(name, similarity, confidence)` per the ranked top-two margin
    /// procedure. Returns `name = "Unknown"` whenever confidence is
    /// `Unknown`.
    pub fn match_embedding(&self, e: &[f32]) -> MatchResult {
        let mut scored: Vec<(String, f32)> = self
            .speakers
            .iter()
            .map(|p| {
                let s = p.max_similarity_to_core(e).max(p.max_similarity_to_boundary(e));
                (p.name.clone(), s)
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let Some((name1, s1)) = scored.first().cloned() else {
            return MatchResult {
                name: RESERVED_UNKNOWN_NAME.to_string(),
                similarity: -1.0,
                confidence: Confidence::Unknown,
            };
        };
        let second = scored.get(1).cloned();

        let confidence = self.tier(s1, second.as_ref().map(|(_, s2)| *s2));
        let name = if confidence == Confidence::Unknown {
            RESERVED_UNKNOWN_NAME.to_string()
        } else {
            name1
        };

        MatchResult {
            name,
            similarity: s1,
            confidence,
        }
    }

    fn tier(&self, s1: f32, s2: Option<f32>) -> Confidence {
        let cfg = &self.config;
        if s1 < cfg.boundary_threshold {
            return Confidence::Unknown;
        }
        match s2 {
            None => {
                if s1 >= cfg.core_threshold {
                    Confidence::High
                } else {
                    Confidence::Low
                }
            }
            Some(s2) => {
                let margin = s1 - s2;
                if s1 >= cfg.core_threshold && margin >= cfg.conflict_margin {
                    Confidence::High
                } else if margin < cfg.conflict_margin && s2 >= cfg.boundary_threshold {
                    Confidence::Conflict
                } else if s1 >= cfg.boundary_threshold && margin >= cfg.conflict_margin {
                    Confidence::Medium
                } else {
                    Confidence::Low
                }
            }
        }
    }

    /// Attempt to enlarge `name`'s profile with `e`, but only when called
    /// right after a `high`-confidence `match_embedding` whose score also
    /// clears `auto_learn_threshold`. Returns whether the embedding was
    /// actually admitted.
    pub fn auto_learn(
        &mut self,
        name: &str,
        e: &[f32],
        match_confidence: Confidence,
        score: f32,
    ) -> Result<bool, PipelineError> {
        if match_confidence != Confidence::High || score < self.config.auto_learn_threshold {
            return Ok(false);
        }
        let Some(profile) = self.speakers.iter_mut().find(|p| p.name == name) else {
            return Ok(false);
        };
        let tag = profile.add_embedding(e, false, &self.config)?;
        Ok(tag.starts_with("added") || tag.starts_with("replaced"))
    }

    /// Agglomerative clustering (average linkage, cosine similarity) over
    /// the Unknown bucket. Clusters reaching `min_cluster_size` become
    /// provisional profiles; smaller groups remain parked. Returns the
    /// names of newly minted profiles.
    pub fn cluster_unknowns(&mut self) -> Result<Vec<String>, PipelineError> {
        let threshold = self.config.core_threshold;
        let mut clusters: Vec<Vec<Vec<f32>>> = self.unknown_bucket.drain(..).map(|v| vec![v]).collect();

        loop {
            let mut best: Option<(usize, usize, f32)> = None;
            for i in 0..clusters.len() {
                for j in (i + 1)..clusters.len() {
                    let sim = average_linkage_similarity(&clusters[i], &clusters[j])?;
                    if sim >= threshold && best.map_or(true, |(_, _, b)| sim > b) {
                        best = Some((i, j, sim));
                    }
                }
            }
            match best {
                Some((i, j, _)) => {
                    let merged = clusters.remove(j);
                    clusters[i].extend(merged);
                }
                None => break,
            }
        }

        let mut new_names = Vec::new();
        let mut leftovers = Vec::new();
        for cluster in clusters {
            if cluster.len() >= self.config.min_cluster_size {
                let name = format!("Cluster-{}", self.next_cluster_id);
                self.next_cluster_id += 1;
                let mut profile = SpeakerProfile::new(&name);
                for e in &cluster {
                    profile.add_embedding(e, false, &self.config)?;
                }
                self.speakers.push(profile);
                new_names.push(name);
            } else {
                leftovers.extend(cluster);
            }
        }
        self.unknown_bucket = leftovers;
        Ok(new_names)
    }

    /// Re-examine every confirmed profile's members against
    /// `centroid.stddev * outlier_stddev_factor`; members beyond it are
    /// demoted core-to-boundary, or evicted to the Unknown bucket when
    /// boundary has no room or already hold boundary status. Idempotent.
    pub fn confirm_outliers(&mut self) -> Result<(), PipelineError> {
        let factor = self.config.outlier_stddev_factor;
        let max_boundary = self.config.max_boundary;
        for profile in &mut self.speakers {
            let evicted = profile.confirm_outliers(factor, max_boundary)?;
            self.unknown_bucket.extend(evicted);
        }
        Ok(())
    }

    /// Serialise to the stable library schema and write atomically (temp
    /// file + rename) so a crash mid-write never corrupts the previous
    /// version.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PipelineError> {
        let path = path.as_ref();
        let data = LibraryData {
            speakers: self
                .speakers
                .iter()
                .map(|p| SpeakerRecord {
                    name: p.name.clone(),
                    core: p.core.clone(),
                    boundary: p.boundary.clone(),
                    centroid: p.centroid.clone(),
                    std_dev: p.stddev,
                    all_distances: p.all_distances.clone(),
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&data)?;

        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Deserialise from the stable library schema. Missing `centroid` is
    /// accepted as `null`; unrecognised future fields are ignored by
    /// `serde`'s default field handling.
    pub fn load(path: impl AsRef<Path>, config: SpeakerConfig) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path)?;
        let data: LibraryData = serde_json::from_str(&text).map_err(|e| PipelineError::LibraryCorrupt {
            detail: e.to_string(),
        })?;

        let speakers = data
            .speakers
            .into_iter()
            .map(|r| SpeakerProfile::from_parts(r.name, r.core, r.boundary, r.centroid, r.std_dev, r.all_distances))
            .collect();

        Ok(Self {
            speakers,
            unknown_bucket: Vec::new(),
            config,
            next_cluster_id: 1,
        })
    }

    /// `load`, but a corrupt or missing file yields an empty library
    /// rather than propagating the error — the file on disk, if any, is
    /// left untouched either way.
    pub fn load_or_default(path: impl AsRef<Path>, config: SpeakerConfig) -> Self {
        let path = path.as_ref();
        match Self::load(path, config.clone()) {
            Ok(lib) => lib,
            Err(e) => {
                warn!("voice library at {path:?} unreadable ({e}), starting empty");
                Self::new(config)
            }
        }
    }
}

fn average_linkage_similarity(a: &[Vec<f32>], b: &[Vec<f32>]) -> Result<f32, PipelineError> {
    let mut total = 0.0f32;
    let mut count = 0usize;
    for x in a {
        for y in b {
            total += 1.0 - cosine_distance(x, y)?;
            count += 1;
        }
    }
    Ok(if count == 0 { f32::NEG_INFINITY } else { total / count as f32 })
}
