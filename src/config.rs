//! Pipeline configuration.
//!
//! Each concern gets its own `serde`-derived struct with a `Default` impl,
//! following the same pattern the teacher uses for `VadConfig`,
//! `AudioProcessorConfig`, `ManualModeConfig`, etc. — a flat aggregate of
//! small, independently-defaultable pieces rather than one monolithic
//! struct of loose fields.

use serde::{Deserialize, Serialize};

/// Feature-prep parameters: mel spectrogram, LFR stacking, fixed-frame
/// padding for the ASR head.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Working sample rate in Hz.
    pub sample_rate: usize,
    /// STFT window size in samples.
    pub n_fft: usize,
    /// STFT hop length in samples.
    pub hop_length: usize,
    /// Number of mel filterbank bands.
    pub n_mels: usize,
    /// Low-frame-rate stacking factor (frames stacked together).
    pub lfr_m: usize,
    /// Low-frame-rate stride (frames advanced per output frame).
    pub lfr_n: usize,
    /// Number of frames the ASR input is padded/truncated to.
    pub fixed_frames: usize,
}

impl FeatureConfig {
    /// ASR input feature dimension: `n_mels * lfr_m`.
    pub fn feature_dim(&self) -> usize {
        self.n_mels * self.lfr_m
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            n_fft: 512,
            hop_length: 160,
            n_mels: 80,
            lfr_m: 7,
            lfr_n: 6,
            fixed_frames: 200,
        }
    }
}

/// Speaker-embedding window parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Number of samples the speaker embedder expects as input.
    pub xvector_samples: usize,
    /// Dimensionality of the embedder's output vector.
    pub xvector_dim: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            xvector_samples: 48000, // 3s at 16kHz
            xvector_dim: 192,
        }
    }
}

/// VAD chunking, context, and hysteresis parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    /// Number of samples consumed per chunk.
    pub chunk_size: usize,
    /// Number of samples of rolling context prepended to each chunk.
    pub context_size: usize,
    /// Size of the VAD backend's opaque hidden/cell state vectors.
    pub state_size: usize,
    /// Probability threshold above which a frame counts as speech.
    pub speech_threshold: f32,
    /// Minimum cumulative speech duration (seconds) to confirm onset.
    pub min_speech_duration: f64,
    /// Minimum cumulative silence duration (seconds) to confirm offset.
    pub min_silence_duration: f64,
}

impl VadConfig {
    /// Total input length passed to the VAD backend: `context_size + chunk_size`.
    pub fn model_input_size(&self) -> usize {
        self.context_size + self.chunk_size
    }
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            context_size: 64,
            state_size: 128,
            speech_threshold: 0.5,
            min_speech_duration: 0.25,
            min_silence_duration: 0.4,
        }
    }
}

/// Speaker-profile and library matching thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeakerConfig {
    /// Similarity above which an embedding is a confident core match.
    pub core_threshold: f32,
    /// Similarity above which an embedding still counts as this speaker
    /// (but only strongly enough to enlarge the boundary bucket).
    pub boundary_threshold: f32,
    /// Minimum match score for `auto_learn` to attempt admission.
    pub auto_learn_threshold: f32,
    /// Minimum similarity gap between the top two matches to avoid `conflict`.
    pub conflict_margin: f32,
    /// Minimum cosine distance a new boundary/core member must keep from
    /// existing members when the bucket is full (diversity gating).
    pub min_diversity: f32,
    /// Maximum number of core embeddings per profile.
    pub max_core: usize,
    /// Maximum number of boundary embeddings per profile.
    pub max_boundary: usize,
    /// Minimum cluster size for `cluster_unknowns` to mint a new profile.
    pub min_cluster_size: usize,
    /// Outlier re-examination threshold, in standard deviations from centroid.
    pub outlier_stddev_factor: f32,
}

impl Default for SpeakerConfig {
    fn default() -> Self {
        Self {
            core_threshold: 0.75,
            boundary_threshold: 0.55,
            auto_learn_threshold: 0.85,
            conflict_margin: 0.08,
            min_diversity: 0.05,
            max_core: 10,
            max_boundary: 20,
            min_cluster_size: 2,
            outlier_stddev_factor: 3.0,
        }
    }
}

/// Top-level pipeline configuration: the union of every named constant in
/// the component-level configs above.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub features: FeatureConfig,
    pub embedding: EmbeddingConfig,
    pub vad: VadConfig,
    pub speaker: SpeakerConfig,
}
