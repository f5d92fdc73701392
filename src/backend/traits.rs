//! Backend traits: the three opaque predict functions the core depends on.
//!
//! Shapes follow spec §4.H exactly. Implementations own their inference
//! session; dropping a `Box<dyn ...>` drops the session with it (no
//! back-reference into the pipeline is required, matching the teacher's
//! "model adapters own their inference sessions" design note).

use crate::error::PipelineError;

/// Output of one VAD backend call: a speech probability plus the updated
/// opaque recurrent state.
#[derive(Debug, Clone)]
pub struct VadOutput {
    pub probability: f32,
    pub hidden: Vec<f32>,
    pub cell: Vec<f32>,
}

/// `run_vad(input, h, c) -> (p, h', c')`.
///
/// `input` is exactly `context_size + chunk_size` samples; `hidden` and
/// `cell` are exactly `state_size` floats each.
pub trait VadBackend {
    fn run(&mut self, input: &[f32], hidden: &[f32], cell: &[f32]) -> Result<VadOutput, PipelineError>;
}

/// `run_asr(features[fixed_frames][feature_dim]) -> logits[T][V]`.
///
/// `features` is row-major `fixed_frames` rows of `feature_dim` floats.
/// The returned logits are row-major `T` timesteps of `vocab_size` floats.
pub trait AsrBackend {
    fn run(&mut self, features: &[Vec<f32>]) -> Result<Vec<Vec<f32>>, PipelineError>;

    /// Vocabulary size, needed by callers to validate logits shape.
    fn vocab_size(&self) -> usize;
}

/// `run_speaker_embedding(audio[xvector_samples]) -> embedding[xvector_dim]`.
pub trait SpeakerEmbedBackend {
    fn run(&mut self, audio: &[f32]) -> Result<Vec<f32>, PipelineError>;

    fn embedding_dim(&self) -> usize;
}

#[cfg(test)]
pub(crate) mod mocks {
    use super::*;

    /// A VAD backend that returns a fixed probability for every call and
    /// echoes back zeroed state (sufficient for aggregator unit tests).
    pub struct FixedVad {
        pub probability: f32,
        pub state_size: usize,
    }

    impl VadBackend for FixedVad {
        fn run(&mut self, _input: &[f32], _hidden: &[f32], _cell: &[f32]) -> Result<VadOutput, PipelineError> {
            Ok(VadOutput {
                probability: self.probability,
                hidden: vec![0.0; self.state_size],
                cell: vec![0.0; self.state_size],
            })
        }
    }

    /// An ASR backend that always reports empty text via all-blank logits.
    pub struct SilentAsr {
        pub vocab_size: usize,
    }

    impl AsrBackend for SilentAsr {
        fn run(&mut self, features: &[Vec<f32>]) -> Result<Vec<Vec<f32>>, PipelineError> {
            let t = features.len().max(1);
            Ok(vec![vec![1.0; self.vocab_size]; t.min(4)])
        }

        fn vocab_size(&self) -> usize {
            self.vocab_size
        }
    }

    /// A speaker embedder that hashes the input's sign pattern into a
    /// deterministic, non-zero unit-ish vector — enough to exercise
    /// matching logic without a real model.
    pub struct DeterministicEmbedder {
        pub dim: usize,
    }

    impl SpeakerEmbedBackend for DeterministicEmbedder {
        fn run(&mut self, audio: &[f32]) -> Result<Vec<f32>, PipelineError> {
            if audio.is_empty() {
                return Err(PipelineError::InvalidInput {
                    kind: "empty audio for speaker embedding".into(),
                });
            }
            let mut v = vec![0.0f32; self.dim];
            for (i, &s) in audio.iter().enumerate() {
                v[i % self.dim] += s;
            }
            Ok(v)
        }

        fn embedding_dim(&self) -> usize {
            self.dim
        }
    }
}
