//! Segment assembler / live pipeline: orchestrates VAD, feature prep, ASR,
//! speaker embedding, and library matching into emitted transcript
//! segments.
//!
//! Single-threaded and not reentrant, per the "one pipeline instance per
//! thread, own your own models and library" resource model; shaped after
//! the teacher's `RealTimeTranscriber` orchestration loop but collapsed
//! from its tokio broadcast/mpsc wiring down to plain synchronous calls,
//! since this crate owns no audio capture thread of its own.

use std::time::Instant;

use log::warn;

use crate::backend::{AsrBackend, SpeakerEmbedBackend, VadBackend};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::features::{lfr_stack, pad_to_fixed_frames, MelSpectrogram};
use crate::speaker::library::Confidence;
use crate::speaker::VoiceLibrary;
use crate::tokens::special::SpecialTokenRanges;
use crate::tokens::{ctc, decode_vocabulary, partition};
use crate::vad::VadAggregator;
use crate::vector_ops::normalize;

/// A timestamped, speaker-attributed transcript segment.
#[derive(Debug, Clone)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub speaker_name: Option<String>,
    pub confidence: Confidence,
    pub is_known: bool,
    pub is_conflict: bool,
    pub embedding: Option<Vec<f32>>,
    pub process_time_ms: f64,
    pub learned: bool,
    pub cluster_label: Option<String>,
}

/// Holds references to the VAD/ASR/speaker-embedding models and the voice
/// library, and turns raw PCM into [`Segment`]s.
pub struct LivePipeline {
    config: PipelineConfig,
    vad: VadAggregator,
    asr: Box<dyn AsrBackend>,
    embedder: Box<dyn SpeakerEmbedBackend>,
    mel: MelSpectrogram,
    vocab: Vec<String>,
    special_ranges: SpecialTokenRanges,
    library: VoiceLibrary,
}

impl LivePipeline {
    pub fn new(
        config: PipelineConfig,
        vad_backend: Box<dyn VadBackend>,
        asr: Box<dyn AsrBackend>,
        embedder: Box<dyn SpeakerEmbedBackend>,
        vocab: Vec<String>,
        special_ranges: SpecialTokenRanges,
        library: VoiceLibrary,
    ) -> Self {
        let mel = MelSpectrogram::new(
            config.features.n_fft,
            config.features.hop_length,
            config.features.n_mels,
            config.features.sample_rate as f32,
        );
        let vad = VadAggregator::new(config.vad.clone(), config.features.sample_rate, vad_backend);
        Self {
            config,
            vad,
            asr,
            embedder,
            mel,
            vocab,
            special_ranges,
            library,
        }
    }

    pub fn library(&self) -> &VoiceLibrary {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut VoiceLibrary {
        &mut self.library
    }

    /// Forward `samples` through the VAD aggregator, assembling and
    /// returning every segment whose speech ended as a result.
    pub fn process_audio(&mut self, samples: &[f32]) -> Result<Vec<Segment>, PipelineError> {
        let speech_segments = self.vad.process_audio(samples)?;
        speech_segments.into_iter().map(|s| self.assemble(s)).collect()
    }

    /// Finalise the VAD aggregator, assembling the trailing partial
    /// segment if it was eligible.
    pub fn flush(&mut self) -> Result<Option<Segment>, PipelineError> {
        match self.vad.flush() {
            Some(speech) => Ok(Some(self.assemble(speech)?)),
            None => Ok(None),
        }
    }

    /// Drop all in-flight state (VAD buffers, hidden/cell tensors) without
    /// flushing. The library is untouched.
    pub fn reset(&mut self) {
        self.vad.reset();
    }

    fn assemble(&mut self, speech: crate::vad::SpeechSegment) -> Result<Segment, PipelineError> {
        let started = Instant::now();

        let text = self.transcribe(&speech.audio);
        let (speaker_name, confidence, is_known, is_conflict, embedding, learned, cluster_label) =
            self.attribute_speaker(&speech.audio)?;

        let process_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        Ok(Segment {
            start: speech.start,
            end: speech.end,
            text,
            speaker_name,
            confidence,
            is_known,
            is_conflict,
            embedding,
            process_time_ms,
            learned,
            cluster_label,
        })
    }

    fn transcribe(&mut self, audio: &[f32]) -> String {
        let mel_freq_major = self.mel.compute(audio);
        let time_major = transpose(&mel_freq_major);
        let lfr = lfr_stack(&time_major, self.config.features.lfr_m, self.config.features.lfr_n);
        let padded = pad_to_fixed_frames(&lfr, self.config.features.fixed_frames, self.config.features.feature_dim());

        match self.asr.run(&padded) {
            Ok(logits) => {
                let ids = ctc::greedy_decode(&logits);
                let (_meta, text_ids) = partition(&ids, &self.special_ranges);
                decode_vocabulary(&text_ids, &self.vocab)
            }
            Err(e) => {
                warn!("ASR inference failed, emitting empty text: {e}");
                String::new()
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn attribute_speaker(
        &mut self,
        audio: &[f32],
    ) -> Result<(Option<String>, Confidence, bool, bool, Option<Vec<f32>>, bool, Option<String>), PipelineError> {
        let window = center_window(audio, self.config.embedding.xvector_samples);

        let raw_embedding = match self.embedder.run(&window) {
            Ok(e) => e,
            Err(e) => {
                warn!("speaker embedding failed, segment emitted without attribution: {e}");
                return Ok((None, Confidence::Unknown, false, false, None, false, None));
            }
        };

        let embedding = normalize(&raw_embedding);
        let result = self.library.match_embedding(&embedding);
        let is_conflict = result.confidence == Confidence::Conflict;
        let is_known = matches!(result.confidence, Confidence::High | Confidence::Medium | Confidence::Low);

        let learned = self
            .library
            .auto_learn(&result.name, &embedding, result.confidence, result.similarity)?;

        let cluster_label = result.name.strip_prefix("Cluster-").map(|_| result.name.clone());
        let speaker_name = if result.confidence == Confidence::Unknown {
            None
        } else {
            Some(result.name.clone())
        };

        Ok((speaker_name, result.confidence, is_known, is_conflict, Some(embedding), learned, cluster_label))
    }
}

/// Extract exactly `window` samples centred on `audio`, zero-padding
/// symmetrically when `audio` is shorter.
fn center_window(audio: &[f32], window: usize) -> Vec<f32> {
    if audio.len() == window {
        return audio.to_vec();
    }
    if audio.len() > window {
        let start = (audio.len() - window) / 2;
        return audio[start..start + window].to_vec();
    }
    let total_pad = window - audio.len();
    let left = total_pad / 2;
    let right = total_pad - left;
    let mut out = vec![0.0; left];
    out.extend_from_slice(audio);
    out.extend(std::iter::repeat(0.0).take(right));
    out
}

/// Transpose a freq-major `[n_mels][frames]` matrix into time-major
/// `[frames][n_mels]`, as [`lfr_stack`] expects.
fn transpose(freq_major: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let n_mels = freq_major.len();
    let frames = freq_major.first().map(|r| r.len()).unwrap_or(0);
    let mut out = vec![Vec::with_capacity(n_mels); frames];
    for row in freq_major {
        for (t, &v) in row.iter().enumerate() {
            out[t].push(v);
        }
    }
    out
}
