//! Streaming VAD aggregation: chunk-level speech probability to
//! non-overlapping speech segments, with onset/offset hysteresis.
//!
//! Grounded on the teacher's `SileroVad`/`VadState` state machine
//! (`Silence`/`PossibleSpeech`/`Speech`/`PossibleSilence` with asymmetric
//! hangover counters and pre-roll context), reshaped around the two-mode
//! model the pipeline calls for (`Idle`/`Speaking`) and routed through
//! [`crate::backend::VadBackend`] instead of an embedded inference session.

use crate::backend::VadBackend;
use crate::config::VadConfig;
use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Speaking,
}

/// A confirmed speech segment: timestamps in seconds relative to stream
/// origin, plus the raw audio spanning them.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechSegment {
    pub start: f64,
    pub end: f64,
    pub audio: Vec<f32>,
}

/// Converts a stream of PCM chunks into speech segments via a VAD backend
/// and onset/offset duration hysteresis. Not reentrant: call
/// [`VadAggregator::process_audio`] from a single thread, in stream order.
pub struct VadAggregator {
    config: VadConfig,
    sample_rate: usize,
    backend: Box<dyn VadBackend>,

    mode: Mode,
    hidden: Vec<f32>,
    cell: Vec<f32>,
    context: Vec<f32>,
    pending: Vec<f32>,

    speech_buffer: Vec<f32>,
    speech_run_samples: usize,
    silence_run_samples: usize,
    speech_start_sample: u64,
    cursor_samples: u64,
}

impl VadAggregator {
    pub fn new(config: VadConfig, sample_rate: usize, backend: Box<dyn VadBackend>) -> Self {
        let state_size = config.state_size;
        let context_size = config.context_size;
        Self {
            config,
            sample_rate,
            backend,
            mode: Mode::Idle,
            hidden: vec![0.0; state_size],
            cell: vec![0.0; state_size],
            context: vec![0.0; context_size],
            pending: Vec::new(),
            speech_buffer: Vec::new(),
            speech_run_samples: 0,
            silence_run_samples: 0,
            speech_start_sample: 0,
            cursor_samples: 0,
        }
    }

    fn min_speech_samples(&self) -> usize {
        (self.config.min_speech_duration * self.sample_rate as f64).round() as usize
    }

    fn min_silence_samples(&self) -> usize {
        (self.config.min_silence_duration * self.sample_rate as f64).round() as usize
    }

    fn samples_to_seconds(&self, samples: u64) -> f64 {
        samples as f64 / self.sample_rate as f64
    }

    /// Feed new PCM audio, buffering incomplete chunks internally. Returns
    /// every speech segment confirmed complete as a result of consuming
    /// `samples` (zero, one, or more).
    pub fn process_audio(&mut self, samples: &[f32]) -> Result<Vec<SpeechSegment>, PipelineError> {
        self.pending.extend_from_slice(samples);
        let mut emitted = Vec::new();

        while self.pending.len() >= self.config.chunk_size {
            let chunk: Vec<f32> = self.pending.drain(..self.config.chunk_size).collect();
            if let Some(seg) = self.process_chunk(&chunk)? {
                emitted.push(seg);
            }
        }
        Ok(emitted)
    }

    fn process_chunk(&mut self, chunk: &[f32]) -> Result<Option<SpeechSegment>, PipelineError> {
        let mut model_input = self.context.clone();
        model_input.extend_from_slice(chunk);

        let out = self.backend.run(&model_input, &self.hidden, &self.cell)?;
        self.hidden = out.hidden;
        self.cell = out.cell;

        let context_size = self.config.context_size;
        if context_size > 0 {
            let tail_start = chunk.len().saturating_sub(context_size);
            if chunk.len() >= context_size {
                self.context = chunk[tail_start..].to_vec();
            } else {
                self.context.drain(..chunk.len());
                self.context.extend_from_slice(chunk);
            }
        }

        let is_speech = out.probability >= self.config.speech_threshold;
        let result = self.advance_state(chunk, is_speech);
        self.cursor_samples += chunk.len() as u64;
        Ok(result)
    }

    fn advance_state(&mut self, chunk: &[f32], is_speech: bool) -> Option<SpeechSegment> {
        match self.mode {
            Mode::Idle => {
                if is_speech {
                    self.speech_run_samples += chunk.len();
                    self.speech_buffer.extend_from_slice(chunk);
                    if self.speech_run_samples >= self.min_speech_samples() {
                        self.mode = Mode::Speaking;
                        self.speech_start_sample = self.cursor_samples + chunk.len() as u64
                            - self.speech_run_samples as u64;
                        self.silence_run_samples = 0;
                    }
                } else {
                    self.speech_run_samples = 0;
                    self.speech_buffer.clear();
                }
                None
            }
            Mode::Speaking => {
                self.speech_buffer.extend_from_slice(chunk);
                if is_speech {
                    self.silence_run_samples = 0;
                    None
                } else {
                    self.silence_run_samples += chunk.len();
                    if self.silence_run_samples >= self.min_silence_samples() {
                        Some(self.emit_and_reset())
                    } else {
                        None
                    }
                }
            }
        }
    }

    fn emit_and_reset(&mut self) -> SpeechSegment {
        let start = self.samples_to_seconds(self.speech_start_sample);
        let trailing_silence = self.silence_run_samples.min(self.speech_buffer.len());
        let end_sample_count =
            self.speech_start_sample + (self.speech_buffer.len() - trailing_silence) as u64;
        let end = self.samples_to_seconds(end_sample_count);

        let trimmed_audio = self.speech_buffer[..self.speech_buffer.len() - trailing_silence].to_vec();

        let segment = SpeechSegment {
            start,
            end,
            audio: trimmed_audio,
        };

        self.mode = Mode::Idle;
        self.speech_buffer.clear();
        self.speech_run_samples = 0;
        self.silence_run_samples = 0;
        segment
    }

    /// Force `Speaking -> Idle`, emitting the partial segment if it meets
    /// `min_speech_duration`; otherwise the buffered audio is discarded.
    /// A no-op (returns `None`) if currently `Idle`.
    pub fn flush(&mut self) -> Option<SpeechSegment> {
        if self.mode != Mode::Speaking {
            self.speech_buffer.clear();
            self.speech_run_samples = 0;
            return None;
        }
        let speech_samples = self.speech_buffer.len().saturating_sub(self.silence_run_samples);
        if speech_samples < self.min_speech_samples() {
            self.mode = Mode::Idle;
            self.speech_buffer.clear();
            self.speech_run_samples = 0;
            self.silence_run_samples = 0;
            return None;
        }
        Some(self.emit_and_reset())
    }

    /// Clear all state, including VAD hidden/cell tensors and rolling
    /// context, as if freshly constructed.
    pub fn reset(&mut self) {
        self.mode = Mode::Idle;
        self.hidden = vec![0.0; self.config.state_size];
        self.cell = vec![0.0; self.config.state_size];
        self.context = vec![0.0; self.config.context_size];
        self.pending.clear();
        self.speech_buffer.clear();
        self.speech_run_samples = 0;
        self.silence_run_samples = 0;
        self.speech_start_sample = 0;
        self.cursor_samples = 0;
    }
}
