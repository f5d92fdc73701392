//! Streaming coordination layer for an on-device speech pipeline.
//!
//! Converts a stream of 16 kHz mono f32 PCM samples into timestamped,
//! speaker-attributed transcript segments. Neural inference backends (VAD,
//! ASR, speaker embedding) are injected as trait objects (see [`backend`]);
//! this crate owns only the coordination logic: VAD hysteresis, feature
//! prep, token decoding, the online speaker library, and segment assembly.

pub mod backend;
pub mod config;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod speaker;
pub mod tokens;
pub mod vad;
pub mod vector_ops;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use pipeline::{LivePipeline, Segment};
pub use speaker::library::{Confidence, MatchResult, VoiceLibrary};
pub use vad::{SpeechSegment, VadAggregator};
