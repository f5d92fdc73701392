//! Model adapter interfaces.
//!
//! The core pipeline never touches a concrete inference runtime. Each
//! neural stage is an opaque, pure function wrapped in a trait — the same
//! "uniform interface over interchangeable backends" shape the teacher uses
//! for its `TranscriptionBackend` enum, but expressed as trait objects
//! since the concrete backends (ONNX Runtime, whisper.cpp, CTranslate2,
//! ...) are out of scope for this crate: callers plug in an implementation
//! that wraps whichever runtime they've chosen.

pub mod traits;

pub use traits::{AsrBackend, SpeakerEmbedBackend, VadBackend, VadOutput};
