//! Online speaker recognition: dual-bucket profiles plus the library that
//! matches, enrolls, auto-learns, clusters, and persists them.

pub mod library;
pub mod profile;

pub use library::{Confidence, MatchResult, VoiceLibrary};
pub use profile::SpeakerProfile;
