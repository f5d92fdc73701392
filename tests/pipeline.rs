//! End-to-end scenarios over the public API, using hand-rolled backend
//! mocks (the real inference runtimes are out of scope for this crate).

use voicepipe::backend::{AsrBackend, SpeakerEmbedBackend, VadBackend, VadOutput};
use voicepipe::error::PipelineError;
use voicepipe::tokens::special::SpecialTokenRanges;
use voicepipe::{Confidence, LivePipeline, PipelineConfig, VoiceLibrary};

/// `RUST_LOG=debug cargo test` then shows per-segment inference warnings;
/// `try_init` so repeated calls across tests don't panic.
fn init_logging() {
    let _ = env_logger::try_init();
}

/// Replays a fixed probability script, one value per chunk consumed;
/// holds the final value once the script runs out.
struct ScriptedVad {
    script: Vec<f32>,
    idx: usize,
    state_size: usize,
}

impl VadBackend for ScriptedVad {
    fn run(&mut self, _input: &[f32], _hidden: &[f32], _cell: &[f32]) -> Result<VadOutput, PipelineError> {
        let p = self
            .script
            .get(self.idx)
            .copied()
            .unwrap_or_else(|| *self.script.last().unwrap_or(&0.0));
        self.idx += 1;
        Ok(VadOutput {
            probability: p,
            hidden: vec![0.0; self.state_size],
            cell: vec![0.0; self.state_size],
        })
    }
}

struct SilentAsr {
    vocab_size: usize,
}

impl AsrBackend for SilentAsr {
    fn run(&mut self, features: &[Vec<f32>]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let t = features.len().max(1).min(4);
        Ok(vec![vec![1.0; self.vocab_size]; t])
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }
}

struct FixedEmbedder {
    embedding: Vec<f32>,
}

impl SpeakerEmbedBackend for FixedEmbedder {
    fn run(&mut self, _audio: &[f32]) -> Result<Vec<f32>, PipelineError> {
        Ok(self.embedding.clone())
    }

    fn embedding_dim(&self) -> usize {
        self.embedding.len()
    }
}

fn scripted_pipeline(script: Vec<f32>, embedding: Vec<f32>, library: VoiceLibrary) -> LivePipeline {
    let config = PipelineConfig::default();
    let vad = Box::new(ScriptedVad {
        script,
        idx: 0,
        state_size: config.vad.state_size,
    });
    let asr = Box::new(SilentAsr { vocab_size: 16 });
    let embedder = Box::new(FixedEmbedder { embedding });
    let vocab: Vec<String> = (0..16).map(|i| format!("tok{i}")).collect();
    LivePipeline::new(config, vad, asr, embedder, vocab, SpecialTokenRanges::default(), library)
}

/// Enough chunks of a given probability to clear the default hysteresis
/// thresholds (`min_speech_duration = 0.25s`, `min_silence_duration =
/// 0.4s` at `chunk_size = 512` samples, 16kHz).
fn chunks_for(seconds: f64) -> usize {
    let chunk_size = PipelineConfig::default().vad.chunk_size;
    let sample_rate = PipelineConfig::default().features.sample_rate;
    ((seconds * sample_rate as f64) / chunk_size as f64).ceil() as usize + 2
}

fn samples_for(num_chunks: usize) -> Vec<f32> {
    vec![0.1f32; num_chunks * PipelineConfig::default().vad.chunk_size]
}

#[test]
fn silence_produces_no_segments() {
    init_logging();
    let mut pipeline = scripted_pipeline(vec![0.0], vec![0.0; 4], VoiceLibrary::new(Default::default()));
    let audio = vec![0.0f32; 16000 * 3];
    let segments = pipeline.process_audio(&audio).unwrap();
    assert!(segments.is_empty());
}

#[test]
fn sustained_speech_then_silence_emits_one_unknown_segment() {
    init_logging();
    let speech_chunks = chunks_for(0.25);
    let silence_chunks = chunks_for(0.4);
    let mut script = vec![0.9; speech_chunks];
    script.extend(vec![0.0; silence_chunks]);
    let total_chunks = script.len();

    let mut pipeline = scripted_pipeline(script, vec![0.0; 4], VoiceLibrary::new(Default::default()));
    let segments = pipeline.process_audio(&samples_for(total_chunks)).unwrap();

    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].speaker_name, None);
    assert_eq!(segments[0].confidence, Confidence::Unknown);
    assert!(segments[0].end > segments[0].start);
}

#[test]
fn enrolled_speaker_matches_with_high_confidence() {
    init_logging();
    let embedding = vec![1.0, 0.0, 0.0];
    let mut library = VoiceLibrary::new(Default::default());
    library.enroll("Alice", &embedding).unwrap();

    let speech_chunks = chunks_for(0.25);
    let silence_chunks = chunks_for(0.4);
    let mut script = vec![0.9; speech_chunks];
    script.extend(vec![0.0; silence_chunks]);
    let total_chunks = script.len();

    let mut pipeline = scripted_pipeline(script, embedding, library);
    let segments = pipeline.process_audio(&samples_for(total_chunks)).unwrap();

    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].speaker_name.as_deref(), Some("Alice"));
    assert_eq!(segments[0].confidence, Confidence::High);
    assert!(segments[0].is_known);
    assert!(!segments[0].is_conflict);
}

#[test]
fn two_close_speakers_yield_conflict() {
    init_logging();
    let alice = vec![1.0, 0.0, 0.0];
    let bob = vec![0.85, (1.0f32 - 0.85f32 * 0.85f32).sqrt(), 0.0];
    let mut library = VoiceLibrary::new(Default::default());
    library.enroll("Alice", &alice).unwrap();
    library.enroll("Bob", &bob).unwrap();

    // Equidistant query: normalised Alice + Bob.
    let raw = vec![alice[0] + bob[0], alice[1] + bob[1], alice[2] + bob[2]];
    let norm = (raw.iter().map(|x| x * x).sum::<f32>()).sqrt();
    let query: Vec<f32> = raw.iter().map(|x| x / norm).collect();

    let result = library.match_embedding(&query);
    assert_eq!(result.confidence, Confidence::Conflict);
}

#[test]
fn auto_learn_grows_core_on_high_confidence_match() {
    init_logging();
    let embedding = vec![1.0, 0.0, 0.0];
    let mut library = VoiceLibrary::new(Default::default());
    library.enroll("Alice", &embedding).unwrap();
    assert_eq!(library.profile("Alice").unwrap().core.len(), 1);

    let speech_chunks = chunks_for(0.25);
    let silence_chunks = chunks_for(0.4);
    let mut script = vec![0.9; speech_chunks];
    script.extend(vec![0.0; silence_chunks]);
    let total_chunks = script.len();

    // Close but not identical, so it admits as a second core exemplar
    // rather than a no-op replacement of the first.
    let near_embedding = vec![0.99, 0.1411, 0.0];
    let mut pipeline = scripted_pipeline(script, near_embedding, library);
    let segments = pipeline.process_audio(&samples_for(total_chunks)).unwrap();

    assert_eq!(segments.len(), 1);
    assert!(segments[0].learned);
    assert_eq!(pipeline.library().profile("Alice").unwrap().core.len(), 2);
}

#[test]
fn library_persists_and_reloads_multiple_speakers() {
    init_logging();
    let mut library = VoiceLibrary::new(Default::default());
    for i in 0..3 {
        let mut base = vec![0.0f32; 8];
        base[i] = 1.0;
        library.enroll(&format!("Speaker{i}"), &base).unwrap();
        for j in 1..5 {
            let mut nearby = base.clone();
            nearby[(i + 1) % 8] = 0.02 * j as f32;
            let _ = library.auto_learn(&format!("Speaker{i}"), &nearby, Confidence::High, 0.9);
        }
    }

    let path = std::env::temp_dir().join("voicepipe_multi_speaker_library.json");
    library.save(&path).unwrap();
    let reloaded = VoiceLibrary::load(&path, Default::default()).unwrap();

    for i in 0..3 {
        let mut base = vec![0.0f32; 8];
        base[i] = 1.0;
        let result = reloaded.match_embedding(&base);
        assert_eq!(result.name, format!("Speaker{i}"));
        assert_eq!(result.confidence, Confidence::High);
    }

    let _ = std::fs::remove_file(&path);
}

#[test]
fn reset_discards_in_flight_speech_without_emitting() {
    init_logging();
    let mut pipeline = scripted_pipeline(vec![0.9], vec![0.0; 4], VoiceLibrary::new(Default::default()));
    pipeline.process_audio(&samples_for(chunks_for(0.25))).unwrap();
    pipeline.reset();
    assert!(pipeline.flush().unwrap().is_none());
}
