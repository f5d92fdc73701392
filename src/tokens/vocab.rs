//! Vocabulary-based text reconstruction.
//!
//! Two distinct decoders, matching the original's split between a
//! SentencePiece-style decoder (meta-space prefix marks word starts) and a
//! Whisper-style byte-level BPE decoder with its own vocab file, grounded
//! on the teacher's `MoonshineTokenizer` (`tokenizers::Tokenizer` wrapper
//! with BOS/EOS resolution).

use std::path::Path;

use crate::error::PipelineError;

const META_SPACE: char = '\u{2581}';

/// Concatenate vocabulary pieces for `ids`, SentencePiece-style: a piece
/// beginning with the meta-space character introduces a leading ASCII
/// space (stripped of the marker itself); other pieces concatenate
/// directly. Unknown indices render as empty strings.
pub fn decode_vocabulary(ids: &[usize], vocab: &[String]) -> String {
    let mut out = String::new();
    for &id in ids {
        let Some(piece) = vocab.get(id) else {
            continue;
        };
        if let Some(rest) = piece.strip_prefix(META_SPACE) {
            out.push(' ');
            out.push_str(rest);
        } else {
            out.push_str(piece);
        }
    }
    out
}

/// Byte-level BPE decoder over a `tokenizers`-format vocabulary, for
/// Whisper-style ASR heads whose vocab is not SentencePiece.
pub struct BpeVocabulary {
    tokenizer: tokenizers::Tokenizer,
}

impl BpeVocabulary {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let tokenizer = tokenizers::Tokenizer::from_file(path).map_err(|e| PipelineError::InvalidInput {
            kind: format!("failed to load BPE vocabulary: {e}"),
        })?;
        Ok(Self { tokenizer })
    }

    pub fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String, PipelineError> {
        self.tokenizer
            .decode(ids, skip_special_tokens)
            .map_err(|e| PipelineError::InvalidInput {
                kind: format!("BPE decode failed: {e}"),
            })
    }

    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }
}
