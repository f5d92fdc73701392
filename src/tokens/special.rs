//! Special-token partitioning: separate language/emotion/event/task
//! metadata tokens from the text-bearing token stream.
//!
//! Grounded on the original `TokenMappings` interface (curated
//! `LANG_TOKENS`/`EMOTION_TOKENS`/`EVENT_TOKENS`/`TASK_TOKENS` ID sets with
//! a `decodeSpecialTokens`/`isSpecialToken` pair); the curated sets
//! themselves are vocabulary-specific and supplied by the caller rather
//! than hard-coded, since this crate has no bundled vocabulary.

use std::collections::HashMap;

/// Metadata recovered from special tokens in a decoded ID sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecialTokens {
    pub language: Option<String>,
    pub emotion: Option<String>,
    pub event: Option<String>,
    pub task: Option<String>,
}

/// Curated ID -> label maps for each special-token category.
#[derive(Debug, Clone, Default)]
pub struct SpecialTokenRanges {
    pub language: HashMap<usize, String>,
    pub emotion: HashMap<usize, String>,
    pub event: HashMap<usize, String>,
    pub task: HashMap<usize, String>,
}

impl SpecialTokenRanges {
    pub fn is_special_token(&self, id: usize) -> bool {
        self.language.contains_key(&id)
            || self.emotion.contains_key(&id)
            || self.event.contains_key(&id)
            || self.task.contains_key(&id)
    }
}

/// Partition `ids` into recovered metadata and the remaining text tokens,
/// preserving the text tokens' relative order.
pub fn partition(ids: &[usize], ranges: &SpecialTokenRanges) -> (SpecialTokens, Vec<usize>) {
    let mut meta = SpecialTokens::default();
    let mut text_tokens = Vec::with_capacity(ids.len());

    for &id in ids {
        if let Some(lang) = ranges.language.get(&id) {
            meta.language = Some(lang.clone());
        } else if let Some(emotion) = ranges.emotion.get(&id) {
            meta.emotion = Some(emotion.clone());
        } else if let Some(event) = ranges.event.get(&id) {
            meta.event = Some(event.clone());
        } else if let Some(task) = ranges.task.get(&id) {
            meta.task = Some(task.clone());
        } else {
            text_tokens.push(id);
        }
    }

    (meta, text_tokens)
}
