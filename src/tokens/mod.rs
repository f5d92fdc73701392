//! Token decoding: CTC collapse, special-token partition, vocabulary text
//! reconstruction. All three are stateless value-typed helpers over plain
//! data, per the "no process-global helpers" design note — even the
//! loaded vocabulary is just a read-only `Vec<String>` passed in.

pub mod ctc;
pub mod special;
pub mod vocab;

pub use ctc::greedy_decode;
pub use special::{partition, SpecialTokens};
pub use vocab::decode_vocabulary;
