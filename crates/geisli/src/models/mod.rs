//! Models that can drive the decoder.

pub mod bigram;

pub use bigram::{BigramCache, BigramModel, SpecialTokens};

use geisli_transformers::{GenerationConfig, StepScorer};

/// A scorer that also knows its vocabulary and preferred generation settings.
pub trait Seq2SeqModel: StepScorer {
    /// Name shown in logs and CLI output.
    fn name(&self) -> &str;

    fn vocab_size(&self) -> usize;

    /// Special token ids and vocabulary size filled in for this model.
    fn default_generation_config(&self) -> GenerationConfig;

    /// Renders token ids as text, dropping special tokens.
    fn decode_tokens(&self, tokens: &[u32]) -> String;
}
