//! Types for seq2seq generation.

use geisli_transformers::{DecodeError, Score};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Errors

/// Errors that can occur during seq2seq generation.
#[derive(Debug, Error)]
pub enum Seq2SeqError {
    /// The resolved generation config was rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Decoding aborted.
    #[error("Generation failed: {0}")]
    GenerationFailed(#[source] DecodeError),

    /// Model loading failed.
    #[error("Failed to load model '{model}': {source}")]
    LoadFailed {
        model: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<DecodeError> for Seq2SeqError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::InvalidConfig(msg) => Seq2SeqError::InvalidConfig(msg),
            other => Seq2SeqError::GenerationFailed(other),
        }
    }
}

/// Result type for seq2seq operations.
pub type Seq2SeqResult<T> = Result<T, Seq2SeqError>;

// Overrides

/// User-specified overrides for seq2seq generation.
///
/// All fields are optional. `None` means "use model default".
/// Also the `[generation]` table of `geisli.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Seq2SeqOverrides {
    /// Minimum output length in tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    /// Maximum output length in tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    /// Number of beams for beam search. `1` = greedy decoding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_beams: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_penalty: Option<Score>,

    /// Stop when `num_beams` complete sequences are found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub early_stopping: Option<bool>,

    /// Prevent repeating n-grams of this size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_repeat_ngram_size: Option<usize>,

    /// Penalty for repeating tokens (1.0 = no penalty).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<Score>,

    /// Token sequences that must never be generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bad_words_ids: Option<Vec<Vec<u32>>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub forced_bos_token_id: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub forced_eos_token_id: Option<u32>,

    /// Draw candidates instead of taking the top scores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub do_sample: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Score>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<Score>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_p: Option<Score>,

    /// Seed for sampling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Seq2SeqOverrides {
    /// Use greedy decoding (fastest, single beam).
    pub fn greedy() -> Self {
        Self {
            num_beams: Some(1),
            ..Default::default()
        }
    }

    /// Wider beam, no early stopping.
    pub fn high_quality() -> Self {
        Self {
            num_beams: Some(6),
            early_stopping: Some(false),
            ..Default::default()
        }
    }

    /// Check if any overrides are set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge with another set of overrides. Values from `other` take precedence.
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            min_length: other.min_length.or(self.min_length),
            max_length: other.max_length.or(self.max_length),
            num_beams: other.num_beams.or(self.num_beams),
            length_penalty: other.length_penalty.or(self.length_penalty),
            early_stopping: other.early_stopping.or(self.early_stopping),
            no_repeat_ngram_size: other.no_repeat_ngram_size.or(self.no_repeat_ngram_size),
            repetition_penalty: other.repetition_penalty.or(self.repetition_penalty),
            bad_words_ids: other
                .bad_words_ids
                .clone()
                .or_else(|| self.bad_words_ids.clone()),
            forced_bos_token_id: other.forced_bos_token_id.or(self.forced_bos_token_id),
            forced_eos_token_id: other.forced_eos_token_id.or(self.forced_eos_token_id),
            do_sample: other.do_sample.or(self.do_sample),
            temperature: other.temperature.or(self.temperature),
            top_k: other.top_k.or(self.top_k),
            top_p: other.top_p.or(self.top_p),
            min_p: other.min_p.or(self.min_p),
            seed: other.seed.or(self.seed),
        }
    }
}
