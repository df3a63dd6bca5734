pub mod cancellation;
pub mod error;
pub mod processors;
pub mod sampling;
pub mod selection;

pub use cancellation::{CancellationError, CancellationHandle, CancellationToken};
pub use error::{DecodeError, DecodeResult};
pub use processors::{ScorePipeline, ScoreProcessor, StepContext};
pub use sampling::*;
pub use selection::{ScoredToken, SelectionStrategy};

use serde::{Deserialize, Serialize};

/// Floating point type of every score the decoder handles.
#[cfg(not(feature = "f32-scores"))]
pub type Score = f64;

/// Floating point type of every score the decoder handles.
#[cfg(feature = "f32-scores")]
pub type Score = f32;

/// Value written into vocabulary positions that must never be selected.
pub const FILTER_VALUE: Score = Score::NEG_INFINITY;

/// Parameters for sampling-based decoding (Top-K, Top-P, Temperature).
///
/// The filters are applied whenever they are set. `do_sample` only switches
/// candidate selection from deterministic top-k to multinomial draws.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    pub do_sample: bool,
    pub temperature: Option<Score>,
    pub top_k: Option<usize>,
    pub top_p: Option<Score>,
    pub min_p: Option<Score>,
    /// Seed for multinomial selection. `None` seeds from the OS.
    pub seed: Option<u64>,
}

/// Immutable configuration for one beam search decode call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    // --- Beam search ---
    pub num_beams: usize,
    pub max_length: usize,
    pub min_length: usize,
    pub length_penalty: Score,
    pub early_stopping: bool,

    // --- Special tokens ---
    pub eos_token_id: u32,
    pub pad_token_id: Option<u32>,
    pub decoder_start_token_id: u32,
    pub forced_bos_token_id: Option<u32>,
    pub forced_eos_token_id: Option<u32>,

    // --- Filters ---
    pub bad_words_ids: Vec<Vec<u32>>,
    pub repetition_penalty: Score,
    pub no_repeat_ngram_size: usize,

    // --- Model shape ---
    pub vocab_size: usize,
    pub is_encoder_decoder: bool,

    pub sampling: SamplingParams,
}

/// Defaults follow BART's special tokens and vocabulary.
impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            num_beams: 4,
            max_length: 20,
            min_length: 0,
            length_penalty: 1.0,
            early_stopping: false,
            eos_token_id: 2,
            pad_token_id: Some(1),
            decoder_start_token_id: 2,
            forced_bos_token_id: None,
            forced_eos_token_id: None,
            bad_words_ids: Vec::new(),
            repetition_penalty: 1.0,
            no_repeat_ngram_size: 0,
            vocab_size: 50265,
            is_encoder_decoder: true,
            sampling: SamplingParams::default(),
        }
    }
}

impl GenerationConfig {
    /// Rejects configurations the decoder cannot run.
    pub fn validate(&self) -> DecodeResult<()> {
        let invalid = |msg: String| Err(DecodeError::InvalidConfig(msg));

        if self.num_beams == 0 {
            return invalid("num_beams must be at least 1".into());
        }
        if self.max_length == 0 {
            return invalid("max_length must be at least 1".into());
        }
        if self.vocab_size == 0 {
            return invalid("vocab_size must be at least 1".into());
        }
        if self.num_beams > self.vocab_size {
            return invalid(format!(
                "num_beams {} exceeds the vocabulary size {}",
                self.num_beams, self.vocab_size
            ));
        }
        if self.sampling.do_sample {
            // each beam draws 2 * num_beams distinct tokens per step
            let draws = self.candidate_count()?;
            if draws > self.vocab_size {
                return invalid(format!(
                    "sampling needs {} distinct tokens per step but the vocabulary has {}",
                    draws, self.vocab_size
                ));
            }
            if let Some(k) = self.sampling.top_k.filter(|&k| k < draws) {
                return invalid(format!(
                    "top_k {} leaves fewer than the {} tokens sampling draws per step (2 * num_beams)",
                    k, draws
                ));
            }
        }
        if !self.length_penalty.is_finite() {
            return invalid(format!("length_penalty must be finite, got {}", self.length_penalty));
        }
        if !(self.repetition_penalty.is_finite() && self.repetition_penalty > 0.0) {
            return invalid(format!(
                "repetition_penalty must be positive, got {}",
                self.repetition_penalty
            ));
        }

        let named_ids = [
            ("eos_token_id", Some(self.eos_token_id)),
            ("decoder_start_token_id", Some(self.decoder_start_token_id)),
            ("pad_token_id", self.pad_token_id),
            ("forced_bos_token_id", self.forced_bos_token_id),
            ("forced_eos_token_id", self.forced_eos_token_id),
        ];
        for (name, id) in named_ids {
            if let Some(id) = id {
                if id as usize >= self.vocab_size {
                    return invalid(format!(
                        "{} {} is outside the vocabulary (size {})",
                        name, id, self.vocab_size
                    ));
                }
            }
        }

        for (i, seq) in self.bad_words_ids.iter().enumerate() {
            if seq.is_empty() {
                return invalid(format!("bad_words_ids[{}] is empty", i));
            }
            if let Some(&id) = seq.iter().find(|&&id| id as usize >= self.vocab_size) {
                return invalid(format!(
                    "bad_words_ids[{}] contains token {} outside the vocabulary (size {})",
                    i, id, self.vocab_size
                ));
            }
        }

        self.sampling.validate()
    }

    /// Candidates ranked per step: twice the beam count.
    pub fn candidate_count(&self) -> DecodeResult<usize> {
        self.num_beams.checked_mul(2).ok_or_else(|| {
            DecodeError::InvalidConfig(format!("num_beams {} is too large", self.num_beams))
        })
    }
}

impl SamplingParams {
    fn validate(&self) -> DecodeResult<()> {
        let invalid = |msg: String| Err(DecodeError::InvalidConfig(msg));

        if let Some(t) = self.temperature {
            if !(t.is_finite() && t > 0.0) {
                return invalid(format!("temperature must be positive, got {}", t));
            }
        }
        if self.top_k == Some(0) {
            return invalid("top_k must be at least 1".into());
        }
        if let Some(p) = self.top_p {
            if !(p > 0.0 && p <= 1.0) {
                return invalid(format!("top_p must be in (0, 1], got {}", p));
            }
        }
        if let Some(p) = self.min_p {
            if !(0.0..=1.0).contains(&p) {
                return invalid(format!("min_p must be in [0, 1], got {}", p));
            }
        }
        Ok(())
    }
}
