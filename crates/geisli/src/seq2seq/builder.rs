//! Builder pattern for Seq2SeqGenerator configuration.

use geisli_transformers::{GenerationConfig, Score, StepScorer};

use super::model::Seq2SeqGenerator;
use super::types::{Seq2SeqOverrides, Seq2SeqResult};

/// Builder for configuring a Seq2SeqGenerator instance.
///
/// # Example
///
/// ```ignore
/// use geisli::seq2seq::Seq2SeqGenerator;
///
/// let generator = Seq2SeqGenerator::builder(scorer, defaults)
///     .num_beams(6)
///     .max_length(256)
///     .no_repeat_ngram_size(3)
///     .build()?;
/// ```
pub struct Seq2SeqGeneratorBuilder<S> {
    pub(crate) scorer: S,
    pub(crate) model_defaults: GenerationConfig,

    // Generation overrides
    pub(crate) overrides: Seq2SeqOverrides,
}

impl<S: StepScorer + 'static> Seq2SeqGeneratorBuilder<S> {
    /// Create a new builder for `scorer`.
    ///
    /// # Arguments
    ///
    /// * `model_defaults` - Special token ids, vocabulary size and preferred
    ///   settings of the model behind `scorer`
    pub fn new(scorer: S, model_defaults: GenerationConfig) -> Self {
        Self {
            scorer,
            model_defaults,
            overrides: Seq2SeqOverrides::default(),
        }
    }

    // =========================================================================
    // Beam Search
    // =========================================================================

    /// Set the number of beams for beam search.
    ///
    /// - `1` = greedy decoding (fastest)
    /// - `4` = typical default
    /// - `6-8` = higher quality, slower
    pub fn num_beams(mut self, n: usize) -> Self {
        self.overrides.num_beams = Some(n);
        self
    }

    /// Set the maximum output length in tokens, start token included.
    pub fn max_length(mut self, len: usize) -> Self {
        self.overrides.max_length = Some(len);
        self
    }

    /// Set the minimum output length in tokens.
    pub fn min_length(mut self, len: usize) -> Self {
        self.overrides.min_length = Some(len);
        self
    }

    /// Set the length penalty for beam search.
    ///
    /// - `< 1.0` = favor shorter outputs
    /// - `= 1.0` = neutral
    /// - `> 1.0` = favor longer outputs
    pub fn length_penalty(mut self, penalty: Score) -> Self {
        self.overrides.length_penalty = Some(penalty);
        self
    }

    /// Set early stopping for beam search.
    pub fn early_stopping(mut self, early: bool) -> Self {
        self.overrides.early_stopping = Some(early);
        self
    }

    /// Use greedy decoding (fastest, single beam).
    pub fn greedy(mut self) -> Self {
        self.overrides.num_beams = Some(1);
        self
    }

    /// Use high-quality beam search (6 beams, no early stopping).
    pub fn high_quality(self) -> Self {
        self.merge_overrides(Seq2SeqOverrides::high_quality())
    }

    // =========================================================================
    // Score Processing
    // =========================================================================

    /// Set n-gram blocking size (prevents repetition).
    ///
    /// - `0` = disabled
    /// - `3` = typical for summarization
    pub fn no_repeat_ngram_size(mut self, size: usize) -> Self {
        self.overrides.no_repeat_ngram_size = Some(size);
        self
    }

    /// Set repetition penalty.
    pub fn repetition_penalty(mut self, penalty: Score) -> Self {
        self.overrides.repetition_penalty = Some(penalty);
        self
    }

    /// Token sequences that must never be generated.
    pub fn bad_words(mut self, bad_words_ids: Vec<Vec<u32>>) -> Self {
        self.overrides.bad_words_ids = Some(bad_words_ids);
        self
    }

    /// Force the first generated token.
    pub fn forced_bos_token(mut self, token_id: u32) -> Self {
        self.overrides.forced_bos_token_id = Some(token_id);
        self
    }

    /// Force the last token before `max_length`.
    pub fn forced_eos_token(mut self, token_id: u32) -> Self {
        self.overrides.forced_eos_token_id = Some(token_id);
        self
    }

    // =========================================================================
    // Sampling
    // =========================================================================

    /// Draw candidates from the score distribution instead of taking the best.
    pub fn sampling(mut self, enabled: bool) -> Self {
        self.overrides.do_sample = Some(enabled);
        self
    }

    /// Set sampling temperature. Implies sampling.
    pub fn temperature(mut self, temperature: Score) -> Self {
        self.overrides.temperature = Some(temperature);
        self.sampling(true)
    }

    /// Keep only the `k` best tokens per beam. Implies sampling.
    pub fn top_k(mut self, k: usize) -> Self {
        self.overrides.top_k = Some(k);
        self.sampling(true)
    }

    /// Nucleus filtering. Implies sampling.
    pub fn top_p(mut self, p: Score) -> Self {
        self.overrides.top_p = Some(p);
        self.sampling(true)
    }

    /// Drop tokens below `min_p` times the best probability. Implies sampling.
    pub fn min_p(mut self, min_p: Score) -> Self {
        self.overrides.min_p = Some(min_p);
        self.sampling(true)
    }

    /// Seed the sampler for reproducible output.
    pub fn seed(mut self, seed: u64) -> Self {
        self.overrides.seed = Some(seed);
        self
    }

    // =========================================================================
    // Presets
    // =========================================================================

    /// Apply a preset of overrides.
    pub fn with_overrides(mut self, overrides: Seq2SeqOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Merge additional overrides with existing ones.
    pub fn merge_overrides(mut self, overrides: Seq2SeqOverrides) -> Self {
        self.overrides = self.overrides.merge(&overrides);
        self
    }

    /// Build the generator, rejecting settings the decoder cannot run.
    pub fn build(self) -> Seq2SeqResult<Seq2SeqGenerator<S>> {
        Seq2SeqGenerator::from_builder(self)
    }
}
