//! Generation config resolution for seq2seq models.
//!
//! Start with model defaults, apply only what the user explicitly set.

use geisli_transformers::GenerationConfig;

use super::types::{Seq2SeqOverrides, Seq2SeqResult};

/// Apply user overrides to a generation config.
///
/// Only modifies values that the user explicitly set (Some(...)).
/// Model defaults are preserved for everything else.
pub fn apply_overrides(config: &mut GenerationConfig, overrides: &Seq2SeqOverrides) {
    // Length control
    if let Some(v) = overrides.min_length {
        config.min_length = v;
    }
    if let Some(v) = overrides.max_length {
        config.max_length = v;
    }

    // Beam search
    if let Some(v) = overrides.num_beams {
        config.num_beams = v;
    }
    if let Some(v) = overrides.length_penalty {
        config.length_penalty = v;
    }
    if let Some(v) = overrides.early_stopping {
        config.early_stopping = v;
    }

    // Repetition control
    if let Some(v) = overrides.no_repeat_ngram_size {
        config.no_repeat_ngram_size = v;
    }
    if let Some(v) = overrides.repetition_penalty {
        config.repetition_penalty = v;
    }
    if let Some(v) = &overrides.bad_words_ids {
        config.bad_words_ids = v.clone();
    }

    // Forced tokens
    if let Some(v) = overrides.forced_bos_token_id {
        config.forced_bos_token_id = Some(v);
    }
    if let Some(v) = overrides.forced_eos_token_id {
        config.forced_eos_token_id = Some(v);
    }

    // Sampling
    let sampling = &mut config.sampling;
    if let Some(v) = overrides.do_sample {
        sampling.do_sample = v;
    }
    if let Some(v) = overrides.temperature {
        sampling.temperature = Some(v);
    }
    if let Some(v) = overrides.top_k {
        sampling.top_k = Some(v);
    }
    if let Some(v) = overrides.top_p {
        sampling.top_p = Some(v);
    }
    if let Some(v) = overrides.min_p {
        sampling.min_p = Some(v);
    }
    if let Some(v) = overrides.seed {
        sampling.seed = Some(v);
    }
}

/// Model defaults, then builder overrides, then per-call overrides.
pub fn resolve_generation_config(
    model_defaults: &GenerationConfig,
    user_overrides: &Seq2SeqOverrides,
    runtime_overrides: &Seq2SeqOverrides,
) -> Seq2SeqResult<GenerationConfig> {
    let mut config = model_defaults.clone();
    apply_overrides(&mut config, &user_overrides.merge(runtime_overrides));
    config.validate()?;
    Ok(config)
}
