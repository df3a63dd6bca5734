//! A bigram language model loaded from JSON.
//!
//! Scores the next token from the previous one only. It is small enough to
//! write by hand, which makes decoder behavior easy to reproduce from the CLI.
//!
//! ```json
//! {
//!   "name": "toy",
//!   "vocab": ["<s>", "<pad>", "</s>", "the", "cat"],
//!   "special_tokens": { "bos": 0, "eos": 2, "pad": 1 },
//!   "fallback_logit": -10.0,
//!   "transitions": { "0": { "3": 3.0 }, "3": { "4": 2.0 }, "4": { "2": 3.0 } },
//!   "generation": { "num_beams": 2, "max_length": 12 }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use geisli_transformers::common::log_softmax_1d;
use geisli_transformers::{BeamInput, BeamScores, GenerationConfig, Score, StepScorer};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::seq2seq::{Seq2SeqOverrides, apply_overrides};

use super::Seq2SeqModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SpecialTokens {
    /// Also the decoder start token.
    pub bos: u32,
    pub eos: u32,
    #[serde(default)]
    pub pad: Option<u32>,
}

impl SpecialTokens {
    pub fn contains(&self, id: u32) -> bool {
        id == self.bos || id == self.eos || self.pad == Some(id)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BigramFile {
    #[serde(default)]
    name: Option<String>,
    vocab: Vec<String>,
    special_tokens: SpecialTokens,
    #[serde(default = "default_fallback_logit")]
    fallback_logit: Score,
    #[serde(default)]
    transitions: HashMap<u32, HashMap<u32, Score>>,
    #[serde(default)]
    generation: Seq2SeqOverrides,
}

fn default_fallback_logit() -> Score {
    -10.0
}

/// Per-beam state: the token the beam ended with when it was last scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BigramCache {
    pub last_token: u32,
    pub steps: usize,
}

#[derive(Debug, Clone)]
pub struct BigramModel {
    name: String,
    vocab: Vec<String>,
    token_ids: HashMap<String, u32>,
    special: SpecialTokens,
    fallback_logit: Score,
    transitions: HashMap<u32, HashMap<u32, Score>>,
    generation: Seq2SeqOverrides,
}

impl BigramModel {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: BigramFile = serde_json::from_str(json).context("invalid bigram model JSON")?;
        Self::from_file(file, "bigram")
    }

    /// Loads a model file. The name defaults to the file stem.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read model file '{}'", path.display()))?;
        let file: BigramFile = serde_json::from_str(&contents)
            .with_context(|| format!("invalid bigram model JSON in '{}'", path.display()))?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("bigram");

        let model = Self::from_file(file, stem)?;
        log::info!(
            "loaded bigram model '{}' ({} tokens) from {}",
            model.name,
            model.vocab.len(),
            path.display()
        );
        Ok(model)
    }

    fn from_file(file: BigramFile, fallback_name: &str) -> Result<Self> {
        let vocab_size = file.vocab.len();
        if vocab_size == 0 {
            bail!("vocabulary is empty");
        }
        if !file.fallback_logit.is_finite() {
            bail!("fallback_logit must be finite");
        }

        let mut token_ids = HashMap::with_capacity(vocab_size);
        for (id, token) in file.vocab.iter().enumerate() {
            if token_ids.insert(token.clone(), id as u32).is_some() {
                bail!("token '{}' appears twice in the vocabulary", token);
            }
        }

        let in_vocab = |id: u32| (id as usize) < vocab_size;
        let special = file.special_tokens;
        for (name, id) in [("bos", Some(special.bos)), ("eos", Some(special.eos)), ("pad", special.pad)] {
            if let Some(id) = id {
                if !in_vocab(id) {
                    bail!("special token {} = {} is outside the vocabulary (size {})", name, id, vocab_size);
                }
            }
        }

        for (&from, row) in &file.transitions {
            if !in_vocab(from) {
                bail!("transition from unknown token id {}", from);
            }
            for (&to, &logit) in row {
                if !in_vocab(to) {
                    bail!("transition {} -> {} targets an unknown token id", from, to);
                }
                if !logit.is_finite() {
                    bail!("transition {} -> {} has a non-finite logit", from, to);
                }
            }
        }

        Ok(Self {
            name: file.name.unwrap_or_else(|| fallback_name.to_string()),
            vocab: file.vocab,
            token_ids,
            special,
            fallback_logit: file.fallback_logit,
            transitions: file.transitions,
            generation: file.generation,
        })
    }

    pub fn special_tokens(&self) -> SpecialTokens {
        self.special
    }

    pub fn token_id(&self, token: &str) -> Option<u32> {
        self.token_ids.get(token).copied()
    }

    pub fn token_str(&self, id: u32) -> Option<&str> {
        self.vocab.get(id as usize).map(String::as_str)
    }

    /// Splits on whitespace and looks up every word.
    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        text.split_whitespace()
            .map(|word| {
                self.token_id(word)
                    .ok_or_else(|| anyhow!("'{}' is not in the vocabulary of '{}'", word, self.name))
            })
            .collect()
    }

    /// Joins tokens with single spaces.
    pub fn decode(&self, tokens: &[u32], skip_special: bool) -> String {
        tokens
            .iter()
            .filter(|&&id| !(skip_special && self.special.contains(id)))
            .map(|&id| self.token_str(id).unwrap_or("<unk>"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Raw logits for the token following `last`.
    pub fn logits(&self, last: u32) -> Array1<Score> {
        let mut logits = Array1::from_elem(self.vocab.len(), self.fallback_logit);
        if let Some(row) = self.transitions.get(&last) {
            for (&to, &logit) in row {
                logits[to as usize] = logit;
            }
        }
        logits
    }

    /// Log-probabilities for the token following `last`.
    pub fn next_token_scores(&self, last: u32) -> Array1<Score> {
        log_softmax_1d(&self.logits(last))
    }
}

#[async_trait]
impl StepScorer for BigramModel {
    type Cache = BigramCache;

    async fn score_beam(&self, input: BeamInput<'_, BigramCache>) -> Result<BeamScores<BigramCache>> {
        let (&last, history) = input
            .tokens
            .split_last()
            .ok_or_else(|| anyhow!("beam {} has no tokens", input.beam_index))?;

        let steps = match input.cache {
            Some(cache) => {
                if history.last() != Some(&cache.last_token) {
                    bail!(
                        "cache of beam {} is out of sync: it ends with {} but the beam history is {:?}",
                        input.beam_index,
                        cache.last_token,
                        history
                    );
                }
                cache.steps + 1
            }
            None => 1,
        };

        Ok(BeamScores {
            scores: self.next_token_scores(last),
            cache: BigramCache {
                last_token: last,
                steps,
            },
        })
    }
}

impl Seq2SeqModel for BigramModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    fn default_generation_config(&self) -> GenerationConfig {
        let mut config = GenerationConfig {
            eos_token_id: self.special.eos,
            pad_token_id: self.special.pad,
            decoder_start_token_id: self.special.bos,
            vocab_size: self.vocab.len(),
            is_encoder_decoder: false,
            ..Default::default()
        };
        apply_overrides(&mut config, &self.generation);
        config
    }

    fn decode_tokens(&self, tokens: &[u32]) -> String {
        self.decode(tokens, true)
    }
}

/// Nine-token model used by tests across the crate.
#[cfg(test)]
pub(crate) const TINY_MODEL_JSON: &str = r#"{
    "name": "tiny",
    "vocab": ["<s>", "<pad>", "</s>", "the", "cat", "sat", "on", "mat", "dog"],
    "special_tokens": { "bos": 0, "eos": 2, "pad": 1 },
    "fallback_logit": -10.0,
    "transitions": {
        "0": { "3": 3.0 },
        "3": { "4": 2.0, "8": 1.0 },
        "4": { "5": 2.0 },
        "8": { "5": 2.0 },
        "5": { "6": 2.0 },
        "6": { "7": 2.0 },
        "7": { "2": 3.0 }
    },
    "generation": { "num_beams": 2, "max_length": 12 }
}"#;
