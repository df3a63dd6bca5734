use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::seq2seq::Seq2SeqOverrides;

/// Top-level Geisli configuration.
///
/// Loaded from geisli.toml, provides defaults for decode runs.
/// CLI flags always override these settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GeisliConfig {
    /// Generation overrides applied on top of model defaults
    #[serde(default)]
    pub generation: Seq2SeqOverrides,

    /// Model selection
    #[serde(default)]
    pub model: ModelConfig,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

// =============================================================================
// Model
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ModelConfig {
    /// Bigram model file used when `--model` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

// =============================================================================
// Output Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Print hypothesis scores next to the text.
    #[serde(default = "default_true")]
    pub scores: bool,
    #[serde(default = "default_true")]
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            scores: true,
            color: true,
        }
    }
}

fn default_true() -> bool {
    true
}
