//! Geisli - beam search text generation over pluggable scorers
//!
//! This crate wraps the `geisli-transformers` decoder with a generator API,
//! TOML configuration and a small reference model.

pub mod geisli_config;
pub mod geisli_config_loader;
pub mod models;
pub mod seq2seq;

pub use geisli_config::{GeisliConfig, ModelConfig, OutputConfig, OutputFormat};
pub use geisli_config_loader::{config_search_paths, load_config, load_config_from_path};
pub use models::{BigramModel, Seq2SeqModel};
pub use seq2seq::{Seq2SeqError, Seq2SeqGenerator, Seq2SeqOverrides, Seq2SeqResult};

// Re-export core types
pub use geisli_transformers::{
    CancellationHandle, CancellationToken, DecodeEvent, DecodeOutput, GenerationConfig, Score,
    StepScorer, StopReason, StreamedToken,
};
