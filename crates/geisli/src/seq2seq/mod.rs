//! Text-to-text generation with beam search.
//!
//! This module provides `Seq2SeqGenerator`, which binds a scorer to its
//! default generation settings and layers user overrides on top.
//!
//! # Quick Start
//!
//! ```ignore
//! use geisli::seq2seq::Seq2SeqGenerator;
//!
//! // One-liner
//! let output = geisli::seq2seq::generate("models/tiny.json").await?;
//!
//! // Reusable instance
//! let model = geisli::models::BigramModel::from_path("models/tiny.json")?;
//! let generator = Seq2SeqGenerator::for_model(model)?;
//! let text = generator.generate_text().await?;
//! ```
//!
//! # Configuration
//!
//! ```ignore
//! use geisli::seq2seq::{Seq2SeqGenerator, Seq2SeqOverrides};
//!
//! // Builder pattern
//! let generator = Seq2SeqGenerator::model_builder(model)
//!     .num_beams(6)           // Higher quality
//!     .max_length(256)        // Longer outputs
//!     .build()?;
//!
//! // Runtime overrides
//! let output = generator
//!     .generate_with_config(&Seq2SeqOverrides::greedy())
//!     .await?;
//! ```
//!
//! # Streaming
//!
//! ```ignore
//! use futures::StreamExt;
//! use geisli_transformers::DecodeEvent;
//!
//! let mut stream = generator.stream(&Seq2SeqOverrides::greedy())?;
//! while let Some(event) = stream.next().await {
//!     if let DecodeEvent::Token(token) = event? {
//!         print!("{} ", token.id);
//!     }
//! }
//! ```

mod builder;
mod model;
mod resolution;
mod types;

// Re-exports
pub use builder::Seq2SeqGeneratorBuilder;
pub use model::{DecodeEventStream, Seq2SeqGenerator};
pub use resolution::{apply_overrides, resolve_generation_config};
pub use types::{Seq2SeqError, Seq2SeqOverrides, Seq2SeqResult};

use std::path::Path;

use crate::models::BigramModel;

/// Load a bigram model file and decode with its defaults.
///
/// # Example
///
/// ```ignore
/// let text = geisli::seq2seq::generate("models/tiny.json").await?;
/// ```
///
/// For repeated generation, create a `Seq2SeqGenerator` instead.
pub async fn generate(model_path: impl AsRef<Path>) -> Seq2SeqResult<String> {
    generate_with_config(model_path, Seq2SeqOverrides::default()).await
}

/// Load a bigram model file and decode with custom overrides.
pub async fn generate_with_config(
    model_path: impl AsRef<Path>,
    overrides: Seq2SeqOverrides,
) -> Seq2SeqResult<String> {
    let model_path = model_path.as_ref();
    let model = BigramModel::from_path(model_path).map_err(|source| Seq2SeqError::LoadFailed {
        model: model_path.display().to_string(),
        source,
    })?;

    Seq2SeqGenerator::model_builder(model)
        .with_overrides(overrides)
        .build()?
        .generate_text()
        .await
}

#[cfg(test)]
mod send_sync_tests {
    use super::*;

    const _: () = {
        const fn assert_send<T: Send>() {}
        const fn assert_sync<T: Sync>() {}

        assert_send::<Seq2SeqGenerator<BigramModel>>();
        assert_sync::<Seq2SeqGenerator<BigramModel>>();

        assert_send::<Seq2SeqGeneratorBuilder<BigramModel>>();
        assert_sync::<Seq2SeqGeneratorBuilder<BigramModel>>();

        assert_send::<Seq2SeqOverrides>();
        assert_sync::<Seq2SeqOverrides>();

        assert_send::<Seq2SeqError>();
        assert_sync::<Seq2SeqError>();
    };
}
