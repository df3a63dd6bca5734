//! Core Seq2SeqGenerator implementation.

use std::pin::Pin;
use std::sync::Arc;

use futures::channel::mpsc;
use futures::{SinkExt, Stream, StreamExt, pin_mut};

use geisli_transformers::{
    CancellationToken, DecodeEvent, DecodeOutput, GenerationConfig, ScorePipeline,
    SelectionStrategy, StepScorer, decode, run_beam_search_stream,
};

use crate::models::Seq2SeqModel;

use super::builder::Seq2SeqGeneratorBuilder;
use super::resolution::resolve_generation_config;
use super::types::{Seq2SeqError, Seq2SeqOverrides, Seq2SeqResult};

/// Boxed stream of decode events, as returned by [`Seq2SeqGenerator::stream`].
pub type DecodeEventStream = Pin<Box<dyn Stream<Item = Seq2SeqResult<DecodeEvent>> + Send>>;

/// Beam search generator bound to one scorer.
///
/// Holds the scorer's default generation config and the overrides given at
/// build time. Every call resolves the final config from model defaults,
/// builder overrides and per-call overrides, in that order.
///
/// # Example
///
/// ```ignore
/// use geisli::models::BigramModel;
/// use geisli::seq2seq::{Seq2SeqGenerator, Seq2SeqOverrides};
///
/// let model = BigramModel::from_path("tiny.json")?;
/// let generator = Seq2SeqGenerator::model_builder(model)
///     .num_beams(4)
///     .max_length(32)
///     .build()?;
///
/// let output = generator.generate().await?;
/// let greedy = generator.generate_with_config(&Seq2SeqOverrides::greedy()).await?;
/// ```
pub struct Seq2SeqGenerator<S> {
    /// The scorer (wrapped in Arc for streaming).
    scorer: Arc<S>,

    /// Generation config the scorer was built for.
    model_defaults: GenerationConfig,

    /// User-provided overrides (stored for re-resolution with runtime overrides).
    user_overrides: Seq2SeqOverrides,
}

impl<S: StepScorer + 'static> Seq2SeqGenerator<S> {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Create a generator that runs with the model defaults.
    pub fn new(scorer: S, model_defaults: GenerationConfig) -> Seq2SeqResult<Self> {
        Seq2SeqGeneratorBuilder::new(scorer, model_defaults).build()
    }

    /// Create a builder for custom configuration.
    pub fn builder(scorer: S, model_defaults: GenerationConfig) -> Seq2SeqGeneratorBuilder<S> {
        Seq2SeqGeneratorBuilder::new(scorer, model_defaults)
    }

    /// Internal: construct from builder.
    pub(crate) fn from_builder(builder: Seq2SeqGeneratorBuilder<S>) -> Seq2SeqResult<Self> {
        // Fail at build time rather than on the first call
        resolve_generation_config(
            &builder.model_defaults,
            &builder.overrides,
            &Seq2SeqOverrides::default(),
        )?;

        Ok(Self {
            scorer: Arc::new(builder.scorer),
            model_defaults: builder.model_defaults,
            user_overrides: builder.overrides,
        })
    }

    // =========================================================================
    // Generation
    // =========================================================================

    /// Decode with the builder settings.
    pub async fn generate(&self) -> Seq2SeqResult<DecodeOutput> {
        self.generate_with_config(&Seq2SeqOverrides::default())
            .await
    }

    /// Decode with custom overrides for this call only.
    ///
    /// Runtime overrides are merged with user overrides (from builder).
    /// Runtime takes precedence.
    pub async fn generate_with_config(
        &self,
        runtime_overrides: &Seq2SeqOverrides,
    ) -> Seq2SeqResult<DecodeOutput> {
        self.generate_cancellable(runtime_overrides, &CancellationToken::never())
            .await
    }

    /// Decode until finished or until `cancel` fires.
    ///
    /// A cancelled decode is not an error: the output carries the hypotheses
    /// found so far and [`StopReason::Cancelled`](geisli_transformers::StopReason::Cancelled).
    pub async fn generate_cancellable(
        &self,
        runtime_overrides: &Seq2SeqOverrides,
        cancel: &CancellationToken,
    ) -> Seq2SeqResult<DecodeOutput> {
        let config = self.resolve_config(runtime_overrides)?;
        log::debug!(
            "decoding with {} beams, max_length {}, sampling {}",
            config.num_beams,
            config.max_length,
            config.sampling.do_sample
        );

        let pipeline = ScorePipeline::from_config(&config);
        let selection = SelectionStrategy::from_params(&config.sampling);
        let output = decode(self.scorer.as_ref(), &config, &pipeline, selection, cancel).await?;

        Ok(output)
    }

    /// Stream decode events.
    ///
    /// Decoding runs on a spawned tokio task; dropping the stream stops it
    /// after the current step. Must be called from within a tokio runtime.
    pub fn stream(&self, runtime_overrides: &Seq2SeqOverrides) -> Seq2SeqResult<DecodeEventStream> {
        self.stream_cancellable(runtime_overrides, CancellationToken::never())
    }

    /// Stream with an external cancellation token.
    pub fn stream_cancellable(
        &self,
        runtime_overrides: &Seq2SeqOverrides,
        cancel: CancellationToken,
    ) -> Seq2SeqResult<DecodeEventStream> {
        let config = self.resolve_config(runtime_overrides)?;

        // Clone/own everything we need for the spawned task
        let scorer = Arc::clone(&self.scorer);
        let (mut tx, rx) = mpsc::channel::<Seq2SeqResult<DecodeEvent>>(32);

        tokio::spawn(async move {
            let stream = run_beam_search_stream(scorer.as_ref(), &config, cancel);
            pin_mut!(stream);

            while let Some(result) = stream.next().await {
                let msg = result.map_err(Seq2SeqError::from);
                if tx.send(msg).await.is_err() {
                    log::debug!("stream receiver dropped, stopping decode");
                    break;
                }
            }
        });

        Ok(Box::pin(rx))
    }

    // =========================================================================
    // Config Access
    // =========================================================================

    /// The config a call with `runtime_overrides` would decode with.
    pub fn resolve_config(
        &self,
        runtime_overrides: &Seq2SeqOverrides,
    ) -> Seq2SeqResult<GenerationConfig> {
        resolve_generation_config(&self.model_defaults, &self.user_overrides, runtime_overrides)
    }

    /// Get the model's default generation config.
    pub fn model_defaults(&self) -> &GenerationConfig {
        &self.model_defaults
    }

    /// Overrides given at build time.
    pub fn user_overrides(&self) -> &Seq2SeqOverrides {
        &self.user_overrides
    }

    /// Get a reference to the underlying scorer.
    pub fn scorer(&self) -> &S {
        &self.scorer
    }
}

impl<M: Seq2SeqModel + 'static> Seq2SeqGenerator<M> {
    /// Create a generator with the model's own defaults.
    pub fn for_model(model: M) -> Seq2SeqResult<Self> {
        Self::model_builder(model).build()
    }

    /// Builder seeded with the model's own defaults.
    pub fn model_builder(model: M) -> Seq2SeqGeneratorBuilder<M> {
        let defaults = model.default_generation_config();
        Seq2SeqGeneratorBuilder::new(model, defaults)
    }

    pub fn model_name(&self) -> &str {
        self.scorer.name()
    }

    /// Render token ids with the model's vocabulary.
    pub fn detokenize(&self, tokens: &[u32]) -> String {
        self.scorer.decode_tokens(tokens)
    }

    /// Decode and return the best hypothesis as text.
    pub async fn generate_text(&self) -> Seq2SeqResult<String> {
        let output = self.generate().await?;
        Ok(output
            .best()
            .map(|(tokens, _)| self.detokenize(tokens))
            .unwrap_or_default())
    }
}
