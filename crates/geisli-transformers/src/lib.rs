//! Beam search decoding for encoder-decoder transformer models
//!
//! This crate owns the decoding loop only. The forward pass, tokenization and
//! model loading live behind the [`StepScorer`] trait.

pub mod cache;
pub mod common;
pub mod encoder_decoder;

// Re-export commonly used items
pub use crate::{
    common::{
        CancellationHandle, CancellationToken, DecodeError, DecodeResult, GenerationConfig,
        SamplingParams, Score, ScorePipeline, ScoreProcessor, ScoredToken, SelectionStrategy,
    },
    cache::reorder_beam_caches,
    encoder_decoder::{
        BeamHypotheses, BeamInput, BeamScores, DecodeEvent, DecodeOutput, Hypothesis,
        StepScorer, StopReason, StreamedToken, decode, run_beam_search, run_beam_search_stream,
    },
};

// Prelude for easy imports
pub mod prelude {
    pub use crate::common::{CancellationToken, GenerationConfig, SamplingParams, Score};
    pub use crate::encoder_decoder::{BeamInput, BeamScores, StepScorer, run_beam_search};
}
