//! Beam search over an encoder-decoder model's next-token scores.
//!
//! The decoder owns the beams; a [`StepScorer`] owns the model and its caches.

mod beams;
mod hypotheses;
pub mod traits;

pub use beams::{
    DecodeEvent, DecodeOutput, StopReason, StreamedToken, decode, run_beam_search,
    run_beam_search_stream,
};
pub use hypotheses::{BeamHypotheses, Hypothesis, normalized_score};
pub use traits::{BeamInput, BeamScores, StepScorer};
