//! The scoring collaborator the decoder drives.
use anyhow::Result;
use async_trait::async_trait;
use futures::future::try_join_all;
use ndarray::Array1;

use crate::common::Score;

/// One active beam handed to the scorer.
#[derive(Debug)]
pub struct BeamInput<'a, C> {
    /// Position of this beam in the current step.
    pub beam_index: usize,
    /// Index of the previous step's beam this one extends. `None` on the first step.
    pub origin: Option<usize>,
    /// Every token of the beam, starting with the decoder start token.
    pub tokens: &'a [u32],
    /// The cache produced for the origin beam, already reordered.
    pub cache: Option<C>,
}

/// The scorer's answer for one beam.
#[derive(Clone, Debug)]
pub struct BeamScores<C> {
    /// Unnormalized log-space scores, one per vocabulary entry.
    pub scores: Array1<Score>,
    pub cache: C,
}

/// Scores the next token of each active beam.
///
/// Implementations may hold a shared read-only model; `score_beam` is called
/// concurrently for the beams of one step.
#[async_trait]
pub trait StepScorer: Send + Sync {
    /// Incremental decoder state. The decoder never inspects it, only moves
    /// and clones it to follow beam reordering.
    type Cache: Clone + Send + Sync;

    async fn score_beam(&self, input: BeamInput<'_, Self::Cache>) -> Result<BeamScores<Self::Cache>>;

    /// Scores every active beam of a step. Results must come back in input order.
    ///
    /// The default fans out one `score_beam` per beam and waits for all of them.
    async fn score_beams(
        &self,
        inputs: Vec<BeamInput<'_, Self::Cache>>,
    ) -> Result<Vec<BeamScores<Self::Cache>>> {
        try_join_all(inputs.into_iter().map(|input| self.score_beam(input))).await
    }
}
