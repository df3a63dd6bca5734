//! Candidate selection: turns per-beam score rows into a ranked candidate list.

use std::cmp::Ordering;

use ndarray::{Array2, ArrayView2};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::sampling::softmax_1d;
use super::{DecodeError, DecodeResult, SamplingParams, Score};

/// A candidate continuation. `beam_index` refers to the previous step's beams.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredToken {
    pub beam_index: usize,
    pub token_index: usize,
    pub score: Score,
}

impl ScoredToken {
    /// Descending by score, ties broken by discovery order.
    fn rank_cmp(&self, other: &Self) -> Ordering {
        other.score.total_cmp(&self.score).then_with(|| {
            (self.beam_index, self.token_index).cmp(&(other.beam_index, other.token_index))
        })
    }
}

/// How the decoder picks candidates each step.
#[derive(Clone, Debug)]
pub enum SelectionStrategy {
    /// Deterministic: the highest scores across all beams.
    TopK,
    /// Stochastic: softmax draws without replacement within each beam.
    Multinomial(StdRng),
}

impl SelectionStrategy {
    pub fn top_k() -> Self {
        SelectionStrategy::TopK
    }

    pub fn multinomial(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        SelectionStrategy::Multinomial(rng)
    }

    pub fn from_params(params: &SamplingParams) -> Self {
        if params.do_sample {
            Self::multinomial(params.seed)
        } else {
            Self::top_k()
        }
    }

    /// Ranked candidates, best first, at most `result_size` per the strategy's rules.
    pub fn select_next(
        &mut self,
        scores: &Array2<Score>,
        result_size: usize,
    ) -> DecodeResult<Vec<ScoredToken>> {
        match self {
            SelectionStrategy::TopK => Ok(select_next_top_k(scores.view(), result_size)),
            SelectionStrategy::Multinomial(rng) => {
                select_next_multinomial(scores.view(), result_size, rng)
            }
        }
    }
}

/// The `result_size` best `(beam, token)` pairs over every row.
///
/// Keeps a bounded buffer instead of sorting `beams × vocab` scores.
pub fn select_next_top_k(scores: ArrayView2<'_, Score>, result_size: usize) -> Vec<ScoredToken> {
    let capacity = result_size.min(scores.len());
    let mut buffer: Vec<ScoredToken> = Vec::with_capacity(capacity);
    if capacity == 0 {
        return buffer;
    }
    let mut worst = 0;

    for (beam_index, row) in scores.outer_iter().enumerate() {
        for (token_index, &score) in row.iter().enumerate() {
            let candidate = ScoredToken {
                beam_index,
                token_index,
                score,
            };
            if buffer.len() < capacity {
                buffer.push(candidate);
                if buffer.len() == capacity {
                    worst = worst_position(&buffer);
                }
            } else if score > buffer[worst].score {
                buffer[worst] = candidate;
                worst = worst_position(&buffer);
            }
        }
    }

    buffer.sort_by(ScoredToken::rank_cmp);
    buffer
}

// Among equal minima the latest discovered goes first.
fn worst_position(buffer: &[ScoredToken]) -> usize {
    buffer
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.rank_cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Draws `result_size` distinct tokens per beam from the softmax of its row.
///
/// Each drawn token's weight is zeroed before the next draw, so later draws
/// come from the remaining mass. The aggregate is sorted by raw score, ties
/// keeping draw order.
pub fn select_next_multinomial<R: Rng>(
    scores: ArrayView2<'_, Score>,
    result_size: usize,
    rng: &mut R,
) -> DecodeResult<Vec<ScoredToken>> {
    let mut result = Vec::with_capacity(scores.nrows() * result_size.min(scores.ncols()));

    for (beam_index, row) in scores.outer_iter().enumerate() {
        let mut weights = softmax_1d(&row).to_vec();
        let available = weights.iter().filter(|&&p| p > 0.0).count();
        let exhausted = || DecodeError::SamplingExhausted {
            beam: beam_index,
            requested: result_size,
            available,
        };
        if available < result_size {
            return Err(exhausted());
        }

        for _ in 0..result_size {
            // rebuilt each draw: an incremental total rounds to zero once a dominant peak is removed
            let dist = WeightedIndex::new(&weights).map_err(|_| exhausted())?;
            let idx = dist.sample(rng);
            weights[idx] = 0.0;
            result.push(ScoredToken {
                beam_index,
                token_index: idx,
                score: row[idx],
            });
        }
    }

    result.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(result)
}
