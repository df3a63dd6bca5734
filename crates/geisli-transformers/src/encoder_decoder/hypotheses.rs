use crate::common::Score;

/// Larger trackers grow on demand.
const MAX_PREALLOCATED: usize = 256;

/// A finished sequence with its length-normalized score.
#[derive(Clone, Debug, PartialEq)]
pub struct Hypothesis {
    pub tokens: Vec<u32>,
    pub score: Score,
}

/// `cumulative / len^length_penalty`. A penalty of 0 leaves the score unchanged.
pub fn normalized_score(cumulative: Score, len: usize, length_penalty: Score) -> Score {
    cumulative / (len as Score).powf(length_penalty)
}

/// The best `num_beams` finished hypotheses, kept sorted best first.
#[derive(Clone, Debug)]
pub struct BeamHypotheses {
    hypotheses: Vec<Hypothesis>,
    num_beams: usize,
    length_penalty: Score,
    early_stopping: bool,
}

impl BeamHypotheses {
    pub fn new(num_beams: usize, length_penalty: Score, early_stopping: bool) -> Self {
        Self {
            hypotheses: Vec::with_capacity(num_beams.min(MAX_PREALLOCATED)),
            num_beams,
            length_penalty,
            early_stopping,
        }
    }

    /// Offers a finished sequence. Returns whether it was kept.
    ///
    /// When full, the candidate must beat the current worst, which it then evicts.
    /// Sequences with a cumulative score of `-inf` are never kept.
    pub fn insert(&mut self, tokens: Vec<u32>, cumulative: Score) -> bool {
        if cumulative == Score::NEG_INFINITY || self.num_beams == 0 {
            return false;
        }
        let score = normalized_score(cumulative, tokens.len(), self.length_penalty);

        if self.hypotheses.len() >= self.num_beams {
            if score <= self.worst_score() {
                return false;
            }
            self.hypotheses.pop();
        }

        self.hypotheses.push(Hypothesis { tokens, score });
        // stable: equal scores keep insertion order
        self.hypotheses.sort_by(|a, b| b.score.total_cmp(&a.score));
        true
    }

    /// Whether no live beam can still improve the tracked set.
    ///
    /// `best_score` is the best cumulative score seen this step and `cur_len`
    /// the length it is normalized with.
    pub fn is_done(&self, best_score: Score, cur_len: usize) -> bool {
        if self.hypotheses.len() < self.num_beams {
            return false;
        }
        if self.early_stopping {
            return true;
        }
        let highest_attainable = normalized_score(best_score, cur_len, self.length_penalty);
        self.worst_score() >= highest_attainable
    }

    /// Score of the worst kept hypothesis, `-inf` when empty.
    pub fn worst_score(&self) -> Score {
        self.hypotheses
            .last()
            .map(|h| h.score)
            .unwrap_or(Score::NEG_INFINITY)
    }

    pub fn best(&self) -> Option<&Hypothesis> {
        self.hypotheses.first()
    }

    pub fn len(&self) -> usize {
        self.hypotheses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hypothesis> {
        self.hypotheses.iter()
    }

    /// Consumes the tracker, best first.
    pub fn into_sorted(self) -> Vec<Hypothesis> {
        self.hypotheses
    }
}
