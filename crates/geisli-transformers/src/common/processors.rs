//! Score adjustment pipeline.
//!
//! A [`ScorePipeline`] is an ordered list of [`ScoreProcessor`]s applied left
//! to right to each beam's vocabulary row before candidates are ranked.

use ndarray::{Array2, ArrayBase, DataMut, Ix1};

use super::sampling::{
    apply_bad_words_inplace, apply_no_repeat_ngram_inplace, apply_repetition_penalty_inplace,
    apply_temperature_inplace, min_p_filtering_inplace, top_k_filtering_inplace,
    top_p_filtering_inplace,
};
use super::{FILTER_VALUE, GenerationConfig, SamplingParams, Score};

/// What a processor may know about the beam whose row it rewrites.
#[derive(Clone, Copy, Debug)]
pub struct StepContext<'a> {
    /// Tokens of the beam so far, including the decoder start token.
    pub tokens: &'a [u32],
    /// Current sequence length.
    pub cur_len: usize,
    pub max_length: usize,
}

impl StepContext<'_> {
    /// True when the token chosen now is the last one the loop will generate.
    pub fn is_last_step(&self) -> bool {
        self.cur_len + 2 >= self.max_length
    }
}

/// One score transformation.
#[derive(Clone, Debug, PartialEq)]
pub enum ScoreProcessor {
    Temperature(Score),
    TopK {
        k: usize,
        filter_value: Score,
    },
    TopP {
        p: Score,
        min_size: usize,
        filter_value: Score,
    },
    MinP(Score),
    RepetitionPenalty(Score),
    NoRepeatNgram(usize),
    BadWords {
        sequences: Vec<Vec<u32>>,
        eos_token_id: u32,
    },
    MinLength {
        min_length: usize,
        eos_token_id: u32,
    },
    /// Only this token is allowed on the first step.
    ForcedBos(u32),
    /// Only this token is allowed on the last step.
    ForcedEos(u32),
}

impl ScoreProcessor {
    pub fn apply<S>(&self, row: &mut ArrayBase<S, Ix1>, ctx: &StepContext<'_>)
    where
        S: DataMut<Elem = Score>,
    {
        match self {
            ScoreProcessor::Temperature(t) => apply_temperature_inplace(row, *t),
            ScoreProcessor::TopK { k, filter_value } => {
                top_k_filtering_inplace(row, *k, *filter_value)
            }
            ScoreProcessor::TopP {
                p,
                min_size,
                filter_value,
            } => top_p_filtering_inplace(row, *p, *min_size, *filter_value),
            ScoreProcessor::MinP(p) => min_p_filtering_inplace(row, *p, FILTER_VALUE),
            ScoreProcessor::RepetitionPenalty(p) => {
                apply_repetition_penalty_inplace(row, ctx.tokens, *p)
            }
            ScoreProcessor::NoRepeatNgram(n) => apply_no_repeat_ngram_inplace(row, ctx.tokens, *n),
            ScoreProcessor::BadWords {
                sequences,
                eos_token_id,
            } => apply_bad_words_inplace(row, ctx.tokens, sequences, *eos_token_id),
            ScoreProcessor::MinLength {
                min_length,
                eos_token_id,
            } => {
                let eos = *eos_token_id as usize;
                if ctx.cur_len < *min_length && eos < row.len() {
                    row[eos] = Score::NEG_INFINITY;
                }
            }
            ScoreProcessor::ForcedBos(token) => {
                if ctx.cur_len == 1 {
                    force_token(row, *token);
                }
            }
            ScoreProcessor::ForcedEos(token) => {
                if ctx.is_last_step() {
                    force_token(row, *token);
                }
            }
        }
    }
}

fn force_token<S>(row: &mut ArrayBase<S, Ix1>, token: u32)
where
    S: DataMut<Elem = Score>,
{
    let idx = token as usize;
    if idx < row.len() {
        row.fill(Score::NEG_INFINITY);
        row[idx] = 0.0;
    }
}

/// An ordered, composable list of processors.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScorePipeline {
    processors: Vec<ScoreProcessor>,
}

impl ScorePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a processor.
    pub fn with(mut self, processor: ScoreProcessor) -> Self {
        self.processors.push(processor);
        self
    }

    /// Runs `self` first, then `next`.
    pub fn then(mut self, next: ScorePipeline) -> Self {
        self.processors.extend(next.processors);
        self
    }

    /// Temperature, top-k, top-p and min-p, in that order, for whichever are set.
    pub fn sampling(params: &SamplingParams, num_beams: usize) -> Self {
        let mut pipeline = Self::new();
        if let Some(t) = params.temperature {
            if t != 1.0 {
                pipeline = pipeline.with(ScoreProcessor::Temperature(t));
            }
        }
        if let Some(k) = params.top_k {
            pipeline = pipeline.with(ScoreProcessor::TopK {
                k,
                filter_value: FILTER_VALUE,
            });
        }
        if let Some(p) = params.top_p {
            pipeline = pipeline.with(ScoreProcessor::TopP {
                p,
                min_size: if num_beams > 1 { 2 } else { 1 },
                filter_value: FILTER_VALUE,
            });
        }
        if let Some(p) = params.min_p {
            pipeline = pipeline.with(ScoreProcessor::MinP(p));
        }
        pipeline
    }

    /// The gating filters: repetition, bad words, min length and forced tokens.
    pub fn filters(config: &GenerationConfig) -> Self {
        let mut pipeline = Self::new();
        if config.repetition_penalty != 1.0 {
            pipeline = pipeline.with(ScoreProcessor::RepetitionPenalty(config.repetition_penalty));
        }
        if config.no_repeat_ngram_size > 0 {
            pipeline = pipeline.with(ScoreProcessor::NoRepeatNgram(config.no_repeat_ngram_size));
        }
        if !config.bad_words_ids.is_empty() {
            pipeline = pipeline.with(ScoreProcessor::BadWords {
                sequences: config.bad_words_ids.clone(),
                eos_token_id: config.eos_token_id,
            });
        }
        pipeline = pipeline.with(ScoreProcessor::MinLength {
            min_length: config.min_length,
            eos_token_id: config.eos_token_id,
        });
        if let Some(id) = config.forced_bos_token_id {
            pipeline = pipeline.with(ScoreProcessor::ForcedBos(id));
        }
        if let Some(id) = config.forced_eos_token_id {
            pipeline = pipeline.with(ScoreProcessor::ForcedEos(id));
        }
        pipeline
    }

    /// Sampling processors followed by the gating filters.
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::sampling(&config.sampling, config.num_beams).then(Self::filters(config))
    }

    pub fn processors(&self) -> &[ScoreProcessor] {
        &self.processors
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    pub fn apply<S>(&self, row: &mut ArrayBase<S, Ix1>, ctx: &StepContext<'_>)
    where
        S: DataMut<Elem = Score>,
    {
        for processor in &self.processors {
            processor.apply(row, ctx);
        }
    }

    /// Applies the pipeline to row `i` with the tokens of beam `i`.
    pub fn apply_rows(&self, scores: &mut Array2<Score>, beams: &[Vec<u32>], max_length: usize) {
        for (mut row, tokens) in scores.outer_iter_mut().zip(beams) {
            let ctx = StepContext {
                tokens,
                cur_len: tokens.len(),
                max_length,
            };
            self.apply(&mut row, &ctx);
        }
    }
}
