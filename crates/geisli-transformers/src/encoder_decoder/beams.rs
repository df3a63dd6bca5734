use async_stream::try_stream;
use futures::stream::Stream;
use ndarray::Array2;

use crate::cache::reorder_beam_caches;
use crate::common::{
    CancellationToken, DecodeError, DecodeResult, GenerationConfig, Score, ScorePipeline,
    ScoredToken, SelectionStrategy,
};
use crate::encoder_decoder::hypotheses::BeamHypotheses;
use crate::encoder_decoder::traits::{BeamInput, BeamScores, StepScorer};

/// Why a decode call stopped stepping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The hypothesis tracker reported that no live beam can improve it.
    EarlyStop,
    /// The loop ran up to `max_length`; live beams were flushed.
    MaxLength,
    /// No candidate could extend any beam.
    Exhausted,
    /// The cancellation token fired; live beams were flushed.
    Cancelled,
}

/// Result of one decode call, best hypothesis first.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodeOutput {
    /// Token ids including the decoder start token. Sequences shorter than
    /// `max_length` end with the EOS token.
    pub sequences: Vec<Vec<u32>>,
    pub scores: Vec<Score>,
    pub stop_reason: StopReason,
    /// Number of completed decoding steps.
    pub steps: usize,
}

impl DecodeOutput {
    pub fn best(&self) -> Option<(&[u32], Score)> {
        self.sequences
            .first()
            .zip(self.scores.first())
            .map(|(tokens, &score)| (tokens.as_slice(), score))
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

/// Newest token of the leading beam after a step.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamedToken {
    pub id: u32,
    /// Length of the leading beam including this token.
    pub cur_len: usize,
    /// Cumulative score of the leading beam.
    pub score: Score,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DecodeEvent {
    Token(StreamedToken),
    Finished(DecodeOutput),
}

enum StepOutcome {
    Continue,
    EarlyStop,
    Exhausted,
}

struct BeamContext<'a, S: StepScorer> {
    scorer: &'a S,
    config: &'a GenerationConfig,
    pipeline: &'a ScorePipeline,
    selection: SelectionStrategy,

    sequences: Vec<Vec<u32>>,
    scores: Vec<Score>,
    caches: Vec<S::Cache>,
    origins: Vec<usize>,
    finished: BeamHypotheses,

    cur_len: usize,
    steps: usize,
}

impl<'a, S: StepScorer> BeamContext<'a, S> {
    fn new(
        scorer: &'a S,
        config: &'a GenerationConfig,
        pipeline: &'a ScorePipeline,
        selection: SelectionStrategy,
    ) -> DecodeResult<Self> {
        config.validate()?;

        Ok(Self {
            scorer,
            config,
            pipeline,
            selection,
            sequences: vec![vec![config.decoder_start_token_id]],
            scores: vec![0.0],
            caches: Vec::new(),
            origins: Vec::new(),
            finished: BeamHypotheses::new(
                config.num_beams,
                config.length_penalty,
                config.early_stopping,
            ),
            cur_len: 1,
            steps: 0,
        })
    }

    fn has_steps_left(&self) -> bool {
        self.cur_len < self.config.max_length - 1
    }

    async fn score_active_beams(&mut self) -> DecodeResult<(Array2<Score>, Vec<S::Cache>)> {
        let active = self.sequences.len();
        let vocab_size = self.config.vocab_size;

        let mut caches = std::mem::take(&mut self.caches).into_iter();
        let inputs: Vec<_> = self
            .sequences
            .iter()
            .enumerate()
            .map(|(beam_index, tokens)| BeamInput {
                beam_index,
                origin: self.origins.get(beam_index).copied(),
                tokens,
                cache: caches.next(),
            })
            .collect();

        let results = self
            .scorer
            .score_beams(inputs)
            .await
            .map_err(|source| DecodeError::Scorer {
                cur_len: self.cur_len,
                source,
            })?;

        if results.len() != active {
            return Err(DecodeError::ResultCountMismatch {
                expected: active,
                actual: results.len(),
            });
        }

        let mut scores = Array2::zeros((active, vocab_size));
        let mut new_caches = Vec::with_capacity(active);
        for (beam, (BeamScores { scores: row, cache }, mut target)) in results
            .into_iter()
            .zip(scores.outer_iter_mut())
            .enumerate()
        {
            if row.len() != vocab_size {
                return Err(DecodeError::VocabSizeMismatch {
                    beam,
                    expected: vocab_size,
                    actual: row.len(),
                });
            }
            if row.iter().any(|s| s.is_nan()) {
                return Err(DecodeError::NanScores { beam });
            }
            target.assign(&row);
            new_caches.push(cache);
        }

        Ok((scores, new_caches))
    }

    async fn step(&mut self) -> DecodeResult<StepOutcome> {
        let num_beams = self.config.num_beams;
        let eos = self.config.eos_token_id;

        let (mut step_scores, new_caches) = self.score_active_beams().await?;

        self.pipeline
            .apply_rows(&mut step_scores, &self.sequences, self.config.max_length);

        // rank on total path score
        for (mut row, &cumulative) in step_scores.outer_iter_mut().zip(&self.scores) {
            row += cumulative;
        }

        let ranked = self
            .selection
            .select_next(&step_scores, self.config.candidate_count()?)?;
        log::trace!("length {}: candidates {:?}", self.cur_len, ranked);

        let live = num_beams.min(ranked.len());
        let mut next_sequences = Vec::with_capacity(live);
        let mut next_scores = Vec::with_capacity(live);
        let mut next_origins = Vec::with_capacity(live);

        for (rank, &ScoredToken {
            beam_index,
            token_index,
            score,
        }) in ranked.iter().enumerate()
        {
            // masked; everything after it is masked too
            if score == Score::NEG_INFINITY {
                break;
            }
            let token = token_index as u32;
            if token == eos {
                if rank < num_beams {
                    self.finished
                        .insert(self.sequences[beam_index].clone(), score);
                }
                continue;
            }

            let mut tokens = Vec::with_capacity(self.cur_len + 1);
            tokens.extend_from_slice(&self.sequences[beam_index]);
            tokens.push(token);
            next_sequences.push(tokens);
            next_scores.push(score);
            next_origins.push(beam_index);

            if next_sequences.len() == num_beams {
                break;
            }
        }

        let best_score = ranked
            .first()
            .map(|c| c.score)
            .unwrap_or(Score::NEG_INFINITY);
        let done = self.finished.is_done(best_score, self.cur_len);

        log::debug!(
            "length {}: {} live beams, {} finished, best {:.4}",
            self.cur_len,
            next_sequences.len(),
            self.finished.len(),
            best_score
        );

        self.caches = reorder_beam_caches(new_caches, &next_origins);
        self.sequences = next_sequences;
        self.scores = next_scores;
        self.origins = next_origins;
        self.cur_len += 1;
        self.steps += 1;

        if done {
            Ok(StepOutcome::EarlyStop)
        } else if self.sequences.is_empty() {
            Ok(StepOutcome::Exhausted)
        } else {
            Ok(StepOutcome::Continue)
        }
    }

    fn leading_token(&self) -> Option<StreamedToken> {
        let tokens = self.sequences.first()?;
        let id = *tokens.last()?;
        Some(StreamedToken {
            id,
            cur_len: tokens.len(),
            score: self.scores[0],
        })
    }

    fn finish(mut self, stop_reason: StopReason) -> DecodeOutput {
        let flush = match stop_reason {
            StopReason::MaxLength => true,
            StopReason::Cancelled => self.steps > 0,
            StopReason::EarlyStop | StopReason::Exhausted => false,
        };
        if flush {
            for (tokens, cumulative) in self.sequences.drain(..).zip(self.scores.drain(..)) {
                self.finished.insert(tokens, cumulative);
            }
        }

        let max_length = self.config.max_length;
        let eos = self.config.eos_token_id;
        let (sequences, scores): (Vec<Vec<u32>>, Vec<Score>) = self
            .finished
            .into_sorted()
            .into_iter()
            .map(|h| {
                let mut tokens = h.tokens;
                if tokens.len() < max_length {
                    tokens.push(eos);
                }
                (tokens, h.score)
            })
            .unzip();

        log::debug!(
            "decode stopped ({:?}) after {} steps",
            stop_reason,
            self.steps
        );

        DecodeOutput {
            sequences,
            scores,
            stop_reason,
            steps: self.steps,
        }
    }
}

/// Runs beam search with an explicit pipeline and selection strategy.
///
/// Cancellation is polled before every step. A cancelled decode returns what
/// it has, with [`StopReason::Cancelled`].
pub async fn decode<S: StepScorer>(
    scorer: &S,
    config: &GenerationConfig,
    pipeline: &ScorePipeline,
    selection: SelectionStrategy,
    cancel: &CancellationToken,
) -> DecodeResult<DecodeOutput> {
    let mut ctx = BeamContext::new(scorer, config, pipeline, selection)?;

    let mut stop_reason = StopReason::MaxLength;
    while ctx.has_steps_left() {
        if cancel.is_cancelled() {
            stop_reason = StopReason::Cancelled;
            break;
        }
        match ctx.step().await? {
            StepOutcome::Continue => {}
            StepOutcome::EarlyStop => {
                stop_reason = StopReason::EarlyStop;
                break;
            }
            StepOutcome::Exhausted => {
                stop_reason = StopReason::Exhausted;
                break;
            }
        }
    }

    Ok(ctx.finish(stop_reason))
}

/// Runs beam search with the pipeline and selection strategy the config implies.
pub async fn run_beam_search<S: StepScorer>(
    scorer: &S,
    config: &GenerationConfig,
) -> DecodeResult<DecodeOutput> {
    let pipeline = ScorePipeline::from_config(config);
    let selection = SelectionStrategy::from_params(&config.sampling);
    decode(scorer, config, &pipeline, selection, &CancellationToken::never()).await
}

/// Like [`run_beam_search`] but yields the leading beam's newest token after
/// every step, then the final output.
///
/// With several beams the leading beam may change between steps, so earlier
/// tokens are not guaranteed to be part of the final best sequence.
pub fn run_beam_search_stream<'a, S: StepScorer + 'a>(
    scorer: &'a S,
    config: &'a GenerationConfig,
    cancel: CancellationToken,
) -> impl Stream<Item = DecodeResult<DecodeEvent>> + 'a {
    try_stream! {
        let pipeline = ScorePipeline::from_config(config);
        let selection = SelectionStrategy::from_params(&config.sampling);
        let mut ctx = BeamContext::new(scorer, config, &pipeline, selection)?;

        if config.num_beams > 1 {
            log::warn!("streaming beam search is unstable, tokens may change. use greedy for stability.");
        }

        let mut stop_reason = StopReason::MaxLength;
        while ctx.has_steps_left() {
            if cancel.is_cancelled() {
                stop_reason = StopReason::Cancelled;
                break;
            }
            let outcome = ctx.step().await?;

            if let Some(token) = ctx.leading_token() {
                yield DecodeEvent::Token(token);
            }

            match outcome {
                StepOutcome::Continue => {}
                StepOutcome::EarlyStop => {
                    stop_reason = StopReason::EarlyStop;
                    break;
                }
                StepOutcome::Exhausted => {
                    stop_reason = StopReason::Exhausted;
                    break;
                }
            }
        }

        yield DecodeEvent::Finished(ctx.finish(stop_reason));
    }
}
