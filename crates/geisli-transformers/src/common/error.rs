use thiserror::Error;

/// Errors that abort a single decode call.
///
/// Cancellation is not an error; a cancelled decode returns its partial
/// result with [`crate::StopReason::Cancelled`].
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The generation config was rejected before any step ran.
    #[error("Invalid generation config: {0}")]
    InvalidConfig(String),

    /// The scorer returned a different number of rows than there are active beams.
    #[error("Scorer returned {actual} results for {expected} active beams")]
    ResultCountMismatch { expected: usize, actual: usize },

    /// A score row did not cover the vocabulary.
    #[error("Scorer returned {actual} scores for beam {beam}, expected vocab size {expected}")]
    VocabSizeMismatch {
        beam: usize,
        expected: usize,
        actual: usize,
    },

    /// A score row contained NaN.
    #[error("Scorer returned NaN scores for beam {beam}")]
    NanScores { beam: usize },

    /// Multinomial selection could not draw enough distinct tokens.
    #[error(
        "Cannot sample {requested} distinct tokens for beam {beam}: only {available} have non-zero probability"
    )]
    SamplingExhausted {
        beam: usize,
        requested: usize,
        available: usize,
    },

    /// The scorer itself failed.
    #[error("Scoring failed at length {cur_len}: {source}")]
    Scorer {
        cur_len: usize,
        #[source]
        source: anyhow::Error,
    },
}

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;
