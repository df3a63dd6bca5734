//! Row-level score transforms shared by the score processors and selection.
//!
//! Every function works on a single vocabulary row and accepts both owned
//! arrays and mutable views, so callers can run them over `outer_iter_mut()`.

use ndarray::{Array1, ArrayBase, Data, DataMut, Ix1};

use super::Score;

/// Softmax in place. A row with no finite score ends up all zeros.
pub fn softmax_1d_inplace<S>(row: &mut ArrayBase<S, Ix1>)
where
    S: DataMut<Elem = Score>,
{
    let max = row.fold(Score::NEG_INFINITY, |a, &b| a.max(b));
    if max == Score::NEG_INFINITY {
        row.fill(0.0);
        return;
    }
    row.mapv_inplace(|x| (x - max).exp());
    let sum = row.sum();
    if sum > 0.0 {
        row.mapv_inplace(|x| x / sum);
    }
}

pub fn softmax_1d<S>(row: &ArrayBase<S, Ix1>) -> Array1<Score>
where
    S: Data<Elem = Score>,
{
    let mut probs = row.to_owned();
    softmax_1d_inplace(&mut probs);
    probs
}

pub fn log_softmax_1d<S>(row: &ArrayBase<S, Ix1>) -> Array1<Score>
where
    S: Data<Elem = Score>,
{
    let max = row.fold(Score::NEG_INFINITY, |a, &b| a.max(b));
    if max == Score::NEG_INFINITY {
        return row.to_owned();
    }
    let log_sum_exp = max + row.iter().map(|&x| (x - max).exp()).sum::<Score>().ln();
    row.mapv(|x| x - log_sum_exp)
}

/// Scales every score by `1 / temperature`.
pub fn apply_temperature_inplace<S>(row: &mut ArrayBase<S, Ix1>, temperature: Score)
where
    S: DataMut<Elem = Score>,
{
    let inv = 1.0 / temperature;
    row.mapv_inplace(|x| x * inv);
}

/// Replaces every score strictly below the k-th largest with `filter_value`.
///
/// `k` is clamped to the row length. Ties at the threshold all survive, which
/// makes the filter idempotent.
pub fn top_k_filtering_inplace<S>(row: &mut ArrayBase<S, Ix1>, k: usize, filter_value: Score)
where
    S: DataMut<Elem = Score>,
{
    let k = k.min(row.len());
    if k == 0 {
        return;
    }
    let mut values = row.to_vec();
    let (_, &mut threshold, _) = values.select_nth_unstable_by(k - 1, |a, b| b.total_cmp(a));
    row.mapv_inplace(|x| if x < threshold { filter_value } else { x });
}

/// Nucleus filtering.
///
/// Tokens are ranked by score, and every token after the first one whose
/// cumulative probability exceeds `top_p` is replaced with `filter_value`.
/// The first `min_size` ranked tokens always survive.
pub fn top_p_filtering_inplace<S>(
    row: &mut ArrayBase<S, Ix1>,
    top_p: Score,
    min_size: usize,
    filter_value: Score,
) where
    S: DataMut<Elem = Score>,
{
    // cumulative sums may round past 1.0
    if top_p >= 1.0 {
        return;
    }

    let mut order: Vec<usize> = (0..row.len()).collect();
    order.sort_by(|&a, &b| row[b].total_cmp(&row[a]));

    let mut sorted: Array1<Score> = order.iter().map(|&i| row[i]).collect();
    softmax_1d_inplace(&mut sorted);

    let mut cumulative = 0.0;
    let over: Vec<bool> = sorted
        .iter()
        .map(|&p| {
            cumulative += p;
            cumulative > top_p
        })
        .collect();

    // shifted right by one so the token that crosses the threshold survives
    for (rank, &idx) in order.iter().enumerate().skip(min_size.max(1)) {
        if over[rank - 1] {
            row[idx] = filter_value;
        }
    }
}

/// Drops tokens whose probability is below `min_p` times the top probability.
pub fn min_p_filtering_inplace<S>(row: &mut ArrayBase<S, Ix1>, min_p: Score, filter_value: Score)
where
    S: DataMut<Elem = Score>,
{
    let probs = softmax_1d(row);
    let max_prob = probs.fold(0.0, |a: Score, &b| a.max(b));
    let cutoff = max_prob * min_p;

    for (score, &prob) in row.iter_mut().zip(probs.iter()) {
        if prob < cutoff {
            *score = filter_value;
        }
    }
}

/// Apply repetition penalty in-place
pub fn apply_repetition_penalty_inplace<S>(
    row: &mut ArrayBase<S, Ix1>,
    tokens: &[u32],
    penalty: Score,
) where
    S: DataMut<Elem = Score>,
{
    if penalty == 1.0 {
        return;
    }
    let mut seen = vec![false; row.len()];
    for &token in tokens {
        let idx = token as usize;
        if idx < row.len() && !seen[idx] {
            seen[idx] = true;
            let score = row[idx];
            row[idx] = if score < 0.0 {
                score * penalty
            } else {
                score / penalty
            };
        }
    }
}

/// Bans any token that would complete an n-gram already present in `tokens`.
pub fn apply_no_repeat_ngram_inplace<S>(row: &mut ArrayBase<S, Ix1>, tokens: &[u32], n: usize)
where
    S: DataMut<Elem = Score>,
{
    if n == 0 || tokens.len() < n {
        return;
    }

    let prefix = &tokens[tokens.len() - (n - 1)..];

    for window in tokens.windows(n) {
        if &window[..n - 1] == prefix {
            let banned = window[n - 1] as usize;
            if banned < row.len() {
                row[banned] = Score::NEG_INFINITY;
            }
        }
    }
}

/// Bans the last token of every bad-word sequence whose prefix ends `tokens`.
///
/// A single-token sequence equal to `eos_token_id` is skipped; EOS timing is
/// the min-length filter's job.
pub fn apply_bad_words_inplace<S>(
    row: &mut ArrayBase<S, Ix1>,
    tokens: &[u32],
    bad_words_ids: &[Vec<u32>],
    eos_token_id: u32,
) where
    S: DataMut<Elem = Score>,
{
    for seq in bad_words_ids {
        if seq.as_slice() == [eos_token_id] {
            continue;
        }
        let Some((&banned, prefix)) = seq.split_last() else {
            continue;
        };
        if tokens.ends_with(prefix) && (banned as usize) < row.len() {
            row[banned as usize] = Score::NEG_INFINITY;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, array};

    const NEG_INF: Score = Score::NEG_INFINITY;

    // ============== softmax ==============

    #[test]
    fn test_softmax_1d_basic() {
        let probs = softmax_1d(&array![1.0, 2.0, 3.0]);
        assert_abs_diff_eq!(probs.sum(), 1.0, epsilon = 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_1d_numerical_stability() {
        let probs = softmax_1d(&array![1000.0, 1001.0, 1002.0]);
        assert_abs_diff_eq!(probs.sum(), 1.0, epsilon = 1e-6);
        assert!(probs.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_softmax_1d_masked_entries_get_zero() {
        let probs = softmax_1d(&array![0.0, NEG_INF, 0.0]);
        assert_eq!(probs[1], 0.0);
        assert_abs_diff_eq!(probs[0], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_softmax_1d_fully_masked_row() {
        let probs = softmax_1d(&array![NEG_INF, NEG_INF]);
        assert_eq!(probs, array![0.0, 0.0]);
    }

    #[test]
    fn test_log_softmax_matches_ln_softmax() {
        let logits = array![1.0, 2.0, 3.0];
        let log_probs = log_softmax_1d(&logits);
        let probs = softmax_1d(&logits);
        for i in 0..3 {
            assert_abs_diff_eq!(log_probs[i], probs[i].ln(), epsilon = 1e-5);
        }
        assert!(log_probs.iter().all(|&lp| lp <= 0.0));
    }

    // ============== temperature ==============

    #[test]
    fn test_temperature_scales_scores() {
        let mut row = array![1.0, -2.0, 4.0];
        apply_temperature_inplace(&mut row, 2.0);
        assert_eq!(row, array![0.5, -1.0, 2.0]);
    }

    // ============== top-k ==============

    #[test]
    fn test_top_k_filtering_basic() {
        let mut row = array![1.0, 5.0, 3.0, 4.0, 2.0];
        top_k_filtering_inplace(&mut row, 3, NEG_INF);
        assert_eq!(row, array![NEG_INF, 5.0, 3.0, 4.0, NEG_INF]);
    }

    #[test]
    fn test_top_k_keeps_ties_at_threshold() {
        let mut row = array![3.0, 1.0, 3.0, 2.0];
        top_k_filtering_inplace(&mut row, 1, NEG_INF);
        assert_eq!(row, array![3.0, NEG_INF, 3.0, NEG_INF]);
    }

    #[test]
    fn test_top_k_clamped_to_row_size() {
        let mut row = array![1.0, 2.0, 3.0];
        top_k_filtering_inplace(&mut row, 50, NEG_INF);
        assert_eq!(row, array![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_top_k_is_idempotent() {
        let mut once = array![0.3, -1.2, 4.0, 2.2, 2.2, -0.5, 7.0];
        top_k_filtering_inplace(&mut once, 3, NEG_INF);
        let mut twice = once.clone();
        top_k_filtering_inplace(&mut twice, 3, NEG_INF);
        assert_eq!(once, twice);
    }

    // ============== top-p ==============

    #[test]
    fn test_top_p_keeps_token_that_crosses_threshold() {
        // probs ~ [0.032, 0.087, 0.237, 0.644]
        let mut row = array![0.0, 1.0, 2.0, 3.0];
        top_p_filtering_inplace(&mut row, 0.7, 1, NEG_INF);

        assert!(row[3].is_finite());
        assert!(row[2].is_finite());
        assert_eq!(row[1], NEG_INF);
        assert_eq!(row[0], NEG_INF);
    }

    #[test]
    fn test_top_p_respects_original_positions() {
        let mut row = array![3.0, 0.0, 2.0, 1.0];
        top_p_filtering_inplace(&mut row, 0.5, 1, NEG_INF);
        assert_eq!(row, array![3.0, NEG_INF, NEG_INF, NEG_INF]);
    }

    #[test]
    fn test_top_p_min_size_keeps_two() {
        let mut row = array![1.0, 2.0, 10.0];
        top_p_filtering_inplace(&mut row, 0.01, 2, NEG_INF);
        assert!(row[2].is_finite());
        assert!(row[1].is_finite());
        assert_eq!(row[0], NEG_INF);
    }

    #[test]
    fn test_top_p_one_is_noop() {
        let original = array![-3.0, 0.5, 1.0, 9.0, -0.25];
        let mut row = original.clone();
        top_p_filtering_inplace(&mut row, 1.0, 1, NEG_INF);
        assert_eq!(row, original);
    }

    // ============== min-p ==============

    #[test]
    fn test_min_p_filters_unlikely_tokens() {
        let mut row = array![0.0, 5.0, 4.5];
        min_p_filtering_inplace(&mut row, 0.1, NEG_INF);
        assert_eq!(row[0], NEG_INF);
        assert!(row[1].is_finite() && row[2].is_finite());
    }

    // ============== repetition penalty ==============

    #[test]
    fn test_repetition_penalty_signs() {
        let mut row = array![-1.0, 0.0, 2.0];
        apply_repetition_penalty_inplace(&mut row, &[0, 2], 2.0);
        assert_eq!(row, array![-2.0, 0.0, 1.0]);
    }

    #[test]
    fn test_repetition_penalty_applies_once_per_token() {
        let mut row = array![4.0, 1.0];
        apply_repetition_penalty_inplace(&mut row, &[0, 0, 0, 99], 2.0);
        assert_eq!(row, array![2.0, 1.0]);
    }

    // ============== no repeat ngram ==============

    #[test]
    fn test_no_repeat_ngram_trigram() {
        let mut row = Array1::from_elem(5, 1.0);
        apply_no_repeat_ngram_inplace(&mut row, &[0, 1, 2, 0, 1], 3);
        assert_eq!(row[2], NEG_INF);
        assert_eq!(row.iter().filter(|x| x.is_finite()).count(), 4);
    }

    #[test]
    fn test_no_repeat_ngram_too_short() {
        let mut row = Array1::from_elem(3, 1.0);
        apply_no_repeat_ngram_inplace(&mut row, &[0], 3);
        assert!(row.iter().all(|&x| x == 1.0));
    }

    #[test]
    fn test_no_repeat_ngram_over_views() {
        let mut rows = Array2::from_elem((3, 40), 1.0);
        for mut row in rows.outer_iter_mut() {
            apply_no_repeat_ngram_inplace(&mut row, &[10, 20, 30, 10, 20], 3);
        }
        for row in rows.rows() {
            assert_eq!(row[30], NEG_INF);
        }
    }

    // ============== bad words ==============

    #[test]
    fn test_bad_words_exact_prefix_match() {
        let bad = vec![vec![3, 4, 9]];

        let mut hit = Array1::zeros(10);
        apply_bad_words_inplace(&mut hit, &[0, 7, 3, 4], &bad, 2);
        assert_eq!(hit[9], NEG_INF);
        assert_eq!(hit.iter().filter(|x| x.is_finite()).count(), 9);

        let mut miss = Array1::zeros(10);
        apply_bad_words_inplace(&mut miss, &[0, 7, 3, 5], &bad, 2);
        assert!(miss.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_single_token_bad_word_always_banned() {
        let mut row = Array1::zeros(6);
        apply_bad_words_inplace(&mut row, &[0], &[vec![5]], 2);
        assert_eq!(row[5], NEG_INF);
    }

    #[test]
    fn test_bad_word_equal_to_eos_is_ignored() {
        let mut row = Array1::zeros(6);
        apply_bad_words_inplace(&mut row, &[0], &[vec![2]], 2);
        assert!(row.iter().all(|x| x.is_finite()));
    }
}
