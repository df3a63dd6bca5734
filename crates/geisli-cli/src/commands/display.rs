use colored::*;

use geisli::{Score, StopReason};

/// Format a rank number with dimmed style
pub fn rank_label(rank: usize) -> ColoredString {
    format!("{:>3}.", rank).dimmed()
}

/// Normalized log-probability score, colored by how close it is to zero.
pub fn score_label(score: Score) -> ColoredString {
    let text = format!("{:>9.4}", score);
    if score >= -0.5 {
        text.green()
    } else if score >= -2.0 {
        text.yellow()
    } else {
        text.red()
    }
}

pub fn stop_reason_label(reason: StopReason) -> &'static str {
    match reason {
        StopReason::EarlyStop => "early_stop",
        StopReason::MaxLength => "max_length",
        StopReason::Exhausted => "exhausted",
        StopReason::Cancelled => "cancelled",
    }
}

/// Horizontal separator
pub fn separator(width: usize) -> ColoredString {
    "─".repeat(width).dimmed()
}
