//! Side-by-side comparison of a handful of texts

use crate::aggregate::{summarize, AggregateStats};
use moodscan_core::{Error, Result, SentimentLabel, SentimentResult};
use serde::Serialize;

pub const MIN_COMPARE_TEXTS: usize = 2;
pub const MAX_COMPARE_TEXTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub results: Vec<SentimentResult>,
    pub stats: AggregateStats,
    /// Highest minus lowest confidence; `None` when nothing was classified
    pub confidence_range: Option<f32>,
    pub most_positive: Option<usize>,
    pub most_negative: Option<usize>,
}

/// Reject requests outside 2..=5 texts
pub fn check_comparison_size(count: usize) -> Result<()> {
    if (MIN_COMPARE_TEXTS..=MAX_COMPARE_TEXTS).contains(&count) {
        Ok(())
    } else {
        Err(Error::InvalidComparison(format!(
            "expected {MIN_COMPARE_TEXTS} to {MAX_COMPARE_TEXTS} texts, got {count}"
        )))
    }
}

/// Build a comparison over already classified results
pub fn compare_results(results: Vec<SentimentResult>) -> Comparison {
    let stats = summarize(&results);

    let confidence_range = match (stats.min_confidence_index, stats.max_confidence_index) {
        (Some(min), Some(max)) => results[max]
            .confidence()
            .zip(results[min].confidence())
            .map(|(hi, lo)| hi - lo),
        _ => None,
    };

    // Ranked by label, then confidence; the first entry wins on a full tie
    let ranked = || {
        results
            .iter()
            .enumerate()
            .filter_map(|(idx, r)| r.classification().map(|c| (idx, c.label, c.confidence)))
    };

    let most_positive = ranked()
        .fold(None, |best: Option<(usize, SentimentLabel, f32)>, entry| match best {
            Some(b) if (b.1, b.2) >= (entry.1, entry.2) => Some(b),
            _ => Some(entry),
        })
        .map(|(idx, _, _)| idx);

    let most_negative = ranked()
        .fold(None, |best: Option<(usize, SentimentLabel, f32)>, entry| match best {
            Some(b) if (b.1, b.2) <= (entry.1, entry.2) => Some(b),
            _ => Some(entry),
        })
        .map(|(idx, _, _)| idx);

    Comparison {
        results,
        stats,
        confidence_range,
        most_positive,
        most_negative,
    }
}
