//! Statistics over a result collection
//!
//! Entries with an error are counted in `error_count` and left out of every
//! label and confidence statistic.

use moodscan_core::{SentimentLabel, SentimentResult};
use serde::Serialize;
use std::collections::BTreeMap;

/// Snapshot of statistics over a result sequence
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub total: usize,

    /// Labels that occur at least once
    pub counts: BTreeMap<SentimentLabel, usize>,

    /// Share of classified entries per label, in percent
    pub percentages: BTreeMap<SentimentLabel, f32>,

    /// `None` when nothing was classified
    pub mean_confidence: Option<f32>,

    pub mean_confidence_by_label: BTreeMap<SentimentLabel, f32>,

    /// Population standard deviation of confidence
    pub confidence_std_dev: Option<f32>,

    pub error_count: usize,

    pub degraded_count: usize,

    /// Pearson correlation between text length in characters and confidence
    pub correlation: Option<f32>,

    /// Most frequent label; ties go to the higher class
    pub dominant: Option<SentimentLabel>,

    /// Position of the lowest-confidence entry, first on ties
    pub min_confidence_index: Option<usize>,

    /// Position of the highest-confidence entry, first on ties
    pub max_confidence_index: Option<usize>,
}

impl AggregateStats {
    /// Count for a label, zero when absent
    pub fn count(&self, label: SentimentLabel) -> usize {
        self.counts.get(&label).copied().unwrap_or(0)
    }

    /// Number of classified entries
    pub fn classified(&self) -> usize {
        self.total - self.error_count
    }
}

/// Compute statistics over a completed result sequence
pub fn summarize(results: &[SentimentResult]) -> AggregateStats {
    let mut counts: BTreeMap<SentimentLabel, usize> = BTreeMap::new();
    let mut confidence_sums: BTreeMap<SentimentLabel, f64> = BTreeMap::new();
    let mut lengths = Vec::new();
    let mut confidences = Vec::new();
    let mut error_count = 0;
    let mut min_confidence_index: Option<(usize, f32)> = None;
    let mut max_confidence_index: Option<(usize, f32)> = None;

    for (idx, result) in results.iter().enumerate() {
        let Some(classification) = result.classification() else {
            error_count += 1;
            continue;
        };

        let confidence = classification.confidence;
        *counts.entry(classification.label).or_default() += 1;
        *confidence_sums.entry(classification.label).or_default() += f64::from(confidence);
        lengths.push(result.text().chars().count() as f64);
        confidences.push(f64::from(confidence));

        if min_confidence_index.map_or(true, |(_, min)| confidence < min) {
            min_confidence_index = Some((idx, confidence));
        }
        if max_confidence_index.map_or(true, |(_, max)| confidence > max) {
            max_confidence_index = Some((idx, confidence));
        }
    }

    let classified = confidences.len();

    let percentages = counts
        .iter()
        .map(|(label, count)| (*label, (*count as f64 * 100.0 / classified as f64) as f32))
        .collect();

    let mean_confidence_by_label = confidence_sums
        .iter()
        .map(|(label, sum)| (*label, (sum / counts[label] as f64) as f32))
        .collect();

    let dominant = SentimentLabel::ALL
        .iter()
        .copied()
        .filter(|label| counts.contains_key(label))
        .fold(None, |best: Option<SentimentLabel>, label| match best {
            Some(current) if counts[&current] > counts[&label] => Some(current),
            _ => Some(label),
        });

    let mean = mean(&confidences);

    AggregateStats {
        total: results.len(),
        percentages,
        mean_confidence: mean.map(|m| m as f32),
        mean_confidence_by_label,
        confidence_std_dev: mean.map(|m| std_dev(&confidences, m) as f32),
        error_count,
        degraded_count: results.iter().filter(|r| r.is_degraded()).count(),
        correlation: pearson(&lengths, &confidences).map(|r| r as f32),
        dominant,
        counts,
        min_confidence_index: min_confidence_index.map(|(idx, _)| idx),
        max_confidence_index: max_confidence_index.map(|(idx, _)| idx),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn std_dev(values: &[f64], mean: f64) -> f64 {
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Pearson's r; `None` with fewer than two points or a constant series
fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() < 2 || xs.len() != ys.len() {
        return None;
    }

    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= f64::EPSILON || var_y <= f64::EPSILON {
        return None;
    }

    Some((covariance / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodscan_core::{Classification, ResultSource, ValidationError};
    use proptest::prelude::*;

    fn classified(text: &str, label: SentimentLabel, confidence: f32) -> SentimentResult {
        SentimentResult::classified(
            text,
            ResultSource::RuleBased,
            Classification {
                label,
                confidence,
                keywords: Vec::new(),
            },
        )
    }

    fn rejected(text: &str) -> SentimentResult {
        SentimentResult::rejected(text, ResultSource::RuleBased, ValidationError::TooShort)
    }

    #[test]
    fn test_documented_aggregation() {
        let results = vec![
            classified("great", SentimentLabel::VeryPositive, 0.9),
            classified("lovely", SentimentLabel::VeryPositive, 0.85),
            classified("fine enough", SentimentLabel::Neutral, 0.5),
            rejected("x"),
        ];

        let stats = summarize(&results);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.counts.len(), 2);
        assert_eq!(stats.count(SentimentLabel::VeryPositive), 2);
        assert_eq!(stats.count(SentimentLabel::Neutral), 1);
        assert_eq!(stats.count(SentimentLabel::Negative), 0);
        assert_eq!(stats.error_count, 1);
        assert!((stats.mean_confidence.unwrap() - 0.75).abs() < 1e-6);
        assert_eq!(stats.dominant, Some(SentimentLabel::VeryPositive));
        assert_eq!(stats.min_confidence_index, Some(2));
        assert_eq!(stats.max_confidence_index, Some(0));
        assert!((stats.mean_confidence_by_label[&SentimentLabel::VeryPositive] - 0.875).abs() < 1e-6);
    }

    #[test]
    fn test_correlation_null_with_fewer_than_two_entries() {
        let stats = summarize(&[classified("only one", SentimentLabel::Positive, 0.7), rejected("")]);
        assert_eq!(stats.correlation, None);
        assert!(stats.mean_confidence.is_some());

        let stats = summarize(&[]);
        assert_eq!(stats.correlation, None);
        assert_eq!(stats.mean_confidence, None);
        assert_eq!(stats.dominant, None);
        assert_eq!(stats.total, 0);
    }

    #[test]
    fn test_correlation_null_for_constant_series() {
        let stats = summarize(&[
            classified("same length", SentimentLabel::Positive, 0.7),
            classified("equal chars", SentimentLabel::Positive, 0.9),
        ]);
        assert_eq!(stats.correlation, None);
    }

    #[test]
    fn test_correlation_sign() {
        let stats = summarize(&[
            classified("ok ok", SentimentLabel::Negative, 0.3),
            classified("somewhat longer", SentimentLabel::Neutral, 0.5),
            classified("a considerably longer review text", SentimentLabel::Positive, 0.7),
        ]);
        assert!(stats.correlation.unwrap() > 0.9);
    }

    #[test]
    fn test_dominant_tie_goes_to_higher_class() {
        let stats = summarize(&[
            classified("bad", SentimentLabel::Negative, 0.3),
            classified("good", SentimentLabel::Positive, 0.7),
        ]);
        assert_eq!(stats.dominant, Some(SentimentLabel::Positive));
    }

    #[test]
    fn test_degraded_and_percentages() {
        let stats = summarize(&[
            classified("good one", SentimentLabel::Positive, 0.7).into_degraded(),
            classified("good two", SentimentLabel::Positive, 0.7),
            classified("bad one", SentimentLabel::Negative, 0.3),
            classified("bad two", SentimentLabel::Negative, 0.3).into_degraded(),
        ]);
        assert_eq!(stats.degraded_count, 2);
        assert_eq!(stats.percentages[&SentimentLabel::Positive], 50.0);
        assert!((stats.confidence_std_dev.unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_wire_format() {
        let stats = summarize(&[classified("great", SentimentLabel::VeryPositive, 0.9), rejected("")]);
        let json = serde_json::to_value(&stats).unwrap();

        assert_eq!(json["counts"]["VeryPositive"], 1);
        assert_eq!(json["errorCount"], 1);
        assert!(json["correlation"].is_null());
        assert!(json["meanConfidence"].is_number());
    }

    proptest! {
        #[test]
        fn prop_error_entries_never_counted(
            confidences in proptest::collection::vec(0.0f32..=1.0, 0..20),
            errors in 0usize..5,
        ) {
            let mut results: Vec<SentimentResult> = confidences
                .iter()
                .map(|c| classified("text", moodscan_core::label_for_score(*c), *c))
                .collect();
            results.extend((0..errors).map(|_| rejected("")));

            let stats = summarize(&results);
            prop_assert_eq!(stats.error_count, errors);
            prop_assert_eq!(stats.counts.values().sum::<usize>(), confidences.len());
            prop_assert_eq!(stats.classified(), confidences.len());
        }
    }
}
