//! Five-class label mapping
//!
//! Both classifier paths hand their raw (label, score) pair to
//! [`map_to_five_class`], so results are comparable across environments.
//!
//! | score          | label        |
//! |----------------|--------------|
//! | [0.00, 0.20)   | VeryNegative |
//! | [0.20, 0.40)   | Negative     |
//! | [0.40, 0.60)   | Neutral      |
//! | [0.60, 0.80)   | Positive     |
//! | [0.80, 1.00]   | VeryPositive |
//!
//! A score exactly on a boundary belongs to the higher class.

use crate::types::SentimentLabel;

/// Lower bounds of Negative, Neutral, Positive and VeryPositive
pub const CLASS_BOUNDARIES: [f32; 4] = [0.20, 0.40, 0.60, 0.80];

/// Map an upstream (label, score) pair to a five-class label and confidence.
///
/// `raw_score` is read on the positivity axis. When the upstream label names
/// the negative pole of a binary head (`"negative"`, `"neg"`, `"label_0"`),
/// the score is that label's probability and is reflected onto the axis
/// first. Any other label (including star ratings and `"positive"`) is taken
/// as already positivity-oriented. The resulting axis value is both the class
/// boundary signal and the reported confidence; it is not recalibrated.
///
/// Out-of-range scores are clamped; NaN maps to 0.5.
pub fn map_to_five_class(raw_label: &str, raw_score: f32) -> (SentimentLabel, f32) {
    let score = sanitize(raw_score);
    let score = if is_negative_pole(raw_label) {
        1.0 - score
    } else {
        score
    };

    (label_for_score(score), score)
}

/// Label for a positivity score, using the closed-upper boundaries
pub fn label_for_score(score: f32) -> SentimentLabel {
    let score = sanitize(score);
    let index = CLASS_BOUNDARIES
        .iter()
        .take_while(|boundary| score >= **boundary)
        .count();
    SentimentLabel::ALL[index]
}

fn sanitize(score: f32) -> f32 {
    if score.is_nan() {
        0.5
    } else {
        score.clamp(0.0, 1.0)
    }
}

fn is_negative_pole(raw_label: &str) -> bool {
    matches!(
        raw_label.trim().to_ascii_lowercase().as_str(),
        "negative" | "neg" | "label_0"
    )
}
