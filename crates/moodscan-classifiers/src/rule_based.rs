//! Lexicon-based sentiment classifier
//!
//! Deterministic fallback used when no external model is loaded or the host
//! is too constrained to run one.

use crate::backend::{BackendError, KeywordExtractor};
use crate::classifier::Classifier;
use crate::config::RuleBasedConfig;
use crate::lexicon::Lexicon;
use moodscan_core::{map_to_five_class, Classification, Result, ResultSource, SentimentResult};
use std::time::Instant;

/// Each exclamation mark amplifies the net score by this much
const EXCLAMATION_BOOST: f32 = 0.1;

/// Exclamation marks beyond this count add nothing
const MAX_EXCLAMATIONS: usize = 3;

pub struct RuleBasedClassifier {
    name: String,
    lexicon: Lexicon,
    config: RuleBasedConfig,
}

/// Raw lexicon score of one text
#[derive(Debug, Clone, PartialEq)]
pub struct LexiconScore {
    /// Position on the positivity axis, in [0, 1]
    pub score: f32,
    pub keywords: Vec<String>,
}

impl RuleBasedClassifier {
    pub fn new() -> Result<Self> {
        Self::with_config(RuleBasedConfig::default())
    }

    pub fn with_config(config: RuleBasedConfig) -> Result<Self> {
        Ok(Self {
            name: "rule-based".to_string(),
            lexicon: Lexicon::english()?,
            config,
        })
    }

    /// Score a text without wrapping it in a result
    pub fn score(&self, text: &str) -> LexiconScore {
        let tokens = self.lexicon.tokenize(text);
        if tokens.is_empty() {
            return LexiconScore {
                score: 0.5,
                keywords: Vec::new(),
            };
        }

        let mut net = 0.0f32;
        let mut last_negator: Option<usize> = None;

        for (idx, token) in tokens.iter().enumerate() {
            if self.lexicon.is_negator(token) {
                last_negator = Some(idx);
                continue;
            }

            let weight = self.lexicon.weight(token);
            if weight == 0.0 {
                continue;
            }

            let negated = last_negator
                .map(|at| idx - at <= self.config.negation_window)
                .unwrap_or(false);
            net += if negated { -weight } else { weight };
        }

        if net != 0.0 {
            let exclamations = text.matches('!').count().min(MAX_EXCLAMATIONS);
            net *= 1.0 + EXCLAMATION_BOOST * exclamations as f32;
        }

        let normalized = net / (tokens.len() as f32).sqrt();
        let score = (0.5 + 0.5 * normalized.tanh()).clamp(0.0, 1.0);

        LexiconScore {
            score,
            keywords: self.rank_keywords(&tokens, self.config.top_n),
        }
    }

    /// Lexicon keyword ranking on its own
    pub fn keywords_for(&self, text: &str, top_n: usize) -> Vec<String> {
        self.rank_keywords(&self.lexicon.tokenize(text), top_n)
    }

    fn rank_keywords(&self, tokens: &[String], top_n: usize) -> Vec<String> {
        let mut candidates: Vec<(&str, f32)> = Vec::new();
        for token in tokens {
            if !self.lexicon.is_keyword_candidate(token) {
                continue;
            }
            if candidates.iter().any(|(seen, _)| *seen == token.as_str()) {
                continue;
            }
            candidates.push((token.as_str(), self.lexicon.weight(token).abs()));
        }

        // Stable sort keeps first occurrence order among equal weights
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

        candidates
            .into_iter()
            .take(top_n)
            .map(|(token, _)| token.to_string())
            .collect()
    }
}

impl KeywordExtractor for RuleBasedClassifier {
    fn extract(&self, text: &str, top_n: usize) -> std::result::Result<Vec<String>, BackendError> {
        Ok(self.keywords_for(text, top_n))
    }
}

#[async_trait::async_trait]
impl Classifier for RuleBasedClassifier {
    async fn classify(&self, text: &str) -> SentimentResult {
        let start = Instant::now();

        let LexiconScore { score, keywords } = self.score(text);
        let (label, confidence) = map_to_five_class("positivity", score);

        SentimentResult::classified(
            text,
            ResultSource::RuleBased,
            Classification {
                label,
                confidence,
                keywords,
            },
        )
        .with_latency(start.elapsed().as_micros() as u64)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> ResultSource {
        ResultSource::RuleBased
    }
}
