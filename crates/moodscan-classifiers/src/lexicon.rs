//! Sentiment lexicon, stopwords and tokenization

use moodscan_core::Result;
use regex::Regex;
use std::collections::{HashMap, HashSet};

const STRONG_POSITIVE: &[&str] = &[
    "excellent", "amazing", "wonderful", "fantastic", "outstanding", "brilliant", "superb",
    "magnificent", "terrific", "marvelous", "exceptional", "incredible", "spectacular",
    "phenomenal", "remarkable", "fabulous", "perfect", "love", "loved", "loves", "best",
    "awesome", "delightful", "stunning",
];

const POSITIVE: &[&str] = &[
    "great", "good", "happy", "pleased", "satisfied", "beautiful", "gorgeous", "impressive",
    "enjoy", "enjoyed", "like", "liked", "recommend", "delicious", "nice", "glad", "helpful",
    "friendly", "fresh", "yummy",
];

const MILD_POSITIVE: &[&str] = &["fine", "okay", "decent", "fair", "solid", "pleasant"];

const STRONG_NEGATIVE: &[&str] = &[
    "terrible", "awful", "horrible", "disgusting", "hate", "hated", "worst", "atrocious",
    "abysmal", "appalling", "dreadful", "deplorable", "pathetic", "revolting", "repulsive",
    "unbearable", "intolerable", "insufferable", "furious", "outraged", "nasty",
];

const NEGATIVE: &[&str] = &[
    "bad", "poor", "disappointing", "disappointed", "useless", "frustrated", "frustrating",
    "angry", "annoyed", "disgusted", "offensive", "unacceptable", "broken", "sad", "rude",
    "stale", "worse",
];

const MILD_NEGATIVE: &[&str] = &["mediocre", "boring", "slow", "bland", "meh", "overpriced"];

const NEGATORS: &[&str] = &[
    "not", "no", "never", "nothing", "nobody", "nowhere", "neither", "nor", "hardly", "without",
    "cannot",
];

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will", "would",
    "could", "should", "may", "might", "can", "this", "that", "these", "those", "i", "you", "he",
    "she", "it", "we", "they", "me", "him", "her", "us", "them", "my", "your", "his", "hers",
    "our", "their", "am", "get", "got", "very", "really", "just", "so", "now", "here", "there",
    "where", "when", "what", "how", "why", "who", "which", "than", "too", "also", "then", "its",
    "from", "as", "if", "all", "any", "some", "about", "into", "out", "up", "down", "over",
    "again", "more", "most", "much", "such", "only", "own", "same", "each", "few", "other",
];

/// Fixed positive/negative lexicon with signed weights
#[derive(Debug, Clone)]
pub struct Lexicon {
    weights: HashMap<&'static str, f32>,
    negators: HashSet<&'static str>,
    stopwords: HashSet<&'static str>,
    token_pattern: Regex,
}

impl Lexicon {
    /// Build the built-in English lexicon
    pub fn english() -> Result<Self> {
        let tiers: [(&[&str], f32); 6] = [
            (STRONG_POSITIVE, 3.0),
            (POSITIVE, 2.0),
            (MILD_POSITIVE, 1.0),
            (STRONG_NEGATIVE, -3.0),
            (NEGATIVE, -2.0),
            (MILD_NEGATIVE, -1.0),
        ];

        let weights = tiers
            .iter()
            .flat_map(|(words, weight)| words.iter().map(move |w| (*w, *weight)))
            .collect();

        let token_pattern = Regex::new(r"[\p{L}\p{N}]+(?:'[\p{L}]+)?").map_err(|e| {
            moodscan_core::Error::classifier(format!("Failed to build token pattern: {e}"))
        })?;

        Ok(Self {
            weights,
            negators: NEGATORS.iter().copied().collect(),
            stopwords: STOPWORDS.iter().copied().collect(),
            token_pattern,
        })
    }

    /// Lowercase and split on whitespace and punctuation.
    ///
    /// Apostrophe contractions (`don't`, `isn't`) stay single tokens.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.token_pattern
            .find_iter(&lowered)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Signed weight of a token, 0.0 when it is not in the lexicon
    pub fn weight(&self, token: &str) -> f32 {
        self.weights.get(token).copied().unwrap_or(0.0)
    }

    pub fn is_negator(&self, token: &str) -> bool {
        self.negators.contains(token) || token.ends_with("n't")
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// Whether a token may be reported as a keyword
    pub fn is_keyword_candidate(&self, token: &str) -> bool {
        token.chars().count() >= 3
            && token.chars().all(char::is_alphabetic)
            && !self.is_stopword(token)
            && !self.is_negator(token)
    }

    /// Distinct uni- and bi-gram keyphrase candidates in first-occurrence
    /// order. A bigram is two adjacent candidate tokens.
    pub fn candidate_phrases(&self, text: &str, max_candidates: usize) -> Vec<String> {
        let tokens = self.tokenize(text);
        let mut seen = HashSet::new();
        let mut phrases = Vec::new();

        for (idx, token) in tokens.iter().enumerate() {
            if !self.is_keyword_candidate(token) {
                continue;
            }

            if seen.insert(token.clone()) {
                phrases.push(token.clone());
            }

            if let Some(next) = tokens.get(idx + 1) {
                if self.is_keyword_candidate(next) {
                    let bigram = format!("{token} {next}");
                    if seen.insert(bigram.clone()) {
                        phrases.push(bigram);
                    }
                }
            }

            if phrases.len() >= max_candidates {
                phrases.truncate(max_candidates);
                break;
            }
        }

        phrases
    }
}
