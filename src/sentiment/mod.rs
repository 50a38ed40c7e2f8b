//! Sentiment classification over VADER compound scores.

use serde::{Deserialize, Serialize};

const POSITIVE_THRESHOLD: f64 = 0.05;
const NEGATIVE_THRESHOLD: f64 = -0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

/// Maps a compound score in `[-1, 1]` to a label. Both thresholds are
/// neutral.
pub fn classify(compound: f64) -> Sentiment {
    if compound > POSITIVE_THRESHOLD {
        Sentiment::Positive
    } else if compound < NEGATIVE_THRESHOLD {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

pub trait SentimentScorer: Send + Sync {
    /// Compound polarity in `[-1, 1]`.
    fn compound(&self, text: &str) -> f64;

    fn classify(&self, text: &str) -> Sentiment {
        classify(self.compound(text))
    }
}

/// Lexicon and rule based scorer (VADER).
#[derive(Debug, Clone, Copy, Default)]
pub struct VaderScorer;

impl SentimentScorer for VaderScorer {
    fn compound(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }
        let analyzer = vader_sentiment::SentimentIntensityAnalyzer::new();
        analyzer
            .polarity_scores(text)
            .get("compound")
            .copied()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_exclusive() {
        assert_eq!(classify(0.06), Sentiment::Positive);
        assert_eq!(classify(0.05), Sentiment::Neutral);
        assert_eq!(classify(0.0), Sentiment::Neutral);
        assert_eq!(classify(-0.05), Sentiment::Neutral);
        assert_eq!(classify(-0.06), Sentiment::Negative);
        assert_eq!(classify(1.0), Sentiment::Positive);
        assert_eq!(classify(-1.0), Sentiment::Negative);
    }

    #[test]
    fn labels_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Sentiment::Positive).unwrap(), "\"positive\"");
        assert_eq!(Sentiment::Neutral.as_str(), "neutral");
    }

    #[test]
    fn vader_scores_clear_cases() {
        let scorer = VaderScorer;
        assert_eq!(scorer.classify("I love this, it is wonderful!"), Sentiment::Positive);
        assert_eq!(scorer.classify("This is terrible and I hate it."), Sentiment::Negative);
        assert_eq!(scorer.classify(""), Sentiment::Neutral);
        assert_eq!(scorer.classify("   "), Sentiment::Neutral);
    }

    #[test]
    fn compound_stays_in_range() {
        let scorer = VaderScorer;
        for text in ["great great great!!!", "awful awful awful!!!", "the table"] {
            let score = scorer.compound(text);
            assert!((-1.0..=1.0).contains(&score), "{text}: {score}");
        }
    }
}
