//! News sentiment scoring (spec §9 Open Question: scorer is pluggable behind
//! a trait so a model-backed implementation can replace the keyword heuristic
//! without touching the `SentimentAnalysis` worker).

pub trait SentimentModel: Send + Sync {
    /// Returns a score in `[-1.0, 1.0]`.
    fn score(&self, text: &str) -> f64;
}

const POSITIVE_WORDS: &[&str] = &[
    "beat", "beats", "surge", "soars", "record", "upgrade", "upgraded", "growth",
    "profit", "gain", "rally", "strong", "outperform", "bullish", "win", "wins",
];

const NEGATIVE_WORDS: &[&str] = &[
    "miss", "misses", "plunge", "crash", "downgrade", "downgraded", "loss",
    "decline", "weak", "underperform", "bearish", "lawsuit", "recall", "fraud",
    "bankrupt", "injury", "suspended",
];

/// Default scorer: counts positive/negative keyword hits and normalizes by
/// total hits. Deterministic, no network or model dependency.
#[derive(Default)]
pub struct KeywordSentimentModel;

impl SentimentModel for KeywordSentimentModel {
    fn score(&self, text: &str) -> f64 {
        let lower = text.to_lowercase();
        let pos = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count() as f64;
        let neg = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count() as f64;
        let total = pos + neg;
        if total == 0.0 {
            0.0
        } else {
            ((pos - neg) / total).clamp(-1.0, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_headline_scores_above_zero() {
        let model = KeywordSentimentModel;
        let score = model.score("Company beats earnings and surges to record high");
        assert!(score > 0.0, "expected positive score, got {score}");
    }

    #[test]
    fn negative_headline_scores_below_zero() {
        let model = KeywordSentimentModel;
        let score = model.score("Stock plunges after fraud lawsuit and downgrade");
        assert!(score < 0.0, "expected negative score, got {score}");
    }

    #[test]
    fn neutral_headline_scores_zero() {
        let model = KeywordSentimentModel;
        let score = model.score("Company to release quarterly report next week");
        assert_eq!(score, 0.0);
    }
}
