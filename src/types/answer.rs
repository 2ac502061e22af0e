//! Scored retrieval results

use serde::{Deserialize, Serialize};
use std::fmt;

/// A candidate label with its similarity to the query
///
/// Scores from the cosine classifier lie in [-1, 1]. Lists of answers are
/// ordered by descending score; equal scores keep fit-time order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredAnswer {
    /// Label (answer text) attached to the matched training example
    pub label: String,

    /// Cosine similarity between the query and the matched vector
    pub score: f32,
}

impl ScoredAnswer {
    /// Create a new scored answer
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }

    /// Whether the score reaches the given confidence floor
    pub fn is_confident(&self, min_score: f32) -> bool {
        self.score >= min_score
    }
}

impl fmt::Display for ScoredAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.3})", self.label, self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_rounds_score() {
        let answer = ScoredAnswer::new("9am", 0.87654);
        assert_eq!(answer.to_string(), "9am (0.877)");
    }

    #[test]
    fn test_confidence_floor() {
        let answer = ScoredAnswer::new("June 5", 0.4);
        assert!(answer.is_confident(0.4));
        assert!(!answer.is_confident(0.5));
    }
}
