use serde::{Deserialize, Serialize};

use super::category::Category;

/// Confidence at or above which a decision is written back by default.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 5.0;

/// One web-search hit used as extra context for the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
        }
    }
}

/// The categorizer's answer for a single transaction. `category` always
/// comes from the catalog the decision was made against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizationDecision {
    pub reasoning: String,
    pub category: Category,
    /// Self-reported by the model, 0 (guess) to 10 (certain).
    pub confidence: f64,
    /// The category text exactly as the model wrote it.
    pub raw_category_guess: String,
}

impl CategorizationDecision {
    pub fn meets_threshold(&self, threshold: f64) -> bool {
        self.confidence >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CategoryId;

    fn decision(confidence: f64) -> CategorizationDecision {
        CategorizationDecision {
            reasoning: String::new(),
            category: Category::new(CategoryId(1), "Groceries", ""),
            confidence,
            raw_category_guess: "Groceries".to_string(),
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        assert!(decision(5.0).meets_threshold(DEFAULT_CONFIDENCE_THRESHOLD));
        assert!(!decision(4.9).meets_threshold(DEFAULT_CONFIDENCE_THRESHOLD));
    }

    #[test]
    fn nan_never_meets_threshold() {
        assert!(!decision(f64::NAN).meets_threshold(0.0));
    }
}
