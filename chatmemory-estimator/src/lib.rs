#![deny(missing_docs)]
//! Reference [`TokenEstimator`] implementation: a fixed chars-per-token
//! ratio.
//!
//! Deterministic and pure. Real tokenizers can implement the same trait;
//! the engine never compares estimates produced by different
//! implementations within the same process.

use chatmemory_types::TokenEstimator;

/// Default characters-per-token ratio used when none is configured.
pub const DEFAULT_CHARS_PER_TOKEN: usize = 4;

/// Estimates token count as `ceil(normalized_len / chars_per_token)`,
/// where whitespace runs are first collapsed to a single space.
pub struct CharRatioEstimator {
    chars_per_token: usize,
}

impl CharRatioEstimator {
    /// Create an estimator with the default ratio (4 chars/token).
    #[must_use]
    pub fn new() -> Self {
        Self::with_ratio(DEFAULT_CHARS_PER_TOKEN)
    }

    /// Create an estimator with a custom ratio. `chars_per_token` is
    /// clamped to at least `1` so the estimator never divides by zero.
    #[must_use]
    pub fn with_ratio(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }

    fn normalize(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last_was_space = false;
        for ch in text.chars() {
            if ch.is_whitespace() {
                if !last_was_space {
                    out.push(' ');
                }
                last_was_space = true;
            } else {
                out.push(ch);
                last_was_space = false;
            }
        }
        out.trim().to_string()
    }
}

impl Default for CharRatioEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenEstimator for CharRatioEstimator {
    fn estimate(&self, text: &str) -> usize {
        let normalized = Self::normalize(text);
        if normalized.is_empty() {
            return 0;
        }
        normalized.chars().count().div_ceil(self.chars_per_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_zero_tokens() {
        assert_eq!(CharRatioEstimator::new().estimate(""), 0);
        assert_eq!(CharRatioEstimator::new().estimate("   \n\t "), 0);
    }

    #[test]
    fn non_empty_text_is_at_least_one_token() {
        assert_eq!(CharRatioEstimator::new().estimate("a"), 1);
    }

    #[test]
    fn collapses_whitespace_runs_before_counting() {
        let estimator = CharRatioEstimator::with_ratio(4);
        // "a b" (3 chars) vs "a    b" (collapses to "a b", 3 chars too).
        assert_eq!(estimator.estimate("a    b"), estimator.estimate("a b"));
    }

    #[test]
    fn ratio_changes_the_estimate() {
        let text = "a".repeat(40);
        let four = CharRatioEstimator::with_ratio(4).estimate(&text);
        let eight = CharRatioEstimator::with_ratio(8).estimate(&text);
        assert_eq!(four, 10);
        assert_eq!(eight, 5);
    }

    #[test]
    fn zero_ratio_is_clamped_to_one() {
        let estimator = CharRatioEstimator::with_ratio(0);
        assert_eq!(estimator.estimate("abc"), 3);
    }

    proptest::proptest! {
        #[test]
        fn never_panics_and_zero_iff_blank(text: String) {
            let estimator = CharRatioEstimator::new();
            let n = estimator.estimate(&text);
            if text.trim().is_empty() {
                proptest::prop_assert_eq!(n, 0);
            } else {
                proptest::prop_assert!(n >= 1);
            }
        }
    }
}
