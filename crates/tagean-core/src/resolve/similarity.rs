//! Deterministic string similarity on a 0-100 scale.

use serde::{Deserialize, Serialize};
use strsim::normalized_levenshtein;

/// Token-order-insensitive similarity metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Edit-distance ratio of the whitespace tokens sorted alphabetically.
    #[default]
    TokenSort,
    /// Like `TokenSort`, but shared tokens are factored out first, so a
    /// query that is a token subset of the candidate scores 100.
    TokenSet,
}

impl SimilarityMetric {
    /// Score `query` against `candidate`.
    pub fn score(&self, query: &str, candidate: &str) -> u8 {
        match self {
            SimilarityMetric::TokenSort => token_sort_ratio(query, candidate),
            SimilarityMetric::TokenSet => token_set_ratio(query, candidate),
        }
    }
}

/// Normalized Levenshtein similarity scaled to 0-100 and rounded.
pub fn ratio(a: &str, b: &str) -> u8 {
    (normalized_levenshtein(a, b) * 100.0).round().clamp(0.0, 100.0) as u8
}

fn sorted_tokens(s: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens
}

pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    ratio(&sorted_tokens(a).join(" "), &sorted_tokens(b).join(" "))
}

pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    let mut tokens_a = sorted_tokens(a);
    let mut tokens_b = sorted_tokens(b);
    tokens_a.dedup();
    tokens_b.dedup();

    let common: Vec<&str> = tokens_a
        .iter()
        .copied()
        .filter(|t| tokens_b.contains(t))
        .collect();
    let only_a: Vec<&str> = tokens_a.iter().copied().filter(|t| !common.contains(t)).collect();
    let only_b: Vec<&str> = tokens_b.iter().copied().filter(|t| !common.contains(t)).collect();

    let base = common.join(" ");
    let combined_a = format!("{} {}", base, only_a.join(" ")).trim().to_string();
    let combined_b = format!("{} {}", base, only_b.join(" ")).trim().to_string();

    let mut best = ratio(&combined_a, &combined_b);
    if !base.is_empty() {
        best = best
            .max(ratio(&base, &combined_a))
            .max(ratio(&base, &combined_b));
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings_score_100() {
        assert_eq!(token_sort_ratio("nestle leite ninho 400g", "nestle leite ninho 400g"), 100);
        assert_eq!(token_set_ratio("nestle leite ninho 400g", "nestle leite ninho 400g"), 100);
    }

    #[test]
    fn test_token_order_is_ignored() {
        assert_eq!(token_sort_ratio("leite ninho nestle", "nestle leite ninho"), 100);
    }

    #[test]
    fn test_disjoint_strings_score_low() {
        assert!(token_sort_ratio("arroz tio joão", "detergente ypê") < 40);
    }

    #[test]
    fn test_closer_strings_score_higher() {
        let near = token_sort_ratio("nestle leite ninho", "nestle leite ninho 400g");
        let far = token_sort_ratio("nestle leite", "nestle leite ninho 400g");
        assert!(near > far);
        assert!(near < 100);
    }

    #[test]
    fn test_symmetric() {
        let a = "café pilão 500g";
        let b = "pilão café tradicional 500g";
        assert_eq!(token_sort_ratio(a, b), token_sort_ratio(b, a));
        assert_eq!(token_set_ratio(a, b), token_set_ratio(b, a));
    }

    #[test]
    fn test_token_set_subset_scores_100() {
        assert_eq!(token_set_ratio("leite ninho", "nestle leite ninho 400g"), 100);
        assert!(token_sort_ratio("leite ninho", "nestle leite ninho 400g") < 100);
    }

    #[test]
    fn test_metric_dispatch() {
        assert_eq!(SimilarityMetric::default(), SimilarityMetric::TokenSort);
        assert_eq!(
            SimilarityMetric::TokenSet.score("a b", "b a c"),
            token_set_ratio("a b", "b a c")
        );
    }
}
