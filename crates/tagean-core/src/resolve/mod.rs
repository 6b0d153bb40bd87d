//! EAN resolution against the catalog.
//!
//! Resolution is tiered, first success wins:
//! 1. the barcode the model read, looked up exactly in the catalog;
//! 2. a fuzzy match of brand + product against every catalog entry's
//!    comparable text, accepted when the best score reaches the threshold.
//!
//! Every outcome is a normal [`Resolution`]; nothing here fails.

mod similarity;

pub use similarity::{ratio, token_set_ratio, token_sort_ratio, SimilarityMetric};

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::catalog::{normalize_text, Catalog};
use crate::record::ExtractedFields;

/// Default fuzzy acceptance threshold.
pub const DEFAULT_THRESHOLD: u8 = 75;

/// Shortest barcode considered for the direct lookup tier.
pub const MIN_BARCODE_LEN: usize = 8;

/// Which tier resolved an item, or why none did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    /// The extracted barcode exists in the catalog.
    DirectEan,
    /// Fuzzy match accepted with the given score.
    Fuzzy { score: u8 },
    /// Neither brand nor product was extracted.
    InsufficientData,
    /// No catalog entry has usable comparable text.
    InvalidDatabase,
    /// The winning text could not be traced back to a catalog row.
    InternalCorrespondenceError,
    /// Best fuzzy score fell below the threshold.
    LowConfidence { score: u8 },
    /// Scoring produced no winner.
    NoRelevantMatch,
}

impl MatchStatus {
    /// Whether this status carries an inferred EAN.
    pub fn is_match(&self) -> bool {
        matches!(self, MatchStatus::DirectEan | MatchStatus::Fuzzy { .. })
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStatus::DirectEan => write!(f, "Direct EAN Match"),
            MatchStatus::Fuzzy { score } => write!(f, "Fuzzy Match (Score: {})", score),
            MatchStatus::InsufficientData => write!(f, "Insufficient Data For Fuzzy Match"),
            MatchStatus::InvalidDatabase => write!(f, "Invalid Database For Fuzzy Match"),
            MatchStatus::InternalCorrespondenceError => write!(f, "Internal DB Correspondence Error"),
            MatchStatus::LowConfidence { score } => write!(f, "Low Confidence (Score: {})", score),
            MatchStatus::NoRelevantMatch => write!(f, "No Relevant Fuzzy Match Found"),
        }
    }
}

impl Serialize for MatchStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of resolving one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Inferred EAN, if any tier succeeded.
    pub ean: Option<String>,
    /// How the EAN was found, or why it was not.
    pub status: MatchStatus,
}

impl Resolution {
    fn matched(ean: &str, status: MatchStatus) -> Self {
        Self {
            ean: Some(ean.to_string()),
            status,
        }
    }

    fn unmatched(status: MatchStatus) -> Self {
        Self { ean: None, status }
    }
}

/// Tiered EAN resolver.
#[derive(Debug, Clone)]
pub struct Resolver {
    /// Minimum fuzzy score (0-100) for acceptance.
    threshold: u8,
    /// Similarity metric for the fuzzy tier.
    metric: SimilarityMetric,
}

impl Resolver {
    /// Create a resolver with the given acceptance threshold.
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold,
            metric: SimilarityMetric::default(),
        }
    }

    /// Set the similarity metric.
    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Resolve the EAN for one item's extracted fields.
    pub fn resolve(&self, fields: &ExtractedFields, catalog: &Catalog) -> Resolution {
        let barcode = fields.barcode().trim();
        if is_well_formed_barcode(barcode) {
            if let Some(entry) = catalog.find_by_ean(barcode) {
                debug!("Direct EAN match: {}", entry.ean);
                return Resolution::matched(&entry.ean, MatchStatus::DirectEan);
            }
            debug!("Barcode '{}' not in catalog, trying fuzzy match", barcode);
        }

        let query = search_text(fields);
        if query.is_empty() {
            return Resolution::unmatched(MatchStatus::InsufficientData);
        }

        let mut candidates = catalog.candidates().peekable();
        if candidates.peek().is_none() {
            return Resolution::unmatched(MatchStatus::InvalidDatabase);
        }

        // Strictly greater keeps the first entry among equal scores.
        let mut best: Option<(&str, u8)> = None;
        for entry in candidates {
            let score = self.metric.score(&query, &entry.comparable_text);
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((entry.comparable_text.as_str(), score));
            }
        }

        let Some((winner, score)) = best else {
            return Resolution::unmatched(MatchStatus::NoRelevantMatch);
        };

        if score < self.threshold {
            debug!(
                "Best match '{}' for '{}' scored {} < {}",
                winner, query, score, self.threshold
            );
            return Resolution::unmatched(MatchStatus::LowConfidence { score });
        }

        match catalog.find_by_comparable(winner) {
            Some(entry) => {
                debug!("Fuzzy match '{}' -> {} (score {})", query, entry.ean, score);
                Resolution::matched(&entry.ean, MatchStatus::Fuzzy { score })
            }
            None => Resolution::unmatched(MatchStatus::InternalCorrespondenceError),
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

/// Resolve with the default metric.
pub fn resolve(fields: &ExtractedFields, catalog: &Catalog, threshold: u8) -> Resolution {
    Resolver::new(threshold).resolve(fields, catalog)
}

/// Non-empty, digits only, and at least [`MIN_BARCODE_LEN`] long.
pub fn is_well_formed_barcode(barcode: &str) -> bool {
    barcode.len() >= MIN_BARCODE_LEN && barcode.chars().all(|c| c.is_ascii_digit())
}

/// Normalized brand + product search string; empty when both are missing.
pub fn search_text(fields: &ExtractedFields) -> String {
    let brand = fields.brand().trim();
    let product = fields.product().trim();

    let text = match (brand.is_empty(), product.is_empty()) {
        (false, false) => format!("{} {}", brand, product),
        (true, false) => product.to_string(),
        (false, true) => brand.to_string(),
        (true, true) => String::new(),
    };

    normalize_text(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;
    use crate::record::{BARCODE_KEY, BRAND_KEY, PRODUCT_KEY};
    use pretty_assertions::assert_eq;

    fn catalog() -> Catalog {
        Catalog::from_entries(vec![
            CatalogEntry::new("7891000100103", "Nestle", "Leite Ninho 400g"),
            CatalogEntry::new("7891234567890", "Coca", "Cola 2L"),
            CatalogEntry::new("7896005800010", "Tio João", "Arroz Branco 5kg"),
        ])
    }

    fn fields(pairs: &[(&str, &str)]) -> ExtractedFields {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_default_threshold() {
        assert_eq!(Resolver::default().threshold(), DEFAULT_THRESHOLD);
        assert_eq!(Resolver::new(90).threshold(), 90);
    }

    #[test]
    fn test_direct_barcode_wins_over_text() {
        let f = fields(&[
            (BARCODE_KEY, " 7891234567890 "),
            (BRAND_KEY, "Nestle"),
            (PRODUCT_KEY, "Leite Ninho 400g"),
        ]);

        let resolution = resolve(&f, &catalog(), 75);
        assert_eq!(resolution.ean.as_deref(), Some("7891234567890"));
        assert_eq!(resolution.status.to_string(), "Direct EAN Match");
    }

    #[test]
    fn test_unknown_barcode_falls_through_to_fuzzy() {
        let f = fields(&[
            (BARCODE_KEY, "0000000000000"),
            (BRAND_KEY, "Nestle"),
            (PRODUCT_KEY, "Leite Ninho 400g"),
        ]);

        let resolution = resolve(&f, &catalog(), 75);
        assert_eq!(resolution.ean.as_deref(), Some("7891000100103"));
        assert_eq!(resolution.status, MatchStatus::Fuzzy { score: 100 });
    }

    #[test]
    fn test_malformed_barcode_is_ignored() {
        assert!(!is_well_formed_barcode("1234567"));
        assert!(!is_well_formed_barcode("78912345A7890"));
        assert!(!is_well_formed_barcode(""));
        assert!(is_well_formed_barcode("12345678"));

        let f = fields(&[(BARCODE_KEY, "789 1234 567890")]);
        assert_eq!(resolve(&f, &catalog(), 75).status, MatchStatus::InsufficientData);
    }

    #[test]
    fn test_fuzzy_match_with_high_threshold() {
        let f = fields(&[(BRAND_KEY, "Nestle"), (PRODUCT_KEY, "Leite Ninho 400g")]);

        for threshold in [50, 75, 90] {
            let resolution = resolve(&f, &catalog(), threshold);
            assert_eq!(resolution.ean.as_deref(), Some("7891000100103"));
            assert!(resolution.status.to_string().starts_with("Fuzzy Match"));
        }
    }

    #[test]
    fn test_threshold_boundary() {
        let f = fields(&[(BRAND_KEY, "Nestle"), (PRODUCT_KEY, "Leite Ninho")]);
        let score = token_sort_ratio("nestle leite ninho", "nestle leite ninho 400g");
        assert!(score < 100);

        let accepted = resolve(&f, &catalog(), score);
        assert_eq!(accepted.ean.as_deref(), Some("7891000100103"));
        assert_eq!(accepted.status, MatchStatus::Fuzzy { score });

        let rejected = resolve(&f, &catalog(), score + 1);
        assert_eq!(rejected.ean, None);
        assert_eq!(rejected.status.to_string(), format!("Low Confidence (Score: {})", score));
    }

    #[test]
    fn test_insufficient_data() {
        let resolution = resolve(&fields(&[("preço", "R$ 4,99")]), &catalog(), 75);
        assert_eq!(resolution.ean, None);
        assert_eq!(resolution.status.to_string(), "Insufficient Data For Fuzzy Match");
    }

    #[test]
    fn test_invalid_database() {
        let empty = Catalog::from_entries(vec![
            CatalogEntry::new("1", "", ""),
            CatalogEntry::new("2", " ", ""),
        ]);
        let f = fields(&[(PRODUCT_KEY, "Arroz")]);

        let resolution = resolve(&f, &empty, 75);
        assert_eq!(resolution.status.to_string(), "Invalid Database For Fuzzy Match");
    }

    #[test]
    fn test_tie_break_is_first_in_catalog_order() {
        let catalog = Catalog::from_entries(vec![
            CatalogEntry::new("111", "", "Sabão em Pó"),
            CatalogEntry::new("222", "", "Sabão em Pó"),
            CatalogEntry::new("333", "", "Sabão em Pó 1kg"),
        ]);
        let f = fields(&[(PRODUCT_KEY, "sabão em pó")]);

        let resolution = resolve(&f, &catalog, 75);
        assert_eq!(resolution.ean.as_deref(), Some("111"));
    }

    #[test]
    fn test_brand_only_and_product_only_search() {
        assert_eq!(search_text(&fields(&[(BRAND_KEY, "  Coca ")])), "coca");
        assert_eq!(search_text(&fields(&[(PRODUCT_KEY, "Cola   2L")])), "cola 2l");
        assert_eq!(
            search_text(&fields(&[(BRAND_KEY, "Coca"), (PRODUCT_KEY, "Cola 2L")])),
            "coca cola 2l"
        );
        assert_eq!(search_text(&fields(&[])), "");
    }

    #[test]
    fn test_token_set_metric() {
        let f = fields(&[(PRODUCT_KEY, "Leite Ninho")]);
        let resolver = Resolver::new(95).with_metric(SimilarityMetric::TokenSet);

        let resolution = resolver.resolve(&f, &catalog());
        assert_eq!(resolution.ean.as_deref(), Some("7891000100103"));
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(MatchStatus::Fuzzy { score: 87 }.to_string(), "Fuzzy Match (Score: 87)");
        assert_eq!(MatchStatus::NoRelevantMatch.to_string(), "No Relevant Fuzzy Match Found");
        assert_eq!(
            MatchStatus::InternalCorrespondenceError.to_string(),
            "Internal DB Correspondence Error"
        );
        assert!(MatchStatus::DirectEan.is_match());
        assert!(!MatchStatus::LowConfidence { score: 10 }.is_match());
    }
}
