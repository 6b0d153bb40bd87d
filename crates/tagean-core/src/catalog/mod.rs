//! Reference product catalog.
//!
//! The catalog is loaded once per run from a comma-separated file with at
//! least the `brand`, `name` and `ean` columns, and is immutable afterwards.

mod loader;

pub use loader::{load, REQUIRED_COLUMNS};

use serde::Serialize;

use crate::error::CatalogError;

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// A single catalog row, ready for lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    /// EAN barcode, kept as an opaque trimmed string.
    pub ean: String,
    /// Brand as read from the catalog (empty when missing).
    pub brand: String,
    /// Product name as read from the catalog (empty when missing).
    pub name: String,
    /// Lower-cased, whitespace-collapsed `brand + " " + name`.
    pub comparable_text: String,
}

impl CatalogEntry {
    /// Build an entry, deriving its comparable text.
    pub fn new(ean: impl Into<String>, brand: impl Into<String>, name: impl Into<String>) -> Self {
        let ean = ean.into().trim().to_string();
        let brand = brand.into();
        let name = name.into();
        let comparable_text = normalize_text(&format!("{} {}", brand, name));

        Self {
            ean,
            brand,
            name,
            comparable_text,
        }
    }

    /// Whether this entry can take part in fuzzy matching.
    pub fn is_matchable(&self) -> bool {
        !self.comparable_text.trim().is_empty()
    }
}

/// The loaded catalog, in file order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Create a catalog from entries already in file order.
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// All entries in file order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry whose EAN equals `ean` exactly.
    pub fn find_by_ean(&self, ean: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.ean == ean)
    }

    /// First entry whose comparable text equals `text` exactly.
    pub fn find_by_comparable(&self, text: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.comparable_text == text)
    }

    /// Entries eligible for fuzzy matching, in file order.
    ///
    /// Rows whose brand and name are both empty are excluded: an empty
    /// comparable text would match every search string.
    pub fn candidates(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().filter(|e| e.is_matchable())
    }

    /// Number of rows that cannot take part in fuzzy matching.
    pub fn unmatchable_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_matchable()).count()
    }
}

/// Lower-case `text` and collapse every run of whitespace to a single space.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_comparable_text_normalization() {
        let entry = CatalogEntry::new("7891000100103", " Coca ", "Cola 2L");
        assert_eq!(entry.comparable_text, "coca cola 2l");
    }

    #[test]
    fn test_ean_is_trimmed() {
        let entry = CatalogEntry::new("  7891000100103 ", "Coca", "Cola");
        assert_eq!(entry.ean, "7891000100103");
    }

    #[test]
    fn test_empty_rows_are_not_candidates() {
        let catalog = Catalog::from_entries(vec![
            CatalogEntry::new("1", "", ""),
            CatalogEntry::new("2", "Nestlé", "Ninho"),
            CatalogEntry::new("3", "  ", "\t"),
        ]);

        let eans: Vec<&str> = catalog.candidates().map(|e| e.ean.as_str()).collect();
        assert_eq!(eans, vec!["2"]);
        assert_eq!(catalog.unmatchable_count(), 2);
    }

    #[test]
    fn test_find_by_ean_first_wins() {
        let catalog = Catalog::from_entries(vec![
            CatalogEntry::new("123", "A", "first"),
            CatalogEntry::new("123", "B", "second"),
        ]);

        assert_eq!(catalog.find_by_ean("123").map(|e| e.brand.as_str()), Some("A"));
        assert!(catalog.find_by_ean("999").is_none());
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Leite   NINHO\t400g \n"), "leite ninho 400g");
        assert_eq!(normalize_text("   "), "");
    }
}
