//! Field extraction from a block's free text.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::patterns::{BRL_AMOUNT, FIELD_LABEL};
use super::price::parse_brl_amount;

/// Key holding the product name.
pub const PRODUCT_KEY: &str = "produto";
/// Key holding the brand.
pub const BRAND_KEY: &str = "marca";
/// Key holding the barcode read by the model.
pub const BARCODE_KEY: &str = "códigos_de_barras";
/// Keys that may hold a price, in lookup order.
pub const PRICE_KEYS: [&str; 3] = ["preço", "preço_promocional", "preço_normal"];

/// Structured key/value data parsed out of one block.
///
/// Keys are normalized labels (trimmed, spaces replaced with underscores,
/// lower-cased). A missing key reads as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExtractedFields {
    values: BTreeMap<String, String>,
}

impl ExtractedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value under an already-normalized key, replacing any earlier one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Value for `key`, or `""` when absent.
    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn product(&self) -> &str {
        self.get(PRODUCT_KEY)
    }

    pub fn brand(&self) -> &str {
        self.get(BRAND_KEY)
    }

    pub fn barcode(&self) -> &str {
        self.get(BARCODE_KEY)
    }

    /// First parseable amount found under one of the price keys.
    pub fn price(&self) -> Option<Decimal> {
        PRICE_KEYS
            .iter()
            .map(|key| self.get(key))
            .filter(|value| !value.is_empty())
            .find_map(|value| {
                BRL_AMOUNT
                    .find(value)
                    .and_then(|m| parse_brl_amount(m.as_str()))
            })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExtractedFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (key, value) in iter {
            fields.insert(key, value);
        }
        fields
    }
}

/// Normalize a label into a field key.
pub fn normalize_key(label: &str) -> String {
    label.trim().replace(' ', "_").to_lowercase()
}

/// Extract labeled fields from free text.
///
/// A value runs from its label to the next labeled bullet (or the end of
/// the text) and may span several lines. Text outside any label is ignored.
/// When a label repeats, the later value wins.
pub fn extract_fields(text: &str) -> ExtractedFields {
    let text = text.replace('\u{00a0}', " ");
    let mut fields = ExtractedFields::new();

    let labels: Vec<_> = FIELD_LABEL.captures_iter(&text).collect();

    for (i, caps) in labels.iter().enumerate() {
        let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        let value_end = labels
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(text.len());

        let value = text[whole.end()..value_end].trim();
        fields.insert(normalize_key(label.as_str()), value);
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    const SAMPLE: &str = "* **Produto:** Leite Ninho 400g\n\
                          * **Marca:** Nestlé\n\
                          * **Preço:** R$ 19,90\n\
                          * **Códigos de Barras:** 7891000100103";

    #[test]
    fn test_extract_bullet_fields() {
        let fields = extract_fields(SAMPLE);

        assert_eq!(fields.product(), "Leite Ninho 400g");
        assert_eq!(fields.brand(), "Nestlé");
        assert_eq!(fields.barcode(), "7891000100103");
        assert_eq!(fields.get("preço"), "R$ 19,90");
        assert_eq!(fields.len(), 4);
    }

    #[test]
    fn test_missing_key_is_empty() {
        let fields = extract_fields("* **Produto:** Arroz");
        assert_eq!(fields.brand(), "");
        assert!(!fields.contains(BRAND_KEY));
    }

    #[test]
    fn test_multiline_value() {
        let text = "* **Produto:** Biscoito Recheado\nsabor chocolate\n* **Marca:** Bauducco";
        let fields = extract_fields(text);

        assert_eq!(fields.product(), "Biscoito Recheado\nsabor chocolate");
        assert_eq!(fields.brand(), "Bauducco");
    }

    #[test]
    fn test_later_label_overwrites() {
        let text = "* **Marca:** Nestle\n* **Marca:** Nestlé Brasil";
        assert_eq!(extract_fields(text).brand(), "Nestlé Brasil");
    }

    #[test]
    fn test_non_breaking_space_is_normalized() {
        let text = "*\u{00a0}**Produto:**\u{00a0}Café\u{00a0}Pilão";
        assert_eq!(extract_fields(text).product(), "Café Pilão");
    }

    #[test]
    fn test_label_variants() {
        let text = "- **Marca**: Ypê\n**Produto:** Detergente\n•   **Unidade:**   500ml";
        let fields = extract_fields(text);

        assert_eq!(fields.brand(), "Ypê");
        assert_eq!(fields.product(), "Detergente");
        assert_eq!(fields.get("unidade"), "500ml");
    }

    #[test]
    fn test_unstructured_text_is_ignored() {
        let fields = extract_fields("Não consegui identificar o produto nesta imagem.");
        assert!(fields.is_empty());
    }

    #[test]
    fn test_extraction_is_idempotent() {
        assert_eq!(extract_fields(SAMPLE), extract_fields(SAMPLE));
    }

    #[test]
    fn test_price() {
        let fields = extract_fields(SAMPLE);
        assert_eq!(fields.price(), Some(Decimal::from_str("19.90").unwrap()));

        let fields: ExtractedFields = [("preço_promocional", "R$ 1.299,00 cada")].into_iter().collect();
        assert_eq!(fields.price(), Some(Decimal::from_str("1299.00").unwrap()));

        let fields: ExtractedFields = [("preço", "não visível")].into_iter().collect();
        assert_eq!(fields.price(), None);
    }

    #[test]
    fn test_price_does_not_join_separate_numbers() {
        let fields: ExtractedFields = [("preço", "leve 3 100,00")].into_iter().collect();
        assert_eq!(fields.price(), Some(Decimal::from_str("100.00").unwrap()));

        let fields: ExtractedFields = [("preço", "R$ 1299,00")].into_iter().collect();
        assert_eq!(fields.price(), Some(Decimal::from_str("1299.00").unwrap()));

        let fields: ExtractedFields = [("preço", "R$ 1.234.567,89")].into_iter().collect();
        assert_eq!(fields.price(), Some(Decimal::from_str("1234567.89").unwrap()));

        let fields: ExtractedFields = [("preço", "R$\u{00a0}2\u{00a0}499,90")].into_iter().collect();
        assert_eq!(fields.price(), Some(Decimal::from_str("2499.90").unwrap()));
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key(" Códigos de Barras "), "códigos_de_barras");
        assert_eq!(normalize_key("Preço/Unidade"), "preço/unidade");
    }
}
