//! Regex patterns for parsing model-generated price-tag descriptions.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Start of a labeled bullet: "* **Produto:** ", "- **Marca**: ", "**Preço:**"
    pub static ref FIELD_LABEL: Regex = Regex::new(
        r"(?m)^[ \t]*(?:[*\-•][ \t]*)?\*\*[ \t]*([\w \t/]+?)[ \t]*(?::(?:[ \t]*\*\*)?|\*\*[ \t]*:)[ \t]*"
    ).unwrap();

    // Brazilian amount: "1.234,56", "1299,00", "4,99", "10.00"
    // Thousands are grouped by '.' or a no-break space only; plain spaces
    // separate numbers ("leve 3 100,00").
    pub static ref BRL_AMOUNT: Regex = Regex::new(
        r"\b(\d{1,3}(?:[.\u{00a0}]\d{3})+|\d+)[,.](\d{2})\b"
    ).unwrap();
}
