//! CSV catalog loading.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use tracing::{debug, info, warn};

use super::{Catalog, CatalogEntry, Result};
use crate::error::CatalogError;

/// Columns the catalog header must contain.
pub const REQUIRED_COLUMNS: [&str; 3] = ["brand", "name", "ean"];

/// Load the catalog from a CSV file.
pub fn load(path: &Path) -> Result<Catalog> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => CatalogError::NotFound(path.to_path_buf()),
        _ => CatalogError::Parse(format!("{}: {}", path.display(), e)),
    })?;

    let catalog = Catalog::from_reader(file)?;
    info!(
        "Loaded {} catalog entries from {}",
        catalog.len(),
        path.display()
    );

    Ok(catalog)
}

impl Catalog {
    /// Parse a catalog from any CSV source.
    ///
    /// Fields may be double-quoted; a quote inside a quoted field is escaped
    /// by doubling it. Extra columns are ignored and short rows read their
    /// missing cells as empty strings.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b',')
            .quote(b'"')
            .double_quote(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| CatalogError::Parse(e.to_string()))?
            .clone();

        let position = |column: &str| headers.iter().position(|h| h == column);

        let (brand_idx, name_idx, ean_idx) = match (position("brand"), position("name"), position("ean")) {
            (Some(b), Some(n), Some(e)) => (b, n, e),
            _ => {
                return Err(CatalogError::Schema {
                    missing: REQUIRED_COLUMNS
                        .iter()
                        .filter(|&&c| position(c).is_none())
                        .map(|c| c.to_string())
                        .collect(),
                    available: headers.iter().map(String::from).collect(),
                });
            }
        };

        let mut entries = Vec::new();
        for (i, record) in rdr.records().enumerate() {
            // Header is line 1.
            let record = record.map_err(|e| CatalogError::Parse(format!("line {}: {}", i + 2, e)))?;

            let cell = |idx: usize| record.get(idx).unwrap_or("");
            entries.push(CatalogEntry::new(cell(ean_idx), cell(brand_idx), cell(name_idx)));
        }

        let catalog = Catalog::from_entries(entries);

        let unmatchable = catalog.unmatchable_count();
        if unmatchable > 0 {
            warn!(
                "{} catalog rows have empty brand and name and are excluded from fuzzy matching",
                unmatchable
            );
        }
        debug!(
            "Catalog parsed: {} rows, {} fuzzy candidates",
            catalog.len(),
            catalog.len() - unmatchable
        );

        Ok(catalog)
    }
}
