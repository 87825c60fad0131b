//! Planogram reference table loading
//!
//! Reads the product-to-location table from CSV. The planogram's native
//! column names are accepted alongside English aliases:
//!
//! | Field | Columns |
//! |---|---|
//! | product id | `CB`, `product_id` |
//! | name | `Nombre`, `name` |
//! | shelf | `Estante`, `shelf` |
//! | tray | `Charola`, `tray` |
//! | slot | `Posicion en Charola`, `position` |
//!
//! Extra columns are ignored.

use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::types::ReferenceEntry;

/// Reference table could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ReferenceLoadError {
    #[error("cannot read reference table {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed reference table at line {line}: {source}")]
    Csv {
        line: u64,
        #[source]
        source: csv::Error,
    },
    #[error("reference table has no rows")]
    Empty,
    #[error("line {line}: product {product_id} has position {position}, positions start at 1")]
    InvalidPosition {
        line: u64,
        product_id: String,
        position: u32,
    },
    #[error("line {line}: shelf {shelf} tray {tray} position {position} is assigned twice")]
    DuplicateSlot {
        line: u64,
        shelf: String,
        tray: u32,
        position: u32,
    },
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "CB", alias = "product_id")]
    product_id: String,
    #[serde(rename = "Nombre", alias = "name")]
    name: String,
    #[serde(rename = "Estante", alias = "shelf")]
    shelf: String,
    #[serde(rename = "Charola", alias = "tray")]
    tray: u32,
    #[serde(rename = "Posicion en Charola", alias = "position")]
    position: u32,
}

/// Load the reference table from a CSV file.
pub fn load_reference(path: &Path) -> Result<Vec<ReferenceEntry>, ReferenceLoadError> {
    let file = File::open(path).map_err(|source| ReferenceLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let entries = load_reference_from_reader(file)?;
    tracing::debug!(count = entries.len(), path = %path.display(), "Loaded reference table");
    Ok(entries)
}

/// Load the reference table from any CSV source with a header row.
pub fn load_reference_from_reader<R: Read>(
    reader: R,
) -> Result<Vec<ReferenceEntry>, ReferenceLoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(csv_error)?.clone();

    let mut entries = Vec::new();
    let mut slots: HashSet<(String, u32, u32)> = HashSet::new();

    for result in rdr.records() {
        let record = result.map_err(csv_error)?;
        let line = record.position().map_or(0, csv::Position::line);
        let row: RawRow = record
            .deserialize(Some(&headers))
            .map_err(|source| ReferenceLoadError::Csv { line, source })?;

        if row.position < 1 {
            return Err(ReferenceLoadError::InvalidPosition {
                line,
                product_id: row.product_id,
                position: row.position,
            });
        }
        if !slots.insert((row.shelf.clone(), row.tray, row.position)) {
            return Err(ReferenceLoadError::DuplicateSlot {
                line,
                shelf: row.shelf,
                tray: row.tray,
                position: row.position,
            });
        }

        entries.push(ReferenceEntry {
            product_id: row.product_id,
            name: row.name,
            shelf: row.shelf,
            tray: row.tray,
            position: row.position,
        });
    }

    if entries.is_empty() {
        return Err(ReferenceLoadError::Empty);
    }
    Ok(entries)
}

fn csv_error(source: csv::Error) -> ReferenceLoadError {
    let line = source.position().map_or(0, csv::Position::line);
    ReferenceLoadError::Csv { line, source }
}
