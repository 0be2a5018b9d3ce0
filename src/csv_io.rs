// 📄 CSV Codec
// Import: header validation + row parsing. Export: fixed five-column layout.

use crate::error::{LedgerError, Result};
use crate::record::CustomerRecord;
use std::io::{Read, Write};

// ============================================================================
// COLUMN LAYOUT
// ============================================================================

pub const COL_ID: &str = "ID";
pub const COL_MARGIN: &str = "Margin";
pub const COL_COST: &str = "Biaya_Akuisisi";
pub const COL_CLV: &str = "CLV";
pub const COL_SEGMENT: &str = "Segment";

/// Columns an import file must carry (extra columns are ignored)
pub const REQUIRED_COLUMNS: [&str; 3] = [COL_ID, COL_MARGIN, COL_COST];

/// Header of every export, in this order
pub const EXPORT_HEADER: [&str; 5] = [COL_ID, COL_MARGIN, COL_COST, COL_CLV, COL_SEGMENT];

// ============================================================================
// IMPORT
// ============================================================================

/// One parsed input row. `id` is kept verbatim and may be empty;
/// the store decides the placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedRow {
    pub id: String,
    pub margin: u64,
    pub acquisition_cost: u64,
}

/// Parse an import file.
///
/// Fails with `Validation` when a required column is missing, before any row
/// is read, and with `DataFormat` at the first row whose margin or cost is not
/// a non-negative integer.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<ImportedRow>> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = rdr.headers()?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}') == name)
    };

    let (id_idx, margin_idx, cost_idx) =
        match (position(COL_ID), position(COL_MARGIN), position(COL_COST)) {
            (Some(i), Some(m), Some(c)) => (i, m, c),
            _ => {
                let missing = REQUIRED_COLUMNS
                    .iter()
                    .filter(|&&col| position(col).is_none())
                    .map(|col| col.to_string())
                    .collect();
                return Err(LedgerError::Validation { missing });
            }
        };

    let mut rows = Vec::new();

    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let row = i + 1;

        let cell = |idx: usize| record.get(idx).unwrap_or("");

        rows.push(ImportedRow {
            id: cell(id_idx).trim().to_string(),
            margin: parse_amount(cell(margin_idx), row, COL_MARGIN)?,
            acquisition_cost: parse_amount(cell(cost_idx), row, COL_COST)?,
        });
    }

    log::debug!("parsed {} CSV rows", rows.len());

    Ok(rows)
}

/// Non-negative integer amount. Spreadsheet tools often write `1500000.0`,
/// so integral floats are accepted too.
fn parse_amount(raw: &str, row: usize, column: &str) -> Result<u64> {
    let trimmed = raw.trim();

    if let Ok(v) = trimmed.parse::<u64>() {
        return Ok(v);
    }

    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
            Ok(f as u64)
        }
        _ => Err(LedgerError::data_format(row, column, raw)),
    }
}

// ============================================================================
// EXPORT
// ============================================================================

pub fn write_records<W: Write>(records: &[CustomerRecord], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(EXPORT_HEADER)?;
    for record in records {
        wtr.write_record(record.to_row())?;
    }

    wtr.flush()?;
    Ok(())
}

/// UTF-8 CSV bytes, header first, one line per record
pub fn export_bytes(records: &[CustomerRecord]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_records(records, &mut buf)?;
    Ok(buf)
}
