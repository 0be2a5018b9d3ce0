// 🗂️ Record Store
// Ordered, in-memory, owned exclusively by one session.
// Every write goes through CustomerRecord::new / replaced, so CLV and segment
// always match margin and cost.

use crate::csv_io::{self, ImportedRow};
use crate::error::Result;
use crate::record::{placeholder_id, CustomerInput, CustomerRecord};
use crate::summary::{summarize, Summary};
use anyhow::Context;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<CustomerRecord>,
}

impl RecordStore {
    pub fn new() -> Self {
        RecordStore {
            records: Vec::new(),
        }
    }

    /// Current snapshot in display order
    pub fn records(&self) -> &[CustomerRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&CustomerRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn position_of(&self, handle: Uuid) -> Option<usize> {
        self.records.iter().position(|r| r.handle() == handle)
    }

    // ========================================================================
    // ADD / IMPORT
    // ========================================================================

    /// Append one record. A blank id becomes `ID_<n+1>`.
    pub fn add(&mut self, input: CustomerInput) -> Result<&CustomerRecord> {
        let position = self.records.len() + 1;
        let id = resolve_id(input.id.as_deref(), position);

        let record = CustomerRecord::new(id, input.margin, input.acquisition_cost, position)?;
        log::debug!(
            "added {} (CLV {}, {})",
            record.id(),
            record.clv(),
            record.segment()
        );

        self.records.push(record);
        Ok(&self.records[position - 1])
    }

    /// Import a CSV stream. All-or-nothing: on any error the store is unchanged.
    ///
    /// Returns the number of records appended.
    pub fn import_bulk<R: Read>(&mut self, reader: R) -> Result<usize> {
        let rows = csv_io::read_rows(reader)?;
        self.import_rows(rows)
    }

    pub fn import_csv_path(&mut self, path: &Path) -> anyhow::Result<usize> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open CSV file: {:?}", path))?;
        let imported = self
            .import_bulk(BufReader::new(file))
            .with_context(|| format!("Failed to import {:?}", path))?;

        log::info!("imported {} records from {:?}", imported, path);
        Ok(imported)
    }

    /// Classify every row into a staging buffer, then append in one go.
    pub fn import_rows(&mut self, rows: Vec<ImportedRow>) -> Result<usize> {
        let base = self.records.len();
        let mut staged = Vec::with_capacity(rows.len());

        for (i, row) in rows.into_iter().enumerate() {
            let position = base + i + 1;
            let id = resolve_id(Some(&row.id), position);
            // Report the data row number, matching csv_io's numbering
            let record = CustomerRecord::new(id, row.margin, row.acquisition_cost, i + 1)?;
            staged.push(record);
        }

        let count = staged.len();
        self.records.extend(staged);
        Ok(count)
    }

    // ========================================================================
    // EDIT
    // ========================================================================

    /// Replace the record at `index` with freshly classified values.
    ///
    /// Returns `Ok(false)` without touching the store when `index` is out of
    /// range. The handle of the replaced record is preserved.
    pub fn edit(&mut self, index: usize, input: CustomerInput) -> Result<bool> {
        let Some(current) = self.records.get(index) else {
            log::debug!("edit ignored: index {} out of range ({})", index, self.records.len());
            return Ok(false);
        };

        let position = index + 1;
        let id = resolve_id(input.id.as_deref(), position);
        let next = current.replaced(id, input.margin, input.acquisition_cost, position)?;

        self.records[index] = next;
        Ok(true)
    }

    pub fn edit_by_handle(&mut self, handle: Uuid, input: CustomerInput) -> Result<bool> {
        match self.position_of(handle) {
            Some(index) => self.edit(index, input),
            None => Ok(false),
        }
    }

    // ========================================================================
    // DELETE
    // ========================================================================

    /// Remove every record whose id is in `ids`, duplicates included.
    ///
    /// Returns how many records were removed.
    pub fn delete<S: AsRef<str>>(&mut self, ids: &[S]) -> usize {
        let targets: HashSet<&str> = ids.iter().map(|s| s.as_ref()).collect();
        let before = self.records.len();

        self.records.retain(|r| !targets.contains(r.id()));

        let removed = before - self.records.len();
        log::debug!("deleted {} records by id", removed);
        removed
    }

    /// Remove exactly one record by position
    pub fn delete_at(&mut self, index: usize) -> Option<CustomerRecord> {
        if index < self.records.len() {
            Some(self.records.remove(index))
        } else {
            None
        }
    }

    pub fn delete_by_handle(&mut self, handle: Uuid) -> Option<CustomerRecord> {
        let index = self.position_of(handle)?;
        self.delete_at(index)
    }

    // ========================================================================
    // READ-OUT
    // ========================================================================

    pub fn summary(&self) -> Option<Summary> {
        summarize(&self.records)
    }

    pub fn export_csv(&self) -> Result<Vec<u8>> {
        csv_io::export_bytes(&self.records)
    }

    pub fn export_csv_path(&self, path: &Path) -> anyhow::Result<()> {
        let bytes = self.export_csv()?;
        std::fs::write(path, bytes)
            .with_context(|| format!("Failed to write CSV file: {:?}", path))?;

        log::info!("exported {} records to {:?}", self.records.len(), path);
        Ok(())
    }
}

fn resolve_id(raw: Option<&str>, position: usize) -> String {
    match raw.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => placeholder_id(position),
    }
}
