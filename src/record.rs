// 👤 Customer Record
// Identity (handle) is stable, values are replaced wholesale on edit.
// CLV and segment are derived at construction and never set directly.

use crate::error::{LedgerError, Result};
use crate::segment::{classify, Segment};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerRecord {
    handle: Uuid,
    id: String,
    margin: u64,
    acquisition_cost: u64,
    clv: i64,
    segment: Segment,
}

impl CustomerRecord {
    /// Build a record with a fresh handle.
    ///
    /// `position` is the 1-based slot the record will occupy; it only feeds
    /// the error when margin/cost do not fit the signed CLV range.
    pub fn new(id: String, margin: u64, acquisition_cost: u64, position: usize) -> Result<Self> {
        Self::with_handle(Uuid::new_v4(), id, margin, acquisition_cost, position)
    }

    pub(crate) fn with_handle(
        handle: Uuid,
        id: String,
        margin: u64,
        acquisition_cost: u64,
        position: usize,
    ) -> Result<Self> {
        let classification = classify(margin, acquisition_cost).ok_or_else(|| {
            let (column, value) = if i64::try_from(margin).is_err() {
                ("Margin", margin)
            } else {
                ("Biaya_Akuisisi", acquisition_cost)
            };
            LedgerError::data_format(position, column, &value.to_string())
        })?;

        Ok(CustomerRecord {
            handle,
            id,
            margin,
            acquisition_cost,
            clv: classification.value,
            segment: classification.segment,
        })
    }

    /// Same identity, new values. Used by edit.
    pub(crate) fn replaced(
        &self,
        id: String,
        margin: u64,
        acquisition_cost: u64,
        position: usize,
    ) -> Result<Self> {
        Self::with_handle(self.handle, id, margin, acquisition_cost, position)
    }

    pub fn handle(&self) -> Uuid {
        self.handle
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn margin(&self) -> u64 {
        self.margin
    }

    pub fn acquisition_cost(&self) -> u64 {
        self.acquisition_cost
    }

    pub fn clv(&self) -> i64 {
        self.clv
    }

    pub fn segment(&self) -> Segment {
        self.segment
    }

    /// Cells in export column order: ID, Margin, Biaya_Akuisisi, CLV, Segment
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.margin.to_string(),
            self.acquisition_cost.to_string(),
            self.clv.to_string(),
            self.segment.label().to_string(),
        ]
    }
}

// ============================================================================
// INPUT (form submit / API body / CLI flag)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CustomerInput {
    #[serde(default)]
    pub id: Option<String>,
    pub margin: u64,
    pub acquisition_cost: u64,
}

impl CustomerInput {
    pub fn new(id: impl Into<String>, margin: u64, acquisition_cost: u64) -> Self {
        CustomerInput {
            id: Some(id.into()),
            margin,
            acquisition_cost,
        }
    }

    /// Parse `ID,MARGIN,COST`. The ID part may be empty.
    pub fn parse_triplet(s: &str) -> std::result::Result<Self, String> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 3 {
            return Err(format!("expected ID,MARGIN,COST but got {s:?}"));
        }

        let margin = parts[1]
            .trim()
            .parse::<u64>()
            .map_err(|_| format!("invalid margin: {}", parts[1]))?;
        let acquisition_cost = parts[2]
            .trim()
            .parse::<u64>()
            .map_err(|_| format!("invalid acquisition cost: {}", parts[2]))?;

        Ok(CustomerInput {
            id: Some(parts[0].trim().to_string()),
            margin,
            acquisition_cost,
        })
    }
}

/// Placeholder identifier for the record at 1-based `position`
pub fn placeholder_id(position: usize) -> String {
    format!("ID_{position}")
}
