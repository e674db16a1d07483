//! Writes computed costs back into the cost spreadsheet.
//!
//! Row 1 is a header; column A holds the card id and column B receives the
//! cost. The workbook is saved in place.

use crate::store::{ProductStore, StoreError};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};
use umya_spreadsheet::Worksheet;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unable to open workbook {path}: {message}")]
    Open { path: String, message: String },
    #[error("worksheet `{0}` not found")]
    MissingSheet(String),
    #[error("unable to save workbook {path}: {message}")]
    Save { path: String, message: String },
}

/// Minimal cell access needed to fill the cost column.
pub trait CostSheet {
    fn last_row(&self) -> u32;
    fn id_cell(&self, row: u32) -> String;
    fn write_cost(&mut self, row: u32, cost: i64);
}

impl CostSheet for Worksheet {
    fn last_row(&self) -> u32 {
        self.get_highest_row()
    }

    fn id_cell(&self, row: u32) -> String {
        self.get_value(format!("A{row}").as_str())
    }

    fn write_cost(&mut self, row: u32, cost: i64) {
        self.get_cell_mut(format!("B{row}").as_str())
            .set_value_number(cost as f64);
    }
}

pub trait CostLookup {
    fn cost_for(&self, nm_id: u64) -> Result<Option<i64>, StoreError>;
}

impl CostLookup for ProductStore {
    fn cost_for(&self, nm_id: u64) -> Result<Option<i64>, StoreError> {
        ProductStore::cost_for(self, nm_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub updated: usize,
    pub skipped: usize,
}

/// Fills column B for every data row whose id has a stored cost.
pub fn fill_costs<S, L>(sheet: &mut S, costs: &L) -> ExportReport
where
    S: CostSheet + ?Sized,
    L: CostLookup + ?Sized,
{
    let mut report = ExportReport::default();
    for row in 2..=sheet.last_row() {
        let raw = sheet.id_cell(row);
        let Ok(nm_id) = raw.trim().parse::<u64>() else {
            warn!(target = "unitsync.export", row, value = %raw, "card_id_unparseable");
            report.skipped += 1;
            continue;
        };
        match costs.cost_for(nm_id) {
            Ok(Some(cost)) => {
                sheet.write_cost(row, cost);
                report.updated += 1;
            }
            Ok(None) => {
                info!(target = "unitsync.export", row, nm_id, "cost_not_found");
                report.skipped += 1;
            }
            Err(err) => {
                warn!(target = "unitsync.export", row, nm_id, error = %err, "cost_lookup_failed");
                report.skipped += 1;
            }
        }
    }
    report
}

pub fn export_costs(
    path: &Path,
    sheet_name: &str,
    store: &ProductStore,
) -> Result<ExportReport, ExportError> {
    let shown = path.display().to_string();
    let mut book = umya_spreadsheet::reader::xlsx::read(path).map_err(|err| ExportError::Open {
        path: shown.clone(),
        message: err.to_string(),
    })?;
    let sheet = book
        .get_sheet_by_name_mut(sheet_name)
        .ok_or_else(|| ExportError::MissingSheet(sheet_name.to_string()))?;
    let report = fill_costs(sheet, store);
    umya_spreadsheet::writer::xlsx::write(&book, path).map_err(|err| ExportError::Save {
        path: shown.clone(),
        message: err.to_string(),
    })?;
    info!(
        target = "unitsync.export",
        path = %shown,
        updated = report.updated,
        skipped = report.skipped,
        "workbook_saved"
    );
    Ok(report)
}
