use crate::engine::Reconciliation;
use crate::error::{ReconciliationError, Result};
use crate::export::ReportSheet;
use crate::identifier::ClientSet;
use serde::{Deserialize, Serialize};

pub const MOVEMENT_SHEET: &str = "Relatório de Movimentações";
pub const MOVEMENT_HEADERS: [&str; 5] = ["", "Início", "Entradas", "Saídas", "Fim"];

pub const TOTAL_LABEL: &str = "Total";
pub const WITHIN_TRACKED_LABEL: &str = "Dentro Positivador";
pub const OUTSIDE_TRACKED_LABEL: &str = "Fora Positivador";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRow {
    pub label: String,
    pub start: i64,
    pub entries: i64,
    pub exits: i64,
    pub end: i64,
}

impl MovementRow {
    /// `end` is always `start + entries - exits`.
    pub fn new(label: &str, start: i64, entries: i64, exits: i64) -> Self {
        Self {
            label: label.to_string(),
            start,
            entries,
            exits,
            end: start + entries - exits,
        }
    }

    pub fn verify_identity(&self) -> Result<()> {
        if self.end != self.start + self.entries - self.exits {
            return Err(ReconciliationError::CountIdentityViolation {
                label: self.label.clone(),
                start: self.start,
                entries: self.entries,
                exits: self.exits,
                end: self.end,
            });
        }
        Ok(())
    }
}

/// Start / entries / exits / end counts for the whole portfolio, split by
/// membership of the tracked system.
///
/// Tracked-system membership is approximated by the `stayed` set: a client
/// present in both rosters is "within" the tracked system. New clients are
/// all attributed to the outside row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementTable {
    pub total: MovementRow,
    pub within_tracked: MovementRow,
    pub outside_tracked: MovementRow,
}

impl MovementTable {
    pub fn from_reconciliation(base: &ClientSet, reconciliation: &Reconciliation) -> Self {
        let stayed = &reconciliation.stayed;
        let left = &reconciliation.left;

        let total = MovementRow::new(
            TOTAL_LABEL,
            count(base.len()),
            count(reconciliation.entered.len()),
            count(left.len()),
        );

        let within_tracked = MovementRow::new(
            WITHIN_TRACKED_LABEL,
            count(stayed.len()),
            0,
            count(left.intersection(stayed).count()),
        );

        let outside_tracked = MovementRow::new(
            OUTSIDE_TRACKED_LABEL,
            total.start - within_tracked.start,
            count(reconciliation.entered.len()),
            count(left.difference(stayed).count()),
        );

        Self {
            total,
            within_tracked,
            outside_tracked,
        }
    }

    pub fn rows(&self) -> [&MovementRow; 3] {
        [&self.total, &self.within_tracked, &self.outside_tracked]
    }

    pub fn verify_identity(&self) -> Result<()> {
        for row in self.rows() {
            row.verify_identity()?;
        }
        Ok(())
    }

    pub fn to_sheet(&self) -> ReportSheet {
        let mut sheet = ReportSheet::new(MOVEMENT_SHEET, &MOVEMENT_HEADERS);
        for row in self.rows() {
            sheet.push_row(vec![
                row.label.clone(),
                row.start.to_string(),
                row.entries.to_string(),
                row.exits.to_string(),
                row.end.to_string(),
            ]);
        }
        sheet
    }
}

fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
