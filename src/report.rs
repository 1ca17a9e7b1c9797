use crate::engine::Reconciliation;
use crate::export::{ReportSheet, Workbook};
use crate::ingestion::{BaseRoster, CurrentRoster, Inclusions};
use crate::movement::MovementTable;
use crate::rollup::RosterRollup;
use crate::schema::RawTable;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementSummary {
    pub stayed: usize,
    pub entered: usize,
    pub left: usize,
    pub inclusions: usize,
    pub base_total: usize,
    pub attributed_entries: usize,
    pub untracked_entries: usize,
}

impl MovementSummary {
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("Total de clientes coincidentes: {}", self.stayed),
            format!("Total de novos clientes: {}", self.entered),
            format!("Total de clientes que saíram: {}", self.left),
            format!("Total de inclusões: {}", self.inclusions),
            format!("Total Base Gamma: {}", self.base_total),
            format!(
                "Total de clientes coincidentes entre Inclusões e Novos Clientes: {}",
                self.attributed_entries
            ),
            format!(
                "Total de novos clientes sem inclusão: {}",
                self.untracked_entries
            ),
        ]
    }
}

/// Everything one movement run produces. Detail tables are filtered views
/// of the (normalized) input tables, keeping their original columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementReport {
    pub movement: MovementTable,
    pub summary: MovementSummary,
    pub reconciliation: Reconciliation,
    pub stayed_detail: RawTable,
    pub entered_detail: RawTable,
    pub left_detail: RawTable,
    pub inclusions_detail: RawTable,
    pub attributed_detail: RawTable,
    pub untracked_detail: RawTable,
    pub rollup_by_agent: RosterRollup,
    pub rollup_by_class_and_agent: RosterRollup,
}

impl MovementReport {
    pub fn build(
        base: &BaseRoster,
        current: &CurrentRoster,
        inclusions: &Inclusions,
        reconciliation: Reconciliation,
        missing_label: &str,
    ) -> Self {
        let base_set = base.clients.client_set();
        let inclusion_set = inclusions.clients.client_set();
        let untracked = reconciliation.untracked_entries();

        let movement = MovementTable::from_reconciliation(&base_set, &reconciliation);

        let summary = MovementSummary {
            stayed: reconciliation.stayed.len(),
            entered: reconciliation.entered.len(),
            left: reconciliation.left.len(),
            inclusions: inclusion_set.len(),
            base_total: base_set.len(),
            attributed_entries: reconciliation.attributed_entries.len(),
            untracked_entries: untracked.len(),
        };

        Self {
            movement,
            summary,
            stayed_detail: base.clients.select(&reconciliation.stayed),
            entered_detail: current.clients.select(&reconciliation.entered),
            left_detail: base.clients.select(&reconciliation.left),
            inclusions_detail: inclusions.clients.select(&inclusion_set),
            attributed_detail: inclusions
                .clients
                .select(&reconciliation.attributed_entries),
            untracked_detail: current.clients.select(&untracked),
            rollup_by_agent: RosterRollup::by_agent(&base.entries, missing_label),
            rollup_by_class_and_agent: RosterRollup::by_class_and_agent(
                &base.entries,
                missing_label,
            ),
            reconciliation,
        }
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Movement table, both rollups, and every detail view as sheets.
    pub fn to_workbook(&self) -> Workbook {
        let details = [
            ("Coincidentes", &self.stayed_detail),
            ("Novos Clientes", &self.entered_detail),
            ("Clientes que Saíram", &self.left_detail),
            ("Inclusões", &self.inclusions_detail),
            ("Inclusões em Novos Clientes", &self.attributed_detail),
            ("Novos Clientes sem Inclusão", &self.untracked_detail),
        ];

        let mut sheets = vec![
            self.movement.to_sheet(),
            self.rollup_by_agent.to_sheet(),
            self.rollup_by_class_and_agent.to_sheet(),
        ];
        sheets.extend(details.iter().map(|(name, table)| table_sheet(name, table)));

        Workbook::new(sheets)
    }
}

fn table_sheet(name: &str, table: &RawTable) -> ReportSheet {
    let mut sheet = ReportSheet::new(name, &table.headers[..]);
    for row in &table.rows {
        let mut cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        cells.resize(table.width().max(cells.len()), String::new());
        sheet.push_row(cells);
    }
    sheet
}
