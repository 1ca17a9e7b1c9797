//! Month-scoped attribution of completed transfers to agents.
//!
//! A transfer with no origin agent brings a client into the firm; one with
//! no destination agent takes a client out. Each transfer is credited to the
//! agent the client is currently assigned to, and the per-agent book is
//! rolled forward as `initial + entries - exits`.

use crate::error::Result;
use crate::export::{ReportSheet, Workbook, AGENT_SUMMARY_SHEET, CLIENT_DETAIL_SHEET};
use crate::identifier::{ClientId, ClientSet};
use crate::movement::TOTAL_LABEL;
use crate::schema::{AgentAssignment, ReconciliationConfig, TransferEntry};
use crate::utils::{month_bucket, validate_month_selector};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const ENTRY_STATUS: &str = "Entrada";
pub const EXIT_STATUS: &str = "Saída";

pub const AGENT_SUMMARY_HEADERS: [&str; 5] = ["Assessor", "Inicial", "Entradas", "Saídas", "Final"];
pub const CLIENT_DETAIL_HEADERS: [&str; 4] = [
    "Código do Cliente",
    "Nome Assessor Origem",
    "Nome Assessor Destino",
    "Status",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferDirection {
    /// No origin agent, destination agent present
    Entry,
    /// Origin agent present, no destination agent
    Exit,
    /// Anything else, e.g. a hand-off between two agents
    Internal,
}

impl TransferDirection {
    pub fn of(transfer: &TransferEntry) -> Self {
        match (&transfer.origin_agent, &transfer.destination_agent) {
            (None, Some(_)) => TransferDirection::Entry,
            (Some(_), None) => TransferDirection::Exit,
            _ => TransferDirection::Internal,
        }
    }
}

/// A completed transfer joined to the client's assigned agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributedTransfer {
    pub transfer: TransferEntry,
    pub assigned_agent: String,
    pub month: Option<String>,
    pub direction: TransferDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummaryRow {
    pub agent: String,
    pub initial: i64,
    pub entries: i64,
    pub exits: i64,
    #[serde(rename = "final")]
    pub final_count: i64,
}

impl AgentSummaryRow {
    fn new(agent: &str, initial: i64, entries: i64, exits: i64) -> Self {
        Self {
            agent: agent.to_string(),
            initial,
            entries,
            exits,
            final_count: initial + entries - exits,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDetail {
    pub client: ClientId,
    pub origin_agent: String,
    pub destination_agent: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionReport {
    pub month: String,
    /// One row per agent, sorted by name
    pub summary: Vec<AgentSummaryRow>,
    pub total: AgentSummaryRow,
    /// Entry rows first, then exit rows, each in log order
    pub details: Vec<TransferDetail>,
    /// Completed transfers of the requested month, internal ones included
    pub filtered_log: Vec<AttributedTransfer>,
    pub internal_reassignments: usize,
}

impl AttributionReport {
    pub fn agent(&self, name: &str) -> Option<&AgentSummaryRow> {
        self.summary.iter().find(|r| r.agent == name)
    }

    pub fn summary_sheet(&self) -> ReportSheet {
        let mut sheet = ReportSheet::new(AGENT_SUMMARY_SHEET, &AGENT_SUMMARY_HEADERS);
        for row in self.summary.iter().chain(std::iter::once(&self.total)) {
            sheet.push_row(vec![
                row.agent.clone(),
                row.initial.to_string(),
                row.entries.to_string(),
                row.exits.to_string(),
                row.final_count.to_string(),
            ]);
        }
        sheet
    }

    pub fn detail_sheet(&self) -> ReportSheet {
        let mut sheet = ReportSheet::new(CLIENT_DETAIL_SHEET, &CLIENT_DETAIL_HEADERS);
        for detail in &self.details {
            sheet.push_row(vec![
                detail.client.to_string(),
                detail.origin_agent.clone(),
                detail.destination_agent.clone(),
                detail.status.clone(),
            ]);
        }
        sheet
    }

    pub fn to_workbook(&self) -> Workbook {
        Workbook::new(vec![self.summary_sheet(), self.detail_sheet()])
    }
}

pub struct TransferAttributionAnalyzer<'a> {
    config: &'a ReconciliationConfig,
}

impl<'a> TransferAttributionAnalyzer<'a> {
    pub fn new(config: &'a ReconciliationConfig) -> Self {
        Self { config }
    }

    pub fn analyze(
        &self,
        transfers: &[TransferEntry],
        assignments: &[AgentAssignment],
        month: &str,
    ) -> Result<AttributionReport> {
        let month = validate_month_selector(month)?;
        let not_on_file = self.config.not_on_file_label.as_str();

        let (assigned, initial) = self.index_assignments(assignments);

        let completed_status = self.config.completed_status.trim();
        let filtered_log: Vec<AttributedTransfer> = transfers
            .iter()
            .filter(|t| t.status.trim() == completed_status)
            .map(|t| AttributedTransfer {
                assigned_agent: assigned
                    .get(&t.client)
                    .map(|agent| agent.to_string())
                    .unwrap_or_else(|| not_on_file.to_string()),
                month: t.transferred_at.as_ref().map(month_bucket),
                direction: TransferDirection::of(t),
                transfer: t.clone(),
            })
            .filter(|t| t.month.as_deref() == Some(month.as_str()))
            .collect();

        let mut entries: BTreeMap<String, ClientSet> = BTreeMap::new();
        let mut exits: BTreeMap<String, ClientSet> = BTreeMap::new();
        let mut entry_details = Vec::new();
        let mut exit_details = Vec::new();
        let mut internal_reassignments = 0usize;

        for attributed in &filtered_log {
            let transfer = &attributed.transfer;
            match attributed.direction {
                TransferDirection::Entry => {
                    entries
                        .entry(attributed.assigned_agent.clone())
                        .or_default()
                        .insert(transfer.client.clone());
                    entry_details.push(TransferDetail {
                        client: transfer.client.clone(),
                        origin_agent: attributed.assigned_agent.clone(),
                        destination_agent: label_or(&transfer.destination_agent, not_on_file),
                        status: ENTRY_STATUS.to_string(),
                    });
                }
                TransferDirection::Exit => {
                    exits
                        .entry(attributed.assigned_agent.clone())
                        .or_default()
                        .insert(transfer.client.clone());
                    exit_details.push(TransferDetail {
                        client: transfer.client.clone(),
                        origin_agent: label_or(&transfer.origin_agent, not_on_file),
                        destination_agent: attributed.assigned_agent.clone(),
                        status: EXIT_STATUS.to_string(),
                    });
                }
                TransferDirection::Internal => internal_reassignments += 1,
            }
        }

        let agents: BTreeSet<&String> = initial
            .keys()
            .chain(entries.keys())
            .chain(exits.keys())
            .collect();

        let summary: Vec<AgentSummaryRow> = agents
            .into_iter()
            .map(|agent| {
                AgentSummaryRow::new(
                    agent,
                    initial.get(agent).copied().unwrap_or(0),
                    distinct_count(&entries, agent),
                    distinct_count(&exits, agent),
                )
            })
            .collect();

        let total = AgentSummaryRow {
            agent: TOTAL_LABEL.to_string(),
            initial: summary.iter().map(|r| r.initial).sum(),
            entries: summary.iter().map(|r| r.entries).sum(),
            exits: summary.iter().map(|r| r.exits).sum(),
            final_count: summary.iter().map(|r| r.final_count).sum(),
        };

        info!(
            "Transfer attribution for {}: {} completed transfers in month, {} entries, {} exits, {} internal, {} agents",
            month,
            filtered_log.len(),
            entry_details.len(),
            exit_details.len(),
            internal_reassignments,
            summary.len()
        );

        let mut details = entry_details;
        details.extend(exit_details);

        Ok(AttributionReport {
            month,
            summary,
            total,
            details,
            filtered_log,
            internal_reassignments,
        })
    }

    /// First assignment per client wins; returns the client → agent map and
    /// the per-agent client counts.
    fn index_assignments<'b>(
        &self,
        assignments: &'b [AgentAssignment],
    ) -> (HashMap<&'b ClientId, &'b str>, BTreeMap<String, i64>) {
        let mut assigned: HashMap<&ClientId, &str> = HashMap::with_capacity(assignments.len());
        let mut initial: BTreeMap<String, i64> = BTreeMap::new();
        let mut duplicates = 0usize;

        for assignment in assignments {
            if assigned.contains_key(&assignment.client) {
                duplicates += 1;
                continue;
            }
            assigned.insert(&assignment.client, assignment.agent.as_str());
            *initial.entry(assignment.agent.clone()).or_insert(0) += 1;
        }

        if duplicates > 0 {
            debug!("Ignored {} repeated assignment rows", duplicates);
        }

        (assigned, initial)
    }
}

fn label_or(value: &Option<String>, fallback: &str) -> String {
    value.clone().unwrap_or_else(|| fallback.to_string())
}

fn distinct_count(groups: &BTreeMap<String, ClientSet>, agent: &str) -> i64 {
    groups
        .get(agent)
        .map(|clients| i64::try_from(clients.len()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
