use crate::export::ReportSheet;
use crate::movement::TOTAL_LABEL;
use crate::schema::BaseRosterEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ROLLUP_BY_AGENT_SHEET: &str = "Clientes por Farmer";
pub const ROLLUP_BY_CLASS_SHEET: &str = "Clientes por Classe e Farmer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RollupGrouping {
    Agent,
    ClassAndAgent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupRow {
    pub class: Option<String>,
    pub agent: String,
    pub clients: i64,
}

/// Base roster rows counted per agent, or per class and agent, with a
/// grand-total row equal to the sum of every group.
///
/// This is a headcount of the starting roster only. The rolled-forward
/// initial / entries / exits / final view per agent is
/// [`crate::transfers::AgentSummaryRow`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRollup {
    pub grouping: RollupGrouping,
    pub rows: Vec<RollupRow>,
    pub total: RollupRow,
}

impl RosterRollup {
    pub fn by_agent(entries: &[BaseRosterEntry], missing_label: &str) -> Self {
        Self::build(entries, RollupGrouping::Agent, missing_label)
    }

    pub fn by_class_and_agent(entries: &[BaseRosterEntry], missing_label: &str) -> Self {
        Self::build(entries, RollupGrouping::ClassAndAgent, missing_label)
    }

    fn build(entries: &[BaseRosterEntry], grouping: RollupGrouping, missing_label: &str) -> Self {
        let mut groups: BTreeMap<(Option<String>, String), i64> = BTreeMap::new();

        for entry in entries {
            let class = match grouping {
                RollupGrouping::Agent => None,
                RollupGrouping::ClassAndAgent => Some(
                    entry
                        .class
                        .clone()
                        .unwrap_or_else(|| missing_label.to_string()),
                ),
            };
            let agent = entry
                .agent
                .clone()
                .unwrap_or_else(|| missing_label.to_string());

            *groups.entry((class, agent)).or_insert(0) += 1;
        }

        let rows: Vec<RollupRow> = groups
            .into_iter()
            .map(|((class, agent), clients)| RollupRow {
                class,
                agent,
                clients,
            })
            .collect();

        let total = RollupRow {
            class: None,
            agent: TOTAL_LABEL.to_string(),
            clients: rows.iter().map(|r| r.clients).sum(),
        };

        Self {
            grouping,
            rows,
            total,
        }
    }

    pub fn grand_total(&self) -> i64 {
        self.total.clients
    }

    pub fn classes(&self) -> Vec<&str> {
        let mut classes: Vec<&str> = self.rows.iter().filter_map(|r| r.class.as_deref()).collect();
        classes.dedup();
        classes
    }

    /// Presentation filter: the agent rows of one class.
    pub fn rows_for_class(&self, class: &str) -> Vec<&RollupRow> {
        self.rows
            .iter()
            .filter(|r| r.class.as_deref() == Some(class))
            .collect()
    }

    /// One subtotal per class, in class order. Empty when grouped by agent only.
    pub fn class_subtotals(&self) -> Vec<RollupRow> {
        self.classes()
            .into_iter()
            .map(|class| RollupRow {
                class: Some(class.to_string()),
                agent: TOTAL_LABEL.to_string(),
                clients: self.rows_for_class(class).iter().map(|r| r.clients).sum(),
            })
            .collect()
    }

    pub fn to_sheet(&self) -> ReportSheet {
        match self.grouping {
            RollupGrouping::Agent => {
                let mut sheet =
                    ReportSheet::new(ROLLUP_BY_AGENT_SHEET, &["Farmer / Hunter", "Clientes"]);
                for row in self.rows.iter().chain(std::iter::once(&self.total)) {
                    sheet.push_row(vec![row.agent.clone(), row.clients.to_string()]);
                }
                sheet
            }
            RollupGrouping::ClassAndAgent => {
                let mut sheet = ReportSheet::new(
                    ROLLUP_BY_CLASS_SHEET,
                    &["Classe", "Farmer / Hunter", "Clientes"],
                );
                for row in self.rows.iter().chain(std::iter::once(&self.total)) {
                    sheet.push_row(vec![
                        row.class.clone().unwrap_or_default(),
                        row.agent.clone(),
                        row.clients.to_string(),
                    ]);
                }
                sheet
            }
        }
    }
}
