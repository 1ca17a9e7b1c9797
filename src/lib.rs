//! # Client Movement Reconciler
//!
//! A library for reconciling client-roster snapshots taken at two points in
//! time into a movement report: who stayed, who entered, who left, and how
//! new clients map to the agents that brought them in.
//!
//! ## Core Concepts
//!
//! - **Base Roster**: clients and their assigned agents at the start of the period
//! - **Current Roster**: active clients at the end of the period
//! - **Inclusions**: attribution of newly onboarded clients
//! - **Client Identifier**: a canonical key; `1023`, `1023.0` and `" 1023 "` are the same client
//! - **Movement Table**: start / entries / exits / end, with `end = start + entries - exits`
//! - **Transfer Attribution**: completed transfers of one month rolled up per agent
//!
//! The crate works on already-parsed tables ([`RawTable`]). Reading
//! spreadsheets and rendering results belong to the caller; a small CSV
//! reader is provided in [`ingestion`] for convenience.
//!
//! ## Example
//!
//! ```rust,ignore
//! use client_movement_reconciler::*;
//!
//! let inputs = MovementInputs {
//!     base: Some(read_csv_path("base_gamma.csv")?),
//!     current: Some(read_csv_path("positivador.csv")?),
//!     inclusions: Some(read_csv_path("inclusoes.csv")?),
//! };
//!
//! let report = RosterReconciler::new(ReconciliationConfig::default()).run(inputs)?;
//! for line in report.summary.lines() {
//!     println!("{}", line);
//! }
//! ```

pub mod engine;
pub mod error;
pub mod export;
pub mod identifier;
pub mod ingestion;
pub mod movement;
pub mod report;
pub mod rollup;
pub mod schema;
pub mod transfers;
pub mod utils;

pub use engine::{reconcile, Reconciliation, SetReconciler};
pub use error::{ReconciliationError, Result};
pub use export::{ReportSheet, Workbook, AGENT_SUMMARY_SHEET, CLIENT_DETAIL_SHEET};
pub use identifier::{normalize_identifier, normalize_key, ClientId, ClientSet};
pub use ingestion::*;
pub use movement::{MovementRow, MovementTable};
pub use report::{MovementReport, MovementSummary};
pub use rollup::{RollupGrouping, RollupRow, RosterRollup};
pub use schema::*;
pub use transfers::{
    AgentSummaryRow, AttributedTransfer, AttributionReport, TransferAttributionAnalyzer,
    TransferDetail, TransferDirection,
};

use log::{debug, info};

/// The three tables a movement run needs. A `None` stands for an input the
/// user did not provide.
#[derive(Debug, Clone, Default)]
pub struct MovementInputs {
    pub base: Option<RawTable>,
    pub current: Option<RawTable>,
    pub inclusions: Option<RawTable>,
}

impl MovementInputs {
    pub fn new(base: RawTable, current: RawTable, inclusions: RawTable) -> Self {
        Self {
            base: Some(base),
            current: Some(current),
            inclusions: Some(inclusions),
        }
    }

    fn require(self) -> Result<(RawTable, RawTable, RawTable)> {
        let base = self
            .base
            .ok_or_else(|| ReconciliationError::MissingInput(BASE_ROSTER_TABLE.to_string()))?;
        let current = self
            .current
            .ok_or_else(|| ReconciliationError::MissingInput(CURRENT_ROSTER_TABLE.to_string()))?;
        let inclusions = self
            .inclusions
            .ok_or_else(|| ReconciliationError::MissingInput(INCLUSIONS_TABLE.to_string()))?;
        Ok((base, current, inclusions))
    }
}

pub struct RosterReconciler {
    config: ReconciliationConfig,
}

impl RosterReconciler {
    pub fn new(config: ReconciliationConfig) -> Self {
        Self { config }
    }

    /// Load, normalize, reconcile and aggregate. Either the whole report is
    /// returned or nothing is.
    pub fn run(&self, inputs: MovementInputs) -> Result<MovementReport> {
        self.config.validate()?;
        let (base, current, inclusions) = inputs.require()?;

        info!(
            "Starting movement reconciliation: {} base rows, {} current rows, {} inclusion rows",
            base.len(),
            current.len(),
            inclusions.len()
        );

        let base = load_base_roster(base, &self.config)?;
        let current = load_current_roster(current, &self.config)?;
        let inclusions = load_inclusions(inclusions, &self.config)?;

        let base_set = base.clients.client_set();
        let current_set = current.clients.client_set();
        let inclusion_set = inclusions.clients.client_set();

        let reconciliation = SetReconciler::reconcile(&base_set, &current_set, &inclusion_set);
        debug!(
            "Partition check over {} clients: {}",
            base_set.len() + reconciliation.entered.len(),
            reconciliation.is_partition_of(&base_set, &current_set)
        );

        let report = MovementReport::build(
            &base,
            &current,
            &inclusions,
            reconciliation,
            &self.config.not_on_file_label,
        );
        report.movement.verify_identity()?;

        info!(
            "Movement reconciliation finished: start {}, entries {}, exits {}, end {}",
            report.movement.total.start,
            report.movement.total.entries,
            report.movement.total.exits,
            report.movement.total.end
        );

        Ok(report)
    }

    pub fn attribute_transfers(
        &self,
        transfers: &RawTable,
        assignments: &RawTable,
        month: &str,
    ) -> Result<AttributionReport> {
        self.config.validate()?;

        let transfers = load_transfer_log(transfers, &self.config)?;
        let assignments = load_agent_assignments(assignments, &self.config)?;

        TransferAttributionAnalyzer::new(&self.config).analyze(&transfers, &assignments, month)
    }
}

pub fn run_movement_report(
    base: RawTable,
    current: RawTable,
    inclusions: RawTable,
    config: &ReconciliationConfig,
) -> Result<MovementReport> {
    RosterReconciler::new(config.clone()).run(MovementInputs::new(base, current, inclusions))
}

pub fn run_transfer_attribution(
    transfers: &RawTable,
    assignments: &RawTable,
    month: &str,
    config: &ReconciliationConfig,
) -> Result<AttributionReport> {
    RosterReconciler::new(config.clone()).attribute_transfers(transfers, assignments, month)
}
