use crate::error::{ReconciliationError, Result};
use crate::identifier::{normalize_identifier, ClientId, ClientSet};
use crate::schema::{
    AgentAssignment, BaseRosterEntry, CellValue, CurrentRosterEntry, InclusionEntry, RawTable,
    ReconciliationConfig, TransferEntry,
};
use crate::utils::{parse_fixed_datetime, parse_lenient_date};
use log::{debug, warn};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const BASE_ROSTER_TABLE: &str = "Base Gamma";
pub const CURRENT_ROSTER_TABLE: &str = "Positivador Novo";
pub const INCLUSIONS_TABLE: &str = "Inclusões";
pub const ASSIGNMENT_TABLE: &str = "Carteira de Assessores";
pub const TRANSFER_LOG_TABLE: &str = "Transferências";

/// Canonical base roster headers, in positional order: source system,
/// entry date, exit date, client, class, name, agent, trader.
pub const BASE_ROSTER_COLUMNS: [&str; 8] = [
    "Positivador",
    "Dt Entrada",
    "Dt Saída",
    "Cliente",
    "Classe",
    "Nome",
    "Farmer / Hunter",
    "Trader",
];

const BASE_SOURCE_SYSTEM: usize = 0;
const BASE_ENTRY_DATE: usize = 1;
const BASE_EXIT_DATE: usize = 2;
const BASE_CLIENT: usize = 3;
const BASE_CLASS: usize = 4;
const BASE_NAME: usize = 5;
const BASE_AGENT: usize = 6;
const BASE_TRADER: usize = 7;

pub const TRANSFER_STATUS_COLUMN: &str = "Status";
pub const TRANSFER_CLIENT_COLUMN: &str = "Código do Cliente";
pub const TRANSFER_ORIGIN_COLUMN: &str = "Nome Assessor Origem";
pub const TRANSFER_DESTINATION_COLUMN: &str = "Nome Assessor Destino";
pub const TRANSFER_DATE_COLUMN: &str = "Data Transferência";

/// A table whose client column has been normalized in place, together
/// with the per-row canonical keys.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientTable {
    table: RawTable,
    keys: Vec<Option<ClientId>>,
}

impl ClientTable {
    /// Normalizes `client_column` of every row. The cell is rewritten to the
    /// canonical key, or emptied when the identifier is absent.
    pub fn normalize(mut table: RawTable, client_column: usize) -> Self {
        let mut keys = Vec::with_capacity(table.len());

        for row in 0..table.len() {
            let key = normalize_identifier(table.cell(row, client_column));
            let cell = key
                .as_ref()
                .map(|k| CellValue::Text(k.as_str().to_string()))
                .unwrap_or(CellValue::Empty);
            table.set_cell(row, client_column, cell);
            keys.push(key);
        }

        Self { table, keys }
    }

    pub fn table(&self) -> &RawTable {
        &self.table
    }

    pub fn key(&self, row: usize) -> Option<&ClientId> {
        self.keys.get(row).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn absent_count(&self) -> usize {
        self.keys.iter().filter(|k| k.is_none()).count()
    }

    pub fn client_set(&self) -> ClientSet {
        self.keys.iter().flatten().cloned().collect()
    }

    /// Rows whose client belongs to `clients`.
    pub fn select(&self, clients: &ClientSet) -> RawTable {
        self.table.select_rows(|row, _| {
            self.key(row)
                .map(|key| clients.contains(key))
                .unwrap_or(false)
        })
    }

    /// Keeps the first row seen for each client. Rows without an identifier
    /// are kept; they never take part in any count.
    pub fn dedup_by_client(self) -> (Self, usize) {
        let mut seen: HashSet<ClientId> = HashSet::new();
        self.retain(|key| match key {
            Some(key) => seen.insert(key.clone()),
            None => true,
        })
    }

    pub fn drop_absent(self) -> (Self, usize) {
        self.retain(|key| key.is_some())
    }

    fn retain<F>(self, mut keep: F) -> (Self, usize)
    where
        F: FnMut(Option<&ClientId>) -> bool,
    {
        let Self { table, keys } = self;

        let before = keys.len();
        let mut rows = Vec::with_capacity(before);
        let mut kept_keys = Vec::with_capacity(before);

        for (row, key) in table.rows.into_iter().zip(keys) {
            if keep(key.as_ref()) {
                rows.push(row);
                kept_keys.push(key);
            }
        }

        let removed = before - kept_keys.len();
        let table = RawTable::new(table.headers, rows);

        (
            Self {
                table,
                keys: kept_keys,
            },
            removed,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BaseRoster {
    pub clients: ClientTable,
    pub entries: Vec<BaseRosterEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentRoster {
    pub clients: ClientTable,
    pub entries: Vec<CurrentRosterEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inclusions {
    pub clients: ClientTable,
    pub entries: Vec<InclusionEntry>,
}

/// Renames the base roster headers positionally to [`BASE_ROSTER_COLUMNS`].
///
/// The header text of the input is ignored; only the column count is
/// checked. Any other width is rejected with the headers actually found.
pub fn rename_base_roster(mut table: RawTable) -> Result<RawTable> {
    if table.width() != BASE_ROSTER_COLUMNS.len() {
        warn!(
            "{} has {} columns, expected {}: {:?}",
            BASE_ROSTER_TABLE,
            table.width(),
            BASE_ROSTER_COLUMNS.len(),
            table.headers
        );
        return Err(ReconciliationError::SchemaMismatch {
            table: BASE_ROSTER_TABLE.to_string(),
            expected: BASE_ROSTER_COLUMNS.iter().map(|c| c.to_string()).collect(),
            found: table.headers,
        });
    }

    table.headers = BASE_ROSTER_COLUMNS.iter().map(|c| c.to_string()).collect();
    Ok(table)
}

pub fn load_base_roster(table: RawTable, config: &ReconciliationConfig) -> Result<BaseRoster> {
    let table = rename_base_roster(table)?;
    let mut clients = ClientTable::normalize(table, BASE_CLIENT);

    if config.deduplicate_base_roster {
        let (deduped, removed) = clients.dedup_by_client();
        if removed > 0 {
            debug!(
                "Dropped {} duplicate {} rows sharing a client code",
                removed, BASE_ROSTER_TABLE
            );
        }
        clients = deduped;
    }

    log_absent(BASE_ROSTER_TABLE, &clients);

    let table = clients.table();
    let entries = (0..clients.len())
        .filter_map(|row| {
            let client = clients.key(row)?.clone();
            Some(BaseRosterEntry {
                row,
                source_system: table.cell(row, BASE_SOURCE_SYSTEM).as_text(),
                entry_date: parse_lenient_date(table.cell(row, BASE_ENTRY_DATE)),
                exit_date: parse_lenient_date(table.cell(row, BASE_EXIT_DATE)),
                client,
                class: table.cell(row, BASE_CLASS).as_text(),
                name: table.cell(row, BASE_NAME).as_text(),
                agent: table.cell(row, BASE_AGENT).as_text(),
                trader: table.cell(row, BASE_TRADER).as_text(),
            })
        })
        .collect();

    Ok(BaseRoster { clients, entries })
}

pub fn load_current_roster(
    table: RawTable,
    config: &ReconciliationConfig,
) -> Result<CurrentRoster> {
    let client_column = table.require_column(CURRENT_ROSTER_TABLE, &config.current_client_column)?;
    let process_date_column = table.column_index(&config.process_date_column);

    let clients = ClientTable::normalize(table, client_column);
    log_absent(CURRENT_ROSTER_TABLE, &clients);

    let table = clients.table();
    let mut unparseable_dates = 0usize;
    let entries = (0..clients.len())
        .filter_map(|row| {
            let client = clients.key(row)?.clone();
            let process_date = process_date_column.and_then(|col| {
                let cell = table.cell(row, col);
                let parsed = parse_lenient_date(cell);
                if parsed.is_none() && !cell.is_empty() {
                    unparseable_dates += 1;
                }
                parsed
            });
            Some(CurrentRosterEntry {
                row,
                client,
                process_date,
            })
        })
        .collect();

    if unparseable_dates > 0 {
        warn!(
            "{} rows of {} have an unparseable '{}'; treated as missing",
            unparseable_dates, CURRENT_ROSTER_TABLE, config.process_date_column
        );
    }

    Ok(CurrentRoster { clients, entries })
}

pub fn load_inclusions(table: RawTable, config: &ReconciliationConfig) -> Result<Inclusions> {
    let client_column = table.require_column(INCLUSIONS_TABLE, &config.inclusion_client_column)?;

    let (clients, removed) = ClientTable::normalize(table, client_column).drop_absent();
    if removed > 0 {
        debug!(
            "Removed {} {} rows without a client code",
            removed, INCLUSIONS_TABLE
        );
    }

    let entries = (0..clients.len())
        .filter_map(|row| {
            clients.key(row).map(|client| InclusionEntry {
                row,
                client: client.clone(),
            })
        })
        .collect();

    Ok(Inclusions { clients, entries })
}

/// Loads the client → agent assignment roster. Empty agent cells are
/// recorded under the not-on-file label.
pub fn load_agent_assignments(
    table: &RawTable,
    config: &ReconciliationConfig,
) -> Result<Vec<AgentAssignment>> {
    let client_column = table.require_column(ASSIGNMENT_TABLE, &config.assignment_client_column)?;
    let agent_column = table.require_column(ASSIGNMENT_TABLE, &config.assignment_agent_column)?;

    let mut skipped = 0usize;
    let assignments: Vec<AgentAssignment> = (0..table.len())
        .filter_map(|row| {
            let Some(client) = normalize_identifier(table.cell(row, client_column)) else {
                skipped += 1;
                return None;
            };
            let agent = table
                .cell(row, agent_column)
                .as_text()
                .unwrap_or_else(|| config.not_on_file_label.clone());
            Some(AgentAssignment { row, client, agent })
        })
        .collect();

    if skipped > 0 {
        debug!("Skipped {} {} rows without a client code", skipped, ASSIGNMENT_TABLE);
    }

    Ok(assignments)
}

pub fn load_transfer_log(
    table: &RawTable,
    config: &ReconciliationConfig,
) -> Result<Vec<TransferEntry>> {
    let status_column = table.require_column(TRANSFER_LOG_TABLE, TRANSFER_STATUS_COLUMN)?;
    let client_column = table.require_column(TRANSFER_LOG_TABLE, TRANSFER_CLIENT_COLUMN)?;
    let origin_column = table.require_column(TRANSFER_LOG_TABLE, TRANSFER_ORIGIN_COLUMN)?;
    let destination_column =
        table.require_column(TRANSFER_LOG_TABLE, TRANSFER_DESTINATION_COLUMN)?;
    let date_column = table.require_column(TRANSFER_LOG_TABLE, TRANSFER_DATE_COLUMN)?;

    let mut skipped = 0usize;
    let mut unparseable_dates = 0usize;
    let mut entries = Vec::with_capacity(table.len());

    for row in 0..table.len() {
        let Some(client) = normalize_identifier(table.cell(row, client_column)) else {
            skipped += 1;
            continue;
        };

        let date_cell = table.cell(row, date_column);
        let transferred_at = parse_fixed_datetime(date_cell, &config.transfer_date_format);
        if transferred_at.is_none() && !date_cell.is_empty() {
            unparseable_dates += 1;
        }

        entries.push(TransferEntry {
            row,
            client,
            origin_agent: table.cell(row, origin_column).as_text(),
            destination_agent: table.cell(row, destination_column).as_text(),
            status: table.cell(row, status_column).as_text().unwrap_or_default(),
            transferred_at,
        });
    }

    if skipped > 0 {
        debug!("Skipped {} {} rows without a client code", skipped, TRANSFER_LOG_TABLE);
    }
    if unparseable_dates > 0 {
        warn!(
            "{} {} rows have a '{}' not matching '{}'; treated as missing",
            unparseable_dates, TRANSFER_LOG_TABLE, TRANSFER_DATE_COLUMN, config.transfer_date_format
        );
    }

    Ok(entries)
}

/// Reads a CSV document whose first record is the header row.
pub fn read_csv_table<R: Read>(reader: R) -> Result<RawTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        rows.push(record.iter().map(CellValue::infer).collect());
    }

    Ok(RawTable::new(headers, rows))
}

pub fn read_csv_path<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let file = File::open(path.as_ref())?;
    read_csv_table(file)
}

fn log_absent(label: &str, clients: &ClientTable) {
    let absent = clients.absent_count();
    if absent > 0 {
        debug!("{} rows of {} have no client code and are ignored", absent, label);
    }
}
