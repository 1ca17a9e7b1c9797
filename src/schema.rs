use crate::error::{ReconciliationError, Result};
use crate::identifier::ClientId;
use chrono::{NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell of an already-parsed input table.
///
/// Spreadsheet readers hand back loosely typed values: the same client code
/// can arrive as text in one export and as a float in the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Int(i64),
    Number(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Text(String),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// Types a raw CSV field the way spreadsheet readers do.
    ///
    /// Only plain decimal literals become numbers. Zero-padded codes,
    /// scientific notation and integers beyond `i64` stay text so that no
    /// two distinct codes are merged by retyping.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        if trimmed.eq_ignore_ascii_case("nan") {
            return CellValue::Number(f64::NAN);
        }
        if !is_plain_decimal(trimmed) || has_leading_zero(trimmed) {
            return CellValue::Text(raw.to_string());
        }
        if !trimmed.contains('.') {
            return match trimmed.parse::<i64>() {
                Ok(int) => CellValue::Int(int),
                Err(_) => CellValue::Text(raw.to_string()),
            };
        }
        match trimmed.parse::<f64>() {
            Ok(number) => CellValue::Number(number),
            Err(_) => CellValue::Text(raw.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Number(n) => n.is_nan(),
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed text content, `None` for empty cells.
    pub fn as_text(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let text = self.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Optional sign, digits, at most one `.`, and at least one digit.
fn is_plain_decimal(s: &str) -> bool {
    let unsigned = s.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(s);
    let mut dots = 0;
    let mut digits = 0;
    for c in unsigned.chars() {
        match c {
            '.' => dots += 1,
            c if c.is_ascii_digit() => digits += 1,
            _ => return false,
        }
    }
    dots <= 1 && digits > 0
}

fn has_leading_zero(s: &str) -> bool {
    let unsigned = s.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(s);
    let integer_part = unsigned.split('.').next().unwrap_or("");
    integer_part.len() > 1 && integer_part.starts_with('0')
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

/// A header row plus rows of typed cells. Rows may be shorter than the
/// header; missing trailing cells read as [`CellValue::Empty`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { headers, rows }
    }

    pub fn with_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    pub fn require_column(&self, table: &str, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| ReconciliationError::MissingColumn {
                table: table.to_string(),
                column: name.to_string(),
                found: self.headers.clone(),
            })
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: CellValue) {
        if let Some(cells) = self.rows.get_mut(row) {
            if cells.len() <= col {
                cells.resize(col + 1, CellValue::Empty);
            }
            cells[col] = value;
        }
    }

    /// Returns a view holding only the rows for which `keep` is true,
    /// in their original order.
    pub fn select_rows<F>(&self, mut keep: F) -> RawTable
    where
        F: FnMut(usize, &[CellValue]) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .filter(|(idx, row)| keep(*idx, row))
            .map(|(_, row)| row.clone())
            .collect();

        RawTable {
            headers: self.headers.clone(),
            rows,
        }
    }
}

/// One row of the base roster after positional renaming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseRosterEntry {
    /// Index of the row in the source table
    pub row: usize,
    pub source_system: Option<String>,
    pub entry_date: Option<NaiveDate>,
    pub exit_date: Option<NaiveDate>,
    pub client: ClientId,
    pub class: Option<String>,
    pub name: Option<String>,
    /// The "Farmer / Hunter" responsible for the client
    pub agent: Option<String>,
    pub trader: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentRosterEntry {
    pub row: usize,
    pub client: ClientId,
    pub process_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InclusionEntry {
    pub row: usize,
    pub client: ClientId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAssignment {
    pub row: usize,
    pub client: ClientId,
    pub agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferEntry {
    pub row: usize,
    pub client: ClientId,
    /// Absent when the client is new to the firm
    pub origin_agent: Option<String>,
    /// Absent when the client is leaving the firm
    pub destination_agent: Option<String>,
    pub status: String,
    pub transferred_at: Option<NaiveDateTime>,
}

fn default_base_sheet_name() -> String {
    "Clientes.Responsáveis".to_string()
}

fn default_current_client_column() -> String {
    "Cliente".to_string()
}

fn default_inclusion_client_column() -> String {
    "CODIGO DO CLIENTE".to_string()
}

fn default_process_date_column() -> String {
    "Data Processamento".to_string()
}

fn default_assignment_client_column() -> String {
    "Cliente".to_string()
}

fn default_assignment_agent_column() -> String {
    "Farmer".to_string()
}

fn default_completed_status() -> String {
    "CONCLUIDO".to_string()
}

fn default_not_on_file_label() -> String {
    "Não Consta".to_string()
}

fn default_transfer_date_format() -> String {
    "%d/%m/%Y %H:%M:%S".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReconciliationConfig {
    #[serde(default = "default_base_sheet_name")]
    #[schemars(
        description = "Worksheet holding the base roster. Informational only: reading workbooks is left to the caller."
    )]
    pub base_sheet_name: String,

    #[serde(default = "default_current_client_column")]
    #[schemars(description = "Client code column of the current roster (Positivador).")]
    pub current_client_column: String,

    #[serde(default = "default_inclusion_client_column")]
    #[schemars(description = "Client code column of the inclusions extract.")]
    pub inclusion_client_column: String,

    #[serde(default = "default_process_date_column")]
    #[schemars(
        description = "Optional process date column of the current roster. Parsed leniently when present; unparseable values become null."
    )]
    pub process_date_column: String,

    #[serde(default = "default_assignment_client_column")]
    #[schemars(description = "Client code column of the agent assignment roster.")]
    pub assignment_client_column: String,

    #[serde(default = "default_assignment_agent_column")]
    #[schemars(description = "Agent name column of the agent assignment roster.")]
    pub assignment_agent_column: String,

    #[serde(default = "default_completed_status")]
    #[schemars(description = "Transfer status that marks a completed transfer. Other statuses are ignored.")]
    pub completed_status: String,

    #[serde(default = "default_not_on_file_label")]
    #[schemars(description = "Label used for clients or agent fields with no matching record.")]
    pub not_on_file_label: String,

    #[serde(default = "default_transfer_date_format")]
    #[schemars(description = "chrono format string of the transfer date column.")]
    pub transfer_date_format: String,

    #[serde(default = "default_true")]
    #[schemars(
        description = "Drop repeated base roster rows for the same client, keeping the first occurrence."
    )]
    pub deduplicate_base_roster: bool,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            base_sheet_name: default_base_sheet_name(),
            current_client_column: default_current_client_column(),
            inclusion_client_column: default_inclusion_client_column(),
            process_date_column: default_process_date_column(),
            assignment_client_column: default_assignment_client_column(),
            assignment_agent_column: default_assignment_agent_column(),
            completed_status: default_completed_status(),
            not_on_file_label: default_not_on_file_label(),
            transfer_date_format: default_transfer_date_format(),
            deduplicate_base_roster: true,
        }
    }
}

impl ReconciliationConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("current_client_column", &self.current_client_column),
            ("inclusion_client_column", &self.inclusion_client_column),
            ("assignment_client_column", &self.assignment_client_column),
            ("assignment_agent_column", &self.assignment_agent_column),
            ("completed_status", &self.completed_status),
            ("not_on_file_label", &self.not_on_file_label),
            ("transfer_date_format", &self.transfer_date_format),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ReconciliationError::InvalidConfig(format!(
                    "{} must not be empty",
                    field
                )));
            }
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReconciliationConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
