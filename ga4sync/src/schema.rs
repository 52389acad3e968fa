//! Fixed destination schema for the conversion report table.
//!
//! The schema is invariant across runs: table creation is create-if-absent
//! and there is no migration logic. Counter columns correspond one-to-one to
//! the tracked conversion events.

/// Name of the report date column, also the partitioning column.
pub const DATE_COLUMN: &str = "date";

/// Name of the fetch timestamp column used for deduplication ranking.
pub const FETCHED_AT_COLUMN: &str = "fetched_at";

/// Columns identifying one logical record across fetches.
///
/// Everything except the counters and `fetched_at`: the four session
/// dimensions plus the report date.
pub const NATURAL_KEY_COLUMNS: [&str; 5] = [
    DATE_COLUMN,
    "session_source_medium",
    "session_manual_campaign_name",
    "session_manual_term",
    "session_google_ads_query",
];

/// Column types supported by the report table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Date,
    String,
    Int64,
    Timestamp,
}

/// One column of the destination table: name, type and nullability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: &'static str,
    pub typ: ColumnType,
    pub nullable: bool,
}

impl ColumnSchema {
    const fn new(name: &'static str, typ: ColumnType, nullable: bool) -> Self {
        Self {
            name,
            typ,
            nullable,
        }
    }
}

/// The full destination table schema, in column order.
pub const REPORT_TABLE_COLUMNS: [ColumnSchema; 9] = [
    ColumnSchema::new(DATE_COLUMN, ColumnType::Date, false),
    ColumnSchema::new("session_source_medium", ColumnType::String, true),
    ColumnSchema::new("session_manual_campaign_name", ColumnType::String, true),
    ColumnSchema::new("session_manual_term", ColumnType::String, true),
    ColumnSchema::new("session_google_ads_query", ColumnType::String, true),
    ColumnSchema::new("cv_prospect_all", ColumnType::Int64, true),
    ColumnSchema::new("cv_seminar_all", ColumnType::Int64, true),
    ColumnSchema::new("cv_contract_all", ColumnType::Int64, true),
    ColumnSchema::new(FETCHED_AT_COLUMN, ColumnType::Timestamp, false),
];
