use chrono::NaiveDate;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The GA4 property id is not a plain numeric id.
    #[error("`ga4.property_id` must be a numeric GA4 property id, got `{0}`")]
    InvalidPropertyId(String),
    /// A required identifier is empty.
    #[error("`{field}` cannot be empty")]
    EmptyField { field: &'static str },
    /// The report date range ends before it starts.
    #[error("`report.end_date` ({end}) precedes `report.start_date` ({start})")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },
    /// The requested report page size is outside the API's accepted range.
    #[error("`ga4.page_size` must be between 1 and {max}, got {got}")]
    PageSizeOutOfRange { max: i64, got: i64 },
    /// The staging-merge strategy was selected without a staging table id.
    #[error("`bigquery.staging_table_id` must be set when `dedup` is `staging_merge`")]
    MissingStagingTable,
}
