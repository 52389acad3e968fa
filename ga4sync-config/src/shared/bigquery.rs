use secrecy::SecretString;
use serde::Deserialize;

use crate::shared::ValidationError;

/// Configuration for the BigQuery destination.
///
/// This intentionally does not implement [`serde::Serialize`] to avoid
/// accidentally leaking the service account key in serialized forms.
#[derive(Debug, Clone, Deserialize)]
pub struct BigQueryConfig {
    /// Google Cloud project identifier.
    pub project_id: String,
    /// BigQuery dataset identifier.
    pub dataset_id: String,
    /// Destination table for the aggregated report rows.
    pub table_id: String,
    /// Disposable staging table used by the `staging_merge` dedup strategy.
    pub staging_table_id: Option<String>,
    /// Service account key JSON for authenticating with Google APIs.
    ///
    /// The same credential is used for both the reporting API and BigQuery.
    pub service_account_key: SecretString,
}

impl BigQueryConfig {
    /// Validates the destination identifiers.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.project_id.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "bigquery.project_id",
            });
        }

        if self.dataset_id.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "bigquery.dataset_id",
            });
        }

        if self.table_id.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "bigquery.table_id",
            });
        }

        if let Some(staging) = &self.staging_table_id
            && staging.is_empty()
        {
            return Err(ValidationError::EmptyField {
                field: "bigquery.staging_table_id",
            });
        }

        Ok(())
    }
}

/// Strategy used to collapse repeated fetches of the same logical row.
///
/// Both strategies converge to the same final state: exactly one row per
/// natural key, the one with the greatest `fetched_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupStrategy {
    /// Insert into the main table, then delete every row superseded by a
    /// newer fetch of the same natural key.
    DeleteDuplicates,
    /// Insert into a disposable staging table, then rebuild the main table as
    /// the newest-per-key union of main and staging.
    StagingMerge,
}

impl Default for DedupStrategy {
    fn default() -> Self {
        Self::DeleteDuplicates
    }
}
