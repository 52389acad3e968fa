use chrono::NaiveDate;
use serde::Deserialize;

use crate::shared::{BigQueryConfig, DedupStrategy, Ga4Config, ValidationError};

/// The calendar window a run covers, both endpoints inclusive.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReportRangeConfig {
    /// First day to fetch, `YYYY-MM-DD`.
    pub start_date: NaiveDate,
    /// Last day to fetch, `YYYY-MM-DD`.
    pub end_date: NaiveDate,
}

impl ReportRangeConfig {
    /// Validates that the range is not inverted.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.end_date < self.start_date {
            return Err(ValidationError::InvertedDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }

        Ok(())
    }
}

/// Top-level configuration for one loader run.
///
/// This intentionally does not implement [`serde::Serialize`] because the
/// nested [`BigQueryConfig`] carries the service account key.
#[derive(Debug, Clone, Deserialize)]
pub struct LoaderConfig {
    /// GA4 reporting source settings.
    pub ga4: Ga4Config,
    /// BigQuery destination settings.
    pub bigquery: BigQueryConfig,
    /// Date window to fetch.
    pub report: ReportRangeConfig,
    /// Deduplication strategy applied after inserting.
    #[serde(default)]
    pub dedup: DedupStrategy,
}

impl LoaderConfig {
    /// Validates the whole configuration before any I/O happens.
    ///
    /// Cross-field rules live here: the staging-merge strategy requires a
    /// staging table id.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.ga4.validate()?;
        self.bigquery.validate()?;
        self.report.validate()?;

        if self.dedup == DedupStrategy::StagingMerge && self.bigquery.staging_table_id.is_none() {
            return Err(ValidationError::MissingStagingTable);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn config() -> LoaderConfig {
        LoaderConfig {
            ga4: Ga4Config {
                property_id: "331542258".to_string(),
                page_size: Ga4Config::DEFAULT_PAGE_SIZE,
            },
            bigquery: BigQueryConfig {
                project_id: "analytics-project".to_string(),
                dataset_id: "marketing".to_string(),
                table_id: "ga4_google_ads_query".to_string(),
                staging_table_id: None,
                service_account_key: SecretString::new("{}".to_string()),
            },
            report: ReportRangeConfig {
                start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            },
            dedup: DedupStrategy::DeleteDuplicates,
        }
    }

    #[test]
    fn accepts_valid_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_date_range() {
        let mut cfg = config();
        cfg.report.end_date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert!(matches!(
            cfg.validate().unwrap_err(),
            ValidationError::InvertedDateRange { .. }
        ));
    }

    #[test]
    fn single_day_range_is_valid() {
        let mut cfg = config();
        cfg.report.end_date = cfg.report.start_date;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn staging_merge_requires_staging_table() {
        let mut cfg = config();
        cfg.dedup = DedupStrategy::StagingMerge;
        assert!(matches!(
            cfg.validate().unwrap_err(),
            ValidationError::MissingStagingTable
        ));

        cfg.bigquery.staging_table_id = Some("ga4_google_ads_query_staging".to_string());
        assert!(cfg.validate().is_ok());
    }
}
