//! Folds raw event-level report rows into one record per natural key.
//!
//! Each record carries fixed counters for the tracked conversion events.
//! Event names outside the tracked set contribute nothing; a duplicate
//! key+event pair in the upstream data overwrites the counter rather than
//! incrementing it, matching the upstream report semantics where one row per
//! key+event is expected.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::bail;
use crate::error::{ErrorKind, SyncResult};
use crate::source::report::{
    DATE_DIMENSION_INDEX, EVENT_DIMENSION_INDEX, NATURAL_KEY_DIMENSIONS, REPORT_DIMENSIONS,
    ReportRow,
};
use crate::sync_error;

/// The closed set of conversion events folded into counter columns.
///
/// Each entry matches one destination column name.
pub const TRACKED_EVENTS: [&str; 3] = ["cv_prospect_all", "cv_seminar_all", "cv_contract_all"];

/// One aggregated record per natural key: the session dimensions, the report
/// date, and the conversion counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRecord {
    pub date: NaiveDate,
    pub session_source_medium: String,
    pub session_manual_campaign_name: String,
    pub session_manual_term: String,
    pub session_google_ads_query: String,
    pub cv_prospect_all: i64,
    pub cv_seminar_all: i64,
    pub cv_contract_all: i64,
}

impl ConversionRecord {
    /// Shapes the record into a destination row stamped with the fetch time.
    pub fn into_row(self, fetched_at: DateTime<Utc>) -> ConversionRow {
        ConversionRow {
            date: self.date,
            session_source_medium: self.session_source_medium,
            session_manual_campaign_name: self.session_manual_campaign_name,
            session_manual_term: self.session_manual_term,
            session_google_ads_query: self.session_google_ads_query,
            cv_prospect_all: self.cv_prospect_all,
            cv_seminar_all: self.cv_seminar_all,
            cv_contract_all: self.cv_contract_all,
            fetched_at,
        }
    }
}

/// One persisted destination row. Field names and order match the destination
/// table schema; serialization produces the insert payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionRow {
    pub date: NaiveDate,
    pub session_source_medium: String,
    pub session_manual_campaign_name: String,
    pub session_manual_term: String,
    pub session_google_ads_query: String,
    pub cv_prospect_all: i64,
    pub cv_seminar_all: i64,
    pub cv_contract_all: i64,
    pub fetched_at: DateTime<Utc>,
}

impl ConversionRow {
    /// The values identifying this logical row across fetches.
    pub fn natural_key(&self) -> (NaiveDate, &str, &str, &str, &str) {
        (
            self.date,
            &self.session_source_medium,
            &self.session_manual_campaign_name,
            &self.session_manual_term,
            &self.session_google_ads_query,
        )
    }
}

/// Groups raw report rows by natural key and folds tracked events into
/// counters.
///
/// Counters start at zero for every key; a tracked event sets its counter to
/// the row's metric value. Output order is deterministic (sorted by key), so
/// aggregating the same input twice yields the same records.
pub fn aggregate_report_rows(rows: &[ReportRow]) -> SyncResult<Vec<ConversionRecord>> {
    let mut grouped: BTreeMap<Vec<String>, ConversionRecord> = BTreeMap::new();

    for row in rows {
        if row.dimension_values.len() != REPORT_DIMENSIONS.len() {
            bail!(
                ErrorKind::InvalidData,
                "Report row has unexpected dimension count",
                format!(
                    "expected {} dimension values, got {}",
                    REPORT_DIMENSIONS.len(),
                    row.dimension_values.len()
                )
            );
        }

        let date = parse_compact_date(&row.dimension_values[DATE_DIMENSION_INDEX].value)?;

        let key: Vec<String> = row.dimension_values[..NATURAL_KEY_DIMENSIONS]
            .iter()
            .map(|dimension| dimension.value.clone())
            .collect();

        let record = grouped
            .entry(key)
            .or_insert_with(|| ConversionRecord {
                date,
                session_source_medium: row.dimension_values[0].value.clone(),
                session_manual_campaign_name: row.dimension_values[1].value.clone(),
                session_manual_term: row.dimension_values[2].value.clone(),
                session_google_ads_query: row.dimension_values[3].value.clone(),
                cv_prospect_all: 0,
                cv_seminar_all: 0,
                cv_contract_all: 0,
            });

        let count: i64 = row
            .metric_values
            .first()
            .ok_or_else(|| {
                sync_error!(ErrorKind::InvalidData, "Report row has no metric values")
            })?
            .value
            .parse()?;

        match row.dimension_values[EVENT_DIMENSION_INDEX].value.as_str() {
            "cv_prospect_all" => record.cv_prospect_all = count,
            "cv_seminar_all" => record.cv_seminar_all = count,
            "cv_contract_all" => record.cv_contract_all = count,
            // Everything outside the tracked set is dropped.
            _ => {}
        }
    }

    Ok(grouped.into_values().collect())
}

/// Parses the API's compact `YYYYMMDD` date dimension.
fn parse_compact_date(value: &str) -> SyncResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y%m%d").map_err(|err| {
        sync_error!(
            ErrorKind::ConversionError,
            "Invalid compact report date",
            format!("`{value}`: {err}")
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_row(dims: [&str; 4], date: &str, event: &str, count: &str) -> ReportRow {
        ReportRow::from_values(&[dims[0], dims[1], dims[2], dims[3], date, event], &[count])
    }

    #[test]
    fn folds_events_for_one_key_into_one_record() {
        let rows = vec![
            raw_row(["a", "b", "c", "d"], "20250101", "cv_prospect_all", "5"),
            raw_row(["a", "b", "c", "d"], "20250101", "cv_seminar_all", "2"),
        ];

        let records = aggregate_report_rows(&rows).unwrap();

        assert_eq!(
            records,
            vec![ConversionRecord {
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                session_source_medium: "a".to_string(),
                session_manual_campaign_name: "b".to_string(),
                session_manual_term: "c".to_string(),
                session_google_ads_query: "d".to_string(),
                cv_prospect_all: 5,
                cv_seminar_all: 2,
                cv_contract_all: 0,
            }]
        );
    }

    #[test]
    fn distinct_keys_produce_distinct_records() {
        let rows = vec![
            raw_row(["a", "b", "c", "d"], "20250101", "cv_prospect_all", "5"),
            raw_row(["a", "b", "c", "e"], "20250101", "cv_prospect_all", "1"),
            raw_row(["a", "b", "c", "d"], "20250102", "cv_prospect_all", "3"),
        ];

        let records = aggregate_report_rows(&rows).unwrap();

        assert_eq!(records.len(), 3);
    }

    #[test]
    fn untracked_event_names_contribute_nothing() {
        let rows = vec![
            raw_row(["a", "b", "c", "d"], "20250101", "page_view", "100"),
            raw_row(["a", "b", "c", "d"], "20250101", "cv_contract_all", "1"),
        ];

        let records = aggregate_report_rows(&rows).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].cv_prospect_all, 0);
        assert_eq!(records[0].cv_seminar_all, 0);
        assert_eq!(records[0].cv_contract_all, 1);
    }

    #[test]
    fn duplicate_key_event_pairs_overwrite_rather_than_add() {
        let rows = vec![
            raw_row(["a", "b", "c", "d"], "20250101", "cv_prospect_all", "5"),
            raw_row(["a", "b", "c", "d"], "20250101", "cv_prospect_all", "7"),
        ];

        let records = aggregate_report_rows(&rows).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].cv_prospect_all, 7);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let rows = vec![
            raw_row(["a", "b", "c", "d"], "20250101", "cv_prospect_all", "5"),
            raw_row(["a", "b", "c", "e"], "20250101", "cv_seminar_all", "2"),
            raw_row(["a", "b", "c", "d"], "20250101", "cv_contract_all", "1"),
        ];

        let first = aggregate_report_rows(&rows).unwrap();
        let second = aggregate_report_rows(&rows).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn empty_input_yields_no_records() {
        assert!(aggregate_report_rows(&[]).unwrap().is_empty());
    }

    #[test]
    fn malformed_compact_date_is_an_error() {
        let rows = vec![raw_row(
            ["a", "b", "c", "d"],
            "2025-01-01",
            "cv_prospect_all",
            "5",
        )];

        let err = aggregate_report_rows(&rows).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConversionError);
    }

    #[test]
    fn short_dimension_list_is_an_error() {
        let rows = vec![ReportRow::from_values(&["a", "b"], &["5"])];

        let err = aggregate_report_rows(&rows).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn non_integer_metric_is_an_error() {
        let rows = vec![raw_row(
            ["a", "b", "c", "d"],
            "20250101",
            "cv_prospect_all",
            "many",
        )];

        let err = aggregate_report_rows(&rows).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConversionError);
    }

    #[test]
    fn tracked_events_each_have_a_destination_column() {
        use crate::schema::REPORT_TABLE_COLUMNS;

        for event in TRACKED_EVENTS {
            assert!(
                REPORT_TABLE_COLUMNS
                    .iter()
                    .any(|column| column.name == event)
            );
        }
    }

    #[test]
    fn row_serializes_to_destination_column_names() {
        let record = ConversionRecord {
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            session_source_medium: "google / cpc".to_string(),
            session_manual_campaign_name: "brand".to_string(),
            session_manual_term: "term".to_string(),
            session_google_ads_query: "query".to_string(),
            cv_prospect_all: 5,
            cv_seminar_all: 2,
            cv_contract_all: 0,
        };
        let fetched_at = DateTime::parse_from_rfc3339("2025-01-11T03:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let json = serde_json::to_value(record.into_row(fetched_at)).unwrap();

        assert_eq!(json["date"], "2025-01-01");
        assert_eq!(json["session_google_ads_query"], "query");
        assert_eq!(json["cv_prospect_all"], 5);
        assert_eq!(json["cv_contract_all"], 0);
        assert_eq!(json["fetched_at"], "2025-01-11T03:00:00Z");
    }
}
