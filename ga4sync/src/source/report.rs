//! Wire types for the GA4 Data API `runReport` endpoint.
//!
//! The request shape is fixed for this loader: four session dimensions, the
//! report date, the event name, and a single `eventCount` metric. Field names
//! follow the API's camelCase JSON convention.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Ordered report dimensions. The first five form the natural key of an
/// output row; the trailing `eventName` is folded into counter columns by the
/// aggregator.
pub const REPORT_DIMENSIONS: [&str; 6] = [
    "sessionSourceMedium",
    "sessionManualCampaignName",
    "sessionManualTerm",
    "sessionGoogleAdsQuery",
    "date",
    "eventName",
];

/// Number of leading dimensions forming the natural key.
pub const NATURAL_KEY_DIMENSIONS: usize = 5;

/// Index of the report date within [`REPORT_DIMENSIONS`].
pub const DATE_DIMENSION_INDEX: usize = 4;

/// Index of the event name within [`REPORT_DIMENSIONS`].
pub const EVENT_DIMENSION_INDEX: usize = 5;

/// Ordered report metrics.
pub const REPORT_METRICS: [&str; 1] = ["eventCount"];

/// A `runReport` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReportRequest {
    pub dimensions: Vec<DimensionSpec>,
    pub metrics: Vec<MetricSpec>,
    pub date_ranges: Vec<ReportDateRange>,
    pub limit: i64,
    pub offset: i64,
}

impl RunReportRequest {
    /// Builds the fixed conversion report request for one page.
    pub fn conversion_report(
        start_date: NaiveDate,
        end_date: NaiveDate,
        limit: i64,
        offset: i64,
    ) -> Self {
        Self {
            dimensions: REPORT_DIMENSIONS
                .iter()
                .map(|name| DimensionSpec {
                    name: (*name).to_string(),
                })
                .collect(),
            metrics: REPORT_METRICS
                .iter()
                .map(|name| MetricSpec {
                    name: (*name).to_string(),
                })
                .collect(),
            date_ranges: vec![ReportDateRange {
                start_date: start_date.format("%Y-%m-%d").to_string(),
                end_date: end_date.format("%Y-%m-%d").to_string(),
            }],
            limit,
            offset,
        }
    }
}

/// A dimension reference in a report request.
#[derive(Debug, Clone, Serialize)]
pub struct DimensionSpec {
    pub name: String,
}

/// A metric reference in a report request.
#[derive(Debug, Clone, Serialize)]
pub struct MetricSpec {
    pub name: String,
}

/// An inclusive date range in a report request, `YYYY-MM-DD` on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDateRange {
    pub start_date: String,
    pub end_date: String,
}

/// A `runReport` response body.
///
/// Every field is optional on the wire; an empty report arrives with no
/// `rows` key at all.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunReportResponse {
    pub rows: Vec<ReportRow>,
    /// Total number of rows matching the query, across all pages.
    pub row_count: Option<i64>,
    pub metadata: Option<ResponseMetadata>,
}

/// One result row: ordered dimension values plus ordered metric values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportRow {
    pub dimension_values: Vec<DimensionValue>,
    pub metric_values: Vec<MetricValue>,
}

impl ReportRow {
    /// Builds a row from plain string slices. Intended for tests and fixtures.
    pub fn from_values(dimensions: &[&str], metrics: &[&str]) -> Self {
        Self {
            dimension_values: dimensions
                .iter()
                .map(|value| DimensionValue {
                    value: (*value).to_string(),
                })
                .collect(),
            metric_values: metrics
                .iter()
                .map(|value| MetricValue {
                    value: (*value).to_string(),
                })
                .collect(),
        }
    }
}

/// A single dimension value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DimensionValue {
    pub value: String,
}

/// A single metric value. The API serializes all metric values as strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricValue {
    pub value: String,
}

/// Response metadata relevant to result quality.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseMetadata {
    /// Present when the report is based on sampled data. One entry per date
    /// range in the request.
    pub sampling_metadatas: Vec<SamplingMetadata>,
    /// True when low-volume rows were folded into an `(other)` row.
    pub data_loss_from_other_row: bool,
}

/// Sampling diagnostics for one date range.
///
/// The API serializes these int64 counts as JSON strings; they are only
/// logged, never computed with, so they stay strings here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SamplingMetadata {
    pub samples_read_count: Option<String>,
    pub sampling_space_size: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_with_camel_case_keys() {
        let request = RunReportRequest::conversion_report(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            10_000,
            0,
        );

        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["dateRanges"][0]["startDate"], "2025-01-01");
        assert_eq!(json["dateRanges"][0]["endDate"], "2025-01-10");
        assert_eq!(json["dimensions"][5]["name"], "eventName");
        assert_eq!(json["metrics"][0]["name"], "eventCount");
        assert_eq!(json["limit"], 10_000);
        assert_eq!(json["offset"], 0);
    }

    #[test]
    fn empty_response_deserializes_to_no_rows() {
        let response: RunReportResponse = serde_json::from_str("{}").unwrap();

        assert!(response.rows.is_empty());
        assert_eq!(response.row_count, None);
        assert!(response.metadata.is_none());
    }

    #[test]
    fn response_rows_and_sampling_deserialize() {
        let body = r#"{
            "rows": [
                {
                    "dimensionValues": [
                        {"value": "google / cpc"},
                        {"value": "brand"},
                        {"value": "term"},
                        {"value": "query"},
                        {"value": "20250101"},
                        {"value": "cv_prospect_all"}
                    ],
                    "metricValues": [{"value": "5"}]
                }
            ],
            "rowCount": 1,
            "metadata": {
                "samplingMetadatas": [
                    {"samplesReadCount": "100000", "samplingSpaceSize": "800000"}
                ],
                "dataLossFromOtherRow": true
            }
        }"#;

        let response: RunReportResponse = serde_json::from_str(body).unwrap();

        assert_eq!(response.rows.len(), 1);
        assert_eq!(response.rows[0].dimension_values[4].value, "20250101");
        assert_eq!(response.rows[0].metric_values[0].value, "5");
        assert_eq!(response.row_count, Some(1));

        let metadata = response.metadata.unwrap();
        assert_eq!(metadata.sampling_metadatas.len(), 1);
        assert_eq!(
            metadata.sampling_metadatas[0].samples_read_count.as_deref(),
            Some("100000")
        );
        assert!(metadata.data_loss_from_other_row);
    }
}
