use chrono::NaiveDate;
use tracing::debug;

use crate::error::SyncResult;
use crate::source::ga4::ReportSource;
use crate::source::report::{ReportRow, RunReportRequest, RunReportResponse, SamplingMetadata};

/// All pages of one report query, concatenated in arrival order.
#[derive(Debug, Default)]
pub struct FetchedReport {
    pub rows: Vec<ReportRow>,
    /// Sampling diagnostics reported by the API, one entry per sampled page
    /// range. Empty when the report is unsampled.
    pub sampling: Vec<SamplingMetadata>,
    /// True when the API folded low-volume rows into an `(other)` row.
    pub data_loss_from_other_row: bool,
}

impl FetchedReport {
    /// Whether the upstream reported any sampling for this result.
    pub fn is_sampled(&self) -> bool {
        !self.sampling.is_empty()
    }
}

/// Paginates `runReport` queries against a [`ReportSource`].
#[derive(Debug)]
pub struct ReportFetcher<S> {
    source: S,
    page_size: i64,
}

impl<S> ReportFetcher<S>
where
    S: ReportSource,
{
    /// Creates a fetcher requesting up to `page_size` rows per page.
    pub fn new(source: S, page_size: i64) -> Self {
        Self { source, page_size }
    }

    /// Fetches every row for a single report date.
    pub async fn fetch_date(&self, date: NaiveDate) -> SyncResult<FetchedReport> {
        self.fetch_range(date, date).await
    }

    /// Fetches every row for an inclusive date range.
    ///
    /// Requests pages at increasing offsets until a page comes back shorter
    /// than `page_size`, empty, or the reported total row count is reached.
    /// A report with zero rows is a valid, non-error outcome. Sampling
    /// metadata from every page is accumulated and returned, never dropped.
    pub async fn fetch_range(&self, start: NaiveDate, end: NaiveDate) -> SyncResult<FetchedReport> {
        let mut fetched = FetchedReport::default();
        let mut offset = 0i64;

        loop {
            let request = RunReportRequest::conversion_report(start, end, self.page_size, offset);

            let RunReportResponse {
                rows,
                row_count,
                metadata,
            } = self.source.run_report(&request).await?;

            let page_rows = rows.len() as i64;
            debug!(%start, %end, offset, rows = page_rows, "fetched report page");

            if let Some(metadata) = metadata {
                fetched.sampling.extend(metadata.sampling_metadatas);
                fetched.data_loss_from_other_row |= metadata.data_loss_from_other_row;
            }

            fetched.rows.extend(rows);
            offset += page_rows;

            // A short or empty page means the data is exhausted; when the API
            // reports the total up front, stop as soon as it is reached so a
            // total divisible by the page size costs no extra request.
            if page_rows < self.page_size {
                break;
            }
            if let Some(total) = row_count
                && offset >= total
            {
                break;
            }
        }

        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::{ErrorKind, SyncResult};
    use crate::source::report::ResponseMetadata;
    use crate::sync_error;

    /// A [`ReportSource`] that replays scripted responses and records the
    /// offset of every request it receives.
    struct ScriptedSource {
        responses: Mutex<Vec<RunReportResponse>>,
        offsets: Mutex<Vec<i64>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<RunReportResponse>) -> Self {
            Self {
                responses: Mutex::new(responses),
                offsets: Mutex::new(Vec::new()),
            }
        }

        fn recorded_offsets(&self) -> Vec<i64> {
            self.offsets.lock().unwrap().clone()
        }
    }

    impl ReportSource for &ScriptedSource {
        async fn run_report(&self, request: &RunReportRequest) -> SyncResult<RunReportResponse> {
            self.offsets.lock().unwrap().push(request.offset);

            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(sync_error!(
                    ErrorKind::SourceQueryFailed,
                    "Scripted source exhausted"
                ));
            }

            Ok(responses.remove(0))
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(tag: usize) -> ReportRow {
        ReportRow::from_values(
            &[
                "google / cpc",
                "brand",
                &format!("term_{tag}"),
                "query",
                "20250101",
                "cv_prospect_all",
            ],
            &["1"],
        )
    }

    fn page(tags: std::ops::Range<usize>, row_count: Option<i64>) -> RunReportResponse {
        RunReportResponse {
            rows: tags.map(row).collect(),
            row_count,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn paginates_until_a_short_page() {
        // 25 rows with a page size of 10: pages of 10, 10 and 5.
        let source = ScriptedSource::new(vec![
            page(0..10, Some(25)),
            page(10..20, Some(25)),
            page(20..25, Some(25)),
        ]);
        let fetcher = ReportFetcher::new(&source, 10);

        let fetched = fetcher
            .fetch_range(date(2025, 1, 1), date(2025, 1, 1))
            .await
            .unwrap();

        assert_eq!(fetched.rows.len(), 25);
        assert_eq!(source.recorded_offsets(), vec![0, 10, 20]);

        // Arrival order is preserved across pages.
        for (index, fetched_row) in fetched.rows.iter().enumerate() {
            assert_eq!(
                fetched_row.dimension_values[2].value,
                format!("term_{index}")
            );
        }
    }

    #[tokio::test]
    async fn total_divisible_by_page_size_costs_no_extra_request() {
        // 20 rows with a page size of 10 and a reported total: two requests,
        // not three.
        let source = ScriptedSource::new(vec![page(0..10, Some(20)), page(10..20, Some(20))]);
        let fetcher = ReportFetcher::new(&source, 10);

        let fetched = fetcher
            .fetch_range(date(2025, 1, 1), date(2025, 1, 1))
            .await
            .unwrap();

        assert_eq!(fetched.rows.len(), 20);
        assert_eq!(source.recorded_offsets(), vec![0, 10]);
    }

    #[tokio::test]
    async fn empty_report_is_not_an_error() {
        let source = ScriptedSource::new(vec![RunReportResponse::default()]);
        let fetcher = ReportFetcher::new(&source, 10);

        let fetched = fetcher.fetch_date(date(2025, 1, 1)).await.unwrap();

        assert!(fetched.rows.is_empty());
        assert!(!fetched.is_sampled());
        assert_eq!(source.recorded_offsets(), vec![0]);
    }

    #[tokio::test]
    async fn sampling_metadata_is_surfaced() {
        let response = RunReportResponse {
            rows: vec![row(0)],
            row_count: Some(1),
            metadata: Some(ResponseMetadata {
                sampling_metadatas: vec![SamplingMetadata {
                    samples_read_count: Some("100000".to_string()),
                    sampling_space_size: Some("800000".to_string()),
                }],
                data_loss_from_other_row: true,
            }),
        };
        let source = ScriptedSource::new(vec![response]);
        let fetcher = ReportFetcher::new(&source, 10);

        let fetched = fetcher.fetch_date(date(2025, 1, 1)).await.unwrap();

        assert!(fetched.is_sampled());
        assert!(fetched.data_loss_from_other_row);
        assert_eq!(
            fetched.sampling[0].samples_read_count.as_deref(),
            Some("100000")
        );
    }

    #[tokio::test]
    async fn request_failures_propagate() {
        let source = ScriptedSource::new(vec![]);
        let fetcher = ReportFetcher::new(&source, 10);

        let err = fetcher.fetch_date(date(2025, 1, 1)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SourceQueryFailed);
    }
}
