//! The loader pipeline: fetch, aggregate, load, deduplicate.
//!
//! Execution is strictly sequential. Each date in the configured range is
//! fetched independently; a failed date is logged and contributes zero rows
//! while the run carries on. The destination is only touched when at least
//! one row was fetched.

use chrono::Utc;
use ga4sync_config::shared::{DedupStrategy, ReportRangeConfig};
use tracing::{debug, error, info, warn};

use crate::aggregate::{ConversionRow, aggregate_report_rows};
use crate::daterange::date_range;
use crate::destination::Destination;
use crate::error::SyncResult;
use crate::source::{ReportFetcher, ReportSource};

/// Outcome of one pipeline run, for the log.
///
/// A reader tells success, partial success (some dates failed), or an empty
/// window apart from this summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of dates in the requested range.
    pub dates_requested: usize,
    /// Dates whose fetch failed and contributed zero rows.
    pub dates_failed: usize,
    /// Raw event-level rows fetched across all dates.
    pub raw_rows: usize,
    /// Aggregated rows written to the destination.
    pub records_written: usize,
    /// Whether any fetched report was based on sampled data.
    pub sampled: bool,
}

/// One-shot pipeline from a report source into a destination.
#[derive(Debug)]
pub struct ReportPipeline<S, D> {
    fetcher: ReportFetcher<S>,
    destination: D,
    range: ReportRangeConfig,
    dedup: DedupStrategy,
}

impl<S, D> ReportPipeline<S, D>
where
    S: ReportSource,
    D: Destination,
{
    /// Creates a pipeline for one run over the given date range.
    pub fn new(
        fetcher: ReportFetcher<S>,
        destination: D,
        range: ReportRangeConfig,
        dedup: DedupStrategy,
    ) -> Self {
        Self {
            fetcher,
            destination,
            range,
            dedup,
        }
    }

    /// Runs the pipeline once.
    pub async fn run(&self) -> SyncResult<RunSummary> {
        let mut summary = RunSummary {
            dates_requested: 0,
            dates_failed: 0,
            raw_rows: 0,
            records_written: 0,
            sampled: false,
        };
        let mut raw_rows = Vec::new();

        for date in date_range(self.range.start_date, self.range.end_date)? {
            summary.dates_requested += 1;

            match self.fetcher.fetch_date(date).await {
                Ok(report) => {
                    if report.is_sampled() {
                        summary.sampled = true;
                        warn!(%date, sampling = ?report.sampling, "report data is sampled");
                    }
                    if report.data_loss_from_other_row {
                        warn!(%date, "report folded low-volume rows into (other)");
                    }

                    debug!(%date, rows = report.rows.len(), "fetched report rows");
                    raw_rows.extend(report.rows);
                }
                Err(fetch_error) => {
                    // This date contributes zero rows; the loop carries on.
                    error!(%date, error = %fetch_error, "report fetch failed for date");
                    summary.dates_failed += 1;
                }
            }
        }

        summary.raw_rows = raw_rows.len();

        let records = aggregate_report_rows(&raw_rows)?;
        if records.is_empty() {
            info!("no report rows fetched, destination left untouched");
            return Ok(summary);
        }

        // One timestamp per run: every row of this fetch ranks identically
        // during deduplication.
        let fetched_at = Utc::now();
        let rows: Vec<ConversionRow> = records
            .into_iter()
            .map(|record| record.into_row(fetched_at))
            .collect();
        summary.records_written = rows.len();

        self.destination.load_report_rows(rows, self.dedup).await?;

        info!(
            dates_requested = summary.dates_requested,
            dates_failed = summary.dates_failed,
            raw_rows = summary.raw_rows,
            records_written = summary.records_written,
            "report rows loaded and deduplicated"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::NaiveDate;

    use super::*;
    use crate::destination::memory::MemoryDestination;
    use crate::error::ErrorKind;
    use crate::source::report::{ReportRow, RunReportRequest, RunReportResponse};
    use crate::sync_error;

    /// Serves one scripted response per date, erroring for dates marked bad.
    struct PerDateSource {
        responses: Mutex<Vec<Result<Vec<ReportRow>, ()>>>,
    }

    impl PerDateSource {
        fn new(responses: Vec<Result<Vec<ReportRow>, ()>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    impl ReportSource for &PerDateSource {
        async fn run_report(&self, _request: &RunReportRequest) -> SyncResult<RunReportResponse> {
            let mut responses = self.responses.lock().unwrap();
            assert!(!responses.is_empty(), "more requests than scripted dates");

            match responses.remove(0) {
                Ok(rows) => Ok(RunReportResponse {
                    row_count: Some(rows.len() as i64),
                    rows,
                    metadata: None,
                }),
                Err(()) => Err(sync_error!(
                    ErrorKind::SourceQueryFailed,
                    "Scripted fetch failure"
                )),
            }
        }
    }

    fn raw_row(query: &str, date: &str, event: &str, count: &str) -> ReportRow {
        ReportRow::from_values(
            &["google / cpc", "brand", "term", query, date, event],
            &[count],
        )
    }

    fn range(start: (i32, u32, u32), end: (i32, u32, u32)) -> ReportRangeConfig {
        ReportRangeConfig {
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        }
    }

    #[tokio::test]
    async fn loads_aggregated_rows_into_the_destination() {
        let source = PerDateSource::new(vec![Ok(vec![
            raw_row("q1", "20250101", "cv_prospect_all", "5"),
            raw_row("q1", "20250101", "cv_seminar_all", "2"),
        ])]);
        let destination = MemoryDestination::new();
        let pipeline = ReportPipeline::new(
            ReportFetcher::new(&source, 1000),
            destination.clone(),
            range((2025, 1, 1), (2025, 1, 1)),
            DedupStrategy::DeleteDuplicates,
        );

        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.dates_requested, 1);
        assert_eq!(summary.dates_failed, 0);
        assert_eq!(summary.raw_rows, 2);
        assert_eq!(summary.records_written, 1);

        let rows = destination.rows().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cv_prospect_all, 5);
        assert_eq!(rows[0].cv_seminar_all, 2);
        assert_eq!(rows[0].cv_contract_all, 0);
    }

    #[tokio::test]
    async fn a_failed_date_contributes_zero_rows_and_the_run_continues() {
        let source = PerDateSource::new(vec![
            Ok(vec![raw_row("q1", "20250101", "cv_prospect_all", "5")]),
            Err(()),
            Ok(vec![raw_row("q1", "20250103", "cv_prospect_all", "3")]),
        ]);
        let destination = MemoryDestination::new();
        let pipeline = ReportPipeline::new(
            ReportFetcher::new(&source, 1000),
            destination.clone(),
            range((2025, 1, 1), (2025, 1, 3)),
            DedupStrategy::DeleteDuplicates,
        );

        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.dates_requested, 3);
        assert_eq!(summary.dates_failed, 1);
        assert_eq!(summary.records_written, 2);
        assert_eq!(destination.rows().await.len(), 2);
    }

    #[tokio::test]
    async fn an_empty_window_leaves_the_destination_untouched() {
        let source = PerDateSource::new(vec![Ok(vec![])]);
        let destination = MemoryDestination::new();
        let pipeline = ReportPipeline::new(
            ReportFetcher::new(&source, 1000),
            destination.clone(),
            range((2025, 1, 1), (2025, 1, 1)),
            DedupStrategy::DeleteDuplicates,
        );

        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.records_written, 0);
        assert!(destination.rows().await.is_empty());
    }

    #[tokio::test]
    async fn rerunning_the_same_window_replaces_rather_than_duplicates() {
        let destination = MemoryDestination::new();

        for _ in 0..2 {
            let source =
                PerDateSource::new(vec![Ok(vec![raw_row("q1", "20250101", "cv_prospect_all", "5")])]);
            let pipeline = ReportPipeline::new(
                ReportFetcher::new(&source, 1000),
                destination.clone(),
                range((2025, 1, 1), (2025, 1, 1)),
                DedupStrategy::DeleteDuplicates,
            );
            pipeline.run().await.unwrap();
        }

        // Exactly one row per natural key survives repeated runs.
        assert_eq!(destination.rows().await.len(), 1);
    }

    #[tokio::test]
    async fn an_inverted_range_fails_before_any_fetch() {
        let source = PerDateSource::new(vec![]);
        let destination = MemoryDestination::new();
        let pipeline = ReportPipeline::new(
            ReportFetcher::new(&source, 1000),
            destination.clone(),
            range((2025, 1, 10), (2025, 1, 1)),
            DedupStrategy::DeleteDuplicates,
        );

        let err = pipeline.run().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert!(destination.rows().await.is_empty());
    }
}
