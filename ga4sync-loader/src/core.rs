use ga4sync::destination::bigquery::{BigQueryClient, BigQueryDestination};
use ga4sync::pipeline::{ReportPipeline, RunSummary};
use ga4sync::source::{Ga4Client, ReportFetcher};
use ga4sync_config::shared::LoaderConfig;
use secrecy::ExposeSecret;
use tracing::info;

use crate::error::LoaderResult;

/// Builds the clients and runs the pipeline once.
pub async fn start_loader(config: LoaderConfig) -> LoaderResult<RunSummary> {
    info!(
        property_id = %config.ga4.property_id,
        project_id = %config.bigquery.project_id,
        dataset_id = %config.bigquery.dataset_id,
        table_id = %config.bigquery.table_id,
        start_date = %config.report.start_date,
        end_date = %config.report.end_date,
        dedup = ?config.dedup,
        "starting loader run"
    );

    let sa_key = config.bigquery.service_account_key.expose_secret();

    let source = Ga4Client::new_with_key(config.ga4.property_id.clone(), sa_key).await?;
    let fetcher = ReportFetcher::new(source, config.ga4.page_size);

    let bigquery_client =
        BigQueryClient::new_with_key(config.bigquery.project_id.clone(), sa_key).await?;
    let destination = BigQueryDestination::new(
        bigquery_client,
        config.bigquery.dataset_id.clone(),
        config.bigquery.table_id.clone(),
        config.bigquery.staging_table_id.clone(),
    );

    let pipeline = ReportPipeline::new(fetcher, destination, config.report, config.dedup);

    let summary = pipeline.run().await?;

    info!(
        dates_requested = summary.dates_requested,
        dates_failed = summary.dates_failed,
        raw_rows = summary.raw_rows,
        records_written = summary.records_written,
        sampled = summary.sampled,
        "loader run finished"
    );

    Ok(summary)
}
