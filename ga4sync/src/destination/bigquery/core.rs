use ga4sync_config::shared::DedupStrategy;
use gcp_bigquery_client::model::query_request::QueryRequest;
use tracing::{info, warn};

use crate::aggregate::ConversionRow;
use crate::destination::Destination;
use crate::destination::bigquery::client::{BigQueryClient, BigQueryDatasetId, BigQueryTableId};
use crate::error::{ErrorKind, SyncResult};
use crate::schema::{DATE_COLUMN, FETCHED_AT_COLUMN, NATURAL_KEY_COLUMNS, REPORT_TABLE_COLUMNS};
use crate::sync_error;

/// Backtick-quoted, comma-separated natural key column list for dedup SQL.
fn natural_key_column_list() -> String {
    NATURAL_KEY_COLUMNS
        .iter()
        .map(|column| format!("`{column}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Backtick-quoted, comma-separated full column list, in schema order.
fn report_column_list() -> String {
    REPORT_TABLE_COLUMNS
        .iter()
        .map(|column| format!("`{}`", column.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SQL deleting every row superseded by a newer fetch of the same natural key.
///
/// One atomic set-based statement: for each key, only the row with the
/// maximum `fetched_at` survives.
fn delete_superseded_sql(main_table: &str) -> String {
    let key = natural_key_column_list();

    format!(
        "delete from {main_table} \
         where struct({key}, `{FETCHED_AT_COLUMN}`) not in (\
         select as struct {key}, max(`{FETCHED_AT_COLUMN}`) as {FETCHED_AT_COLUMN} \
         from {main_table} group by {key})"
    )
}

/// SQL rebuilding the main table as the newest-per-key union of main and
/// staging.
fn rebuild_main_from_union_sql(main_table: &str, staging_table: &str) -> String {
    let key = natural_key_column_list();
    let columns = report_column_list();

    format!(
        "create or replace table {main_table} partition by `{DATE_COLUMN}` as \
         select {columns} from (\
         select *, row_number() over (\
         partition by {key} order by `{FETCHED_AT_COLUMN}` desc) as row_rank \
         from (select * from {main_table} union all select * from {staging_table})) \
         where row_rank = 1"
    )
}

/// SQL creating the main table directly from staging, for the first run when
/// the main table does not exist yet. Still ranks within staging so a staging
/// table carrying duplicates converges the same way.
fn create_main_from_staging_sql(main_table: &str, staging_table: &str) -> String {
    let key = natural_key_column_list();
    let columns = report_column_list();

    format!(
        "create table {main_table} partition by `{DATE_COLUMN}` as \
         select {columns} from (\
         select *, row_number() over (\
         partition by {key} order by `{FETCHED_AT_COLUMN}` desc) as row_rank \
         from {staging_table}) \
         where row_rank = 1"
    )
}

/// BigQuery destination for aggregated report rows.
///
/// Owns the destination identifiers and drives table management, batch
/// insertion and deduplication through a [`BigQueryClient`].
#[derive(Debug, Clone)]
pub struct BigQueryDestination {
    client: BigQueryClient,
    dataset_id: BigQueryDatasetId,
    table_id: BigQueryTableId,
    staging_table_id: Option<BigQueryTableId>,
}

impl BigQueryDestination {
    /// Creates a new [`BigQueryDestination`] over an authenticated client.
    pub fn new(
        client: BigQueryClient,
        dataset_id: BigQueryDatasetId,
        table_id: BigQueryTableId,
        staging_table_id: Option<BigQueryTableId>,
    ) -> Self {
        Self {
            client,
            dataset_id,
            table_id,
            staging_table_id,
        }
    }

    /// Ensures the main table exists with the fixed schema and day-level
    /// partitioning on the date column. Idempotent.
    pub async fn ensure_main_table(&self) -> SyncResult<bool> {
        self.client
            .create_table_if_missing(
                &self.dataset_id,
                &self.table_id,
                &REPORT_TABLE_COLUMNS,
                Some(DATE_COLUMN),
            )
            .await
    }

    /// Inserts rows into the main table as one batch.
    pub async fn insert_report_rows(&self, rows: &[ConversionRow]) -> SyncResult<()> {
        self.client
            .insert_rows(&self.dataset_id, &self.table_id, rows)
            .await
    }

    /// Removes every main-table row superseded by a newer fetch of the same
    /// natural key.
    pub async fn delete_superseded_rows(&self) -> SyncResult<()> {
        let main_table = self.client.full_table_name(&self.dataset_id, &self.table_id)?;

        info!(%main_table, "deleting superseded rows");

        let _ = self
            .client
            .query(QueryRequest::new(delete_superseded_sql(&main_table)))
            .await?;

        Ok(())
    }

    /// Loads rows through a disposable staging table and rebuilds the main
    /// table as the newest-per-key union of both.
    ///
    /// The staging table is recreated before the load and dropped when the
    /// merge finishes, regardless of success; a failed drop is logged without
    /// masking the merge outcome.
    pub async fn merge_via_staging(&self, rows: &[ConversionRow]) -> SyncResult<()> {
        let staging_table_id = self.staging_table_id.as_ref().ok_or_else(|| {
            sync_error!(
                ErrorKind::ConfigError,
                "Staging table id missing",
                "the staging_merge strategy requires `bigquery.staging_table_id`"
            )
        })?;

        self.client
            .create_or_replace_table(
                &self.dataset_id,
                staging_table_id,
                &REPORT_TABLE_COLUMNS,
                None,
            )
            .await?;

        let merge_result = self.stage_and_rebuild(staging_table_id, rows).await;

        if let Err(drop_error) = self.client.drop_table(&self.dataset_id, staging_table_id).await {
            warn!(
                staging_table_id = %staging_table_id,
                error = %drop_error,
                "failed to drop staging table after merge"
            );
        }

        merge_result
    }

    /// Inserts into staging and rewrites the main table.
    async fn stage_and_rebuild(
        &self,
        staging_table_id: &BigQueryTableId,
        rows: &[ConversionRow],
    ) -> SyncResult<()> {
        self.client
            .insert_rows(&self.dataset_id, staging_table_id, rows)
            .await?;

        let main_table = self.client.full_table_name(&self.dataset_id, &self.table_id)?;
        let staging_table = self
            .client
            .full_table_name(&self.dataset_id, staging_table_id)?;

        // A missing main table is a distinct case: create it straight from
        // staging instead of unioning with a table that is not there.
        let main_exists = self
            .client
            .table_exists(&self.dataset_id, &self.table_id)
            .await?;

        let query = if main_exists {
            rebuild_main_from_union_sql(&main_table, &staging_table)
        } else {
            create_main_from_staging_sql(&main_table, &staging_table)
        };

        info!(%main_table, %staging_table, %main_exists, "rebuilding main table from staging");

        let _ = self.client.query(QueryRequest::new(query)).await?;

        Ok(())
    }
}

impl Destination for BigQueryDestination {
    async fn load_report_rows(
        &self,
        rows: Vec<ConversionRow>,
        strategy: DedupStrategy,
    ) -> SyncResult<()> {
        match strategy {
            DedupStrategy::DeleteDuplicates => {
                self.ensure_main_table().await?;
                self.insert_report_rows(&rows).await?;
                self.delete_superseded_rows().await?;
            }
            DedupStrategy::StagingMerge => {
                self.merge_via_staging(&rows).await?;
            }
        }

        Ok(())
    }
}
