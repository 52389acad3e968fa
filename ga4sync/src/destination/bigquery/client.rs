use std::fmt;

use gcp_bigquery_client::{
    Client,
    client_builder::ClientBuilder,
    error::BQError,
    model::{
        query_request::QueryRequest, query_response::ResultSet,
        table_data_insert_all_request::TableDataInsertAllRequest,
    },
    yup_oauth2::parse_service_account_key,
};
use serde::Serialize;
use tracing::info;

use crate::error::{ErrorKind, SyncError, SyncResult};
use crate::schema::{ColumnSchema, ColumnType};
use crate::sync_error;

/// BigQuery project identifier.
pub type BigQueryProjectId = String;
/// BigQuery dataset identifier.
pub type BigQueryDatasetId = String;
/// BigQuery table identifier.
pub type BigQueryTableId = String;

/// Converts BigQuery errors to loader errors with appropriate classification.
fn bq_error_to_sync_error(err: BQError) -> SyncError {
    let (kind, description) = match &err {
        // Authentication related errors
        BQError::InvalidServiceAccountKey(_)
        | BQError::InvalidServiceAccountAuthenticator(_)
        | BQError::InvalidInstalledFlowAuthenticator(_)
        | BQError::InvalidApplicationDefaultCredentialsAuthenticator(_)
        | BQError::InvalidAuthorizedUserAuthenticator(_)
        | BQError::AuthError(_)
        | BQError::YupAuthError(_) => (
            ErrorKind::AuthenticationError,
            "BigQuery authentication error",
        ),
        BQError::NoToken => (
            ErrorKind::AuthenticationError,
            "BigQuery authentication token missing",
        ),

        // Network and transport errors
        BQError::RequestError(_) => (ErrorKind::DestinationIoError, "BigQuery request failed"),

        // Query and data errors
        BQError::ResponseError { .. } => {
            (ErrorKind::DestinationQueryFailed, "BigQuery response error")
        }
        BQError::NoDataAvailable => (
            ErrorKind::DestinationError,
            "BigQuery result set positioning error",
        ),
        BQError::InvalidColumnIndex { .. } | BQError::InvalidColumnName { .. } => {
            (ErrorKind::InvalidData, "BigQuery invalid column reference")
        }
        BQError::InvalidColumnType { .. } => {
            (ErrorKind::ConversionError, "BigQuery column type mismatch")
        }

        // Serialization errors
        BQError::SerializationError(_) => (
            ErrorKind::SerializationError,
            "BigQuery JSON serialization error",
        ),

        // Remaining variants belong to API surfaces this loader does not use
        // (gRPC streaming, connection pooling).
        _ => (ErrorKind::DestinationError, "BigQuery operation failed"),
    };

    sync_error!(kind, description, err.to_string())
}

/// Client for interacting with Google BigQuery.
///
/// Provides table management, batch insertion, and query execution against
/// BigQuery datasets with authentication and error handling.
#[derive(Clone)]
pub struct BigQueryClient {
    project_id: BigQueryProjectId,
    client: Client,
}

impl BigQueryClient {
    /// Creates a new [`BigQueryClient`] from a service account key file.
    pub async fn new_with_key_path(
        project_id: BigQueryProjectId,
        sa_key_file: &str,
    ) -> SyncResult<BigQueryClient> {
        let client = ClientBuilder::new()
            .build_from_service_account_key_file(sa_key_file)
            .await
            .map_err(bq_error_to_sync_error)?;

        Ok(BigQueryClient { project_id, client })
    }

    /// Creates a new [`BigQueryClient`] from a service account key JSON string.
    pub async fn new_with_key(
        project_id: BigQueryProjectId,
        sa_key: &str,
    ) -> SyncResult<BigQueryClient> {
        let sa_key = parse_service_account_key(sa_key)
            .map_err(BQError::from)
            .map_err(bq_error_to_sync_error)?;
        let client = ClientBuilder::new()
            .build_from_service_account_key(sa_key, false)
            .await
            .map_err(bq_error_to_sync_error)?;

        Ok(BigQueryClient { project_id, client })
    }

    /// Creates a new [`BigQueryClient`] using Application Default Credentials.
    pub async fn new_with_adc(project_id: BigQueryProjectId) -> SyncResult<BigQueryClient> {
        let client = ClientBuilder::new()
            .build_from_application_default_credentials()
            .await
            .map_err(bq_error_to_sync_error)?;

        Ok(BigQueryClient { project_id, client })
    }

    /// Returns the fully qualified BigQuery table name.
    ///
    /// Formats the table name as `` `project_id.dataset_id.table_id` `` with
    /// proper quoting.
    pub fn full_table_name(
        &self,
        dataset_id: &BigQueryDatasetId,
        table_id: &BigQueryTableId,
    ) -> SyncResult<String> {
        let project_id = Self::sanitize_identifier(&self.project_id, "BigQuery project id")?;
        let dataset_id = Self::sanitize_identifier(dataset_id, "BigQuery dataset id")?;
        let table_id = Self::sanitize_identifier(table_id, "BigQuery table id")?;

        Ok(format!("`{project_id}.{dataset_id}.{table_id}`"))
    }

    /// Checks whether a table exists in the BigQuery dataset.
    ///
    /// Returns `true` if the table exists, `false` otherwise. Existence is an
    /// explicit metadata lookup, not a create-and-catch-conflict.
    pub async fn table_exists(
        &self,
        dataset_id: &BigQueryDatasetId,
        table_id: &BigQueryTableId,
    ) -> SyncResult<bool> {
        let table = self
            .client
            .table()
            .get(&self.project_id, dataset_id, table_id, None)
            .await;

        match table {
            Ok(_) => Ok(true),
            Err(BQError::ResponseError { error }) if error.error.code == 404 => Ok(false),
            Err(e) => Err(bq_error_to_sync_error(e)),
        }
    }

    /// Creates a table in BigQuery if it doesn't already exist.
    ///
    /// Returns `true` if the table was created, `false` if it already existed.
    pub async fn create_table_if_missing(
        &self,
        dataset_id: &BigQueryDatasetId,
        table_id: &BigQueryTableId,
        column_schemas: &[ColumnSchema],
        partition_column: Option<&str>,
    ) -> SyncResult<bool> {
        if self.table_exists(dataset_id, table_id).await? {
            return Ok(false);
        }

        self.create_table(dataset_id, table_id, column_schemas, partition_column)
            .await?;

        Ok(true)
    }

    /// Creates a new table in the BigQuery dataset.
    ///
    /// Builds and executes a CREATE TABLE statement with the provided column
    /// schemas and optional day-level partitioning.
    pub async fn create_table(
        &self,
        dataset_id: &BigQueryDatasetId,
        table_id: &BigQueryTableId,
        column_schemas: &[ColumnSchema],
        partition_column: Option<&str>,
    ) -> SyncResult<()> {
        let full_table_name = self.full_table_name(dataset_id, table_id)?;

        let columns_spec = Self::create_columns_spec(column_schemas)?;
        let partition_option = match partition_column {
            Some(column) => Self::partition_option(column)?,
            None => "".to_string(),
        };

        info!(%full_table_name, "creating table in bigquery");

        let query = format!("create table {full_table_name} {columns_spec} {partition_option}");

        let _ = self.query(QueryRequest::new(query)).await?;

        Ok(())
    }

    /// Creates a table, replacing any existing table with the same name.
    ///
    /// Used for the disposable staging table, which must start empty before
    /// each run. Returns `true` if the table was created fresh, `false` if it
    /// existed and was replaced.
    pub async fn create_or_replace_table(
        &self,
        dataset_id: &BigQueryDatasetId,
        table_id: &BigQueryTableId,
        column_schemas: &[ColumnSchema],
        partition_column: Option<&str>,
    ) -> SyncResult<bool> {
        let table_exists = self.table_exists(dataset_id, table_id).await?;

        let full_table_name = self.full_table_name(dataset_id, table_id)?;

        let columns_spec = Self::create_columns_spec(column_schemas)?;
        let partition_option = match partition_column {
            Some(column) => Self::partition_option(column)?,
            None => "".to_string(),
        };

        info!(
            %full_table_name,
            %table_exists,
            "creating or replacing table in bigquery"
        );

        let query =
            format!("create or replace table {full_table_name} {columns_spec} {partition_option}");

        let _ = self.query(QueryRequest::new(query)).await?;

        Ok(!table_exists)
    }

    /// Drops a table from BigQuery if it exists.
    pub async fn drop_table(
        &self,
        dataset_id: &BigQueryDatasetId,
        table_id: &BigQueryTableId,
    ) -> SyncResult<()> {
        let full_table_name = self.full_table_name(dataset_id, table_id)?;

        info!(%full_table_name, "dropping table from bigquery");

        let query = format!("drop table if exists {full_table_name}");

        let _ = self.query(QueryRequest::new(query)).await?;

        Ok(())
    }

    /// Inserts rows into a table as one batch.
    ///
    /// Submits every row in a single `insertAll` request. If the response
    /// reports any per-row insert errors the whole call fails with an
    /// aggregated [`ErrorKind::DestinationInsertFailed`] error carrying the
    /// structured detail of every rejected row. There is no partial-success
    /// bookkeeping: the underlying insert may still be partially applied, and
    /// the fetched_at-ranked dedup is what makes a re-run converge.
    pub async fn insert_rows<T>(
        &self,
        dataset_id: &BigQueryDatasetId,
        table_id: &BigQueryTableId,
        rows: &[T],
    ) -> SyncResult<()>
    where
        T: Serialize,
    {
        let mut insert_request = TableDataInsertAllRequest::new();
        for row in rows {
            insert_request
                .add_row(None, row)
                .map_err(bq_error_to_sync_error)?;
        }

        let response = self
            .client
            .tabledata()
            .insert_all(&self.project_id, dataset_id, table_id, insert_request)
            .await
            .map_err(bq_error_to_sync_error)?;

        if let Some(insert_errors) = response.insert_errors
            && !insert_errors.is_empty()
        {
            let errors: Vec<SyncError> = insert_errors
                .into_iter()
                .map(|row_error| {
                    sync_error!(
                        ErrorKind::DestinationInsertFailed,
                        "BigQuery rejected a row",
                        format!("{row_error:?}")
                    )
                })
                .collect();

            return Err(errors.into());
        }

        Ok(())
    }

    /// Executes a BigQuery SQL query and returns the result set.
    pub async fn query(&self, request: QueryRequest) -> SyncResult<ResultSet> {
        let query_response = self
            .client
            .job()
            .query(&self.project_id, request)
            .await
            .map_err(bq_error_to_sync_error)?;

        Ok(ResultSet::new_from_query_response(query_response))
    }

    /// Sanitizes a BigQuery identifier for safe backtick quoting.
    ///
    /// Rejects empty identifiers and identifiers containing control
    /// characters. Backticks and backslashes are escaped per GoogleSQL
    /// lexical rules so the value can be wrapped in backticks without
    /// allowing statement breaks.
    fn sanitize_identifier(identifier: &str, context: &str) -> SyncResult<String> {
        if identifier.is_empty() {
            return Err(sync_error!(
                ErrorKind::DestinationTableNameInvalid,
                "Invalid BigQuery identifier",
                format!("{context} cannot be empty")
            ));
        }

        if identifier.chars().any(char::is_control) {
            return Err(sync_error!(
                ErrorKind::DestinationTableNameInvalid,
                "Invalid BigQuery identifier",
                format!("{context} contains control characters")
            ));
        }

        let mut escaped = String::with_capacity(identifier.len());

        for ch in identifier.chars() {
            match ch {
                '`' => escaped.push_str("\\`"),
                '\\' => escaped.push_str("\\\\"),
                _ => escaped.push(ch),
            }
        }

        Ok(escaped)
    }

    /// Generates the SQL column specification for one column.
    fn column_spec(column_schema: &ColumnSchema) -> SyncResult<String> {
        let column_name = Self::sanitize_identifier(column_schema.name, "BigQuery column name")?;

        let mut column_spec = format!(
            "`{}` {}",
            column_name,
            Self::column_type_to_bigquery_type(column_schema.typ)
        );

        if !column_schema.nullable {
            column_spec.push_str(" not null");
        }

        Ok(column_spec)
    }

    /// Builds complete column specifications for CREATE TABLE statements.
    fn create_columns_spec(column_schemas: &[ColumnSchema]) -> SyncResult<String> {
        let columns = column_schemas
            .iter()
            .map(Self::column_spec)
            .collect::<SyncResult<Vec<_>>>()?
            .join(",");

        Ok(format!("({columns})"))
    }

    /// Creates the day-level partitioning clause for table creation.
    fn partition_option(partition_column: &str) -> SyncResult<String> {
        let column = Self::sanitize_identifier(partition_column, "BigQuery partition column")?;

        Ok(format!("partition by `{column}`"))
    }

    /// Maps report schema column types to BigQuery DDL types.
    fn column_type_to_bigquery_type(typ: ColumnType) -> &'static str {
        match typ {
            ColumnType::Date => "date",
            ColumnType::String => "string",
            ColumnType::Int64 => "int64",
            ColumnType::Timestamp => "timestamp",
        }
    }
}

impl fmt::Debug for BigQueryClient {
    /// Formats the client for debugging, excluding sensitive client details.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BigQueryClient")
            .field("project_id", &self.project_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::REPORT_TABLE_COLUMNS;

    #[test]
    fn test_column_type_to_bigquery_type() {
        assert_eq!(
            BigQueryClient::column_type_to_bigquery_type(ColumnType::Date),
            "date"
        );
        assert_eq!(
            BigQueryClient::column_type_to_bigquery_type(ColumnType::String),
            "string"
        );
        assert_eq!(
            BigQueryClient::column_type_to_bigquery_type(ColumnType::Int64),
            "int64"
        );
        assert_eq!(
            BigQueryClient::column_type_to_bigquery_type(ColumnType::Timestamp),
            "timestamp"
        );
    }

    #[test]
    fn test_column_spec() {
        let nullable = ColumnSchema {
            name: "session_manual_term",
            typ: ColumnType::String,
            nullable: true,
        };
        assert_eq!(
            BigQueryClient::column_spec(&nullable).unwrap(),
            "`session_manual_term` string"
        );

        let required = ColumnSchema {
            name: "fetched_at",
            typ: ColumnType::Timestamp,
            nullable: false,
        };
        assert_eq!(
            BigQueryClient::column_spec(&required).unwrap(),
            "`fetched_at` timestamp not null"
        );
    }

    #[test]
    fn test_create_columns_spec_for_report_table() {
        let spec = BigQueryClient::create_columns_spec(&REPORT_TABLE_COLUMNS).unwrap();

        assert_eq!(
            spec,
            "(`date` date not null,\
             `session_source_medium` string,\
             `session_manual_campaign_name` string,\
             `session_manual_term` string,\
             `session_google_ads_query` string,\
             `cv_prospect_all` int64,\
             `cv_seminar_all` int64,\
             `cv_contract_all` int64,\
             `fetched_at` timestamp not null)"
        );
    }

    #[test]
    fn test_partition_option() {
        assert_eq!(
            BigQueryClient::partition_option("date").unwrap(),
            "partition by `date`"
        );
    }

    #[test]
    fn test_sanitize_identifier_escapes_backticks() {
        let escaped = BigQueryClient::sanitize_identifier("pwn`name", "table").unwrap();
        assert_eq!(escaped, "pwn\\`name");
    }

    #[test]
    fn test_sanitize_identifier_rejects_control_chars() {
        let result = BigQueryClient::sanitize_identifier("bad\nname", "column");

        assert!(matches!(
            result,
            Err(err) if err.kind() == ErrorKind::DestinationTableNameInvalid
        ));
    }

    #[test]
    fn test_sanitize_identifier_rejects_empty() {
        let result = BigQueryClient::sanitize_identifier("", "dataset");

        assert!(matches!(
            result,
            Err(err) if err.kind() == ErrorKind::DestinationTableNameInvalid
        ));
    }

    #[test]
    fn test_create_table_query_generation() {
        // Simulate the query generation logic without creating a client.
        let full_table_name = format!(
            "`{project}.{dataset}.{table}`",
            project = BigQueryClient::sanitize_identifier("analytics-project", "project").unwrap(),
            dataset = BigQueryClient::sanitize_identifier("marketing", "dataset").unwrap(),
            table = BigQueryClient::sanitize_identifier("ga4_google_ads_query", "table").unwrap()
        );
        let columns_spec = BigQueryClient::create_columns_spec(&[
            ColumnSchema {
                name: "date",
                typ: ColumnType::Date,
                nullable: false,
            },
            ColumnSchema {
                name: "cv_prospect_all",
                typ: ColumnType::Int64,
                nullable: true,
            },
        ])
        .unwrap();
        let partition_option = BigQueryClient::partition_option("date").unwrap();
        let query = format!("create table {full_table_name} {columns_spec} {partition_option}");

        assert_eq!(
            query,
            "create table `analytics-project.marketing.ga4_google_ads_query` \
             (`date` date not null,`cv_prospect_all` int64) partition by `date`"
        );
    }
}
