use std::fmt;
use std::future::Future;

use gcp_bigquery_client::yup_oauth2::{
    self, ServiceAccountAuthenticator, authenticator::DefaultAuthenticator,
};
use tracing::debug;

use crate::error::{ErrorKind, SyncResult};
use crate::source::report::{RunReportRequest, RunReportResponse};
use crate::{bail, sync_error};

/// Base URL of the GA4 Data API.
const GA4_DATA_API_BASE_URL: &str = "https://analyticsdata.googleapis.com/v1beta";

/// OAuth2 scope required to run reports.
const ANALYTICS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";

/// Trait for systems that can answer `runReport` queries.
///
/// The production implementation is [`Ga4Client`]; tests drive the fetcher
/// with scripted in-memory sources.
pub trait ReportSource {
    /// Runs one report query and returns the raw response.
    fn run_report(
        &self,
        request: &RunReportRequest,
    ) -> impl Future<Output = SyncResult<RunReportResponse>> + Send;
}

/// Client for the GA4 Data API, bound to a single property.
///
/// Authenticates with a service account key through the same `yup_oauth2`
/// stack the BigQuery client uses, so one credential covers both APIs.
pub struct Ga4Client {
    http: reqwest::Client,
    property_id: String,
    authenticator: DefaultAuthenticator,
}

impl Ga4Client {
    /// Creates a new [`Ga4Client`] from a service account key file.
    pub async fn new_with_key_path(property_id: String, sa_key_file: &str) -> SyncResult<Ga4Client> {
        let sa_key = yup_oauth2::read_service_account_key(sa_key_file)
            .await
            .map_err(|err| {
                sync_error!(
                    ErrorKind::AuthenticationError,
                    "Failed to read service account key file",
                    err.to_string()
                )
            })?;

        Self::new(property_id, sa_key).await
    }

    /// Creates a new [`Ga4Client`] from a service account key JSON string.
    pub async fn new_with_key(property_id: String, sa_key: &str) -> SyncResult<Ga4Client> {
        let sa_key = yup_oauth2::parse_service_account_key(sa_key).map_err(|err| {
            sync_error!(
                ErrorKind::AuthenticationError,
                "Invalid service account key",
                err.to_string()
            )
        })?;

        Self::new(property_id, sa_key).await
    }

    async fn new(
        property_id: String,
        sa_key: yup_oauth2::ServiceAccountKey,
    ) -> SyncResult<Ga4Client> {
        let authenticator = ServiceAccountAuthenticator::builder(sa_key)
            .build()
            .await
            .map_err(|err| {
                sync_error!(
                    ErrorKind::AuthenticationError,
                    "Failed to build service account authenticator",
                    err.to_string()
                )
            })?;

        Ok(Ga4Client {
            http: reqwest::Client::new(),
            property_id,
            authenticator,
        })
    }

    /// Obtains a bearer token for the reporting scope.
    async fn access_token(&self) -> SyncResult<String> {
        let token = self
            .authenticator
            .token(&[ANALYTICS_READONLY_SCOPE])
            .await
            .map_err(|err| {
                sync_error!(
                    ErrorKind::AuthenticationError,
                    "Failed to obtain access token",
                    err.to_string()
                )
            })?;

        match token.token() {
            Some(token) => Ok(token.to_string()),
            None => bail!(
                ErrorKind::AuthenticationError,
                "Access token response contained no token"
            ),
        }
    }
}

impl ReportSource for Ga4Client {
    async fn run_report(&self, request: &RunReportRequest) -> SyncResult<RunReportResponse> {
        let token = self.access_token().await?;
        let url = format!(
            "{GA4_DATA_API_BASE_URL}/properties/{}:runReport",
            self.property_id
        );

        debug!(
            property_id = %self.property_id,
            offset = request.offset,
            limit = request.limit,
            "running report query"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                ErrorKind::SourceQueryFailed,
                "Reporting API returned an error status",
                format!("HTTP {status}: {body}")
            );
        }

        let report = response.json::<RunReportResponse>().await?;

        Ok(report)
    }
}

impl fmt::Debug for Ga4Client {
    /// Formats the client for debugging, excluding credential internals.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ga4Client")
            .field("property_id", &self.property_id)
            .finish()
    }
}
