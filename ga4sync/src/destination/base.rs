use std::future::Future;

use ga4sync_config::shared::DedupStrategy;

use crate::aggregate::ConversionRow;
use crate::error::SyncResult;

/// Trait for table stores that can receive aggregated report rows.
///
/// A load is one batch of rows stamped with a common `fetched_at`, followed
/// by deduplication under the given strategy. After a successful load the
/// store holds exactly one row per natural key: the one with the greatest
/// `fetched_at`. Loading the same logical rows again with a later timestamp
/// must therefore replace, not duplicate, them — this is what makes re-runs
/// of the loader safe.
pub trait Destination {
    /// Loads a batch of rows and deduplicates.
    ///
    /// Callers skip this entirely when a run produced no rows, so
    /// implementations may assume `rows` is non-empty.
    fn load_report_rows(
        &self,
        rows: Vec<ConversionRow>,
        strategy: DedupStrategy,
    ) -> impl Future<Output = SyncResult<()>> + Send;
}
