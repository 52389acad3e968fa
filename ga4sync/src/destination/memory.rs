use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use ga4sync_config::shared::DedupStrategy;
use tokio::sync::Mutex;
use tracing::info;

use crate::aggregate::ConversionRow;
use crate::destination::Destination;
use crate::error::SyncResult;

/// The in-memory natural key: report date plus the four session dimensions.
type Key = (NaiveDate, String, String, String, String);

/// In-memory destination for testing and development purposes.
///
/// [`MemoryDestination`] keeps the loaded table in memory and applies the
/// same dedup contract as the production destination: after every load,
/// exactly one row per natural key survives, the one with the greatest
/// `fetched_at`. Both strategies behave identically here, which is precisely
/// the property the two BigQuery strategies are required to share.
#[derive(Debug, Clone, Default)]
pub struct MemoryDestination {
    table: Arc<Mutex<BTreeMap<Key, ConversionRow>>>,
}

impl MemoryDestination {
    /// Creates a new, empty [`MemoryDestination`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the stored rows in key order.
    pub async fn rows(&self) -> Vec<ConversionRow> {
        self.table.lock().await.values().cloned().collect()
    }
}

impl Destination for MemoryDestination {
    async fn load_report_rows(
        &self,
        rows: Vec<ConversionRow>,
        _strategy: DedupStrategy,
    ) -> SyncResult<()> {
        let mut table = self.table.lock().await;

        let mut inserted = 0usize;
        let mut replaced = 0usize;
        for row in rows {
            let (date, a, b, c, d) = row.natural_key();
            let key = (
                date,
                a.to_string(),
                b.to_string(),
                c.to_string(),
                d.to_string(),
            );

            let newer_exists = table
                .get(&key)
                .is_some_and(|existing| existing.fetched_at >= row.fetched_at);
            if newer_exists {
                continue;
            }

            if table.insert(key, row).is_some() {
                replaced += 1;
            } else {
                inserted += 1;
            }
        }

        info!(inserted, replaced, total = table.len(), "memory destination loaded rows");

        Ok(())
    }
}
