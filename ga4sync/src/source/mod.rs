//! GA4 reporting source: wire types, the HTTP client, and the paginated
//! report fetcher.

pub mod fetcher;
pub mod ga4;
pub mod report;

pub use fetcher::{FetchedReport, ReportFetcher};
pub use ga4::{Ga4Client, ReportSource};
