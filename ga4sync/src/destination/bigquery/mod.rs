//! BigQuery destination: low-level client plus the report-table destination
//! built on top of it.

mod client;
mod core;

pub use client::{BigQueryClient, BigQueryDatasetId, BigQueryProjectId, BigQueryTableId};
pub use core::BigQueryDestination;
