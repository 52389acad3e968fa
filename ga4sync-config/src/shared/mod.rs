mod base;
mod bigquery;
mod ga4;
mod loader;

pub use base::*;
pub use bigquery::*;
pub use ga4::*;
pub use loader::*;
