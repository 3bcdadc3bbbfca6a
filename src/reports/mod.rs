//! Reports (§4.10): day/week/month aggregation of Bills per pile.

pub mod service;

pub use service::{Bucket, ReportRow, ReportService};
