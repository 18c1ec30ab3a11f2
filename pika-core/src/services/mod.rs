mod ingest;
mod query;
mod tamper;
mod traffic;

pub use ingest::MetricIngestService;
pub use query::{align_time_range_to_bucket, MetricQueryService, QueryDefinition};
pub use tamper::TamperService;
pub use traffic::{format_bytes, TrafficService};
