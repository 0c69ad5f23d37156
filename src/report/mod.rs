// Report outputs: JSON snapshot, CSV export of the cleaned dataset and a text digest.

pub mod summary;
pub mod writer;

pub use summary::{format_summary, log_summary};
pub use writer::{ReportWriter, export_records_csv, write_json};
