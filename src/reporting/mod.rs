pub mod aggregator;
pub mod formatter;
pub mod writer;

pub use aggregator::{aggregate, build_report, ReportContext};
pub use writer::{list_reports, write_report, ReportFile};
