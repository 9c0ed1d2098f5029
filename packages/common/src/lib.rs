pub mod config;
pub mod job;
pub mod job_status;
pub mod source_type;

pub use job::{JobInput, SourceInput, SummarizeJob, SummaryOptions};
pub use job_status::JobStatus;
pub use source_type::SourceType;
