//! The CheatGuard pipeline: query → URLs → excerpts → relevant text →
//! structured records → printed / mailed output.
//!
//! Collaborators (search provider, page fetcher, language model, notifier)
//! are passed in as trait objects, so the whole flow runs against fakes in
//! tests.

pub mod filter;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod structured;

pub use pipeline::{DEFAULT_MAIL_SUBJECT, Pipeline, PipelineConfig, digest_body, digest_query};
pub use record::{ArticleRecord, RecordError};
pub use report::{RunAborted, RunReport, StageError};
