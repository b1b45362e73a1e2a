//! Page metadata and article extraction
//!
//! Metadata comes from six DOM probes raced against a content-readiness
//! detector. The primary article comes from a readability pass over the
//! rendered document.

pub mod article;
pub mod probes;
pub mod racer;
pub mod readiness;
pub mod schema;

pub use article::{ExtractedArticle, extract_article, parse_article};
pub use probes::Probe;
pub use racer::{MetadataRacer, PendingMetadata, Readiness, extract_metadata};
pub use readiness::wait_for_readable_content;
pub use schema::{PageMetadata, ProbeValues};
