// Shared helpers for the extraction pipeline
pub mod constants;
mod errors;
pub mod poll;
pub mod timeout;

pub use errors::ScrapeError;
pub use poll::poll_until;
pub use timeout::{settle_within, validate_navigation_timeout, validate_probe_timeout};
