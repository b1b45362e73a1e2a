//! The six metadata probes
//!
//! A probe is one DOM query. Probes never fail: errors and timeouts resolve
//! to an empty string so a single broken query cannot sink the request.

use std::time::Duration;
use tracing::debug;

use crate::browser::{BrowserResult, PageHandle};
use crate::utils::settle_within;

use super::schema::ProbeValues;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    DocumentTitle,
    OgTitle,
    OgDescription,
    MetaDescription,
    OgSiteName,
    FirstHeading,
}

impl Probe {
    /// Launch order; the first [`Probe::PRIMARY`] entries take part in the readiness race
    pub const ALL: [Probe; 6] = [
        Probe::DocumentTitle,
        Probe::OgTitle,
        Probe::OgDescription,
        Probe::MetaDescription,
        Probe::OgSiteName,
        Probe::FirstHeading,
    ];

    /// Title, og:title and og:description
    pub const PRIMARY: usize = 3;

    pub fn name(self) -> &'static str {
        match self {
            Probe::DocumentTitle => "title",
            Probe::OgTitle => "og:title",
            Probe::OgDescription => "og:description",
            Probe::MetaDescription => "description",
            Probe::OgSiteName => "og:site_name",
            Probe::FirstHeading => "h1",
        }
    }

    async fn query<P: PageHandle + ?Sized>(self, page: &P) -> BrowserResult<Option<String>> {
        match self {
            Probe::DocumentTitle => page.title().await,
            Probe::OgTitle => page.attribute(r#"meta[property="og:title"]"#, "content").await,
            Probe::OgDescription => {
                page.attribute(r#"meta[property="og:description"]"#, "content")
                    .await
            }
            Probe::MetaDescription => page.attribute(r#"meta[name="description"]"#, "content").await,
            Probe::OgSiteName => {
                page.attribute(r#"meta[property="og:site_name"]"#, "content")
                    .await
            }
            Probe::FirstHeading => page.text_content("h1").await,
        }
    }
}

/// Run `probe` bounded by `limit`; any failure becomes an empty string
pub async fn run_probe<P: PageHandle + ?Sized>(page: &P, probe: Probe, limit: Duration) -> String {
    match settle_within(limit, probe.query(page)).await {
        Some(Ok(value)) => value.unwrap_or_default(),
        Some(Err(e)) => {
            debug!("Probe {} failed: {}", probe.name(), e);
            String::new()
        }
        None => {
            debug!("Probe {} timed out after {:?}", probe.name(), limit);
            String::new()
        }
    }
}

impl ProbeValues {
    /// Build from values listed in [`Probe::ALL`] order
    pub fn from_ordered(values: Vec<String>) -> Self {
        let mut values = values.into_iter();
        let mut next = || values.next().unwrap_or_default();
        Self {
            document_title: next(),
            og_title: next(),
            og_description: next(),
            meta_description: next(),
            og_site_name: next(),
            h1_text: next(),
        }
    }
}
