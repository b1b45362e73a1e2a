//! Concurrent, timeout-bounded metadata acquisition
//!
//! All six probes start together. The pipeline then races the settlement of
//! the primary three (title, og:title, og:description) against the readiness
//! detector and moves on as soon as either wins, so a slow page costs at most
//! one probe timeout. The remaining probes keep running during the race and
//! are collected by [`PendingMetadata::settle`].

use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use std::time::Duration;
use tracing::debug;

use crate::browser::PageHandle;

use super::probes::{Probe, run_probe};
use super::readiness::wait_for_readable_content;
use super::schema::{PageMetadata, ProbeValues};

/// Which side of the readiness race finished first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Title, og:title and og:description all settled
    PrimaryProbesSettled,
    /// The detector saw enough content
    ContentDetected,
    /// The detector gave up; primary probes were still pending
    DetectorTimedOut,
}

#[derive(Debug, Clone, Copy)]
pub struct MetadataRacer {
    timeout: Duration,
}

impl MetadataRacer {
    /// `timeout` bounds each probe and the readiness detector
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Start all probes against `page`
    pub fn start<'a, P: PageHandle + ?Sized>(&self, page: &'a P) -> PendingMetadata<'a, P> {
        let probes = Probe::ALL
            .iter()
            .map(|&probe| run_probe(page, probe, self.timeout).boxed().shared())
            .collect();

        PendingMetadata {
            page,
            timeout: self.timeout,
            probes,
        }
    }

    /// Race, settle and resolve in one call
    pub async fn extract_metadata<P: PageHandle + ?Sized>(&self, page: &P) -> PageMetadata {
        let pending = self.start(page);
        let readiness = pending.wait_ready().await;
        debug!("Readiness race finished: {:?}", readiness);
        PageMetadata::from_probes(&pending.settle().await)
    }
}

/// Probes in flight against one page
pub struct PendingMetadata<'a, P: ?Sized> {
    page: &'a P,
    timeout: Duration,
    probes: Vec<Shared<BoxFuture<'a, String>>>,
}

impl<'a, P: PageHandle + ?Sized> PendingMetadata<'a, P> {
    /// Wait until the primary probes settle or the page looks ready
    ///
    /// Every probe is driven while waiting, so the ones outside the race make
    /// progress too. Bounded by the probe timeout.
    pub async fn wait_ready(&self) -> Readiness {
        let primary = join_all(self.probes[..Probe::PRIMARY].iter().cloned());
        let everything = join_all(self.probes.iter().cloned());
        let detector = wait_for_readable_content(self.page, self.timeout);

        tokio::select! {
            _ = primary => Readiness::PrimaryProbesSettled,
            // Implies the primary probes settled as well
            _ = everything => Readiness::PrimaryProbesSettled,
            ready = detector => {
                if ready {
                    Readiness::ContentDetected
                } else {
                    Readiness::DetectorTimedOut
                }
            }
        }
    }

    /// Await every probe
    pub async fn settle(self) -> ProbeValues {
        ProbeValues::from_ordered(join_all(self.probes).await)
    }
}

/// Run all probes and resolve precedence, see [`MetadataRacer::extract_metadata`]
pub async fn extract_metadata<P: PageHandle + ?Sized>(page: &P, timeout: Duration) -> PageMetadata {
    MetadataRacer::new(timeout).extract_metadata(page).await
}
