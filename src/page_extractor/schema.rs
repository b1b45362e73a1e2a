//! Metadata types and field precedence

use serde::{Deserialize, Serialize};

use crate::utils::constants::DEFAULT_TITLE;

/// Raw outcome of the six metadata probes
///
/// Each field is the probe's value, or an empty string when the probe found
/// nothing, failed or timed out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeValues {
    pub document_title: String,
    pub og_title: String,
    pub og_description: String,
    pub meta_description: String,
    pub og_site_name: String,
    pub h1_text: String,
}

/// Page metadata after precedence resolution
///
/// Absent values are empty strings. `title` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub site_name: String,
}

impl Default for PageMetadata {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            description: String::new(),
            site_name: String::new(),
        }
    }
}

impl PageMetadata {
    /// Resolve the precedence chains
    ///
    /// - title: og:title, document title, first h1, `"Untitled"`
    /// - description: og:description, meta description, `""`
    /// - site name: og:site_name, `""`
    pub fn from_probes(probes: &ProbeValues) -> Self {
        Self {
            title: first_non_empty(&[&probes.og_title, &probes.document_title, &probes.h1_text])
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            description: first_non_empty(&[&probes.og_description, &probes.meta_description])
                .unwrap_or_default(),
            site_name: first_non_empty(&[&probes.og_site_name]).unwrap_or_default(),
        }
    }

    /// True when no probe produced a title and the literal default was substituted
    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_TITLE
    }
}

/// First candidate that is non-empty after trimming, trimmed
pub(crate) fn first_non_empty(candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(|candidate| candidate.trim())
        .find(|candidate| !candidate.is_empty())
        .map(str::to_string)
}
