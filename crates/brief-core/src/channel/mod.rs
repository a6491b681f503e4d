//! Text acquisition for the three ingestion channels.
//!
//! Each channel turns its raw input into a bounded UTF-8 blob. Anything that
//! fails here is an [`AcquisitionError`]: the request stops before the
//! briefing is loaded, so no state is touched.

mod document;
mod website;

pub use document::{
    condense_for_extraction, declared_media_type, decode_document, DecodedDocument, DOCUMENT_CONDENSE_THRESHOLD,
    DOCUMENT_EDGE_CHARS, DOCUMENT_MAX_CHARS,
};
pub use website::{html_to_text, WebsiteFetcher, DEFAULT_USER_AGENT, WEBSITE_MAX_CHARS};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Chat,
    Document,
    Website,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Chat => "chat",
            Channel::Document => "document",
            Channel::Website => "website",
        }
    }

    /// Whether extraction and planning see the conversation window.
    pub fn uses_history(&self) -> bool {
        matches!(self, Channel::Chat)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AcquisitionError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("Document payload is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("Document contains no readable text")]
    EmptyDocument,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Fetching the page timed out after {0:?}")]
    FetchTimeout(Duration),

    #[error("Fetching the page failed: {0}")]
    Fetch(String),

    #[error("Page returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Page contains no readable text")]
    EmptyPage,
}

impl AcquisitionError {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AcquisitionError::EmptyMessage => "empty_message",
            AcquisitionError::InvalidBase64(_) => "invalid_base64",
            AcquisitionError::EmptyDocument => "empty_document",
            AcquisitionError::InvalidUrl(_) => "invalid_url",
            AcquisitionError::FetchTimeout(_) => "fetch_timeout",
            AcquisitionError::Fetch(_) => "fetch",
            AcquisitionError::HttpStatus(_) => "http_status",
            AcquisitionError::EmptyPage => "empty_page",
        }
    }

    /// True when the page could not be retrieved at all, as opposed to being
    /// retrieved but unusable.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            AcquisitionError::FetchTimeout(_) | AcquisitionError::Fetch(_) | AcquisitionError::HttpStatus(_)
        )
    }
}

/// The first `max_chars` Unicode scalar values of `s`.
pub(crate) fn take_chars(s: &str, max_chars: usize) -> &str {
    let byte_end = s
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    &s[..byte_end]
}

/// The last `max_chars` Unicode scalar values of `s`.
pub(crate) fn last_chars(s: &str, max_chars: usize) -> &str {
    let total = s.chars().count();
    if total <= max_chars {
        return s;
    }
    let byte_start = s
        .char_indices()
        .nth(total - max_chars)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &s[byte_start..]
}
