//! Error types for access rule and virtual DNS management.

use thiserror::Error;

use crate::types::ScopeKind;

/// Failure of a remote Cloudflare call. Never retried here.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection, TLS or timeout failure
    #[error("Cloudflare request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx status or `success: false` envelope
    #[error("Cloudflare API error (HTTP status {status}): {message}")]
    Api { status: u16, message: String },

    /// Body that is not a Cloudflare response envelope
    #[error("malformed Cloudflare response for {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// Successful envelope without a `result`
    #[error("Cloudflare response for {0} carried no result")]
    EmptyResult(String),
}

impl UpstreamError {
    /// True when the API answered 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, UpstreamError::Api { status: 404, .. })
    }
}

/// Errors surfaced by the resolver, locator and resource handlers.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The rule does not exist in the scanned collection
    #[error("cannot find {scope} firewall access rule for ID {rule_id}")]
    RuleNotFound { scope: ScopeKind, rule_id: String },

    /// Listing did not report exhaustion within the page cap
    #[error("listing {scope} collection {collection_id} did not finish within {max_pages} pages")]
    Pagination {
        scope: ScopeKind,
        collection_id: String,
        max_pages: u32,
    },

    /// The API answered a page request with a different page
    #[error("listing {scope} collection {collection_id} returned page {reported} when page {requested} was requested")]
    PageMismatch {
        scope: ScopeKind,
        collection_id: String,
        requested: u32,
        reported: u32,
    },

    #[error("zone not found: {0}")]
    ZoneNotFound(String),

    #[error("invalid id (\"{0}\") specified, should be in format \"scope/zoneName/ruleID\"")]
    InvalidImportId(String),

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// A create call succeeded without assigning an ID
    #[error("failed to find ID in create response for {0}; resource was empty")]
    MissingId(&'static str),

    /// Attribute that can only change by replacing the resource
    #[error("{0} cannot be changed in place; delete and recreate the rule")]
    ForceNew(&'static str),
}

impl Error {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Error::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// True for a lookup that completed without finding the rule
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::RuleNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
