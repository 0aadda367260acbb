//! Outcome of one backfill run.

use minter_core::{
    CollectionKey, MinterError, PageRequest, PersistenceError, UpstreamError,
};
use serde::Serialize;
use thiserror::Error;

/// A record that could not be persisted. Not fatal to the batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertFailure {
    pub page: PageRequest,
    /// Index of the item within its page.
    pub item_index: usize,
    pub key_string: String,
    pub reason: String,
}

/// What a single `ensure_cached` call did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackfillReport {
    pub collection: CollectionKey,
    /// Remote total at call time.
    pub remote_total: u64,
    /// Local record count before any insert.
    pub local_before: u64,
    /// `remote_total - local_before`. Negative when the local cache is larger.
    pub missing: i64,
    pub planned_pages: Vec<PageRequest>,
    pub fetched_pages: usize,
    pub fetched_items: usize,
    pub inserted: u64,
    pub failures: Vec<InsertFailure>,
}

impl BackfillReport {
    pub(crate) fn new(
        collection: CollectionKey,
        remote_total: u64,
        local_before: u64,
        missing: i64,
        planned_pages: Vec<PageRequest>,
    ) -> Self {
        Self {
            collection,
            remote_total,
            local_before,
            missing,
            planned_pages,
            fetched_pages: 0,
            fetched_items: 0,
            inserted: 0,
            failures: Vec::new(),
        }
    }

    /// Nothing was missing, so nothing was fetched.
    pub fn is_noop(&self) -> bool {
        self.planned_pages.is_empty()
    }

    /// Every planned page was fetched.
    pub fn is_complete(&self) -> bool {
        self.fetched_pages == self.planned_pages.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Fatal backfill errors. Inserts that already happened are kept.
#[derive(Debug, Clone, Error)]
pub enum BackfillError {
    #[error("Failed to fetch metadata for {collection}: {source}")]
    Metadata {
        collection: CollectionKey,
        source: UpstreamError,
    },

    #[error("Failed to count cached records for {collection}: {source}")]
    Count {
        collection: CollectionKey,
        source: PersistenceError,
    },

    #[error(
        "Failed to fetch page offset={} size={} for {collection}: {source}",
        .page.offset,
        .page.size
    )]
    Page {
        collection: CollectionKey,
        page: PageRequest,
        /// Progress made before the failing page.
        partial: Box<BackfillReport>,
        source: UpstreamError,
    },
}

impl BackfillError {
    /// Report of the pages completed before the abort, if any ran.
    pub fn partial_report(&self) -> Option<&BackfillReport> {
        match self {
            BackfillError::Page { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

impl From<BackfillError> for MinterError {
    fn from(err: BackfillError) -> Self {
        match err {
            BackfillError::Metadata { source, .. } | BackfillError::Page { source, .. } => {
                MinterError::Upstream(source)
            }
            BackfillError::Count { source, .. } => MinterError::Persistence(source),
        }
    }
}
