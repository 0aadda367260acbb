//! Remote collection client trait.

use async_trait::async_trait;
use minter_core::{CollectionItem, CollectionKey, CollectionMetadata, PageRequest, UpstreamError};
use std::sync::Arc;

/// Result type for remote collection calls.
pub type RemoteResult<T> = Result<T, UpstreamError>;

/// Read access to a remote paginated collection.
///
/// Both calls fail with [`UpstreamError`] on transport failure, non-success
/// status or a body that cannot be decoded. Neither call retries.
#[async_trait]
pub trait RemoteCollectionClient: Send + Sync {
    /// Current size of the collection. Never cached by callers.
    async fn fetch_metadata(&self, collection: &CollectionKey) -> RemoteResult<CollectionMetadata>;

    /// At most `page.size` items starting at `page.offset`, in the remote's ordering.
    async fn fetch_page(
        &self,
        collection: &CollectionKey,
        page: PageRequest,
    ) -> RemoteResult<Vec<CollectionItem>>;
}

#[async_trait]
impl<T: RemoteCollectionClient + ?Sized> RemoteCollectionClient for Arc<T> {
    async fn fetch_metadata(&self, collection: &CollectionKey) -> RemoteResult<CollectionMetadata> {
        (**self).fetch_metadata(collection).await
    }

    async fn fetch_page(
        &self,
        collection: &CollectionKey,
        page: PageRequest,
    ) -> RemoteResult<Vec<CollectionItem>> {
        (**self).fetch_page(collection, page).await
    }
}
