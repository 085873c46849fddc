//! The pluggable store contract.
//!
//! Every message accepted by a buffer queue is mirrored to a store so the
//! partition can be replayed after a restart. The store is a capability,
//! not a concrete type: backends (in-memory, WAL, object store) are
//! selected by configuration at manager construction and must honor this
//! contract identically.

use async_trait::async_trait;
use sluice_core::{Message, PartitionId};

use crate::config::{StoreConfig, StoreKind};
use crate::error::PbqResult;
use crate::memory::MemoryStore;

/// Append-only bounded persistence for one partition's messages.
///
/// Methods take `&self`: one store handle is shared between the writer
/// task (appends) and the reader task (replay), so implementations use
/// interior mutability. Exclusive ownership is temporal, not type-level:
/// writes are blocked while replay reads are in progress, and nothing
/// touches the store concurrently with `gc`.
#[async_trait]
pub trait PbqStore: Send + Sync {
    /// Appends one message.
    ///
    /// No partial writes: on error the store is unchanged.
    ///
    /// # Errors
    ///
    /// [`crate::PbqError::StoreFull`] at capacity,
    /// [`crate::PbqError::StoreClosed`] after close or garbage
    /// collection.
    async fn write(&self, msg: Message) -> PbqResult<()>;

    /// Reads up to `size` messages from the read cursor and advances it.
    ///
    /// The boolean is the end-of-data flag: an empty batch with the flag
    /// set is the normal way a completed replay ends, not a failure.
    ///
    /// # Errors
    ///
    /// Backend-specific read failures.
    async fn read(&self, size: u64) -> PbqResult<(Vec<Message>, bool)>;

    /// Marks the store closed. Subsequent writes fail; already-written
    /// data remains readable. Idempotent.
    ///
    /// # Errors
    ///
    /// Backend-specific flush/finalize failures.
    async fn close(&self) -> PbqResult<()>;

    /// Releases the underlying storage. After this the store must not be
    /// read or written again. Idempotent.
    ///
    /// # Errors
    ///
    /// Backend-specific release failures.
    async fn gc(&self) -> PbqResult<()>;

    /// True iff no message has ever been written.
    async fn is_empty(&self) -> bool;
}

impl StoreConfig {
    /// Constructs the configured store backend for a partition.
    ///
    /// # Errors
    ///
    /// Backend-specific construction failures (the in-memory backend is
    /// infallible).
    #[allow(clippy::unused_async)]
    pub(crate) async fn build(
        &self,
        partition_id: PartitionId,
    ) -> PbqResult<std::sync::Arc<dyn PbqStore>> {
        match self.kind {
            StoreKind::InMemory => Ok(std::sync::Arc::new(MemoryStore::new(
                partition_id,
                self.capacity,
            ))),
        }
    }
}
