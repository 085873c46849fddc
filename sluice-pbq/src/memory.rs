//! In-memory reference store.
//!
//! A fixed-capacity backing vector with monotonic write/read cursors.
//! This is a bounded scratch buffer, not a durable log: process death
//! loses all data. The contract in [`crate::PbqStore`] is what a durable
//! backend (WAL, disk, object store) must honor identically.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sluice_core::{Message, PartitionId};
use tracing::debug;

use crate::error::{PbqError, PbqResult};
use crate::store::PbqStore;

/// Cursor and backing state behind the store's lock.
#[derive(Debug)]
struct Inner {
    /// Backing array. `None` once garbage-collected, which is a distinct
    /// state from "never written" so the two are never conflated.
    storage: Option<Vec<Message>>,
    /// Messages written so far. Always equals the backing length.
    write_pos: u64,
    /// Messages consumed by replay reads so far.
    read_pos: u64,
    /// Set by `close`; writes are rejected afterwards.
    closed: bool,
}

/// Fixed-capacity in-memory store implementation.
///
/// Clones share state via `Arc`, so the writer's and reader's handles
/// observe the same cursors.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    capacity: u64,
    partition_id: PartitionId,
}

impl MemoryStore {
    /// Creates a store that holds up to `capacity` messages.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Capacity is a config value, not data-driven.
    pub fn new(partition_id: PartitionId, capacity: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                storage: Some(Vec::with_capacity(capacity as usize)),
                write_pos: 0,
                read_pos: 0,
                closed: false,
            })),
            capacity,
            partition_id,
        }
    }

    /// Returns the configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> u64 {
        self.capacity
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store lock poisoned")
    }
}

#[async_trait]
impl PbqStore for MemoryStore {
    async fn write(&self, msg: Message) -> PbqResult<()> {
        let mut inner = self.lock();

        // Full check comes before the closed check: a full store reports
        // StoreFull even after close.
        if inner.write_pos >= self.capacity {
            debug!(
                partition_id = %self.partition_id,
                capacity = self.capacity,
                "Rejecting write, store is full"
            );
            return Err(PbqError::StoreFull {
                capacity: self.capacity,
            });
        }
        if inner.closed {
            debug!(partition_id = %self.partition_id, "Rejecting write, store is closed");
            return Err(PbqError::StoreClosed);
        }

        let write_pos = inner.write_pos;
        let Some(storage) = inner.storage.as_mut() else {
            // Collected stores are closed stores.
            return Err(PbqError::StoreClosed);
        };

        // Invariant: the write cursor indexes one past the backing end.
        assert!(
            storage.len() as u64 == write_pos,
            "write cursor out of sync with backing array"
        );

        storage.push(msg);
        inner.write_pos += 1;
        Ok(())
    }

    async fn read(&self, size: u64) -> PbqResult<(Vec<Message>, bool)> {
        let mut inner = self.lock();

        let Some(storage) = inner.storage.as_ref() else {
            // Collected: nothing left to replay.
            return Ok((Vec::new(), true));
        };

        if inner.write_pos == 0 || inner.read_pos >= inner.write_pos {
            // Drained (or never written). Normal end of replay.
            return Ok((Vec::new(), true));
        }

        let count = size.min(inner.write_pos - inner.read_pos);
        #[allow(clippy::cast_possible_truncation)] // count <= capacity, a config value.
        let range = inner.read_pos as usize..(inner.read_pos + count) as usize;
        let batch = storage[range].to_vec();
        inner.read_pos += count;

        // Postcondition: the read cursor never passes the write cursor.
        assert!(inner.read_pos <= inner.write_pos);

        Ok((batch, false))
    }

    async fn close(&self) -> PbqResult<()> {
        self.lock().closed = true;
        Ok(())
    }

    async fn gc(&self) -> PbqResult<()> {
        let mut inner = self.lock();
        inner.storage = None;
        inner.closed = true;
        debug!(partition_id = %self.partition_id, "Collected store");
        Ok(())
    }

    async fn is_empty(&self) -> bool {
        let inner = self.lock();
        // A collected store is not "empty": it may have held data.
        inner.storage.is_some() && inner.write_pos == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store(capacity: u64) -> MemoryStore {
        MemoryStore::new(PartitionId::new("partition-1"), capacity)
    }

    fn make_message(i: u64) -> Message {
        Message::new(format!("message-{i}")).with_offset(sluice_core::Offset::new(i))
    }

    #[tokio::test]
    async fn test_write_then_read_in_order() {
        let store = make_store(10);
        for i in 0..5 {
            store.write(make_message(i)).await.unwrap();
        }

        let (batch, eof) = store.read(3).await.unwrap();
        assert_eq!(batch.len(), 3);
        assert!(!eof);
        assert_eq!(batch[0].header.offset.get(), 0);
        assert_eq!(batch[2].header.offset.get(), 2);

        let (batch, eof) = store.read(10).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert!(!eof);

        // Drained: empty batch, end-of-data, no error.
        let (batch, eof) = store.read(10).await.unwrap();
        assert!(batch.is_empty());
        assert!(eof);
    }

    #[tokio::test]
    async fn test_empty_store_reads_end_of_data() {
        let store = make_store(10);
        assert!(store.is_empty().await);

        let (batch, eof) = store.read(5).await.unwrap();
        assert!(batch.is_empty());
        assert!(eof);
    }

    #[tokio::test]
    async fn test_write_past_capacity_fails_without_mutating() {
        let store = make_store(2);
        store.write(make_message(0)).await.unwrap();
        store.write(make_message(1)).await.unwrap();

        let err = store.write(make_message(2)).await.unwrap_err();
        assert_eq!(err, PbqError::StoreFull { capacity: 2 });

        // The failed write did not advance the cursor.
        let (batch, _) = store.read(10).await.unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn test_write_after_close_fails_data_remains_readable() {
        let store = make_store(10);
        store.write(make_message(0)).await.unwrap();

        store.close().await.unwrap();
        store.close().await.unwrap(); // Idempotent.

        let err = store.write(make_message(1)).await.unwrap_err();
        assert_eq!(err, PbqError::StoreClosed);

        let (batch, eof) = store.read(10).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert!(!eof);
    }

    #[tokio::test]
    async fn test_gc_is_distinct_from_never_written() {
        let store = make_store(10);
        store.write(make_message(0)).await.unwrap();
        assert!(!store.is_empty().await);

        store.gc().await.unwrap();
        store.gc().await.unwrap(); // Idempotent.

        // Collected, not "empty".
        assert!(!store.is_empty().await);

        // Reads report end-of-data; writes fail.
        let (batch, eof) = store.read(10).await.unwrap();
        assert!(batch.is_empty());
        assert!(eof);
        assert_eq!(
            store.write(make_message(1)).await.unwrap_err(),
            PbqError::StoreClosed
        );
    }

    #[tokio::test]
    async fn test_clones_share_cursors() {
        let writer_handle = make_store(10);
        let reader_handle = writer_handle.clone();

        writer_handle.write(make_message(0)).await.unwrap();

        let (batch, eof) = reader_handle.read(10).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert!(!eof);
    }
}
