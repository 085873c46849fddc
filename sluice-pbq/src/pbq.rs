//! The per-partition buffer queue instance.
//!
//! One [`Pbq`] owns one bounded output channel (the live read path) and
//! one store handle (the replay/durability path) for a single partition.
//! Every write is mirrored to both in lock-step. Reads transparently
//! switch between store replay and live channel delivery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use sluice_core::{Message, PartitionId};
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{PbqError, PbqResult};
use crate::manager::Registry;
use crate::store::PbqStore;

/// How a read batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// More messages may follow (includes a read-timeout partial batch,
    /// which is a latency bound, not a terminal condition).
    Open,
    /// The channel is drained and closed. Terminal, and expected.
    EndOfStream,
    /// The reader's cancellation token fired.
    Canceled,
}

impl ReadOutcome {
    /// True if the stream ended normally.
    #[must_use]
    pub const fn is_end_of_stream(self) -> bool {
        matches!(self, Self::EndOfStream)
    }
}

/// A batch of messages returned by [`Pbq::read`], together with how the
/// read ended. End-of-stream and cancellation still deliver everything
/// collected before the condition was observed.
#[derive(Debug)]
pub struct ReadBatch {
    /// Messages collected, in write order.
    pub messages: Vec<Message>,
    /// How the read ended.
    pub outcome: ReadOutcome,
}

/// A per-partition persistent buffer queue.
///
/// Shared as `Arc<Pbq>` between one writer task and one reader task.
/// Concurrent writers to the same partition are not supported and
/// require external serialization.
pub struct Pbq {
    partition_id: PartitionId,
    read_timeout: Duration,
    /// Writer endpoint. Taking the sender out is the close-once latch:
    /// both `close_of_book` and write-path cancellation go through it,
    /// so the channel closes exactly once.
    output_tx: Mutex<Option<mpsc::Sender<Message>>>,
    /// Reader endpoint, `None` once handed out via `take_output`.
    output_rx: AsyncMutex<Option<mpsc::Receiver<Message>>>,
    /// Close-of-book flag. Once set, all writes are rejected.
    cob: AtomicBool,
    /// Replay gate. Writers sleep on this while it holds `true`.
    replay_tx: watch::Sender<bool>,
    /// Store handle, dropped at garbage collection.
    store: Mutex<Option<Arc<dyn PbqStore>>>,
    /// Registry to deregister from at garbage collection.
    registry: Weak<Registry>,
}

impl Pbq {
    pub(crate) fn new(
        partition_id: PartitionId,
        store: Arc<dyn PbqStore>,
        buffer_size: usize,
        read_timeout: Duration,
        registry: Weak<Registry>,
    ) -> Self {
        // The channel is buffered to support bulk reads.
        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        let (replay_tx, _) = watch::channel(false);

        Self {
            partition_id,
            read_timeout,
            output_tx: Mutex::new(Some(tx)),
            output_rx: AsyncMutex::new(Some(rx)),
            cob: AtomicBool::new(false),
            replay_tx,
            store: Mutex::new(Some(store)),
            registry,
        }
    }

    /// Returns the partition this queue serves.
    #[must_use]
    pub const fn partition_id(&self) -> &PartitionId {
        &self.partition_id
    }

    /// True while reads are served from the store instead of the
    /// channel.
    #[must_use]
    pub fn is_replaying(&self) -> bool {
        *self.replay_tx.borrow()
    }

    /// Toggles replay mode.
    ///
    /// Must be set before the first read when recovering from a restart,
    /// so accumulated store contents are replayed before new live
    /// messages are seen. Clearing it wakes writers blocked on the gate.
    pub fn set_replaying(&self, replaying: bool) {
        self.replay_tx.send_replace(replaying);
    }

    /// Writes one message to the queue and mirrors it to the store.
    ///
    /// Blocks while replay is in progress and on channel backpressure.
    /// If the token fires first, the write path is terminally closed:
    /// the channel closes (once) and the store closes.
    ///
    /// # Errors
    ///
    /// - [`PbqError::ClosedForWrites`] after close-of-book or a prior
    ///   terminal cancellation.
    /// - [`PbqError::StoreFull`] / [`PbqError::StoreClosed`] from the
    ///   mirrored store write. The channel delivery already stands:
    ///   callers must treat this as accepted downstream but not durably
    ///   persisted, and decide whether to abort the partition.
    /// - [`PbqError::Canceled`] when the token fires.
    pub async fn write(&self, token: &CancellationToken, msg: Message) -> PbqResult<()> {
        self.wait_replay_end(token).await?;

        if self.cob.load(Ordering::Acquire) {
            warn!(
                partition_id = %self.partition_id,
                offset = %msg.header.offset,
                "Rejecting write after close of book"
            );
            return Err(PbqError::ClosedForWrites {
                partition_id: self.partition_id.clone(),
            });
        }

        let Some(tx) = self.sender() else {
            // The cancellation path already closed the channel.
            return Err(PbqError::ClosedForWrites {
                partition_id: self.partition_id.clone(),
            });
        };

        tokio::select! {
            sent = tx.send(msg.clone()) => {
                if sent.is_err() {
                    // Receiver dropped; the partition is unreadable.
                    return Err(PbqError::ClosedForWrites {
                        partition_id: self.partition_id.clone(),
                    });
                }
                // Mirror to the store in the same call, keeping both
                // paths in lock-step per writer.
                self.store_write(msg).await
            }
            () = token.cancelled() => {
                self.abort_writes("write").await
            }
        }
    }

    /// Signals close-of-book: no further messages will be written for
    /// this partition. Closes the output channel. Safe to call more than
    /// once, and safe against the cancellation path racing it.
    pub fn close_of_book(&self) {
        self.cob.store(true, Ordering::Release);
        if self.close_output() {
            debug!(partition_id = %self.partition_id, "Close of book");
        }
    }

    /// Closes the store (flush/finalize), independent of the channel.
    ///
    /// # Errors
    ///
    /// Backend-specific finalize failures.
    pub async fn close_writer(&self) -> PbqResult<()> {
        match self.store_handle() {
            Some(store) => store.close().await,
            None => Ok(()),
        }
    }

    /// Reads up to `size` messages.
    ///
    /// In replay mode, messages come from the store; when the store
    /// reports end-of-data the queue flips to live mode and the
    /// (possibly empty) batch is returned without error. In live mode,
    /// messages come from the output channel, bounded by the read
    /// timeout: a partial batch under timeout is [`ReadOutcome::Open`],
    /// not a failure.
    ///
    /// # Errors
    ///
    /// Store failures during replay, or [`PbqError::OutputTaken`] if the
    /// channel was handed out via [`Self::take_output`]. Cancellation is
    /// reported as [`ReadOutcome::Canceled`] alongside the partial
    /// batch, not as an error.
    pub async fn read(&self, token: &CancellationToken, size: u64) -> PbqResult<ReadBatch> {
        if self.is_replaying() {
            return self.read_replay(size).await;
        }

        let mut rx_slot = self.output_rx.lock().await;
        let Some(rx) = rx_slot.as_mut() else {
            return Err(PbqError::OutputTaken {
                partition_id: self.partition_id.clone(),
            });
        };

        let deadline = Instant::now() + self.read_timeout;
        let mut messages = Vec::new();

        while (messages.len() as u64) < size {
            tokio::select! {
                () = token.cancelled() => {
                    return Ok(ReadBatch { messages, outcome: ReadOutcome::Canceled });
                }
                () = tokio::time::sleep_until(deadline) => {
                    return Ok(ReadBatch { messages, outcome: ReadOutcome::Open });
                }
                received = rx.recv() => {
                    match received {
                        Some(msg) => messages.push(msg),
                        None => {
                            return Ok(ReadBatch {
                                messages,
                                outcome: ReadOutcome::EndOfStream,
                            });
                        }
                    }
                }
            }
        }

        Ok(ReadBatch {
            messages,
            outcome: ReadOutcome::Open,
        })
    }

    /// Hands the output channel to a consumer that drains it with its
    /// own receive loop. Used when replay is not needed. Afterwards
    /// [`Self::read`] fails with [`PbqError::OutputTaken`].
    pub async fn take_output(&self) -> Option<mpsc::Receiver<Message>> {
        self.output_rx.lock().await.take()
    }

    /// Releases the partition's resources once the downstream consumer
    /// has fully drained and forwarded all output.
    ///
    /// The store handle is dropped and the partition deregistered even
    /// when the store's collection fails, so a non-fatal failure never
    /// leaks a registry entry. After this call the instance is inert.
    ///
    /// # Errors
    ///
    /// The store's collection error, if any.
    pub async fn gc(&self) -> PbqResult<()> {
        let store = self
            .store
            .lock()
            .expect("store lock poisoned")
            .take();

        let result = match store {
            Some(store) => store.gc().await,
            None => Ok(()),
        };

        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.partition_id);
        }

        if let Err(err) = &result {
            warn!(
                partition_id = %self.partition_id,
                error = %err,
                "Store collection failed; partition deregistered anyway"
            );
        } else {
            debug!(partition_id = %self.partition_id, "Collected partition");
        }
        result
    }

    /// Serves a replay-mode read from the store.
    async fn read_replay(&self, size: u64) -> PbqResult<ReadBatch> {
        let Some(store) = self.store_handle() else {
            // Store already collected; nothing left to replay.
            self.set_replaying(false);
            return Ok(ReadBatch {
                messages: Vec::new(),
                outcome: ReadOutcome::Open,
            });
        };

        let (messages, end_of_data) = store.read(size).await.map_err(|err| {
            warn!(
                partition_id = %self.partition_id,
                error = %err,
                "Replay read failed"
            );
            err
        })?;

        if end_of_data {
            // Replay is over: flip to live mode and wake blocked
            // writers.
            self.set_replaying(false);
            debug!(partition_id = %self.partition_id, "Replay complete, switching to live reads");
        }

        Ok(ReadBatch {
            messages,
            outcome: ReadOutcome::Open,
        })
    }

    /// Sleeps until replay ends or the token fires. No busy-waiting: the
    /// watch channel wakes waiters on every flag change.
    async fn wait_replay_end(&self, token: &CancellationToken) -> PbqResult<()> {
        let mut gate = self.replay_tx.subscribe();
        loop {
            if !*gate.borrow_and_update() {
                return Ok(());
            }
            tokio::select! {
                changed = gate.changed() => {
                    if changed.is_err() {
                        // Sender dropped only when the queue is torn
                        // down; treat as gate released.
                        return Ok(());
                    }
                }
                () = token.cancelled() => {
                    return self.abort_writes("write").await;
                }
            }
        }
    }

    /// Terminal cancellation: close the channel through the close-once
    /// latch, close the store, report cancellation.
    async fn abort_writes(&self, operation: &'static str) -> PbqResult<()> {
        if self.close_output() {
            debug!(
                partition_id = %self.partition_id,
                "Writer canceled, output channel closed"
            );
        }
        if let Err(err) = self.close_writer().await {
            warn!(
                partition_id = %self.partition_id,
                error = %err,
                "Store close failed during cancellation"
            );
        }
        Err(PbqError::Canceled { operation })
    }

    /// Drops the stored sender. Returns true if this call performed the
    /// close; the channel itself closes once every outstanding clone is
    /// dropped.
    fn close_output(&self) -> bool {
        self.output_tx
            .lock()
            .expect("output sender lock poisoned")
            .take()
            .is_some()
    }

    fn sender(&self) -> Option<mpsc::Sender<Message>> {
        self.output_tx
            .lock()
            .expect("output sender lock poisoned")
            .clone()
    }

    fn store_handle(&self) -> Option<Arc<dyn PbqStore>> {
        self.store.lock().expect("store lock poisoned").clone()
    }

    /// Mirrors an accepted message into the store.
    async fn store_write(&self, msg: Message) -> PbqResult<()> {
        match self.store_handle() {
            Some(store) => store.write(msg).await,
            // The store is gone after garbage collection; nothing to
            // mirror to.
            None => Err(PbqError::StoreClosed),
        }
    }
}

impl std::fmt::Debug for Pbq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pbq")
            .field("partition_id", &self.partition_id)
            .field("cob", &self.cob.load(Ordering::Acquire))
            .field("is_replaying", &self.is_replaying())
            .finish_non_exhaustive()
    }
}
