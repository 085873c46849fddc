//! Sluice PBQ - the persistent buffer queue.
//!
//! A PBQ decouples the ingestion of unordered-arrival records for a
//! logical partition from their ordered, replayable consumption by a
//! downstream stage. Every accepted message travels two paths in
//! lock-step: a bounded in-process channel (the live read path) and a
//! pluggable persistent store (the replay/durability path). After a
//! restart, the store's contents are replayed before live delivery
//! resumes.
//!
//! # Lifecycle
//!
//! ```text
//! manager.create(partition)
//!     -> writer: pbq.write(..) per message, then pbq.close_of_book()
//!     -> reader: pbq.set_replaying(true) when recovering,
//!                pbq.read(..) until end of stream,
//!                pbq.gc()
//!     -> manager deregisters the partition
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sluice_pbq::{PbqConfig, PbqManager};
//! use sluice_core::{Message, PartitionId};
//! use tokio_util::sync::CancellationToken;
//!
//! let manager = PbqManager::new(PbqConfig::default());
//! let pbq = manager.create(PartitionId::new("window-60s-key-a")).await?;
//!
//! let token = CancellationToken::new();
//! pbq.write(&token, Message::new("payload")).await?;
//! pbq.close_of_book();
//!
//! let batch = pbq.read(&token, 100).await?;
//! assert!(batch.outcome.is_end_of_stream());
//! pbq.gc().await?;
//! ```
//!
//! # Guarantees
//!
//! - Messages reach the output channel in write order; the store receives
//!   the same messages in the same order, per writer call.
//! - The output channel closes exactly once, whether through
//!   [`Pbq::close_of_book`] or write-path cancellation.
//! - Once close-of-book is signaled, the reader drains exactly what was
//!   written, then the partition's resources are reclaimed via
//!   [`Pbq::gc`].
//!
//! Single-writer-per-partition is assumed; concurrent writers to the
//! same partition require external serialization.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod error;
mod manager;
mod memory;
mod pbq;
mod store;

pub use config::{PbqConfig, StoreConfig, StoreKind};
pub use error::{PbqError, PbqResult};
pub use manager::PbqManager;
pub use memory::MemoryStore;
pub use pbq::{Pbq, ReadBatch, ReadOutcome};
pub use store::PbqStore;
