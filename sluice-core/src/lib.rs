//! Sluice Core - shared types for the Sluice buffer queue.
//!
//! This crate provides the value types that flow through a Sluice
//! pipeline: partition identifiers, offsets, event-time and watermark
//! wrappers, and the opaque [`Message`] envelope that the buffer queue
//! moves and persists without inspecting.
//!
//! # Design Principles
//!
//! - **Strongly-typed wrappers**: an `Offset` is not a `Watermark`, even
//!   though both are plain integers underneath.
//! - **Opaque payloads**: the queue treats a message body as an
//!   indivisible unit; only the header carries routing metadata.
//! - **No unsafe code**.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod message;
mod types;

pub use message::{Message, MessageHeader};
pub use types::{Offset, PartitionId, Timestamp, Watermark};
