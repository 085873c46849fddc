//! Sluice Watermark - idle-watermark markers and their validation.
//!
//! A watermark marker ([`Wmb`]) reports how far a partition's event time
//! has progressed. An *idle* marker claims that no new data has advanced
//! the partition since the last observation. Before such a claim is
//! propagated downstream as a commitment, it must be observed stably:
//! the [`WmbChecker`] requires the same idle offset across a configured
//! number of consecutive polling iterations, guarding against a flapping
//! or transiently-stale offset.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod checker;
mod wmb;

pub use checker::WmbChecker;
pub use wmb::Wmb;
