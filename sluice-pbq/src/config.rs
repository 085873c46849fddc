//! Buffer queue configuration.
//!
//! Supplied once at manager construction and applied uniformly to every
//! buffer queue it creates.

use std::time::Duration;

/// Which store backend to construct for each partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    /// Fixed-capacity in-memory store. A bounded scratch buffer, not a
    /// durability guarantee: process death loses all data.
    #[default]
    InMemory,
}

/// Store backend configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Backend to construct.
    pub kind: StoreKind,
    /// Maximum number of messages the store holds.
    pub capacity: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::InMemory,
            capacity: 100_000,
        }
    }
}

impl StoreConfig {
    /// Sets the store capacity.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the backend kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: StoreKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Configuration for a [`crate::PbqManager`] and the buffer queues it
/// creates.
#[derive(Debug, Clone)]
pub struct PbqConfig {
    /// Capacity of each partition's output channel, in messages.
    pub channel_buffer_size: usize,
    /// How long a live-mode read waits for messages before returning a
    /// partial batch.
    pub read_timeout: Duration,
    /// Store backend configuration.
    pub store: StoreConfig,
}

impl Default for PbqConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 100,
            read_timeout: Duration::from_secs(1),
            store: StoreConfig::default(),
        }
    }
}

impl PbqConfig {
    /// Sets the output channel capacity.
    #[must_use]
    pub const fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }

    /// Sets the live-mode read timeout.
    #[must_use]
    pub const fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the store configuration.
    #[must_use]
    pub const fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// Creates a config with small buffers and a short read timeout for
    /// tests.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            channel_buffer_size: 10,
            read_timeout: Duration::from_millis(100),
            store: StoreConfig {
                kind: StoreKind::InMemory,
                capacity: 100,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PbqConfig::default();
        assert_eq!(config.channel_buffer_size, 100);
        assert_eq!(config.read_timeout, Duration::from_secs(1));
        assert_eq!(config.store.kind, StoreKind::InMemory);
    }

    #[test]
    fn test_builder() {
        let config = PbqConfig::default()
            .with_channel_buffer_size(5)
            .with_read_timeout(Duration::from_millis(250))
            .with_store(StoreConfig::default().with_capacity(42));

        assert_eq!(config.channel_buffer_size, 5);
        assert_eq!(config.read_timeout, Duration::from_millis(250));
        assert_eq!(config.store.capacity, 42);
    }
}
