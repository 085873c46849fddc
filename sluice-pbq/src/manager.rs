//! Partition registry and queue lifecycle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sluice_core::PartitionId;
use tracing::{debug, info};

use crate::config::PbqConfig;
use crate::error::{PbqError, PbqResult};
use crate::pbq::Pbq;

/// The shared partition map. Queues hold a weak reference back to it so
/// garbage collection can deregister without keeping the registry (or
/// the manager) alive.
pub(crate) struct Registry {
    partitions: Mutex<HashMap<PartitionId, Arc<Pbq>>>,
}

impl Registry {
    fn new() -> Self {
        Self {
            partitions: Mutex::new(HashMap::new()),
        }
    }

    fn contains(&self, partition_id: &PartitionId) -> bool {
        self.lock().contains_key(partition_id)
    }

    /// Inserts unless the partition appeared concurrently. Returns the
    /// inserted queue, or an error carrying the id back.
    fn try_insert(&self, partition_id: PartitionId, pbq: Arc<Pbq>) -> PbqResult<Arc<Pbq>> {
        let mut partitions = self.lock();
        if partitions.contains_key(&partition_id) {
            return Err(PbqError::PartitionExists { partition_id });
        }
        partitions.insert(partition_id, Arc::clone(&pbq));
        Ok(pbq)
    }

    fn get(&self, partition_id: &PartitionId) -> Option<Arc<Pbq>> {
        self.lock().get(partition_id).cloned()
    }

    pub(crate) fn remove(&self, partition_id: &PartitionId) -> bool {
        self.lock().remove(partition_id).is_some()
    }

    fn snapshot(&self) -> Vec<Arc<Pbq>> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PartitionId, Arc<Pbq>>> {
        self.partitions.lock().expect("partition registry poisoned")
    }
}

/// Creates and tracks one [`Pbq`] per active partition.
///
/// Cloning the manager is cheap and every clone shares the same
/// registry.
#[derive(Clone)]
pub struct PbqManager {
    config: PbqConfig,
    registry: Arc<Registry>,
}

impl PbqManager {
    /// Creates a manager with no registered partitions.
    #[must_use]
    pub fn new(config: PbqConfig) -> Self {
        Self {
            config,
            registry: Arc::new(Registry::new()),
        }
    }

    /// Creates and registers a queue for a new partition.
    ///
    /// # Errors
    ///
    /// [`PbqError::PartitionExists`] if the partition is already
    /// registered, or a store construction failure.
    pub async fn create(&self, partition_id: PartitionId) -> PbqResult<Arc<Pbq>> {
        // Fail fast before building a store the registry would reject.
        if self.registry.contains(&partition_id) {
            return Err(PbqError::PartitionExists { partition_id });
        }

        let store = self.config.store.build(partition_id.clone()).await?;
        let pbq = Arc::new(Pbq::new(
            partition_id.clone(),
            store,
            self.config.channel_buffer_size,
            self.config.read_timeout,
            Arc::downgrade(&self.registry),
        ));

        let pbq = self.registry.try_insert(partition_id.clone(), pbq)?;
        info!(partition_id = %partition_id, "Created partition buffer queue");
        Ok(pbq)
    }

    /// Looks up the queue for a partition, if registered.
    #[must_use]
    pub fn get(&self, partition_id: &PartitionId) -> Option<Arc<Pbq>> {
        self.registry.get(partition_id)
    }

    /// Removes a partition from the registry without touching its
    /// store. Prefer [`Pbq::gc`] for the full teardown; this exists for
    /// abandoning a partition whose consumer never completed. A missing
    /// partition is a no-op.
    pub fn deregister(&self, partition_id: &PartitionId) {
        if self.registry.remove(partition_id) {
            debug!(partition_id = %partition_id, "Deregistered partition");
        }
    }

    /// Snapshot of every registered queue, in no particular order.
    #[must_use]
    pub fn partitions(&self) -> Vec<Arc<Pbq>> {
        self.registry.snapshot()
    }

    /// The configuration queues are created with.
    #[must_use]
    pub const fn config(&self) -> &PbqConfig {
        &self.config
    }
}

impl std::fmt::Debug for PbqManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PbqManager")
            .field("config", &self.config)
            .field("partitions", &self.registry.lock().len())
            .finish()
    }
}
