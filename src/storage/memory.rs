use crate::catalog::types::DescriptorId;
use crate::config::SchemaConfig;
use crate::error::SchemaError;
use crate::event_log::EventRecord;
use crate::storage::{Descriptor, DescriptorKey, DescriptorTxn};
use im::{HashMap, Vector};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Clone)]
struct StoredDescriptor {
    version: u64,
    bytes: Arc<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    names: HashMap<DescriptorKey, DescriptorId>,
    descriptors: HashMap<DescriptorId, StoredDescriptor>,
    events: Vector<EventRecord>,
    commit_seq: u64,
}

/// In-memory descriptor store with snapshot reads and optimistic,
/// first-committer-wins writes.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
    next_id: Arc<AtomicU32>,
}

impl MemoryStore {
    pub fn new(config: &SchemaConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            next_id: Arc::new(AtomicU32::new(config.first_user_descriptor_id().0)),
        }
    }

    pub fn begin(&self) -> MemoryTxn {
        let snapshot = self.state.lock().clone();
        MemoryTxn {
            store: self.clone(),
            snapshot,
            staged_names: BTreeMap::new(),
            staged: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    /// Reads the committed descriptor, outside any transaction.
    pub fn get_descriptor(&self, id: DescriptorId) -> Result<Option<Descriptor>, SchemaError> {
        let stored = self.state.lock().descriptors.get(&id).cloned();
        stored.map(|s| Descriptor::decode(&s.bytes)).transpose()
    }

    pub fn get_descriptor_id(&self, key: &DescriptorKey) -> Option<DescriptorId> {
        self.state.lock().names.get(key).copied()
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.state.lock().events.iter().cloned().collect()
    }

    pub fn commit_seq(&self) -> u64 {
        self.state.lock().commit_seq
    }
}

#[derive(Debug, Clone)]
struct StagedDescriptor {
    /// Committed version this transaction read before its first write;
    /// `None` for descriptors created by this transaction.
    base_version: Option<u64>,
    desc: Descriptor,
}

/// A snapshot transaction over [`MemoryStore`]. Dropping it without calling
/// [`MemoryTxn::commit`] discards every staged write.
#[derive(Debug)]
pub struct MemoryTxn {
    store: MemoryStore,
    snapshot: StoreState,
    staged_names: BTreeMap<DescriptorKey, DescriptorId>,
    staged: BTreeMap<DescriptorId, StagedDescriptor>,
    events: Vec<EventRecord>,
}

impl MemoryTxn {
    fn visible_version(&self, id: DescriptorId) -> Option<u64> {
        if let Some(staged) = self.staged.get(&id) {
            return Some(staged.desc.version());
        }
        self.snapshot.descriptors.get(&id).map(|s| s.version)
    }

    /// Number of descriptors this transaction has written so far.
    pub fn staged_descriptor_count(&self) -> usize {
        self.staged.len()
    }

    /// Validates the transaction against concurrent commits and applies it
    /// atomically. Fails with `Aborted` if any name key it created now exists
    /// or any descriptor it wrote changed since the snapshot.
    pub fn commit(self) -> Result<u64, SchemaError> {
        let mut encoded = Vec::with_capacity(self.staged.len());
        for (id, staged) in &self.staged {
            encoded.push((*id, staged, Arc::new(staged.desc.encode()?)));
        }

        let mut state = self.store.state.lock();
        for (key, id) in &self.staged_names {
            if let Some(existing) = state.names.get(key)
                && existing != id
            {
                return Err(SchemaError::Aborted(format!(
                    "{} {:?} was created by a concurrent transaction",
                    key.resource_type(),
                    key.name()
                )));
            }
        }
        for (id, staged, _) in &encoded {
            let current = state.descriptors.get(id).map(|s| s.version);
            if current != staged.base_version {
                return Err(SchemaError::Aborted(format!(
                    "descriptor {id} changed since it was read (read version {:?}, current {:?})",
                    staged.base_version, current
                )));
            }
        }

        for (key, id) in self.staged_names {
            state.names.insert(key, id);
        }
        for (id, staged, bytes) in encoded {
            state.descriptors.insert(
                id,
                StoredDescriptor {
                    version: staged.desc.version(),
                    bytes,
                },
            );
        }
        state.events.extend(self.events);
        state.commit_seq += 1;
        Ok(state.commit_seq)
    }
}

impl DescriptorTxn for MemoryTxn {
    fn get_descriptor_id(&self, key: &DescriptorKey) -> Result<Option<DescriptorId>, SchemaError> {
        if let Some(id) = self.staged_names.get(key) {
            return Ok(Some(*id));
        }
        Ok(self.snapshot.names.get(key).copied())
    }

    fn get_descriptor(&self, id: DescriptorId) -> Result<Option<Descriptor>, SchemaError> {
        if let Some(staged) = self.staged.get(&id) {
            return Ok(Some(staged.desc.clone()));
        }
        self.snapshot
            .descriptors
            .get(&id)
            .map(|s| Descriptor::decode(&s.bytes))
            .transpose()
    }

    fn generate_descriptor_id(&mut self) -> Result<DescriptorId, SchemaError> {
        let id = self.store.next_id.fetch_add(1, Ordering::SeqCst);
        if id == u32::MAX {
            return Err(SchemaError::Aborted("descriptor ID space exhausted".into()));
        }
        Ok(DescriptorId(id))
    }

    fn conditional_create(
        &mut self,
        key: &DescriptorKey,
        desc: &mut Descriptor,
    ) -> Result<bool, SchemaError> {
        if self.get_descriptor_id(key)?.is_some() {
            return Ok(false);
        }
        let id = desc.id();
        if !id.is_valid() {
            return Err(SchemaError::InvalidArgument(format!(
                "cannot create {} {:?} without an ID",
                key.resource_type(),
                key.name()
            )));
        }
        desc.set_version(1);
        self.staged_names.insert(key.clone(), id);
        self.staged.insert(
            id,
            StagedDescriptor {
                base_version: None,
                desc: desc.clone(),
            },
        );
        Ok(true)
    }

    fn put_descriptor(&mut self, desc: &mut Descriptor) -> Result<(), SchemaError> {
        let id = desc.id();
        let Some(current) = self.visible_version(id) else {
            return Err(SchemaError::InvalidArgument(format!(
                "descriptor {id} does not exist"
            )));
        };
        if desc.version() != current {
            return Err(SchemaError::StaleDescriptor {
                id,
                attempted: desc.version(),
                current,
            });
        }
        // One version bump per transaction, however many times it writes.
        let base_version = match self.staged.get(&id) {
            Some(staged) => staged.base_version,
            None => {
                desc.set_version(current + 1);
                Some(current)
            }
        };
        self.staged.insert(
            id,
            StagedDescriptor {
                base_version,
                desc: desc.clone(),
            },
        );
        Ok(())
    }

    fn insert_event(&mut self, record: EventRecord) -> Result<(), SchemaError> {
        self.events.push(record);
        Ok(())
    }
}
