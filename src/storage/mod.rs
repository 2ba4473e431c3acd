//! Contract with the transactional descriptor store.
//!
//! The schema core never persists anything directly: every read and write
//! goes through a [`DescriptorTxn`] bound to the statement's ambient
//! transaction. [`memory::MemoryStore`] is an in-process implementation with
//! optimistic concurrency control.

pub mod memory;

use crate::catalog::schema::TableDescriptor;
use crate::catalog::types::DescriptorId;
use crate::catalog::DatabaseDescriptor;
use crate::error::{ResourceType, SchemaError};
use crate::event_log::EventRecord;
use serde::{Deserialize, Serialize};

/// Namespace entry mapping a name to a descriptor ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DescriptorKey {
    Database { name: String },
    Table { parent_id: DescriptorId, name: String },
}

impl DescriptorKey {
    pub fn database(name: &str) -> Self {
        DescriptorKey::Database {
            name: name.to_string(),
        }
    }

    pub fn table(parent_id: DescriptorId, name: &str) -> Self {
        DescriptorKey::Table {
            parent_id,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DescriptorKey::Database { name } | DescriptorKey::Table { name, .. } => name,
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        match self {
            DescriptorKey::Database { .. } => ResourceType::Database,
            DescriptorKey::Table { .. } => ResourceType::Table,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Descriptor {
    Database(DatabaseDescriptor),
    Table(TableDescriptor),
}

impl Descriptor {
    pub fn id(&self) -> DescriptorId {
        match self {
            Descriptor::Database(db) => db.id,
            Descriptor::Table(table) => table.id,
        }
    }

    pub fn set_id(&mut self, id: DescriptorId) {
        match self {
            Descriptor::Database(db) => db.id = id,
            Descriptor::Table(table) => table.id = id,
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            Descriptor::Database(db) => db.version,
            Descriptor::Table(table) => table.version,
        }
    }

    pub fn set_version(&mut self, version: u64) {
        match self {
            Descriptor::Database(db) => db.version = version,
            Descriptor::Table(table) => table.version = version,
        }
    }

    pub fn into_table(self) -> Option<TableDescriptor> {
        match self {
            Descriptor::Table(table) => Some(table),
            Descriptor::Database(_) => None,
        }
    }

    pub fn into_database(self) -> Option<DatabaseDescriptor> {
        match self {
            Descriptor::Database(db) => Some(db),
            Descriptor::Table(_) => None,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, SchemaError> {
        rmp_serde::to_vec(self).map_err(|e| SchemaError::Encode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SchemaError> {
        rmp_serde::from_slice(bytes).map_err(|e| SchemaError::Decode(e.to_string()))
    }
}

/// Operations the schema core needs from the ambient transaction. Reads see
/// the transaction's own writes. Serialization failures surface as
/// `Aborted`-class errors and are never retried here.
pub trait DescriptorTxn {
    fn get_descriptor_id(&self, key: &DescriptorKey) -> Result<Option<DescriptorId>, SchemaError>;

    fn get_descriptor(&self, id: DescriptorId) -> Result<Option<Descriptor>, SchemaError>;

    /// Draws a fresh cluster-wide descriptor ID.
    fn generate_descriptor_id(&mut self) -> Result<DescriptorId, SchemaError>;

    /// Writes the name key and the descriptor if the key is absent. Returns
    /// `false` without writing when the key already exists.
    fn conditional_create(
        &mut self,
        key: &DescriptorKey,
        desc: &mut Descriptor,
    ) -> Result<bool, SchemaError>;

    /// Overwrites an existing descriptor. `desc.version()` must equal the
    /// version visible to this transaction; on success the new version is
    /// written back into `desc`.
    fn put_descriptor(&mut self, desc: &mut Descriptor) -> Result<(), SchemaError>;

    fn insert_event(&mut self, record: EventRecord) -> Result<(), SchemaError>;

    fn get_database(&self, id: DescriptorId) -> Result<Option<DatabaseDescriptor>, SchemaError> {
        Ok(self.get_descriptor(id)?.and_then(Descriptor::into_database))
    }

    fn get_table(&self, id: DescriptorId) -> Result<Option<TableDescriptor>, SchemaError> {
        Ok(self.get_descriptor(id)?.and_then(Descriptor::into_table))
    }

    fn get_database_by_name(&self, name: &str) -> Result<Option<DatabaseDescriptor>, SchemaError> {
        match self.get_descriptor_id(&DescriptorKey::database(name))? {
            Some(id) => self.get_database(id),
            None => Ok(None),
        }
    }

    fn get_table_by_name(
        &self,
        parent_id: DescriptorId,
        name: &str,
    ) -> Result<Option<TableDescriptor>, SchemaError> {
        match self.get_descriptor_id(&DescriptorKey::table(parent_id, name))? {
            Some(id) => self.get_table(id),
            None => Ok(None),
        }
    }
}
