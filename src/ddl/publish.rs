//! Transactional writes of descriptors produced by the DDL plan nodes.

use crate::catalog::schema::TableDescriptor;
use crate::catalog::types::DescriptorId;
use crate::ddl::planner::Planner;
use crate::error::SchemaError;
use crate::storage::{Descriptor, DescriptorKey, DescriptorTxn};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tracing::{debug, info};

/// Edited copies of the other tables a statement touches, keyed by ID.
/// Every back-reference edit of a statement lands here so each table is
/// written once.
pub(crate) type TableEdits = BTreeMap<DescriptorId, TableDescriptor>;

impl<T: DescriptorTxn + ?Sized> Planner<'_, T> {
    /// Allocates an ID for `desc` and creates it under `key` if the key is
    /// free. Returns `false` when the key is taken and `if_not_exists` was
    /// requested; fails with `AlreadyExists` otherwise.
    pub(crate) fn create_descriptor(
        &mut self,
        key: DescriptorKey,
        desc: &mut Descriptor,
        if_not_exists: bool,
    ) -> Result<bool, SchemaError> {
        if self.txn.get_descriptor_id(&key)?.is_some() {
            if if_not_exists {
                return Ok(false);
            }
            return Err(SchemaError::already_exists(key.resource_type(), key.name()));
        }

        let id = self.txn.generate_descriptor_id()?;
        desc.set_id(id);
        match desc {
            Descriptor::Database(db) => db.validate(&self.config.root_user)?,
            Descriptor::Table(table) => table.validate()?,
        }

        if !self.txn.conditional_create(&key, desc)? {
            if if_not_exists {
                return Ok(false);
            }
            return Err(SchemaError::already_exists(key.resource_type(), key.name()));
        }
        info!(
            descriptor_id = %id,
            kind = %key.resource_type(),
            name = key.name(),
            "created descriptor"
        );
        Ok(true)
    }

    /// Writes `table` at its current version and records the new version on
    /// it.
    pub(crate) fn write_table_desc(&mut self, table: &mut TableDescriptor) -> Result<(), SchemaError> {
        let mut wrapped = Descriptor::Table(table.clone());
        self.txn.put_descriptor(&mut wrapped)?;
        table.version = wrapped.version();
        debug!(
            table_id = %table.id,
            version = table.version,
            "wrote table descriptor"
        );
        Ok(())
    }

    /// The working copy of table `id` in `edits`, read from the transaction
    /// on first use.
    pub(crate) fn edit_table<'e>(
        &self,
        edits: &'e mut TableEdits,
        id: DescriptorId,
    ) -> Result<&'e mut TableDescriptor, SchemaError> {
        match edits.entry(id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(self.get_table_desc_by_id(id)?)),
        }
    }

    pub(crate) fn save_table_edits(&mut self, edits: TableEdits) -> Result<(), SchemaError> {
        for (_, mut table) in edits {
            self.save_nonmutation_and_notify(&mut table)?;
        }
        Ok(())
    }

    /// Persists a table change that completes synchronously (no queued
    /// mutation) and schedules a lease-refresh notice for it.
    pub(crate) fn save_nonmutation_and_notify(
        &mut self,
        table: &mut TableDescriptor,
    ) -> Result<(), SchemaError> {
        table.set_up_version()?;
        table.validate()?;
        self.write_table_desc(table)?;
        self.notify_schema_change(table.id, None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::DatabaseDescriptor;
    use crate::config::SchemaConfig;
    use crate::ddl::planner::{Planner, Session};
    use crate::error::{ErrorClass, ResourceType};
    use crate::storage::memory::MemoryStore;
    use crate::storage::{Descriptor, DescriptorKey};

    #[test]
    fn create_descriptor_honors_if_not_exists() {
        let config = SchemaConfig::default();
        let store = MemoryStore::new(&config);
        let mut txn = store.begin();
        let session = Session::new("root");
        let mut planner = Planner::new(&mut txn, &session, &config);

        let mut first = Descriptor::Database(DatabaseDescriptor::new("d", "root"));
        assert!(
            planner
                .create_descriptor(DescriptorKey::database("d"), &mut first, false)
                .expect("create")
        );
        assert_eq!(first.id(), config.first_user_descriptor_id());
        assert_eq!(first.version(), 1);

        let mut again = Descriptor::Database(DatabaseDescriptor::new("d", "root"));
        assert!(
            !planner
                .create_descriptor(DescriptorKey::database("d"), &mut again, true)
                .expect("if not exists")
        );
        let err = planner
            .create_descriptor(DescriptorKey::database("d"), &mut again, false)
            .expect_err("exists");
        assert_eq!(err.class(), ErrorClass::Conflict);
        assert!(matches!(
            err,
            crate::error::SchemaError::AlreadyExists {
                resource_type: ResourceType::Database,
                ..
            }
        ));
    }
}
