//! Descriptor model: databases, tables, columns, indexes and the pending
//! mutations queued against them.

pub mod allocate;
pub mod database;
pub mod mutation;
pub mod schema;
pub mod types;
pub mod validate;

use crate::catalog::schema::{
    ColumnDescriptor, IndexDescriptor, MutationDirection, PRIMARY_INDEX_NAME, TableDescriptor,
};
use crate::catalog::types::{ColumnId, DescriptorId, IndexId, MutationId, TableState};
use crate::error::{ResourceType, SchemaError};
use crate::permission::PrivilegeDescriptor;

pub use database::DatabaseDescriptor;

/// Where an index name was found on a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexLookup {
    Primary,
    /// Position in `TableDescriptor::indexes`.
    Public(usize),
    /// Position in `TableDescriptor::mutations`; the index is not yet (or no
    /// longer) fully materialized.
    Mutation(usize),
}

impl TableDescriptor {
    pub fn new(name: &str, parent_id: DescriptorId, privileges: PrivilegeDescriptor) -> Self {
        Self {
            id: DescriptorId::INVALID,
            name: name.to_string(),
            parent_id,
            version: 0,
            columns: Vec::new(),
            next_column_id: ColumnId::INVALID,
            primary_index: IndexDescriptor::default(),
            indexes: Vec::new(),
            next_index_id: IndexId::INVALID,
            checks: Vec::new(),
            mutations: Vec::new(),
            next_mutation_id: MutationId::INVALID,
            state: TableState::Public,
            privileges,
        }
    }

    pub fn add_column(&mut self, column: ColumnDescriptor) {
        self.columns.push(column);
    }

    /// Installs `index` as the primary index or appends it as a secondary
    /// index.
    pub fn add_index(&mut self, mut index: IndexDescriptor, primary: bool) -> Result<(), SchemaError> {
        if primary {
            if !self.primary_index.column_names.is_empty() {
                return Err(SchemaError::InvalidArgument(format!(
                    "multiple primary keys for table {:?} are not allowed",
                    self.name
                )));
            }
            index.name = PRIMARY_INDEX_NAME.to_string();
            index.unique = true;
            self.primary_index = index;
        } else {
            self.indexes.push(index);
        }
        Ok(())
    }

    pub fn find_column_by_name(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn find_column_by_id(&self, id: ColumnId) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Looks up a live column, failing with `NotFound` otherwise.
    pub fn find_active_column_by_name(&self, name: &str) -> Result<&ColumnDescriptor, SchemaError> {
        self.find_column_by_name(name)
            .ok_or_else(|| SchemaError::not_found(ResourceType::Column, name))
    }

    pub fn find_index_by_name(&self, name: &str) -> Option<IndexLookup> {
        if self.primary_index.name == name {
            return Some(IndexLookup::Primary);
        }
        if let Some(pos) = self.indexes.iter().position(|idx| idx.name == name) {
            return Some(IndexLookup::Public(pos));
        }
        self.mutations
            .iter()
            .position(|m| m.index().is_some_and(|idx| idx.name == name))
            .map(IndexLookup::Mutation)
    }

    pub fn find_index_by_id(&self, id: IndexId) -> Option<&IndexDescriptor> {
        if self.primary_index.id == id {
            return Some(&self.primary_index);
        }
        self.indexes
            .iter()
            .find(|idx| idx.id == id)
            .or_else(|| {
                self.mutations
                    .iter()
                    .filter_map(|m| m.index())
                    .find(|idx| idx.id == id)
            })
    }

    pub fn find_index_by_id_mut(&mut self, id: IndexId) -> Result<&mut IndexDescriptor, SchemaError> {
        if self.primary_index.id == id {
            return Ok(&mut self.primary_index);
        }
        if let Some(pos) = self.indexes.iter().position(|idx| idx.id == id) {
            return Ok(&mut self.indexes[pos]);
        }
        let table = self.name.clone();
        self.mutations
            .iter_mut()
            .filter_map(|m| m.index_mut())
            .find(|idx| idx.id == id)
            .ok_or_else(|| SchemaError::not_found(ResourceType::Index, format!("{table}@{id}")))
    }

    /// Primary, secondary, and indexes being added; excludes indexes queued
    /// for removal.
    pub fn all_non_drop_indexes(&self) -> Vec<&IndexDescriptor> {
        let mut out = Vec::with_capacity(1 + self.indexes.len());
        out.push(&self.primary_index);
        out.extend(self.indexes.iter());
        out.extend(
            self.mutations
                .iter()
                .filter(|m| m.direction == MutationDirection::Add)
                .filter_map(|m| m.index()),
        );
        out
    }

    /// Every index the descriptor owns, live or pending.
    pub(crate) fn all_indexes(&self) -> impl Iterator<Item = &IndexDescriptor> {
        std::iter::once(&self.primary_index)
            .chain(self.indexes.iter())
            .chain(self.mutations.iter().filter_map(|m| m.index()))
    }

    pub fn is_dropped(&self) -> bool {
        self.state == TableState::Drop
    }

    /// Checks that a new version of this descriptor may be written.
    pub fn set_up_version(&self) -> Result<(), SchemaError> {
        if self.is_dropped() {
            return Err(SchemaError::NotFound {
                resource_type: ResourceType::Table,
                name: format!("{} (being dropped)", self.name),
            });
        }
        Ok(())
    }
}
