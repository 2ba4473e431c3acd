//! Mutation queue for schema changes that complete asynchronously.
//!
//! A statement appends one or more mutations stamped with the table's pending
//! `next_mutation_id`, then calls [`TableDescriptor::finalize_mutation`] to
//! freeze that ID and advance the counter. After commit the external
//! coordinator drives each mutation to completion and applies
//! [`TableDescriptor::make_mutation_complete`].

use crate::catalog::IndexLookup;
use crate::catalog::schema::{
    ColumnDescriptor, DescriptorMutation, IndexDescriptor, MutationDescriptor, MutationDirection,
    MutationState, TableDescriptor,
};
use crate::catalog::types::MutationId;
use crate::error::{ResourceType, SchemaError};

impl TableDescriptor {
    fn pending_mutation_id(&mut self) -> MutationId {
        if !self.next_mutation_id.is_valid() {
            self.next_mutation_id = MutationId(1);
        }
        self.next_mutation_id
    }

    fn push_mutation(&mut self, descriptor: MutationDescriptor, direction: MutationDirection) {
        let mutation_id = self.pending_mutation_id();
        let state = match direction {
            MutationDirection::Add => MutationState::DeleteOnly,
            MutationDirection::Drop => MutationState::WriteOnly,
        };
        self.mutations.push(DescriptorMutation {
            descriptor,
            direction,
            mutation_id,
            state,
        });
    }

    pub fn add_index_mutation(&mut self, index: IndexDescriptor, direction: MutationDirection) {
        self.push_mutation(MutationDescriptor::Index(index), direction);
    }

    pub fn add_column_mutation(&mut self, column: ColumnDescriptor, direction: MutationDirection) {
        self.push_mutation(MutationDescriptor::Column(column), direction);
    }

    /// Freezes the ID shared by the mutations queued since the last call and
    /// returns it.
    pub fn finalize_mutation(&mut self) -> Result<MutationId, SchemaError> {
        self.set_up_version()?;
        let mutation_id = self.pending_mutation_id();
        self.next_mutation_id = MutationId(mutation_id.0 + 1);
        Ok(mutation_id)
    }

    /// Moves a live secondary index into a `Drop` mutation. The index stays
    /// addressable by name until the coordinator completes the drop.
    pub fn queue_index_drop(&mut self, name: &str) -> Result<MutationId, SchemaError> {
        match self.find_index_by_name(name) {
            Some(IndexLookup::Public(pos)) => {
                let index = self.indexes.remove(pos);
                self.add_index_mutation(index, MutationDirection::Drop);
                self.finalize_mutation()
            }
            Some(IndexLookup::Primary) => Err(SchemaError::InvalidArgument(format!(
                "index {name:?} is the primary index of {:?}",
                self.name
            ))),
            Some(IndexLookup::Mutation(_)) => Err(SchemaError::Conflict(format!(
                "index {name:?} is in the middle of being added or dropped, try again later"
            ))),
            None => Err(SchemaError::not_found(ResourceType::Index, name)),
        }
    }

    /// Applies every mutation with `mutation_id`: additions become live,
    /// drops disappear. Returns how many mutations were consumed.
    pub fn make_mutation_complete(&mut self, mutation_id: MutationId) -> usize {
        let (done, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.mutations)
            .into_iter()
            .partition(|m| m.mutation_id == mutation_id);
        self.mutations = pending;
        for mutation in &done {
            if mutation.direction == MutationDirection::Drop {
                continue;
            }
            match &mutation.descriptor {
                MutationDescriptor::Index(index) => self.indexes.push(index.clone()),
                MutationDescriptor::Column(column) => self.columns.push(column.clone()),
            }
        }
        done.len()
    }

    /// IDs of mutations still waiting on the coordinator, in queue order.
    pub fn pending_mutation_ids(&self) -> Vec<MutationId> {
        let mut ids: Vec<MutationId> = self.mutations.iter().map(|m| m.mutation_id).collect();
        ids.dedup();
        ids
    }
}
