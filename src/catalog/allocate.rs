//! Table-scoped ID allocation: column IDs, index IDs and names, and the
//! column-name to column-ID resolution of every index.
//!
//! Descriptor IDs themselves are cluster-scoped and come from the store when
//! the descriptor is created; see `ddl::publish::create_descriptor`.

use crate::catalog::schema::{IndexDescriptor, PRIMARY_INDEX_NAME, TableDescriptor};
use crate::catalog::types::{ColumnId, DescriptorId, IndexId, MutationId};
use crate::error::SchemaError;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
enum IndexSlot {
    Primary,
    Secondary(usize),
    Mutation(usize),
}

impl TableDescriptor {
    fn index_slots(&self) -> Vec<IndexSlot> {
        let mut slots = vec![IndexSlot::Primary];
        slots.extend((0..self.indexes.len()).map(IndexSlot::Secondary));
        slots.extend(
            self.mutations
                .iter()
                .enumerate()
                .filter(|(_, m)| m.index().is_some())
                .map(|(i, _)| IndexSlot::Mutation(i)),
        );
        slots
    }

    fn index_at_mut(&mut self, slot: IndexSlot) -> Option<&mut IndexDescriptor> {
        match slot {
            IndexSlot::Primary => Some(&mut self.primary_index),
            IndexSlot::Secondary(i) => self.indexes.get_mut(i),
            IndexSlot::Mutation(i) => self.mutations.get_mut(i).and_then(|m| m.index_mut()),
        }
    }

    /// `<table>_<cols>_key` for unique indexes, `<table>_<cols>_idx`
    /// otherwise, with a numeric suffix when the name is taken.
    fn allocate_index_name(&self, index: &IndexDescriptor) -> String {
        let mut segments = vec![self.name.as_str()];
        segments.extend(index.column_names.iter().map(String::as_str));
        segments.push(if index.unique { "key" } else { "idx" });
        let base = segments.join("_");
        let mut name = base.clone();
        let mut suffix = 1;
        while self.find_index_by_name(&name).is_some() {
            name = format!("{base}{suffix}");
            suffix += 1;
        }
        name
    }

    /// Assigns IDs to every column and index that lacks one, resolves index
    /// column names, then validates the result. A table that has not been
    /// created yet is validated as if it had `placeholder_id`.
    pub fn allocate_ids(&mut self, placeholder_id: DescriptorId) -> Result<(), SchemaError> {
        if !self.next_column_id.is_valid() {
            self.next_column_id = ColumnId(1);
        }
        if !self.next_index_id.is_valid() {
            self.next_index_id = IndexId(1);
        }
        if !self.next_mutation_id.is_valid() {
            self.next_mutation_id = MutationId(1);
        }

        let mut next_column = self.next_column_id.0;
        let mut assign = |id: &mut ColumnId| {
            if !id.is_valid() {
                *id = ColumnId(next_column);
                next_column += 1;
            }
        };
        for column in &mut self.columns {
            assign(&mut column.id);
        }
        for mutation in &mut self.mutations {
            if let crate::catalog::schema::MutationDescriptor::Column(column) =
                &mut mutation.descriptor
            {
                assign(&mut column.id);
            }
        }
        self.next_column_id = ColumnId(next_column);

        let column_ids: HashMap<String, ColumnId> = self
            .columns
            .iter()
            .chain(self.mutations.iter().filter_map(|m| m.column()))
            .map(|c| (c.name.clone(), c.id))
            .collect();

        if self.primary_index.name.is_empty() {
            self.primary_index.name = PRIMARY_INDEX_NAME.to_string();
        }

        for slot in self.index_slots() {
            let needs_name = self
                .index_at_mut(slot)
                .is_some_and(|index| index.name.is_empty());
            if needs_name {
                let name = match slot {
                    IndexSlot::Primary => PRIMARY_INDEX_NAME.to_string(),
                    _ => {
                        let Some(index) = self.index_at_mut(slot) else {
                            continue;
                        };
                        let index = index.clone();
                        self.allocate_index_name(&index)
                    }
                };
                if let Some(index) = self.index_at_mut(slot) {
                    index.name = name;
                }
            }

            let mut next_index = self.next_index_id;
            let table_name = self.name.clone();
            let Some(index) = self.index_at_mut(slot) else {
                continue;
            };
            if !index.id.is_valid() {
                index.id = next_index;
                next_index = IndexId(next_index.0 + 1);
            }
            if index.column_ids.len() != index.column_names.len() {
                let mut ids = Vec::with_capacity(index.column_names.len());
                for name in &index.column_names {
                    let id = column_ids.get(name).ok_or_else(|| {
                        SchemaError::InvalidArgument(format!(
                            "index {:?} contains unknown column {name:?} of table {table_name:?}",
                            index.name
                        ))
                    })?;
                    ids.push(*id);
                }
                index.column_ids = ids;
            }
            for stored in &index.store_column_names {
                if !column_ids.contains_key(stored) {
                    return Err(SchemaError::InvalidArgument(format!(
                        "index {:?} stores unknown column {stored:?} of table {table_name:?}",
                        index.name
                    )));
                }
            }
            self.next_index_id = next_index;
        }

        let primary_ids = self.primary_index.column_ids.clone();
        for slot in self.index_slots() {
            if matches!(slot, IndexSlot::Primary) {
                continue;
            }
            if let Some(index) = self.index_at_mut(slot) {
                index.extra_column_ids = primary_ids
                    .iter()
                    .copied()
                    .filter(|id| !index.column_ids.contains(id))
                    .collect();
            }
        }

        self.validate_with_id(placeholder_id)
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::schema::{
        ColumnDescriptor, IndexDescriptor, MutationDirection, TableDescriptor,
    };
    use crate::catalog::types::{ColumnId, ColumnType, DescriptorId, IndexDirection, IndexId};
    use crate::permission::PrivilegeDescriptor;

    fn table() -> TableDescriptor {
        let mut t = TableDescriptor::new(
            "orders",
            DescriptorId(50),
            PrivilegeDescriptor::new_default("root"),
        );
        t.add_column(ColumnDescriptor::new("id", ColumnType::int(), false));
        t.add_column(ColumnDescriptor::new("customer", ColumnType::int(), true));
        t.add_column(ColumnDescriptor::new("total", ColumnType::int(), true));
        let mut pk = IndexDescriptor::new("", true);
        pk.fill_columns([("id", IndexDirection::Asc)]);
        t.add_index(pk, true).expect("primary");
        t
    }

    #[test]
    fn assigns_ids_in_declaration_order() {
        let mut t = table();
        let mut by_customer = IndexDescriptor::new("", false);
        by_customer.fill_columns([("customer", IndexDirection::Desc)]);
        t.add_index(by_customer, false).expect("secondary");
        t.allocate_ids(DescriptorId(50)).expect("allocate");

        let ids: Vec<ColumnId> = t.columns.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![ColumnId(1), ColumnId(2), ColumnId(3)]);
        assert_eq!(t.next_column_id, ColumnId(4));
        assert_eq!(t.primary_index.id, IndexId(1));
        assert_eq!(t.primary_index.name, "primary");
        assert_eq!(t.indexes[0].id, IndexId(2));
        assert_eq!(t.indexes[0].name, "orders_customer_idx");
        assert_eq!(t.indexes[0].column_ids, vec![ColumnId(2)]);
        assert_eq!(t.indexes[0].extra_column_ids, vec![ColumnId(1)]);
        assert_eq!(t.next_index_id, IndexId(3));
    }

    #[test]
    fn allocation_is_stable_across_calls() {
        let mut t = table();
        t.allocate_ids(DescriptorId(50)).expect("allocate");
        let mut pending = IndexDescriptor::new("", true);
        pending.fill_columns([("total", IndexDirection::Asc)]);
        t.add_index_mutation(pending, MutationDirection::Add);
        t.allocate_ids(DescriptorId(50)).expect("allocate again");

        assert_eq!(t.primary_index.id, IndexId(1));
        let pending = t.mutations[0].index().expect("index mutation");
        assert_eq!(pending.id, IndexId(2));
        assert_eq!(pending.name, "orders_total_key");
    }

    #[test]
    fn generated_names_avoid_collisions() {
        let mut t = table();
        for _ in 0..2 {
            let mut idx = IndexDescriptor::new("", false);
            idx.fill_columns([("total", IndexDirection::Asc)]);
            t.add_index(idx, false).expect("secondary");
        }
        t.allocate_ids(DescriptorId(50)).expect("allocate");
        assert_eq!(t.indexes[0].name, "orders_total_idx");
        assert_eq!(t.indexes[1].name, "orders_total_idx1");
    }

    #[test]
    fn unknown_index_column_is_rejected() {
        let mut t = table();
        let mut idx = IndexDescriptor::new("bad", false);
        idx.fill_columns([("nope", IndexDirection::Asc)]);
        t.add_index(idx, false).expect("secondary");
        let err = t.allocate_ids(DescriptorId(50)).expect_err("unknown column");
        assert!(err.to_string().contains("unknown column \"nope\""));
    }
}
