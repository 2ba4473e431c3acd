//! Structural validation of table descriptors. Validation only inspects the
//! descriptor; every violation is reported as `InvalidArgument`.

use crate::catalog::schema::{IndexDescriptor, MutationDescriptor, TableDescriptor};
use crate::catalog::types::{ColumnId, DescriptorId, IndexId};
use crate::error::SchemaError;
use std::collections::{HashMap, HashSet};

fn invalid(message: String) -> SchemaError {
    SchemaError::InvalidArgument(message)
}

impl TableDescriptor {
    pub fn validate(&self) -> Result<(), SchemaError> {
        self.validate_with_id(DescriptorId::INVALID)
    }

    /// Validates as though the table's ID were `placeholder_id` when it has
    /// not been assigned one yet.
    pub fn validate_with_id(&self, placeholder_id: DescriptorId) -> Result<(), SchemaError> {
        if self.name.is_empty() {
            return Err(invalid("empty table name".into()));
        }
        let id = if self.id.is_valid() {
            self.id
        } else {
            placeholder_id
        };
        if !id.is_valid() {
            return Err(invalid(format!("invalid table ID {}", self.id)));
        }
        if !self.parent_id.is_valid() {
            return Err(invalid(format!("invalid parent ID {}", self.parent_id)));
        }
        if self.columns.is_empty() {
            return Err(invalid(format!(
                "table {:?} must contain at least 1 column",
                self.name
            )));
        }

        let mut column_names: HashMap<&str, ColumnId> = HashMap::new();
        let mut column_ids: HashSet<ColumnId> = HashSet::new();
        let mutation_columns = self.mutations.iter().filter_map(|m| m.column());
        for column in self.columns.iter().chain(mutation_columns) {
            if column.name.is_empty() {
                return Err(invalid("empty column name".into()));
            }
            if !column.id.is_valid() {
                return Err(invalid(format!("invalid column ID {}", column.id)));
            }
            if column_names.insert(&column.name, column.id).is_some() {
                return Err(invalid(format!("duplicate column name: {:?}", column.name)));
            }
            if !column_ids.insert(column.id) {
                return Err(invalid(format!(
                    "column {:?} duplicate ID of column: {}",
                    column.name, column.id
                )));
            }
            if column.id >= self.next_column_id {
                return Err(invalid(format!(
                    "column {:?} invalid ID ({}) >= next column ID ({})",
                    column.name, column.id, self.next_column_id
                )));
            }
        }

        for mutation in &self.mutations {
            if !mutation.mutation_id.is_valid() || mutation.mutation_id > self.next_mutation_id {
                return Err(invalid(format!(
                    "mutation in table {:?} has invalid mutation ID {}",
                    self.name, mutation.mutation_id
                )));
            }
            if let MutationDescriptor::Index(index) = &mutation.descriptor
                && index.name.is_empty()
            {
                return Err(invalid("mutation index has empty name".into()));
            }
        }

        if self.primary_index.column_ids.is_empty() {
            return Err(invalid(format!(
                "table {:?} must contain a primary key",
                self.name
            )));
        }
        if !self.primary_index.unique {
            return Err(invalid(format!(
                "primary index of table {:?} must be unique",
                self.name
            )));
        }

        let mut index_names: HashSet<&str> = HashSet::new();
        let mut index_ids: HashSet<IndexId> = HashSet::new();
        for index in self.all_indexes() {
            if index.name.is_empty() {
                return Err(invalid("empty index name".into()));
            }
            if !index_names.insert(&index.name) {
                return Err(invalid(format!("duplicate index name: {:?}", index.name)));
            }
            if !index.id.is_valid() {
                return Err(invalid(format!("invalid index ID {}", index.id)));
            }
            if !index_ids.insert(index.id) {
                return Err(invalid(format!(
                    "index {:?} duplicate ID of index: {}",
                    index.name, index.id
                )));
            }
            if index.id >= self.next_index_id {
                return Err(invalid(format!(
                    "index {:?} invalid index ID ({}) >= next index ID ({})",
                    index.name, index.id, self.next_index_id
                )));
            }
            self.validate_index_columns(index, &column_names)?;
            validate_index_links(index)?;
        }

        let mut check_names: HashSet<&str> = HashSet::new();
        for check in &self.checks {
            if check.expr.trim().is_empty() {
                return Err(invalid(format!(
                    "empty CHECK expression in table {:?}",
                    self.name
                )));
            }
            if let Some(name) = &check.name
                && !check_names.insert(name)
            {
                return Err(invalid(format!("duplicate constraint name: {name:?}")));
            }
        }

        Ok(())
    }

    fn validate_index_columns(
        &self,
        index: &IndexDescriptor,
        column_names: &HashMap<&str, ColumnId>,
    ) -> Result<(), SchemaError> {
        if index.column_names.is_empty() {
            return Err(invalid(format!("index {:?} must contain at least 1 column", index.name)));
        }
        if index.column_ids.len() != index.column_names.len() {
            return Err(invalid(format!(
                "mismatched column IDs ({}) and names ({}) in index {:?}",
                index.column_ids.len(),
                index.column_names.len(),
                index.name
            )));
        }
        if index.column_directions.len() != index.column_names.len() {
            return Err(invalid(format!(
                "mismatched column directions ({}) and names ({}) in index {:?}",
                index.column_directions.len(),
                index.column_names.len(),
                index.name
            )));
        }
        for (name, id) in index.column_names.iter().zip(&index.column_ids) {
            match column_names.get(name.as_str()) {
                Some(actual) if actual == id => {}
                Some(actual) => {
                    return Err(invalid(format!(
                        "index {:?} column {name:?} should have ID {actual}, but found ID {id}",
                        index.name
                    )));
                }
                None => {
                    return Err(invalid(format!(
                        "index {:?} contains unknown column {name:?}",
                        index.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Checks that every FK and interleave edge touching this table is
    /// mirrored on the other side. `lookup` resolves other tables by ID; the
    /// table itself is consulted directly for self-references.
    pub fn validate_cross_references<F>(&self, lookup: F) -> Result<(), SchemaError>
    where
        F: Fn(DescriptorId) -> Option<TableDescriptor>,
    {
        let resolve = |id: DescriptorId| -> Result<TableDescriptor, SchemaError> {
            if id == self.id {
                return Ok(self.clone());
            }
            lookup(id).ok_or_else(|| invalid(format!("referenced table ID {id} does not exist")))
        };

        for index in self.all_non_drop_indexes() {
            if let Some(fk) = &index.foreign_key {
                let target = resolve(fk.table)?;
                let target_index = target.find_index_by_id(fk.index).ok_or_else(|| {
                    invalid(format!(
                        "foreign key {:?} references missing index {} on table {}",
                        fk.name, fk.index, fk.table
                    ))
                })?;
                let matches = target_index
                    .referenced_by
                    .iter()
                    .filter(|back| back.table == self.id && back.index == index.id)
                    .count();
                if matches != 1 {
                    return Err(invalid(format!(
                        "foreign key {:?} on index {:?} has {matches} matching back-references on {:?}",
                        fk.name, index.name, target.name
                    )));
                }
            }
            for back in &index.referenced_by {
                let source = resolve(back.table)?;
                let forward = source
                    .find_index_by_id(back.index)
                    .and_then(|idx| idx.foreign_key.as_ref());
                match forward {
                    Some(fk) if fk.table == self.id && fk.index == index.id => {}
                    _ => {
                        return Err(invalid(format!(
                            "index {:?} is referenced by table {} index {} which has no matching foreign key",
                            index.name, back.table, back.index
                        )));
                    }
                }
            }
            for ancestor in &index.interleave.ancestors {
                let parent = resolve(ancestor.table_id)?;
                let linked = parent
                    .find_index_by_id(ancestor.index_id)
                    .is_some_and(|idx| {
                        idx.interleaved_by
                            .iter()
                            .any(|r| r.table == self.id && r.index == index.id)
                    });
                if !linked {
                    return Err(invalid(format!(
                        "index {:?} interleaved into table {} index {} without a back-reference",
                        index.name, ancestor.table_id, ancestor.index_id
                    )));
                }
            }
        }
        Ok(())
    }
}

fn validate_index_links(index: &IndexDescriptor) -> Result<(), SchemaError> {
    let shared = index.interleave.total_shared_prefix_len() as usize;
    if shared > index.column_ids.len() {
        return Err(invalid(format!(
            "index {:?} shares {shared} key columns with its ancestors but has only {}",
            index.name,
            index.column_ids.len()
        )));
    }
    if let Some(fk) = &index.foreign_key {
        if !fk.index.is_valid() {
            return Err(invalid(format!(
                "foreign key {:?} on index {:?} has no target index",
                fk.name, index.name
            )));
        }
        if fk.name.is_empty() {
            return Err(invalid(format!(
                "foreign key on index {:?} has an empty name",
                index.name
            )));
        }
    }
    Ok(())
}
