//! `INTERLEAVE IN PARENT`: placing an index inside the keyspace of a parent
//! table's primary index.

use crate::catalog::schema::{
    IndexDescriptor, InterleaveAncestor, InterleaveDescriptor, InterleaveReference,
    TableDescriptor,
};
use crate::catalog::types::normalize_name;
use crate::ddl::ast::{DropBehavior, InterleaveDef};
use crate::ddl::planner::Planner;
use crate::ddl::publish::TableEdits;
use crate::error::SchemaError;
use crate::storage::DescriptorTxn;
use tracing::debug;

fn parent_mismatch() -> SchemaError {
    SchemaError::InvalidArgument("interleaved columns must match parent".into())
}

fn declared_mismatch() -> SchemaError {
    SchemaError::InvalidArgument("declared columns must match index being interleaved".into())
}

/// Ancestor chain for an index interleaved into `parent`: the parent
/// primary index's own chain plus one entry for the parent, whose shared
/// prefix is whatever the earlier ancestors have not already claimed.
pub fn ancestor_chain(parent: &TableDescriptor) -> InterleaveDescriptor {
    let parent_index = &parent.primary_index;
    let mut ancestors = parent_index.interleave.ancestors.clone();
    let inherited: u32 = ancestors.iter().map(|a| a.shared_prefix_len).sum();
    ancestors.push(InterleaveAncestor {
        table_id: parent.id,
        index_id: parent_index.id,
        shared_prefix_len: (parent_index.column_ids.len() as u32).saturating_sub(inherited),
    });
    InterleaveDescriptor { ancestors }
}

impl<T: DescriptorTxn + ?Sized> Planner<'_, T> {
    /// Validates that `index` of `desc` can be interleaved as declared and
    /// returns its ancestor chain. Nothing is written.
    pub(crate) fn build_interleave(
        &self,
        desc: &TableDescriptor,
        index: &IndexDescriptor,
        interleave: &InterleaveDef,
    ) -> Result<InterleaveDescriptor, SchemaError> {
        if interleave.drop_behavior != DropBehavior::Default {
            return Err(SchemaError::Unsupported(format!(
                "unsupported shorthand {}",
                interleave.drop_behavior
            )));
        }

        let parent = self.must_get_table_desc(&interleave.parent)?;
        let parent_index = &parent.primary_index;

        if interleave.fields.len() != parent_index.column_ids.len() {
            return Err(parent_mismatch());
        }
        if interleave.fields.len() > index.column_ids.len() {
            return Err(declared_mismatch());
        }
        for (i, (field, parent_col_id)) in interleave
            .fields
            .iter()
            .zip(&parent_index.column_ids)
            .enumerate()
        {
            let parent_col = parent
                .find_column_by_id(*parent_col_id)
                .ok_or_else(parent_mismatch)?;
            let col = desc
                .find_column_by_id(index.column_ids[i])
                .ok_or_else(declared_mismatch)?;
            if normalize_name(field) != normalize_name(&col.name) {
                return Err(declared_mismatch());
            }
            if col.col_type != parent_col.col_type
                || index.column_directions.get(i) != parent_index.column_directions.get(i)
            {
                return Err(parent_mismatch());
            }
        }

        Ok(ancestor_chain(&parent))
    }

    /// Adds `interleaved_by` back-references for the given indexes of
    /// `child` to every ancestor. An ancestor that is `child` itself is
    /// edited in place; the others are recorded in `edits`.
    pub(crate) fn link_interleave_back_references(
        &self,
        child: &mut TableDescriptor,
        indexes: &[IndexDescriptor],
        edits: &mut TableEdits,
    ) -> Result<(), SchemaError> {
        let child_id = child.id;
        for index in indexes {
            for ancestor in &index.interleave.ancestors {
                let back = InterleaveReference {
                    table: child_id,
                    index: index.id,
                };
                let ancestor_table = if ancestor.table_id == child_id {
                    &mut *child
                } else {
                    self.edit_table(edits, ancestor.table_id)?
                };
                ancestor_table
                    .find_index_by_id_mut(ancestor.index_id)?
                    .interleaved_by
                    .push(back);
                debug!(
                    child_id = %child_id,
                    ancestor_id = %ancestor.table_id,
                    index = %index.name,
                    "recording interleave back-reference"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ancestor_chain;
    use crate::catalog::schema::{IndexDescriptor, InterleaveAncestor, TableDescriptor};
    use crate::catalog::types::{ColumnId, DescriptorId, IndexId};
    use crate::permission::PrivilegeDescriptor;
    use proptest::prelude::*;

    fn table_with_pk(id: u32, pk_len: usize, ancestors: Vec<InterleaveAncestor>) -> TableDescriptor {
        let mut t = TableDescriptor::new("t", DescriptorId(1), PrivilegeDescriptor::new_default("root"));
        t.id = DescriptorId(id);
        let mut pk = IndexDescriptor::new("primary", true);
        pk.id = IndexId(1);
        pk.column_ids = (1..=pk_len as u32).map(ColumnId).collect();
        pk.interleave.ancestors = ancestors;
        t.primary_index = pk;
        t
    }

    #[test]
    fn direct_child_shares_parent_key() {
        let parent = table_with_pk(60, 1, Vec::new());
        let chain = ancestor_chain(&parent);
        assert_eq!(
            chain.ancestors,
            vec![InterleaveAncestor {
                table_id: DescriptorId(60),
                index_id: IndexId(1),
                shared_prefix_len: 1,
            }]
        );
    }

    proptest! {
        #[test]
        fn chains_telescope(extra_columns in proptest::collection::vec(1usize..4, 1..6)) {
            let mut pk_len = 0;
            let mut table = None::<TableDescriptor>;
            for (depth, extra) in extra_columns.iter().enumerate() {
                pk_len += extra;
                let ancestors = table.as_ref().map(|p| ancestor_chain(p).ancestors).unwrap_or_default();
                let t = table_with_pk(60 + depth as u32, pk_len, ancestors);
                table = Some(t);
            }
            let Some(parent) = table else {
                return Ok(());
            };
            let chain = ancestor_chain(&parent);
            prop_assert_eq!(chain.ancestors.len(), parent.primary_index.interleave.ancestors.len() + 1);
            prop_assert_eq!(chain.total_shared_prefix_len() as usize, pk_len);
            prop_assert!(chain.ancestors.iter().all(|a| a.shared_prefix_len > 0));
        }
    }
}
