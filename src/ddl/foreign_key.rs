//! Column-level foreign keys.
//!
//! Resolution happens before the referencing table has its real ID, so it
//! runs in two passes. [`Planner::resolve_column_fk`] attaches the forward
//! reference to the source index and returns a [`PendingBackReference`];
//! once the table is created, [`Planner::link_fk_back_references`] adds the
//! matching `referenced_by` entries to the targets.

use crate::catalog::schema::{ForeignKeyReference, TableDescriptor};
use crate::catalog::types::{ColumnId, DescriptorId, IndexId, TableState};
use crate::ddl::ast::ColumnReference;
use crate::ddl::planner::Planner;
use crate::ddl::publish::TableEdits;
use crate::error::{ResourceType, SchemaError};
use crate::storage::DescriptorTxn;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackReferenceTarget {
    /// The table being created references itself.
    SelfTable,
    Table(DescriptorId),
}

/// Back-reference still to be written on a referenced table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBackReference {
    pub source_index: IndexId,
    pub target: BackReferenceTarget,
    pub target_index: IndexId,
    pub name: String,
}

fn invalid(message: String) -> SchemaError {
    SchemaError::InvalidArgument(message)
}

/// Picks the unique index of `target` that a foreign key onto `column` must
/// reference.
fn find_target_index(
    target: &TableDescriptor,
    column: ColumnId,
    column_name: &str,
) -> Result<IndexId, SchemaError> {
    if target.primary_index.column_ids == [column] {
        return Ok(target.primary_index.id);
    }
    let mut eligible = target
        .indexes
        .iter()
        .filter(|idx| idx.unique && idx.column_ids == [column]);
    match (eligible.next(), eligible.next()) {
        (Some(idx), None) => Ok(idx.id),
        (None, _) => Err(invalid(format!(
            "foreign key requires a unique index on {}.{column_name}",
            target.name
        ))),
        (Some(_), Some(_)) => Err(invalid(format!(
            "foreign key reference to {}.{column_name} is ambiguous: more than one unique index on it",
            target.name
        ))),
    }
}

impl<T: DescriptorTxn + ?Sized> Planner<'_, T> {
    /// First pass: validates the reference declared on `from_col` and links
    /// the source index to the target's unique index. Marks `table` as
    /// `Add` until its back-references are saved.
    pub(crate) fn resolve_column_fk(
        &self,
        table: &mut TableDescriptor,
        from_col: &str,
        reference: &ColumnReference,
    ) -> Result<PendingBackReference, SchemaError> {
        let src = table.find_active_column_by_name(from_col)?.clone();

        let target_name = self.normalize_table_name(&reference.table)?;
        let (target, target_kind) = match self.get_table_desc(&target_name)? {
            Some(found) => {
                let id = found.id;
                (found, BackReferenceTarget::Table(id))
            }
            None => {
                let db = self.must_get_database_desc(target_name.database.as_deref().unwrap_or(""))?;
                if db.id != table.parent_id || target_name.table != table.name {
                    return Err(SchemaError::not_found(
                        ResourceType::Table,
                        target_name.to_string(),
                    ));
                }
                (table.clone(), BackReferenceTarget::SelfTable)
            }
        };

        let target_col_name = match &reference.column {
            Some(column) => column.clone(),
            None => match target.primary_index.column_names.as_slice() {
                [only] => only.clone(),
                _ => {
                    return Err(invalid(format!(
                        "must specify a single unique column to reference {:?}",
                        target.name
                    )));
                }
            },
        };
        let target_col = target.find_active_column_by_name(&target_col_name)?;

        if src.col_type.kind != target_col.col_type.kind {
            return Err(invalid(format!(
                "type of {:?} ({}) does not match foreign key {:?}.{:?} ({})",
                src.name, src.col_type.kind, target.name, target_col.name, target_col.col_type.kind
            )));
        }

        let target_index = find_target_index(&target, target_col.id, &target_col.name)?;
        let name = reference.constraint_name.clone().unwrap_or_else(|| {
            format!("fk_{}_ref_{}_{}", src.name, target.name, target_col.name)
        });

        let source = if table.primary_index.leading_column_id() == Some(src.id) {
            &mut table.primary_index
        } else {
            table
                .indexes
                .iter_mut()
                .find(|idx| idx.leading_column_id() == Some(src.id))
                .ok_or_else(|| {
                    invalid(format!(
                        "foreign key column {:?} must be the prefix of an index",
                        src.name
                    ))
                })?
        };
        if let Some(existing) = &source.foreign_key {
            return Err(invalid(format!(
                "index {:?} already has foreign key {:?}",
                source.name, existing.name
            )));
        }
        source.foreign_key = Some(ForeignKeyReference {
            table: target.id,
            index: target_index,
            name: name.clone(),
        });
        let source_index = source.id;

        table.state = TableState::Add;
        Ok(PendingBackReference {
            source_index,
            target: target_kind,
            target_index,
            name,
        })
    }

    /// Second pass, run once `desc` has been created with its real ID.
    /// Self-references land on `desc`; back-references on other tables are
    /// recorded in `edits` for the caller to save.
    pub(crate) fn link_fk_back_references(
        &self,
        desc: &mut TableDescriptor,
        pending: &[PendingBackReference],
        edits: &mut TableEdits,
    ) -> Result<(), SchemaError> {
        let table_id = desc.id;
        for fk in pending {
            let back = ForeignKeyReference {
                table: table_id,
                index: fk.source_index,
                name: fk.name.clone(),
            };
            match fk.target {
                BackReferenceTarget::SelfTable => {
                    desc.find_index_by_id_mut(fk.target_index)?.referenced_by.push(back);
                    if let Some(forward) = desc.find_index_by_id_mut(fk.source_index)?.foreign_key.as_mut() {
                        forward.table = table_id;
                    }
                }
                BackReferenceTarget::Table(target_id) => {
                    self.edit_table(edits, target_id)?
                        .find_index_by_id_mut(fk.target_index)?
                        .referenced_by
                        .push(back);
                    debug!(
                        table_id = %table_id,
                        target_id = %target_id,
                        constraint = %fk.name,
                        "recording foreign key back-reference"
                    );
                }
            }
        }
        Ok(())
    }
}
