//! Turns parsed CREATE statements into unallocated descriptors.

use crate::catalog::DatabaseDescriptor;
use crate::catalog::schema::{
    CheckConstraint, ColumnDescriptor, IndexDescriptor, ROWID_COLUMN_NAME, TableDescriptor,
    UNIQUE_ROWID_EXPR,
};
use crate::catalog::types::{ColumnType, DescriptorId, IndexDirection};
use crate::config::SchemaConfig;
use crate::ddl::ast::{
    CheckConstraintTableDef, CreateDatabase, CreateTable, IndexElem, Nullability, TableDef,
};
use crate::error::SchemaError;
use crate::permission::PrivilegeDescriptor;
use std::collections::HashSet;

const UTF8_ALIASES: [&str; 3] = ["UTF8", "UTF-8", "UNICODE"];

/// Only UTF-8 (under any of its accepted spellings) is supported.
pub fn check_encoding(encoding: Option<&str>) -> Result<(), SchemaError> {
    match encoding {
        None => Ok(()),
        Some(enc) if UTF8_ALIASES.iter().any(|a| a.eq_ignore_ascii_case(enc)) => Ok(()),
        Some(enc) => Err(SchemaError::UnsupportedEncoding {
            encoding: enc.to_string(),
        }),
    }
}

pub fn check_identifier(kind: &str, name: &str, config: &SchemaConfig) -> Result<(), SchemaError> {
    if name.is_empty() {
        return Err(SchemaError::InvalidArgument(format!("empty {kind} name")));
    }
    if name.len() > config.max_identifier_len {
        return Err(SchemaError::InvalidArgument(format!(
            "{kind} name {name:?} is longer than {} bytes",
            config.max_identifier_len
        )));
    }
    Ok(())
}

/// Rewrites every column-level CHECK into a table-level CHECK appended after
/// the existing definitions, leaving the column without checks.
pub fn hoist_constraints(n: &mut CreateTable) {
    let mut hoisted = Vec::new();
    for def in &mut n.defs {
        if let TableDef::Column(column) = def {
            for check in column.checks.drain(..) {
                hoisted.push(TableDef::Check(CheckConstraintTableDef {
                    name: check.name,
                    expr: check.expr,
                }));
            }
        }
    }
    n.defs.extend(hoisted);
}

pub fn make_database_desc(n: &CreateDatabase, config: &SchemaConfig) -> DatabaseDescriptor {
    DatabaseDescriptor::new(&n.name, &config.root_user)
}

fn fill_from_elems(index: &mut IndexDescriptor, elems: &[IndexElem]) {
    index.fill_columns(elems.iter().map(|e| (e.column.as_str(), e.direction)));
}

/// Builds the table descriptor for `n`. Column-level checks are expected to
/// have been hoisted already; any that remain are kept in declaration order.
/// IDs are left unassigned.
pub fn make_table_desc(
    n: &CreateTable,
    parent_id: DescriptorId,
    privileges: PrivilegeDescriptor,
) -> Result<TableDescriptor, SchemaError> {
    let mut desc = TableDescriptor::new(&n.table.table, parent_id, privileges);
    let mut explicit_null: HashSet<&str> = HashSet::new();

    for def in &n.defs {
        match def {
            TableDef::Column(d) => {
                if desc.find_column_by_name(&d.name).is_some() {
                    return Err(SchemaError::InvalidArgument(format!(
                        "duplicate column name: {:?}",
                        d.name
                    )));
                }
                if d.nullability == Nullability::Null {
                    explicit_null.insert(d.name.as_str());
                }
                let nullable = match d.nullability {
                    Nullability::Null => true,
                    Nullability::NotNull => false,
                    Nullability::Silent => !d.primary_key,
                };
                let mut column = ColumnDescriptor::new(&d.name, d.col_type, nullable);
                column.default_expr = d.default_expr.clone();
                desc.add_column(column);

                if d.primary_key {
                    let mut index = IndexDescriptor::new("", true);
                    index.fill_columns([(d.name.as_str(), IndexDirection::Asc)]);
                    desc.add_index(index, true)?;
                }
                if d.unique {
                    let mut index = IndexDescriptor::new("", true);
                    index.fill_columns([(d.name.as_str(), IndexDirection::Asc)]);
                    desc.add_index(index, false)?;
                }
                for check in &d.checks {
                    desc.checks.push(CheckConstraint {
                        name: check.name.clone(),
                        expr: check.expr.clone(),
                    });
                }
            }
            TableDef::Index(d) => {
                let mut index = IndexDescriptor::new(d.name.as_deref().unwrap_or(""), d.unique);
                fill_from_elems(&mut index, &d.columns);
                index.store_column_names = d.storing.clone();
                desc.add_index(index, d.primary_key)?;
            }
            TableDef::Check(d) => desc.checks.push(CheckConstraint {
                name: d.name.clone(),
                expr: d.expr.clone(),
            }),
        }
    }

    let primary_columns = desc.primary_index.column_names.clone();
    for name in &primary_columns {
        if explicit_null.contains(name.as_str()) {
            return Err(SchemaError::InvalidArgument(format!(
                "conflicting NULL/NOT NULL declarations for column {name:?}"
            )));
        }
        if let Some(column) = desc.columns.iter_mut().find(|c| &c.name == name) {
            column.nullable = false;
        }
    }
    Ok(desc)
}

/// Tables without a declared primary key get a hidden `rowid` column filled
/// by `unique_rowid()` and a unique primary index over it.
pub fn ensure_primary_key(desc: &mut TableDescriptor) -> Result<(), SchemaError> {
    if !desc.primary_index.column_names.is_empty() {
        return Ok(());
    }
    let mut column = ColumnDescriptor::new(ROWID_COLUMN_NAME, ColumnType::int(), false);
    column.default_expr = Some(UNIQUE_ROWID_EXPR.to_string());
    column.hidden = true;
    desc.add_column(column);

    let mut index = IndexDescriptor::new("", true);
    index.fill_columns([(ROWID_COLUMN_NAME, IndexDirection::Asc)]);
    desc.add_index(index, true)
}
