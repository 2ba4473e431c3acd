//! Plan nodes for the CREATE statements. Each node does all of its work in
//! [`PlanNode::start`]; none of them produce rows.

use crate::catalog::DatabaseDescriptor;
use crate::catalog::IndexLookup;
use crate::catalog::schema::{IndexDescriptor, MutationDirection, TableDescriptor};
use crate::catalog::types::{ColumnType, TableState};
use crate::ddl::ast::{CreateDatabase, CreateIndex, CreateTable, TableDef};
use crate::ddl::builder::{ensure_primary_key, hoist_constraints, make_database_desc, make_table_desc};
use crate::ddl::planner::Planner;
use crate::ddl::publish::TableEdits;
use crate::error::{ResourceType, SchemaError};
use crate::event_log::{CreateDatabaseInfo, CreateIndexInfo, CreateTableInfo, EventType};
use crate::storage::{Descriptor, DescriptorKey, DescriptorTxn};
use tracing::info;

/// Output column of a plan node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultColumn {
    pub name: String,
    pub col_type: ColumnType,
}

#[derive(Debug)]
pub enum PlanNode {
    CreateDatabase(CreateDatabaseNode),
    CreateTable(CreateTableNode),
    CreateIndex(CreateIndexNode),
}

impl PlanNode {
    /// Runs the statement inside the planner's transaction. May be called
    /// once per node.
    pub fn start<T: DescriptorTxn + ?Sized>(
        &mut self,
        p: &mut Planner<'_, T>,
    ) -> Result<(), SchemaError> {
        let started = match self {
            PlanNode::CreateDatabase(n) => &mut n.started,
            PlanNode::CreateTable(n) => &mut n.started,
            PlanNode::CreateIndex(n) => &mut n.started,
        };
        if std::mem::replace(started, true) {
            return Err(SchemaError::InvalidArgument(format!(
                "{} plan already started",
                self.explain_name()
            )));
        }
        match self {
            PlanNode::CreateDatabase(n) => n.start(p),
            PlanNode::CreateTable(n) => n.start(p),
            PlanNode::CreateIndex(n) => n.start(p),
        }
    }

    pub fn next(&mut self) -> Result<bool, SchemaError> {
        Ok(false)
    }

    pub fn columns(&self) -> Vec<ResultColumn> {
        Vec::new()
    }

    pub fn close(&mut self) {}

    pub fn explain_name(&self) -> &'static str {
        match self {
            PlanNode::CreateDatabase(_) => "create database",
            PlanNode::CreateTable(_) => "create table",
            PlanNode::CreateIndex(_) => "create index",
        }
    }
}

#[derive(Debug)]
pub struct CreateDatabaseNode {
    n: CreateDatabase,
    statement: String,
    started: bool,
}

impl CreateDatabaseNode {
    pub(crate) fn new(n: CreateDatabase, statement: String) -> Self {
        Self {
            n,
            statement,
            started: false,
        }
    }

    fn start<T: DescriptorTxn + ?Sized>(&self, p: &mut Planner<'_, T>) -> Result<(), SchemaError> {
        let mut desc = Descriptor::Database(make_database_desc(&self.n, p.config));
        let created = p.create_descriptor(
            DescriptorKey::database(&self.n.name),
            &mut desc,
            self.n.if_not_exists,
        )?;
        if created {
            p.event_logger.insert_event_record(
                &mut *p.txn,
                EventType::CreateDatabase,
                desc.id(),
                &CreateDatabaseInfo {
                    database_name: &self.n.name,
                    statement: self.statement.clone(),
                    user: &p.session.user,
                },
            )?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct CreateTableNode {
    n: CreateTable,
    db: DatabaseDescriptor,
    statement: String,
    started: bool,
}

impl CreateTableNode {
    pub(crate) fn new(n: CreateTable, db: DatabaseDescriptor, statement: String) -> Self {
        Self {
            n,
            db,
            statement,
            started: false,
        }
    }

    fn start<T: DescriptorTxn + ?Sized>(&self, p: &mut Planner<'_, T>) -> Result<(), SchemaError> {
        let mut n = self.n.clone();
        hoist_constraints(&mut n);
        let mut desc = make_table_desc(&n, self.db.id, self.db.privileges.clone())?;
        ensure_primary_key(&mut desc)?;

        let placeholder = p.config.placeholder_descriptor_id();
        desc.allocate_ids(placeholder)?;

        if let Some(interleave) = &n.interleave {
            let chain = p.build_interleave(&desc, &desc.primary_index, interleave)?;
            desc.primary_index.interleave = chain;
        }

        // FKs record index IDs, so they resolve only after allocation.
        let mut pending = Vec::new();
        for def in &n.defs {
            if let TableDef::Column(column) = def
                && let Some(reference) = &column.references
            {
                pending.push(p.resolve_column_fk(&mut desc, &column.name, reference)?);
            }
        }

        desc.validate_with_id(placeholder)?;

        let mut wrapped = Descriptor::Table(desc.clone());
        let created = p.create_descriptor(
            DescriptorKey::table(self.db.id, &desc.name),
            &mut wrapped,
            n.if_not_exists,
        )?;
        if !created {
            return Ok(());
        }
        desc.id = wrapped.id();
        desc.version = wrapped.version();

        // FK targets and interleave ancestors may overlap; both passes share
        // one edit set so each table is saved once.
        let mut edits = TableEdits::new();
        p.link_fk_back_references(&mut desc, &pending, &mut edits)?;
        let interleaved: Vec<IndexDescriptor> = desc
            .all_non_drop_indexes()
            .into_iter()
            .filter(|idx| idx.interleave.is_interleaved())
            .cloned()
            .collect();
        p.link_interleave_back_references(&mut desc, &interleaved, &mut edits)?;
        p.save_table_edits(edits)?;

        if desc.state == TableState::Add {
            desc.state = TableState::Public;
            p.save_nonmutation_and_notify(&mut desc)?;
        }

        p.event_logger.insert_event_record(
            &mut *p.txn,
            EventType::CreateTable,
            desc.id,
            &CreateTableInfo {
                table_name: n.table.to_string(),
                statement: self.statement.clone(),
                user: &p.session.user,
            },
        )?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct CreateIndexNode {
    n: CreateIndex,
    table: TableDescriptor,
    statement: String,
    started: bool,
}

impl CreateIndexNode {
    pub(crate) fn new(n: CreateIndex, table: TableDescriptor, statement: String) -> Self {
        Self {
            n,
            table,
            statement,
            started: false,
        }
    }

    fn start<T: DescriptorTxn + ?Sized>(&self, p: &mut Planner<'_, T>) -> Result<(), SchemaError> {
        let mut desc = self.table.clone();
        let name = self.n.name.as_str();

        match desc.find_index_by_name(name) {
            Some(IndexLookup::Mutation(pos)) => {
                if desc.mutations[pos].direction == MutationDirection::Drop {
                    return Err(SchemaError::Conflict(format!(
                        "index {name:?} being dropped, try again later"
                    )));
                }
                // A pending add of the same name is rejected by allocate_ids
                // below unless IF NOT EXISTS makes this a no-op.
                if self.n.if_not_exists {
                    return Ok(());
                }
            }
            Some(IndexLookup::Primary | IndexLookup::Public(_)) => {
                if self.n.if_not_exists {
                    return Ok(());
                }
                return Err(SchemaError::already_exists(ResourceType::Index, name));
            }
            None => {}
        }

        let mut index = IndexDescriptor::new(name, self.n.unique);
        index.fill_columns(self.n.columns.iter().map(|e| (e.column.as_str(), e.direction)));
        index.store_column_names = self.n.storing.clone();

        let mutation_pos = desc.mutations.len();
        desc.add_index_mutation(index, MutationDirection::Add);
        let mutation_id = desc.finalize_mutation()?;
        desc.allocate_ids(desc.id)?;

        if let Some(interleave) = &self.n.interleave {
            let pending = desc.mutations[mutation_pos]
                .index()
                .cloned()
                .ok_or_else(|| SchemaError::not_found(ResourceType::Index, name))?;
            let chain = p.build_interleave(&desc, &pending, interleave)?;
            desc.find_index_by_id_mut(pending.id)?.interleave = chain;
            desc.validate()?;
        }

        let created = desc.mutations[mutation_pos].index().cloned();
        let index_name = created.as_ref().map(|i| i.name.clone()).unwrap_or_default();
        let mut edits = TableEdits::new();
        if let Some(index) = created
            && index.interleave.is_interleaved()
        {
            p.link_interleave_back_references(&mut desc, std::slice::from_ref(&index), &mut edits)?;
        }
        p.write_table_desc(&mut desc)?;
        p.save_table_edits(edits)?;

        p.event_logger.insert_event_record(
            &mut *p.txn,
            EventType::CreateIndex,
            desc.id,
            &CreateIndexInfo {
                table_name: &desc.name,
                index_name: &index_name,
                statement: self.statement.clone(),
                user: &p.session.user,
                mutation_id,
            },
        )?;
        info!(
            table_id = %desc.id,
            index = %index_name,
            mutation_id = %mutation_id,
            "queued index mutation"
        );
        p.notify_schema_change(desc.id, Some(mutation_id));
        Ok(())
    }
}
