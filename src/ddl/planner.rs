use crate::catalog::DatabaseDescriptor;
use crate::catalog::schema::TableDescriptor;
use crate::catalog::types::{DescriptorId, MutationId};
use crate::config::SchemaConfig;
use crate::ddl::ast::{Statement, TableName};
use crate::ddl::builder::{check_encoding, check_identifier};
use crate::ddl::create::{CreateDatabaseNode, CreateIndexNode, CreateTableNode, PlanNode};
use crate::error::{ResourceType, SchemaError};
use crate::event_log::EventLogger;
use crate::permission::{Privilege, check_privilege, require_superuser};
use crate::schema_change::SchemaChangeNotice;
use crate::storage::DescriptorTxn;

/// Identity and defaults of the connection issuing statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: String,
    /// Database used to qualify bare table names.
    pub database: Option<String>,
}

impl Session {
    pub fn new(user: &str) -> Self {
        Self {
            user: user.to_string(),
            database: None,
        }
    }

    pub fn with_database(mut self, database: &str) -> Self {
        self.database = Some(database.to_string());
        self
    }
}

/// Per-transaction planning context. Planning only reads; writes happen in
/// [`PlanNode::start`]. Schema-change notices accumulate here and must only
/// be delivered once the transaction has committed.
pub struct Planner<'a, T: DescriptorTxn + ?Sized> {
    pub(crate) txn: &'a mut T,
    pub(crate) session: &'a Session,
    pub(crate) config: &'a SchemaConfig,
    pub(crate) event_logger: EventLogger,
    notices: Vec<SchemaChangeNotice>,
}

impl<'a, T: DescriptorTxn + ?Sized> Planner<'a, T> {
    pub fn new(txn: &'a mut T, session: &'a Session, config: &'a SchemaConfig) -> Self {
        Self {
            txn,
            session,
            config,
            event_logger: EventLogger::new(config.node_id, config.event_log_enabled),
            notices: Vec::new(),
        }
    }

    pub fn plan(&mut self, statement: &Statement) -> Result<PlanNode, SchemaError> {
        let text = statement.to_string();
        match statement {
            Statement::CreateDatabase(n) => {
                check_identifier("database", &n.name, self.config)?;
                check_encoding(n.encoding.as_deref())?;
                require_superuser(&self.session.user, self.config, "create databases")?;
                Ok(PlanNode::CreateDatabase(CreateDatabaseNode::new(
                    n.clone(),
                    text,
                )))
            }
            Statement::CreateTable(n) => {
                let mut n = n.clone();
                n.table = self.normalize_table_name(&n.table)?;
                check_identifier("table", &n.table.table, self.config)?;
                let db = self.must_get_database_desc(database_of(&n.table)?)?;
                check_privilege(
                    &self.session.user,
                    &db.privileges,
                    Privilege::Create,
                    &format!("database {:?}", db.name),
                )?;
                Ok(PlanNode::CreateTable(CreateTableNode::new(n, db, text)))
            }
            Statement::CreateIndex(n) => {
                let mut n = n.clone();
                n.table = self.normalize_table_name(&n.table)?;
                if !n.name.is_empty() {
                    check_identifier("index", &n.name, self.config)?;
                }
                let table = self.must_get_table_desc(&n.table)?;
                check_privilege(
                    &self.session.user,
                    &table.privileges,
                    Privilege::Create,
                    &format!("table {:?}", table.name),
                )?;
                Ok(PlanNode::CreateIndex(CreateIndexNode::new(n, table, text)))
            }
        }
    }

    /// Qualifies a bare table name with the session database.
    pub fn normalize_table_name(&self, name: &TableName) -> Result<TableName, SchemaError> {
        if name.database.is_some() {
            return Ok(name.clone());
        }
        match &self.session.database {
            Some(db) if !db.is_empty() => Ok(TableName::qualified(db, &name.table)),
            _ => Err(SchemaError::InvalidArgument(format!(
                "no database specified: {:?}",
                name.table
            ))),
        }
    }

    pub fn must_get_database_desc(&self, name: &str) -> Result<DatabaseDescriptor, SchemaError> {
        self.txn
            .get_database_by_name(name)?
            .ok_or_else(|| SchemaError::not_found(ResourceType::Database, name))
    }

    /// Looks up a table by (possibly bare) name. Tables being dropped are
    /// reported as absent.
    pub fn get_table_desc(&self, name: &TableName) -> Result<Option<TableDescriptor>, SchemaError> {
        let name = self.normalize_table_name(name)?;
        let db = self.must_get_database_desc(database_of(&name)?)?;
        let table = self.txn.get_table_by_name(db.id, &name.table)?;
        Ok(table.filter(|t| !t.is_dropped()))
    }

    pub fn must_get_table_desc(&self, name: &TableName) -> Result<TableDescriptor, SchemaError> {
        self.get_table_desc(name)?
            .ok_or_else(|| SchemaError::not_found(ResourceType::Table, name.to_string()))
    }

    pub(crate) fn get_table_desc_by_id(&self, id: DescriptorId) -> Result<TableDescriptor, SchemaError> {
        self.txn
            .get_table(id)?
            .ok_or_else(|| SchemaError::not_found(ResourceType::Table, format!("[{id}]")))
    }

    pub(crate) fn notify_schema_change(&mut self, table_id: DescriptorId, mutation_id: Option<MutationId>) {
        self.notices.push(SchemaChangeNotice {
            table_id,
            mutation_id,
        });
    }

    /// Notices buffered so far, in emission order.
    pub fn pending_notices(&self) -> &[SchemaChangeNotice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<SchemaChangeNotice> {
        std::mem::take(&mut self.notices)
    }
}

fn database_of(name: &TableName) -> Result<&str, SchemaError> {
    name.database
        .as_deref()
        .ok_or_else(|| SchemaError::InvalidArgument(format!("no database specified: {:?}", name.table)))
}
