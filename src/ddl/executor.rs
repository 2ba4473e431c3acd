use crate::catalog::types::{DescriptorId, MutationId};
use crate::config::SchemaConfig;
use crate::ddl::ast::Statement;
use crate::ddl::planner::{Planner, Session};
use crate::error::{ResourceType, SchemaError};
use crate::schema_change::{SchemaChangeNotice, SchemaChangeNotifier};
use crate::storage::memory::MemoryStore;
use crate::storage::{Descriptor, DescriptorTxn};
use std::sync::Arc;
use tracing::{debug, warn};

/// Plans and starts `statements` in order inside `txn`, returning the
/// schema-change notices to deliver once `txn` commits.
pub fn execute_in_txn<T: DescriptorTxn + ?Sized>(
    txn: &mut T,
    session: &Session,
    config: &SchemaConfig,
    statements: &[Statement],
) -> Result<Vec<SchemaChangeNotice>, SchemaError> {
    let mut planner = Planner::new(txn, session, config);
    for statement in statements {
        let mut node = planner.plan(statement)?;
        node.start(&mut planner)?;
        while node.next()? {}
        node.close();
    }
    Ok(planner.take_notices())
}

/// Runs DDL against a [`MemoryStore`], one transaction per call, retrying
/// the whole batch on serialization failures.
pub struct Executor {
    store: MemoryStore,
    config: Arc<SchemaConfig>,
    notifier: Arc<dyn SchemaChangeNotifier>,
}

impl Executor {
    pub fn new(
        store: MemoryStore,
        config: SchemaConfig,
        notifier: Arc<dyn SchemaChangeNotifier>,
    ) -> Result<Self, SchemaError> {
        config.validate()?;
        Ok(Self {
            store,
            config: Arc::new(config),
            notifier,
        })
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    pub fn execute(&self, session: &Session, statement: &Statement) -> Result<(), SchemaError> {
        self.execute_batch(session, std::slice::from_ref(statement))
    }

    /// Executes `statements` atomically: either all of them commit or none
    /// do. Notices go out only after the commit succeeds.
    pub fn execute_batch(&self, session: &Session, statements: &[Statement]) -> Result<(), SchemaError> {
        let notices = self.with_retry(|| {
            let mut txn = self.store.begin();
            let notices = execute_in_txn(&mut txn, session, &self.config, statements)?;
            txn.commit()?;
            Ok(notices)
        })?;
        for notice in notices {
            self.notifier.notify(notice);
        }
        Ok(())
    }

    /// Applies the completion step of every mutation with `mutation_id` on
    /// `table_id`, as the schema-change coordinator does once backfill is
    /// done. Returns the number of mutations consumed.
    pub fn complete_mutation(
        &self,
        table_id: DescriptorId,
        mutation_id: MutationId,
    ) -> Result<usize, SchemaError> {
        self.with_retry(|| {
            let mut txn = self.store.begin();
            let mut table = txn
                .get_table(table_id)?
                .ok_or_else(|| SchemaError::not_found(ResourceType::Table, format!("[{table_id}]")))?;
            let consumed = table.make_mutation_complete(mutation_id);
            if consumed > 0 {
                table.validate()?;
                txn.put_descriptor(&mut Descriptor::Table(table))?;
                txn.commit()?;
            }
            debug!(
                table_id = %table_id,
                mutation_id = %mutation_id,
                consumed,
                "completed schema change"
            );
            Ok(consumed)
        })
    }

    fn with_retry<R>(&self, mut attempt: impl FnMut() -> Result<R, SchemaError>) -> Result<R, SchemaError> {
        let mut retries = 0;
        loop {
            match attempt() {
                Err(err) if err.is_retryable() && retries < self.config.max_statement_retries => {
                    retries += 1;
                    warn!(error = %err, retries, "retrying schema change after serialization failure");
                }
                result => return result,
            }
        }
    }
}
