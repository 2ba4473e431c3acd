//! Audit records for successful creation events. Records are written
//! through the statement's transaction, so they become visible exactly when
//! the DDL commits.

use crate::catalog::types::{DescriptorId, MutationId, NodeId};
use crate::error::SchemaError;
use crate::storage::DescriptorTxn;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    CreateDatabase,
    CreateTable,
    CreateIndex,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::CreateDatabase => "create_database",
            EventType::CreateTable => "create_table",
            EventType::CreateIndex => "create_index",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp_micros: u64,
    pub event_type: EventType,
    /// ID of the database or table the event is about.
    pub target_id: DescriptorId,
    /// Node that executed the statement.
    pub reporting_id: NodeId,
    pub info: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateDatabaseInfo<'a> {
    pub database_name: &'a str,
    pub statement: String,
    pub user: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTableInfo<'a> {
    pub table_name: String,
    pub statement: String,
    pub user: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateIndexInfo<'a> {
    pub table_name: &'a str,
    pub index_name: &'a str,
    pub statement: String,
    pub user: &'a str,
    #[serde(rename = "MutationID")]
    pub mutation_id: MutationId,
}

pub struct EventLogger {
    reporting_id: NodeId,
    enabled: bool,
}

impl EventLogger {
    pub fn new(reporting_id: NodeId, enabled: bool) -> Self {
        Self {
            reporting_id,
            enabled,
        }
    }

    pub fn insert_event_record<T, I>(
        &self,
        txn: &mut T,
        event_type: EventType,
        target_id: DescriptorId,
        info: &I,
    ) -> Result<(), SchemaError>
    where
        T: DescriptorTxn + ?Sized,
        I: Serialize,
    {
        if !self.enabled {
            return Ok(());
        }
        let info = serde_json::to_value(info).map_err(|e| SchemaError::Encode(e.to_string()))?;
        txn.insert_event(EventRecord {
            timestamp_micros: now_micros(),
            event_type,
            target_id,
            reporting_id: self.reporting_id,
            info,
        })
    }
}

fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}
