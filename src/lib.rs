//! Descriptor construction, cross-reference linking and online schema-change
//! queueing for a distributed SQL catalog.

pub mod catalog;
pub mod config;
pub mod ddl;
pub mod error;
pub mod event_log;
pub mod permission;
pub mod schema_change;
pub mod storage;

pub use crate::catalog::DatabaseDescriptor;
pub use crate::catalog::schema::{ColumnDescriptor, IndexDescriptor, TableDescriptor};
pub use crate::config::SchemaConfig;
pub use crate::ddl::ast::Statement;
pub use crate::ddl::executor::{Executor, execute_in_txn};
pub use crate::ddl::planner::{Planner, Session};
pub use crate::error::{ErrorClass, SchemaError};
pub use crate::schema_change::{ChannelNotifier, SchemaChangeNotice, SchemaChangeNotifier};
pub use crate::storage::memory::{MemoryStore, MemoryTxn};
pub use crate::storage::{Descriptor, DescriptorKey, DescriptorTxn};
