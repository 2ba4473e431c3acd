use crate::catalog::types::{
    ColumnId, ColumnType, DescriptorId, IndexDirection, IndexId, MutationId, TableState,
};
use crate::permission::PrivilegeDescriptor;
use serde::{Deserialize, Serialize};

pub const PRIMARY_INDEX_NAME: &str = "primary";
pub const ROWID_COLUMN_NAME: &str = "rowid";
pub const UNIQUE_ROWID_EXPR: &str = "unique_rowid()";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub id: ColumnId,
    pub name: String,
    pub col_type: ColumnType,
    pub nullable: bool,
    #[serde(default)]
    pub default_expr: Option<String>,
    #[serde(default)]
    pub hidden: bool,
}

impl ColumnDescriptor {
    pub fn new(name: &str, col_type: ColumnType, nullable: bool) -> Self {
        Self {
            id: ColumnId::INVALID,
            name: name.to_string(),
            col_type,
            nullable,
            default_expr: None,
            hidden: false,
        }
    }
}

/// Directed FK edge. On a source index it points at the referenced unique
/// index; in `referenced_by` it points back at the referencing index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForeignKeyReference {
    pub table: DescriptorId,
    pub index: IndexId,
    #[serde(default)]
    pub name: String,
}

/// Back-reference recorded on an ancestor index for each interleaved child.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterleaveReference {
    pub table: DescriptorId,
    pub index: IndexId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterleaveAncestor {
    pub table_id: DescriptorId,
    pub index_id: IndexId,
    /// Key columns shared with this ancestor beyond those already shared
    /// with the ancestors before it.
    pub shared_prefix_len: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterleaveDescriptor {
    pub ancestors: Vec<InterleaveAncestor>,
}

impl InterleaveDescriptor {
    pub fn is_interleaved(&self) -> bool {
        !self.ancestors.is_empty()
    }

    pub fn total_shared_prefix_len(&self) -> u32 {
        self.ancestors.iter().map(|a| a.shared_prefix_len).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub id: IndexId,
    pub name: String,
    pub unique: bool,
    pub column_names: Vec<String>,
    pub column_directions: Vec<IndexDirection>,
    #[serde(default)]
    pub column_ids: Vec<ColumnId>,
    #[serde(default)]
    pub store_column_names: Vec<String>,
    /// Primary-key columns a secondary index carries without declaring them.
    #[serde(default)]
    pub extra_column_ids: Vec<ColumnId>,
    #[serde(default)]
    pub foreign_key: Option<ForeignKeyReference>,
    #[serde(default)]
    pub referenced_by: Vec<ForeignKeyReference>,
    #[serde(default)]
    pub interleave: InterleaveDescriptor,
    #[serde(default)]
    pub interleaved_by: Vec<InterleaveReference>,
}

impl IndexDescriptor {
    pub fn new(name: &str, unique: bool) -> Self {
        Self {
            name: name.to_string(),
            unique,
            ..Self::default()
        }
    }

    /// Appends key columns in declaration order.
    pub fn fill_columns<'a, I>(&mut self, columns: I)
    where
        I: IntoIterator<Item = (&'a str, IndexDirection)>,
    {
        for (name, direction) in columns {
            self.column_names.push(name.to_string());
            self.column_directions.push(direction);
        }
    }

    pub fn leading_column_id(&self) -> Option<ColumnId> {
        self.column_ids.first().copied()
    }
}

/// Table-level CHECK constraint. Column-level checks are hoisted into this
/// form before the descriptor is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckConstraint {
    #[serde(default)]
    pub name: Option<String>,
    pub expr: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationDirection {
    Add,
    Drop,
}

impl std::fmt::Display for MutationDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationDirection::Add => f.write_str("ADD"),
            MutationDirection::Drop => f.write_str("DROP"),
        }
    }
}

/// Write-visibility stage of a pending mutation, advanced by the external
/// schema-change coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationState {
    DeleteOnly,
    WriteOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MutationDescriptor {
    Index(IndexDescriptor),
    Column(ColumnDescriptor),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DescriptorMutation {
    pub descriptor: MutationDescriptor,
    pub direction: MutationDirection,
    pub mutation_id: MutationId,
    pub state: MutationState,
}

impl DescriptorMutation {
    pub fn index(&self) -> Option<&IndexDescriptor> {
        match &self.descriptor {
            MutationDescriptor::Index(index) => Some(index),
            MutationDescriptor::Column(_) => None,
        }
    }

    pub fn index_mut(&mut self) -> Option<&mut IndexDescriptor> {
        match &mut self.descriptor {
            MutationDescriptor::Index(index) => Some(index),
            MutationDescriptor::Column(_) => None,
        }
    }

    pub fn column(&self) -> Option<&ColumnDescriptor> {
        match &self.descriptor {
            MutationDescriptor::Column(column) => Some(column),
            MutationDescriptor::Index(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableDescriptor {
    /// Zero until the store creates the descriptor; immutable afterwards.
    pub id: DescriptorId,
    pub name: String,
    pub parent_id: DescriptorId,
    #[serde(default)]
    pub version: u64,
    pub columns: Vec<ColumnDescriptor>,
    pub next_column_id: ColumnId,
    pub primary_index: IndexDescriptor,
    pub indexes: Vec<IndexDescriptor>,
    pub next_index_id: IndexId,
    #[serde(default)]
    pub checks: Vec<CheckConstraint>,
    #[serde(default)]
    pub mutations: Vec<DescriptorMutation>,
    pub next_mutation_id: MutationId,
    pub state: TableState,
    pub privileges: PrivilegeDescriptor,
}
