//! Parsed DDL statements as handed over by the SQL front end.
//!
//! `Display` renders canonical statement text; it is what audit records
//! carry in their `Statement` field.

use crate::catalog::types::{ColumnType, IndexDirection};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statement {
    CreateDatabase(CreateDatabase),
    CreateTable(CreateTable),
    CreateIndex(CreateIndex),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDatabase {
    pub name: String,
    #[serde(default)]
    pub if_not_exists: bool,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// Possibly-qualified table name. Planning fills in `database` from the
/// session when it is absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableName {
    pub database: Option<String>,
    pub table: String,
}

impl TableName {
    pub fn new(table: &str) -> Self {
        Self {
            database: None,
            table: table.to_string(),
        }
    }

    pub fn qualified(database: &str, table: &str) -> Self {
        Self {
            database: Some(database.to_string()),
            table: table.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTable {
    pub table: TableName,
    #[serde(default)]
    pub if_not_exists: bool,
    pub defs: Vec<TableDef>,
    #[serde(default)]
    pub interleave: Option<InterleaveDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIndex {
    pub name: String,
    pub table: TableName,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub if_not_exists: bool,
    pub columns: Vec<IndexElem>,
    #[serde(default)]
    pub storing: Vec<String>,
    #[serde(default)]
    pub interleave: Option<InterleaveDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableDef {
    Column(ColumnTableDef),
    Index(IndexTableDef),
    Check(CheckConstraintTableDef),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Nullability {
    Null,
    NotNull,
    /// Nothing declared; the column is nullable unless it is part of the
    /// primary key.
    #[default]
    Silent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnCheck {
    pub name: Option<String>,
    pub expr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnReference {
    pub table: TableName,
    /// Defaults to the target's single primary-key column.
    pub column: Option<String>,
    pub constraint_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTableDef {
    pub name: String,
    pub col_type: ColumnType,
    #[serde(default)]
    pub nullability: Nullability,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub default_expr: Option<String>,
    #[serde(default)]
    pub checks: Vec<ColumnCheck>,
    #[serde(default)]
    pub references: Option<ColumnReference>,
}

impl ColumnTableDef {
    pub fn new(name: &str, col_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            col_type,
            nullability: Nullability::Silent,
            primary_key: false,
            unique: false,
            default_expr: None,
            checks: Vec::new(),
            references: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullability = Nullability::NotNull;
        self
    }

    pub fn null(mut self) -> Self {
        self.nullability = Nullability::Null;
        self
    }

    pub fn default_expr(mut self, expr: &str) -> Self {
        self.default_expr = Some(expr.to_string());
        self
    }

    pub fn check(mut self, name: Option<&str>, expr: &str) -> Self {
        self.checks.push(ColumnCheck {
            name: name.map(str::to_string),
            expr: expr.to_string(),
        });
        self
    }

    pub fn references(mut self, table: TableName, column: Option<&str>) -> Self {
        self.references = Some(ColumnReference {
            table,
            column: column.map(str::to_string),
            constraint_name: None,
        });
        self
    }

    pub fn references_named(mut self, table: TableName, column: Option<&str>, name: &str) -> Self {
        self.references = Some(ColumnReference {
            table,
            column: column.map(str::to_string),
            constraint_name: Some(name.to_string()),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexElem {
    pub column: String,
    #[serde(default)]
    pub direction: IndexDirection,
}

impl IndexElem {
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            direction: IndexDirection::Asc,
        }
    }

    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            direction: IndexDirection::Desc,
        }
    }
}

/// Table-level `PRIMARY KEY (...)`, `UNIQUE (...)` or `INDEX (...)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexTableDef {
    pub name: Option<String>,
    pub columns: Vec<IndexElem>,
    #[serde(default)]
    pub storing: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub primary_key: bool,
}

impl IndexTableDef {
    pub fn primary_key(columns: Vec<IndexElem>) -> Self {
        Self {
            name: None,
            columns,
            storing: Vec::new(),
            unique: true,
            primary_key: true,
        }
    }

    pub fn unique(name: Option<&str>, columns: Vec<IndexElem>) -> Self {
        Self {
            name: name.map(str::to_string),
            columns,
            storing: Vec::new(),
            unique: true,
            primary_key: false,
        }
    }

    pub fn index(name: Option<&str>, columns: Vec<IndexElem>) -> Self {
        Self {
            name: name.map(str::to_string),
            columns,
            storing: Vec::new(),
            unique: false,
            primary_key: false,
        }
    }

    pub fn storing(mut self, columns: &[&str]) -> Self {
        self.storing = columns.iter().map(|c| c.to_string()).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConstraintTableDef {
    pub name: Option<String>,
    pub expr: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropBehavior {
    #[default]
    Default,
    Cascade,
    Restrict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterleaveDef {
    pub parent: TableName,
    pub fields: Vec<String>,
    #[serde(default)]
    pub drop_behavior: DropBehavior,
}

impl InterleaveDef {
    pub fn new(parent: TableName, fields: &[&str]) -> Self {
        Self {
            parent,
            fields: fields.iter().map(|f| f.to_string()).collect(),
            drop_behavior: DropBehavior::Default,
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_constraint_name(f: &mut fmt::Formatter<'_>, name: &Option<String>) -> fmt::Result {
    match name {
        Some(name) => write!(f, "CONSTRAINT {name} "),
        None => Ok(()),
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.database {
            Some(db) => write!(f, "{db}.{}", self.table),
            None => f.write_str(&self.table),
        }
    }
}

impl fmt::Display for IndexElem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            IndexDirection::Asc => f.write_str(&self.column),
            IndexDirection::Desc => write!(f, "{} DESC", self.column),
        }
    }
}

impl fmt::Display for DropBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropBehavior::Default => Ok(()),
            DropBehavior::Cascade => f.write_str("CASCADE"),
            DropBehavior::Restrict => f.write_str("RESTRICT"),
        }
    }
}

impl fmt::Display for InterleaveDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " INTERLEAVE IN PARENT {} (", self.parent)?;
        write_list(f, &self.fields)?;
        f.write_str(")")?;
        if self.drop_behavior != DropBehavior::Default {
            write!(f, " {}", self.drop_behavior)?;
        }
        Ok(())
    }
}

impl fmt::Display for ColumnTableDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.col_type)?;
        match self.nullability {
            Nullability::Null => f.write_str(" NULL")?,
            Nullability::NotNull => f.write_str(" NOT NULL")?,
            Nullability::Silent => {}
        }
        if self.primary_key {
            f.write_str(" PRIMARY KEY")?;
        }
        if self.unique {
            f.write_str(" UNIQUE")?;
        }
        if let Some(expr) = &self.default_expr {
            write!(f, " DEFAULT {expr}")?;
        }
        for check in &self.checks {
            f.write_str(" ")?;
            write_constraint_name(f, &check.name)?;
            write!(f, "CHECK ({})", check.expr)?;
        }
        if let Some(reference) = &self.references {
            f.write_str(" ")?;
            write_constraint_name(f, &reference.constraint_name)?;
            write!(f, "REFERENCES {}", reference.table)?;
            if let Some(column) = &reference.column {
                write!(f, " ({column})")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for TableDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableDef::Column(column) => write!(f, "{column}"),
            TableDef::Index(index) => {
                if index.primary_key {
                    write_constraint_name(f, &index.name)?;
                    f.write_str("PRIMARY KEY (")?;
                } else {
                    f.write_str(if index.unique { "UNIQUE" } else { "INDEX" })?;
                    if let Some(name) = &index.name {
                        write!(f, " {name}")?;
                    }
                    f.write_str(" (")?;
                }
                write_list(f, &index.columns)?;
                f.write_str(")")?;
                if !index.storing.is_empty() {
                    f.write_str(" STORING (")?;
                    write_list(f, &index.storing)?;
                    f.write_str(")")?;
                }
                Ok(())
            }
            TableDef::Check(check) => {
                write_constraint_name(f, &check.name)?;
                write!(f, "CHECK ({})", check.expr)
            }
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::CreateDatabase(n) => {
                f.write_str("CREATE DATABASE ")?;
                if n.if_not_exists {
                    f.write_str("IF NOT EXISTS ")?;
                }
                f.write_str(&n.name)?;
                if let Some(encoding) = &n.encoding {
                    write!(f, " ENCODING = '{encoding}'")?;
                }
                Ok(())
            }
            Statement::CreateTable(n) => {
                f.write_str("CREATE TABLE ")?;
                if n.if_not_exists {
                    f.write_str("IF NOT EXISTS ")?;
                }
                write!(f, "{} (", n.table)?;
                write_list(f, &n.defs)?;
                f.write_str(")")?;
                if let Some(interleave) = &n.interleave {
                    write!(f, "{interleave}")?;
                }
                Ok(())
            }
            Statement::CreateIndex(n) => {
                f.write_str("CREATE ")?;
                if n.unique {
                    f.write_str("UNIQUE ")?;
                }
                f.write_str("INDEX ")?;
                if n.if_not_exists {
                    f.write_str("IF NOT EXISTS ")?;
                }
                if !n.name.is_empty() {
                    write!(f, "{} ", n.name)?;
                }
                write!(f, "ON {} (", n.table)?;
                write_list(f, &n.columns)?;
                f.write_str(")")?;
                if !n.storing.is_empty() {
                    f.write_str(" STORING (")?;
                    write_list(f, &n.storing)?;
                    f.write_str(")")?;
                }
                if let Some(interleave) = &n.interleave {
                    write!(f, "{interleave}")?;
                }
                Ok(())
            }
        }
    }
}
