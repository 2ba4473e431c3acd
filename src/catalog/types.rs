use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub const INVALID: $name = $name(0);

            pub fn is_valid(self) -> bool {
                self.0 != 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Cluster-wide identity of a database or table descriptor.
    DescriptorId
);
id_type!(ColumnId);
id_type!(IndexId);
id_type!(
    /// Per-table schema change identity; shared by every mutation queued by
    /// one statement.
    MutationId
);
id_type!(NodeId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Bool,
    Int,
    Float,
    Decimal,
    Date,
    Timestamp,
    TimestampTz,
    Interval,
    String,
    Bytes,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColumnKind::Bool => "BOOL",
            ColumnKind::Int => "INT",
            ColumnKind::Float => "FLOAT",
            ColumnKind::Decimal => "DECIMAL",
            ColumnKind::Date => "DATE",
            ColumnKind::Timestamp => "TIMESTAMP",
            ColumnKind::TimestampTz => "TIMESTAMPTZ",
            ColumnKind::Interval => "INTERVAL",
            ColumnKind::String => "STRING",
            ColumnKind::Bytes => "BYTES",
        };
        f.write_str(name)
    }
}

/// SQL column type. `width` is the declared length for strings or bit width
/// for numbers; `precision` is the decimal precision. Zero means unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnType {
    pub kind: ColumnKind,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub precision: u32,
}

impl ColumnType {
    pub const fn new(kind: ColumnKind) -> Self {
        Self {
            kind,
            width: 0,
            precision: 0,
        }
    }

    pub const fn with_width(kind: ColumnKind, width: u32) -> Self {
        Self {
            kind,
            width,
            precision: 0,
        }
    }

    pub const fn int() -> Self {
        Self::new(ColumnKind::Int)
    }

    pub const fn string() -> Self {
        Self::new(ColumnKind::String)
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.width, self.precision) {
            (0, 0) => write!(f, "{}", self.kind),
            (w, 0) => write!(f, "{}({w})", self.kind),
            (w, p) => write!(f, "{}({w},{p})", self.kind),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexDirection {
    #[default]
    Asc,
    Desc,
}

impl std::fmt::Display for IndexDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexDirection::Asc => f.write_str("ASC"),
            IndexDirection::Desc => f.write_str("DESC"),
        }
    }
}

/// Visibility of a table to general queries. Only `Public` tables are
/// served to readers outside the creating statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableState {
    Add,
    #[default]
    Public,
    Drop,
}

impl std::fmt::Display for TableState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableState::Add => f.write_str("ADD"),
            TableState::Public => f.write_str("PUBLIC"),
            TableState::Drop => f.write_str("DROP"),
        }
    }
}

/// Identifier comparison form. Unquoted SQL identifiers are case-insensitive.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
}
