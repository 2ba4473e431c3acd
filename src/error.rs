use crate::catalog::types::DescriptorId;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Database,
    Table,
    Index,
    Column,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Database => write!(f, "database"),
            ResourceType::Table => write!(f, "relation"),
            ResourceType::Index => write!(f, "index"),
            ResourceType::Column => write!(f, "column"),
        }
    }
}

/// Coarse error taxonomy. Callers decide whether to surface or retry by class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    InvalidArgument,
    Unsupported,
    PermissionDenied,
    NotFound,
    Conflict,
    Aborted,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    InvalidArgument,
    UnsupportedEncoding,
    Unsupported,
    PermissionDenied,
    DatabaseNotFound,
    TableNotFound,
    IndexNotFound,
    ColumnNotFound,
    DatabaseAlreadyExists,
    TableAlreadyExists,
    IndexAlreadyExists,
    ColumnAlreadyExists,
    Conflict,
    StaleDescriptor,
    Aborted,
    Encode,
    Decode,
    InvalidConfig,
}

impl SchemaErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaErrorCode::InvalidArgument => "invalid_argument",
            SchemaErrorCode::UnsupportedEncoding => "unsupported_encoding",
            SchemaErrorCode::Unsupported => "unsupported",
            SchemaErrorCode::PermissionDenied => "permission_denied",
            SchemaErrorCode::DatabaseNotFound => "database_not_found",
            SchemaErrorCode::TableNotFound => "table_not_found",
            SchemaErrorCode::IndexNotFound => "index_not_found",
            SchemaErrorCode::ColumnNotFound => "column_not_found",
            SchemaErrorCode::DatabaseAlreadyExists => "database_already_exists",
            SchemaErrorCode::TableAlreadyExists => "table_already_exists",
            SchemaErrorCode::IndexAlreadyExists => "index_already_exists",
            SchemaErrorCode::ColumnAlreadyExists => "column_already_exists",
            SchemaErrorCode::Conflict => "conflict",
            SchemaErrorCode::StaleDescriptor => "stale_descriptor",
            SchemaErrorCode::Aborted => "aborted",
            SchemaErrorCode::Encode => "encode",
            SchemaErrorCode::Decode => "decode",
            SchemaErrorCode::InvalidConfig => "invalid_config",
        }
    }

    pub fn class(self) -> ErrorClass {
        match self {
            SchemaErrorCode::InvalidArgument | SchemaErrorCode::UnsupportedEncoding => {
                ErrorClass::InvalidArgument
            }
            SchemaErrorCode::Unsupported => ErrorClass::Unsupported,
            SchemaErrorCode::PermissionDenied => ErrorClass::PermissionDenied,
            SchemaErrorCode::DatabaseNotFound
            | SchemaErrorCode::TableNotFound
            | SchemaErrorCode::IndexNotFound
            | SchemaErrorCode::ColumnNotFound => ErrorClass::NotFound,
            SchemaErrorCode::DatabaseAlreadyExists
            | SchemaErrorCode::TableAlreadyExists
            | SchemaErrorCode::IndexAlreadyExists
            | SchemaErrorCode::ColumnAlreadyExists
            | SchemaErrorCode::Conflict => ErrorClass::Conflict,
            SchemaErrorCode::StaleDescriptor | SchemaErrorCode::Aborted => ErrorClass::Aborted,
            SchemaErrorCode::Encode | SchemaErrorCode::Decode | SchemaErrorCode::InvalidConfig => {
                ErrorClass::Internal
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{encoding} is not a supported encoding")]
    UnsupportedEncoding { encoding: String },
    #[error("unimplemented: {0}")]
    Unsupported(String),
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{resource_type} \"{name}\" does not exist")]
    NotFound {
        resource_type: ResourceType,
        name: String,
    },
    #[error("{resource_type} \"{name}\" already exists")]
    AlreadyExists {
        resource_type: ResourceType,
        name: String,
    },
    #[error("{0}")]
    Conflict(String),
    #[error("descriptor {id} version {attempted} is stale (current version {current})")]
    StaleDescriptor {
        id: DescriptorId,
        attempted: u64,
        current: u64,
    },
    #[error("transaction aborted: {0}")]
    Aborted(String),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },
}

impl SchemaError {
    pub fn code(&self) -> SchemaErrorCode {
        match self {
            SchemaError::InvalidArgument(_) => SchemaErrorCode::InvalidArgument,
            SchemaError::UnsupportedEncoding { .. } => SchemaErrorCode::UnsupportedEncoding,
            SchemaError::Unsupported(_) => SchemaErrorCode::Unsupported,
            SchemaError::PermissionDenied(_) => SchemaErrorCode::PermissionDenied,
            SchemaError::NotFound { resource_type, .. } => match resource_type {
                ResourceType::Database => SchemaErrorCode::DatabaseNotFound,
                ResourceType::Table => SchemaErrorCode::TableNotFound,
                ResourceType::Index => SchemaErrorCode::IndexNotFound,
                ResourceType::Column => SchemaErrorCode::ColumnNotFound,
            },
            SchemaError::AlreadyExists { resource_type, .. } => match resource_type {
                ResourceType::Database => SchemaErrorCode::DatabaseAlreadyExists,
                ResourceType::Table => SchemaErrorCode::TableAlreadyExists,
                ResourceType::Index => SchemaErrorCode::IndexAlreadyExists,
                ResourceType::Column => SchemaErrorCode::ColumnAlreadyExists,
            },
            SchemaError::Conflict(_) => SchemaErrorCode::Conflict,
            SchemaError::StaleDescriptor { .. } => SchemaErrorCode::StaleDescriptor,
            SchemaError::Aborted(_) => SchemaErrorCode::Aborted,
            SchemaError::Encode(_) => SchemaErrorCode::Encode,
            SchemaError::Decode(_) => SchemaErrorCode::Decode,
            SchemaError::InvalidConfig { .. } => SchemaErrorCode::InvalidConfig,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }

    pub fn class(&self) -> ErrorClass {
        self.code().class()
    }

    /// Only store serialization failures are worth re-running the statement for.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Aborted
    }

    pub(crate) fn not_found(resource_type: ResourceType, name: impl Into<String>) -> Self {
        SchemaError::NotFound {
            resource_type,
            name: name.into(),
        }
    }

    pub(crate) fn already_exists(resource_type: ResourceType, name: impl Into<String>) -> Self {
        SchemaError::AlreadyExists {
            resource_type,
            name: name.into(),
        }
    }
}
