use crate::catalog::types::{DescriptorId, NodeId};
use crate::error::SchemaError;

pub const ROOT_USER: &str = "root";

/// Runtime configuration for the schema-mutation core.
#[derive(Debug, Clone)]
pub struct SchemaConfig {
    /// Reported as the originating node on every audit record.
    pub node_id: NodeId,
    /// The only user allowed to create databases.
    pub root_user: String,
    /// IDs up to and including this one are reserved for system descriptors.
    /// The first user descriptor is allocated `max_reserved_descriptor_id + 1`.
    pub max_reserved_descriptor_id: u32,
    pub max_identifier_len: usize,
    pub event_log_enabled: bool,
    /// Whole-statement retries the executor performs on `Aborted` errors.
    pub max_statement_retries: usize,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            node_id: NodeId(1),
            root_user: ROOT_USER.to_string(),
            max_reserved_descriptor_id: 49,
            max_identifier_len: 128,
            event_log_enabled: true,
            max_statement_retries: 3,
        }
    }
}

impl SchemaConfig {
    pub fn for_node(node_id: u32) -> Self {
        Self {
            node_id: NodeId(node_id),
            ..Self::default()
        }
    }

    /// Single-attempt profile: surfaces every `Aborted` error to the caller.
    pub fn no_retry() -> Self {
        Self {
            max_statement_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_root_user(mut self, user: impl Into<String>) -> Self {
        self.root_user = user.into();
        self
    }

    /// Stand-in table ID used to validate a descriptor that has not been
    /// created yet.
    pub fn placeholder_descriptor_id(&self) -> DescriptorId {
        DescriptorId(self.max_reserved_descriptor_id + 1)
    }

    pub fn first_user_descriptor_id(&self) -> DescriptorId {
        DescriptorId(self.max_reserved_descriptor_id + 1)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.root_user.is_empty() {
            return Err(SchemaError::InvalidConfig {
                message: "root_user must not be empty".into(),
            });
        }
        if self.max_identifier_len == 0 {
            return Err(SchemaError::InvalidConfig {
                message: "max_identifier_len must be > 0".into(),
            });
        }
        if self.max_reserved_descriptor_id == u32::MAX {
            return Err(SchemaError::InvalidConfig {
                message: "max_reserved_descriptor_id leaves no room for user descriptors".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SchemaConfig;
    use crate::catalog::types::DescriptorId;

    #[test]
    fn default_reserves_system_ids() {
        let config = SchemaConfig::default();
        assert_eq!(config.first_user_descriptor_id(), DescriptorId(50));
        assert_eq!(config.placeholder_descriptor_id(), DescriptorId(50));
        config.validate().expect("default config is valid");
    }

    #[test]
    fn rejects_empty_root_user() {
        let config = SchemaConfig::default().with_root_user("");
        assert!(config.validate().is_err());
    }
}
