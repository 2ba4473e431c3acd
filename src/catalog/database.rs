use crate::catalog::types::DescriptorId;
use crate::error::SchemaError;
use crate::permission::PrivilegeDescriptor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseDescriptor {
    pub id: DescriptorId,
    pub name: String,
    /// Bumped by the store on every committed write.
    #[serde(default)]
    pub version: u64,
    pub privileges: PrivilegeDescriptor,
}

impl DatabaseDescriptor {
    /// Builds an unallocated descriptor; the ID is assigned when the
    /// descriptor is created in the store.
    pub fn new(name: &str, root_user: &str) -> Self {
        Self {
            id: DescriptorId::INVALID,
            name: name.to_string(),
            version: 0,
            privileges: PrivilegeDescriptor::new_default(root_user),
        }
    }

    pub fn validate(&self, root_user: &str) -> Result<(), SchemaError> {
        if self.name.is_empty() {
            return Err(SchemaError::InvalidArgument(
                "empty database name".into(),
            ));
        }
        if !self.id.is_valid() {
            return Err(SchemaError::InvalidArgument(format!(
                "invalid database ID {}",
                self.id
            )));
        }
        self.privileges
            .validate(root_user, &format!("database {:?}", self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::DatabaseDescriptor;
    use crate::catalog::types::DescriptorId;

    #[test]
    fn unallocated_database_fails_validation() {
        let mut db = DatabaseDescriptor::new("shop", "root");
        let err = db.validate("root").expect_err("no id yet");
        assert!(err.to_string().contains("invalid database ID 0"));
        db.id = DescriptorId(50);
        db.validate("root").expect("valid once allocated");
    }
}
