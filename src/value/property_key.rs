use std::fmt;

use crate::errors::PersistError;

/// Structured form of the legacy flat property key.
///
/// The legacy dynamic-config file addresses every value as
/// `<ObjectType>.<Field>.<InstanceName> = <value>`, with the instance part
/// absent for singletons. Keeping the three parts separate removes the
/// token-splitting ambiguity the flat representation suffered from:
/// only the instance name may contain further dots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyKey {
    pub object_type: String,
    pub field: String,
    pub instance: Option<String>,
}

impl PropertyKey {
    pub fn singleton(object_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            field: field.into(),
            instance: None,
        }
    }

    pub fn composite(
        object_type: impl Into<String>,
        field: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        Self {
            object_type: object_type.into(),
            field: field.into(),
            instance: Some(instance.into()),
        }
    }

    /// Parse one legacy key. `line` is only used for error context.
    pub fn parse(key: &str, line: usize) -> Result<Self, PersistError> {
        let mut parts = key.splitn(3, '.');
        let object_type = parts.next().unwrap_or_default();
        let field = parts.next().unwrap_or_default();
        if object_type.is_empty() || field.is_empty() {
            return Err(PersistError::MalformedLegacyLine {
                line,
                content: key.to_string(),
            });
        }
        Ok(Self {
            object_type: object_type.to_string(),
            field: field.to_string(),
            instance: parts.next().map(str::to_string),
        })
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.instance {
            Some(name) => write!(f, "{}.{}.{}", self.object_type, self.field, name),
            None => write!(f, "{}.{}", self.object_type, self.field),
        }
    }
}
