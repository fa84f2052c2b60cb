//! Configuration Control-Plane Error Hierarchy
//!
//! Defines error types for the dynamic-configuration pipeline,
//! categorized by pipeline stage and operational concerns.

use std::io;
use std::path::PathBuf;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or unresolvable change requests
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Schema violations detected before any store mutation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Object lifecycle and referential-integrity violations
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Subscriber callback failures, including rollback outcomes
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Durability failures in the file-replacement protocol
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// Primary/standby replication failures
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Bootstrap settings loading/validation failures
    #[error(transparent)]
    Settings(#[from] config::ConfigError),

    /// Unrecoverable failures requiring operator intervention
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Required request element is missing entirely
    #[error("Required element is missing: {0}")]
    NullPointer(&'static str),

    /// Request element present but unusable
    #[error("Argument is not valid: {0}")]
    ArgNotValid(String),

    /// Component name does not resolve to a known component
    #[error("Unknown configuration component: {0}")]
    InvalidComponent(String),

    /// Object type name does not resolve to a schema entry
    #[error("Unknown configuration object: {0}")]
    InvalidCfgObject(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Property value has the wrong JSON type for its schema item
    #[error("Property type mismatch for {object}/{name}: item {item} has type {actual_type}")]
    BadPropertyType {
        object: String,
        name: String,
        item: String,
        actual_type: &'static str,
    },

    /// Property value is the right type but out of range / not allowed
    #[error("Invalid value for {object} property {item}: {value}")]
    BadPropertyValue {
        object: String,
        item: String,
        value: String,
    },

    /// A required property is absent (or empty without allow-empty)
    #[error("Required property {item} is missing on {object}/{name}")]
    PropertyRequired {
        object: String,
        name: String,
        item: String,
    },

    /// Object type is marked not settable in the schema
    #[error("Object {0} cannot be modified")]
    NotSettable(String),

    /// Cross-field rule violation with a rule-specific explanation
    #[error("Invalid combination on {object}: {detail}")]
    InvalidCombination { object: String, detail: String },

    /// A referenced named object does not exist in the store
    #[error("Referenced {ref_type} {ref_name} does not exist")]
    ReferenceNotFound { ref_type: String, ref_name: String },
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Instance lookup failed for an operation requiring existence
    #[error("{object} {name} not found")]
    ObjectNotFound { object: String, name: String },

    /// Creating an instance that already exists
    #[error("{object} {name} already exists")]
    ObjectExists { object: String, name: String },

    /// Deleting an object other objects still reference
    #[error("{object} {name} is in use")]
    ObjectIsInUse { object: String, name: String },

    /// Singleton objects are reset to defaults, never deleted
    #[error("Singleton {0} cannot be deleted")]
    SingletonDelete(String),

    /// Object is on the fixed cannot-delete list
    #[error("{object} {name} cannot be deleted")]
    DeleteNotAllowed { object: String, name: String },

    /// Generated UID collided with a live instance
    #[error("UID {0} is already assigned")]
    ExistingKey(String),

    /// UID generation exhausted its retry budget
    #[error("Could not generate a unique object identifier")]
    UuidConfigError,

    /// Mutation attempted on a standby node for a standby-protected type
    #[error("Configuration of {0} is not allowed on a standby node")]
    ConfigNotAllowed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Subscriber rejected the change; compensations (if any) succeeded
    #[error("Callback for {component} rejected {object}/{name}: {detail}")]
    CallbackRejected {
        component: String,
        object: String,
        name: String,
        detail: String,
    },

    /// No registered subscriber and the component is not callback-optional
    #[error("No subscriber registered for component {0}")]
    NoSubscriber(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Disk I/O failures during dump/rename operations
    #[error(transparent)]
    Io(#[from] io::Error),

    /// I/O failure with the file path that produced it
    #[error("Error occurred at path: {path}")]
    PathError { path: PathBuf, source: io::Error },

    /// Serialization failures for the persisted document
    #[error("Configuration serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Retry budget for transient write failures exhausted
    #[error("Configuration file update failed after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// Legacy key=value file could not be parsed
    #[error("Malformed legacy configuration at line {line}: {content}")]
    MalformedLegacyLine { line: usize, content: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Replication transport rejected or dropped the message
    #[error("Replication transport failure: {0}")]
    Transport(String),

    /// Incoming replication payload could not be decoded
    #[error("Malformed replication message: {0}")]
    Decode(String),

    /// Message version is not one this node can apply
    #[error("Unsupported replication message version: {0}")]
    UnsupportedVersion(String),

    /// Replication attempted while HA is disabled or role is wrong
    #[error("Node role {0} cannot perform this replication step")]
    WrongRole(&'static str),
}

// ============== Conversion Implementations ============== //
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Persist(PersistError::Serialize(e))
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Persist(PersistError::Io(e))
    }
}

impl Error {
    /// True for errors a caller may retry after fixing its request,
    /// false for infrastructure failures.
    pub fn is_request_fault(&self) -> bool {
        matches!(
            self,
            Error::Request(_) | Error::Validation(_) | Error::Lifecycle(_)
        )
    }
}
