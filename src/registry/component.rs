use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::errors::RequestError;

/// Server subsystems that can own configuration objects and receive
/// change callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentType {
    Server,
    Transport,
    Protocol,
    Engine,
    Store,
    Security,
    Admin,
    Monitoring,
    MQConnectivity,
    HA,
    Cluster,
}

impl ComponentType {
    pub const ALL: [ComponentType; 11] = [
        ComponentType::Server,
        ComponentType::Transport,
        ComponentType::Protocol,
        ComponentType::Engine,
        ComponentType::Store,
        ComponentType::Security,
        ComponentType::Admin,
        ComponentType::Monitoring,
        ComponentType::MQConnectivity,
        ComponentType::HA,
        ComponentType::Cluster,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ComponentType::Server => "Server",
            ComponentType::Transport => "Transport",
            ComponentType::Protocol => "Protocol",
            ComponentType::Engine => "Engine",
            ComponentType::Store => "Store",
            ComponentType::Security => "Security",
            ComponentType::Admin => "Admin",
            ComponentType::Monitoring => "Monitoring",
            ComponentType::MQConnectivity => "MQConnectivity",
            ComponentType::HA => "HA",
            ComponentType::Cluster => "Cluster",
        }
    }

    pub fn from_name(name: &str) -> Result<ComponentType, RequestError> {
        Self::ALL
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
            .copied()
            .ok_or_else(|| RequestError::InvalidComponent(name.to_string()))
    }

    /// Components allowed to operate without an explicit registration call;
    /// a lookup for these lazily creates a no-op registration.
    pub fn is_callback_optional(&self) -> bool {
        matches!(self, ComponentType::Store | ComponentType::Engine)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
