use std::fmt;

/// Role of this node in the two-node replication pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeRole {
    /// HA is not configured; the node runs standalone.
    #[default]
    Disabled,
    /// Accepts writes and pushes accepted changes to the standby.
    Primary,
    /// Mirrors the primary; direct writes are limited to HA and admin
    /// objects.
    Standby,
}

impl NodeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Disabled => "disabled",
            NodeRole::Primary => "primary",
            NodeRole::Standby => "standby",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
