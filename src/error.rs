use crate::ir::PortId;
use thiserror::Error;

/// Reasons a topology mutation is rejected. A rejected mutation never leaves a
/// partial change or a history entry behind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TopologyError {
    #[error("port {port} on {switch} is already occupied")]
    PortOccupied { switch: String, port: PortId },
    #[error("unknown reference: {0}")]
    InvalidReference(String),
    #[error("invalid VLAN `{0}` (expected ids 1-4094)")]
    InvalidVlan(String),
    #[error("position ({x}, {y}) is not finite")]
    InvalidPosition { x: f32, y: f32 },
    #[error("field `{field}` cannot be updated on {id}")]
    UnsupportedField { id: String, field: &'static str },
    #[error("unknown {kind} `{value}`")]
    UnknownValue { kind: &'static str, value: String },
}

impl TopologyError {
    pub(crate) fn occupied(switch: &str, port: PortId) -> Self {
        Self::PortOccupied {
            switch: switch.to_string(),
            port,
        }
    }

    pub(crate) fn missing(what: &str, id: &str) -> Self {
        Self::InvalidReference(format!("{what} `{id}`"))
    }
}
