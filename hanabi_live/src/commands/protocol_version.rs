//! Protocol versioning of the command wire format.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version carried in the `"v"` field of every command.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ProtocolVersion {
    /// Original clients; they never send a `"v"` field
    V1,
    /// Versioned commands with hypotheticals and tags
    V2,
}

impl ProtocolVersion {
    pub fn current() -> Self {
        ProtocolVersion::V2
    }

    /// The server still understands every released client.
    pub fn is_compatible_with(&self, other: &ProtocolVersion) -> bool {
        matches!(
            (self, other),
            (ProtocolVersion::V1 | ProtocolVersion::V2, ProtocolVersion::V1 | ProtocolVersion::V2)
        )
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl TryFrom<u8> for ProtocolVersion {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            other => Err(format!("unsupported protocol version {other}")),
        }
    }
}

impl From<ProtocolVersion> for u8 {
    fn from(version: ProtocolVersion) -> Self {
        match version {
            ProtocolVersion::V1 => 1,
            ProtocolVersion::V2 => 2,
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", u8::from(*self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_version() {
        assert_eq!(ProtocolVersion::current(), ProtocolVersion::V2);
        assert!(ProtocolVersion::V1.is_compatible_with(&ProtocolVersion::current()));
    }

    #[test]
    fn test_wire_format() {
        assert_eq!(serde_json::to_string(&ProtocolVersion::V2).unwrap(), "2");
        let v1: ProtocolVersion = serde_json::from_str("1").unwrap();
        assert_eq!(v1, ProtocolVersion::V1);
        assert!(serde_json::from_str::<ProtocolVersion>("7").is_err());
    }
}
