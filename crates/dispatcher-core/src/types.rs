use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Which transport a user's message arrived on, or should be delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Surface {
    WebChat,
    PublicWeb,
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Surface::WebChat => write!(f, "web-chat"),
            Surface::PublicWeb => write!(f, "public-web"),
        }
    }
}

impl std::str::FromStr for Surface {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "web-chat" => Ok(Surface::WebChat),
            "public-web" => Ok(Surface::PublicWeb),
            other => Err(format!("unknown surface: {other}")),
        }
    }
}

/// Identifies a user uniquely across the whole system.
///
/// Two different `external_user_id`s on different surfaces are two different
/// users; there is no cross-surface identity merge in this design.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserKey {
    pub surface: Surface,
    pub external_user_id: String,
}

impl UserKey {
    pub fn new(surface: Surface, external_user_id: impl Into<String>) -> Self {
        Self {
            surface,
            external_user_id: external_user_id.into(),
        }
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.surface, self.external_user_id)
    }
}

/// Opaque session identifier (UUIDv7 — time-sortable for log correlation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifies a human support agent in the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns the current instant as an RFC3339 string, the timestamp format
/// used throughout persisted rows and over-the-wire events.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
