use std::{collections::BTreeMap, fmt, str::FromStr};

/// Caller-facing instance name (the label the web panel shows).
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ServerName(pub String);

impl ServerName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of the toolchain script for an instance. Also names its lock file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PhysicalId(pub String);

impl PhysicalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhysicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-observable server state.
///
/// `Stopped`, `Running` and `Unknown` are derived from the lock file and the
/// live probe. `Starting`, `ShuttingDown` and `Updating` are only ever handed
/// out by the dispatcher in the response to the request that caused them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ServerState {
    Stopped,
    Starting,
    Running,
    ShuttingDown,
    Updating,
    Unknown,
}

impl ServerState {
    pub const ALL: [ServerState; 6] = [
        ServerState::Stopped,
        ServerState::Starting,
        ServerState::Running,
        ServerState::ShuttingDown,
        ServerState::Updating,
        ServerState::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ServerState::Stopped => "Stopped",
            ServerState::Starting => "Starting",
            ServerState::Running => "Running",
            ServerState::ShuttingDown => "ShuttingDown",
            ServerState::Updating => "Updating",
            ServerState::Unknown => "Unknown",
        }
    }

    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ServerState::Starting | ServerState::ShuttingDown | ServerState::Updating
        )
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ServerAction {
    Start,
    Stop,
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown action: {}", self.0)
    }
}

impl std::error::Error for UnknownAction {}

impl ServerAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ServerAction::Start => "Start",
            ServerAction::Stop => "Stop",
            ServerAction::Update => "Update",
        }
    }

    /// Argument passed to the toolchain script.
    pub fn verb(self) -> &'static str {
        match self {
            ServerAction::Start => "start",
            ServerAction::Stop => "stop",
            ServerAction::Update => "update",
        }
    }

    /// State reported to the caller right after the action was accepted.
    pub fn optimistic_state(self) -> ServerState {
        match self {
            ServerAction::Start => ServerState::Starting,
            ServerAction::Stop => ServerState::ShuttingDown,
            ServerAction::Update => ServerState::Updating,
        }
    }
}

impl fmt::Display for ServerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Action names are matched exactly; the web panel sends them verbatim.
impl FromStr for ServerAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Start" => Ok(ServerAction::Start),
            "Stop" => Ok(ServerAction::Stop),
            "Update" => Ok(ServerAction::Update),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

pub type ServerStatuses = BTreeMap<ServerName, ServerState>;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StatusResponse {
    pub servers: ServerStatuses,
}

/// Inbound write request. `action` stays a plain string so that the server
/// name can be validated before the action.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ActionRequest {
    pub server: String,
    pub action: String,
}

/// Result of one dispatched action, recorded once the toolchain script exits.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ActionOutcome {
    pub server: ServerName,
    pub action: ServerAction,
    pub started_at_unix_ms: u64,
    pub finished_at_unix_ms: u64,
    pub ok: bool,
    pub message: Option<String>,
}
