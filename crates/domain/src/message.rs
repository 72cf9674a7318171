//! Identity and timing carried by every command and query.
//!
//! Commands and queries are numbered in separate id spaces so audit trails
//! and routers can tell an intent to change state from an intent to read.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(Uuid);

impl CommandId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cmd-{}", self.0)
    }
}

/// Unique identifier for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(Uuid);

impl QueryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for QueryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for QueryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "qry-{}", self.0)
    }
}

/// When and under which id a command was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMetadata {
    pub command_id: CommandId,
    pub issued_at: DateTime<Utc>,
}

impl CommandMetadata {
    /// Stamps a new command with a fresh id and the current time.
    pub fn new() -> Self {
        Self {
            command_id: CommandId::new(),
            issued_at: Utc::now(),
        }
    }

    /// Metadata entries attached to every event the command produces.
    pub fn to_event_metadata(&self) -> HashMap<String, serde_json::Value> {
        HashMap::from([
            (
                "command_id".to_string(),
                serde_json::Value::String(self.command_id.as_uuid().to_string()),
            ),
            (
                "command_issued_at".to_string(),
                serde_json::Value::String(self.issued_at.to_rfc3339()),
            ),
        ])
    }
}

impl Default for CommandMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// When and under which id a query was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryMetadata {
    pub query_id: QueryId,
    pub issued_at: DateTime<Utc>,
}

impl QueryMetadata {
    pub fn new() -> Self {
        Self {
            query_id: QueryId::new(),
            issued_at: Utc::now(),
        }
    }
}

impl Default for QueryMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// An intent to read state.
pub trait Query: Send + Sync {
    fn metadata(&self) -> &QueryMetadata;

    fn query_id(&self) -> QueryId {
        self.metadata().query_id
    }
}
