//! Mutation queue model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// A unique identifier for a queued mutation, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MutationId(Uuid);

impl MutationId {
    /// Create a new unique mutation ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for MutationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MutationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Kind of write a mutation performs against its resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    pub const ALL: [Self; 3] = [Self::Create, Self::Update, Self::Delete];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MutationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!(
                "Unknown mutation type: {other}"
            ))),
        }
    }
}

/// Domain entity a mutation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Job,
    Equipment,
    Inspection,
    Invoice,
    Report,
}

impl Resource {
    pub const ALL: [Self; 5] = [
        Self::Job,
        Self::Equipment,
        Self::Inspection,
        Self::Invoice,
        Self::Report,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Job => "job",
            Self::Equipment => "equipment",
            Self::Inspection => "inspection",
            Self::Invoice => "invoice",
            Self::Report => "report",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "job" => Ok(Self::Job),
            "equipment" => Ok(Self::Equipment),
            "inspection" => Ok(Self::Inspection),
            "invoice" => Ok(Self::Invoice),
            "report" => Ok(Self::Report),
            other => Err(Error::InvalidInput(format!("Unknown resource: {other}"))),
        }
    }
}

/// A pending write captured for later remote application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationItem {
    /// Unique identifier
    pub id: MutationId,
    /// Operation kind
    #[serde(rename = "type")]
    pub kind: MutationKind,
    /// Target entity
    pub resource: Resource,
    /// Opaque operation data, interpreted only by the adapter
    pub payload: serde_json::Value,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Number of failed attempts so far
    pub retry_count: u32,
    /// Last failure message
    #[serde(default)]
    pub error: Option<String>,
}

impl MutationItem {
    /// Create a fresh mutation with no attempts recorded
    #[must_use]
    pub fn new(kind: MutationKind, resource: Resource, payload: serde_json::Value) -> Self {
        Self {
            id: MutationId::new(),
            kind,
            resource,
            payload,
            created_at: crate::util::unix_timestamp_millis(),
            retry_count: 0,
            error: None,
        }
    }

    /// Record a failed attempt
    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.retry_count = self.retry_count.saturating_add(1);
        self.error = Some(message.into());
    }
}

/// A mutation that exhausted its retry budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedMutation {
    #[serde(flatten)]
    pub item: MutationItem,
    /// When the item was moved to the dead-letter store (Unix ms)
    pub failed_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mutation_id_unique() {
        let id1 = MutationId::new();
        let id2 = MutationId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_mutation_id_parse() {
        let id = MutationId::new();
        let parsed: MutationId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_mutation_new() {
        let item = MutationItem::new(
            MutationKind::Create,
            Resource::Job,
            json!({ "title": "Blower door test" }),
        );
        assert_eq!(item.retry_count, 0);
        assert!(item.error.is_none());
        assert!(item.created_at > 0);
    }

    #[test]
    fn test_record_failure_increments_and_keeps_message() {
        let mut item = MutationItem::new(MutationKind::Update, Resource::Equipment, json!({}));
        item.record_failure("timeout");
        item.record_failure("HTTP 502");
        assert_eq!(item.retry_count, 2);
        assert_eq!(item.error.as_deref(), Some("HTTP 502"));
    }

    #[test]
    fn test_kind_and_resource_parse_case_insensitive() {
        assert_eq!("update".parse::<MutationKind>().unwrap(), MutationKind::Update);
        assert_eq!(" Equipment ".parse::<Resource>().unwrap(), Resource::Equipment);
        assert!("archive".parse::<MutationKind>().is_err());
        assert!("vehicle".parse::<Resource>().is_err());
    }

    #[test]
    fn test_serialized_shape_uses_wire_names() {
        let item = MutationItem::new(MutationKind::Create, Resource::Inspection, json!({ "a": 1 }));
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "CREATE");
        assert_eq!(value["resource"], "inspection");
        assert_eq!(value["retryCount"], 0);
        assert!(value.get("createdAt").is_some());
    }
}
