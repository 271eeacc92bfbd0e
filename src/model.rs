//! Shared entity model
//!
//! Value types passed between the request pipeline, the codecs and the task
//! poller: entity references and server-side task descriptors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pointer to a remote entity by kind and UUID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub kind: String,
    pub uuid: String,
    /// Denormalized display name, may be absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Reference {
    pub fn new(kind: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            uuid: uuid.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Status of a server-side task
///
/// Statuses the server adds later are kept verbatim in [`TaskStatus::Other`]
/// rather than failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Queued,
    Pending,
    Running,
    Succeeded,
    Failed,
    InvalidUuid,
    DeletePending,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Queued => "QUEUED",
            TaskStatus::Pending => "PENDING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Succeeded => "SUCCEEDED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::InvalidUuid => "INVALID_UUID",
            TaskStatus::DeletePending => "DELETE_PENDING",
            TaskStatus::Other(s) => s,
        }
    }

    /// FAILED and INVALID_UUID
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::Failed | TaskStatus::InvalidUuid)
    }

    /// No further transition happens from these
    pub fn is_terminal(&self) -> bool {
        self.is_failure() || *self == TaskStatus::Succeeded
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "QUEUED" => TaskStatus::Queued,
            "PENDING" => TaskStatus::Pending,
            "RUNNING" => TaskStatus::Running,
            "SUCCEEDED" => TaskStatus::Succeeded,
            "FAILED" => TaskStatus::Failed,
            "INVALID_UUID" => TaskStatus::InvalidUuid,
            "DELETE_PENDING" => TaskStatus::DeletePending,
            _ => TaskStatus::Other(s),
        }
    }
}

impl From<&str> for TaskStatus {
    fn from(s: &str) -> Self {
        TaskStatus::from(s.to_string())
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side asynchronous job, as returned by `GET tasks/{uuid}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub uuid: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage_complete: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_reference_list: Vec<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_reference: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<DateTime<Utc>>,
}

impl Task {
    /// Minimal task with only identity and status set
    pub fn new(uuid: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            uuid: uuid.into(),
            status,
            error_detail: None,
            progress_message: None,
            operation_type: None,
            percentage_complete: None,
            api_version: None,
            entity_reference_list: Vec::new(),
            cluster_reference: None,
            creation_time: None,
            completion_time: None,
        }
    }

    /// Failure text carrying both the error detail and the progress message
    pub fn failure_message(&self) -> String {
        format!(
            "error_detail: {}, progress_message: {}",
            self.error_detail.as_deref().unwrap_or_default(),
            self.progress_message.as_deref().unwrap_or_default()
        )
    }
}

/// Execution context attached to the status of a mutating call's response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub task_uuid: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_omits_missing_name() {
        let r = Reference::new("vm", "0001");
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({"kind": "vm", "uuid": "0001"})
        );

        let named = Reference::new("cluster", "0002").with_name("prod");
        assert_eq!(named.name.as_deref(), Some("prod"));
    }

    #[test]
    fn test_task_status_parses_known_and_unknown() {
        assert_eq!(TaskStatus::from("RUNNING"), TaskStatus::Running);
        assert_eq!(TaskStatus::from("DELETE_PENDING"), TaskStatus::DeletePending);
        assert_eq!(
            TaskStatus::from("ABORTED"),
            TaskStatus::Other("ABORTED".to_string())
        );
        assert_eq!(TaskStatus::Other("ABORTED".into()).to_string(), "ABORTED");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(TaskStatus::Succeeded.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::InvalidUuid.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(!TaskStatus::DeletePending.is_terminal());
    }

    #[test]
    fn test_task_deserializes_from_api_payload() {
        let task: Task = serde_json::from_value(json!({
            "uuid": "5f6e",
            "status": "FAILED",
            "error_detail": "disk full",
            "progress_message": "create_vm",
            "percentage_complete": 40,
            "entity_reference_list": [{"kind": "vm", "uuid": "aa"}],
            "creation_time": "2024-01-02T03:04:05Z"
        }))
        .unwrap();

        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.entity_reference_list.len(), 1);
        assert!(task.creation_time.is_some());

        let msg = task.failure_message();
        assert!(msg.contains("disk full"));
        assert!(msg.contains("create_vm"));
    }
}
