/*!
 * Job status model shared by the poller and the backend client.
 */

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::errors::ConsoleError;

/// Status of a long-running backend job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    /// Synthetic: the attempt cap was reached before a terminal status
    #[serde(skip_deserializing)]
    Timeout,
    /// Any status string we do not recognise; polling continues
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Whether polling stops at this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Timeout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Timeout => "timeout",
            JobStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Body of a `.../status` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: JobStatus,

    /// Result payload, present once completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Failure detail; usually a string but any JSON is tolerated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,

    /// Free-form progress message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusRecord {
    pub fn with_status(status: JobStatus) -> Self {
        Self {
            status,
            data: None,
            error: None,
            message: None,
        }
    }

    pub fn completed(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::with_status(JobStatus::Completed)
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(Value::String(error.into())),
            ..Self::with_status(JobStatus::Failed)
        }
    }

    /// Failure detail rendered as text
    pub fn error_detail(&self) -> Option<String> {
        match &self.error {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

/// Snapshot of one outstanding poll
#[derive(Debug, Clone, PartialEq)]
pub struct PollJob {
    pub key: String,
    pub status: JobStatus,
    pub interval: Duration,
    /// Successful status observations so far
    pub attempts: u32,
    pub max_attempts: Option<u32>,
    /// Present iff `status` is completed
    pub result: Option<Value>,
    /// Present iff `status` is failed
    pub error: Option<String>,
}

impl PollJob {
    pub(crate) fn new(key: &str, interval: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            key: key.to_string(),
            status: JobStatus::Pending,
            interval,
            attempts: 0,
            max_attempts,
            result: None,
            error: None,
        }
    }
}

/// How a poll ended
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Backend reported completion; `Null` when no payload was sent
    Completed(Value),
    /// Backend reported failure with this detail
    Failed(String),
    /// The attempt cap was exhausted
    TimedOut { attempts: u32 },
}

impl PollOutcome {
    /// Convert into the payload or the matching console error
    pub fn into_result(self, key: &str) -> Result<Value, ConsoleError> {
        match self {
            PollOutcome::Completed(data) => Ok(data),
            PollOutcome::Failed(detail) => Err(ConsoleError::RemoteFailure(detail)),
            PollOutcome::TimedOut { attempts } => Err(ConsoleError::Timeout {
                key: key.to_string(),
                attempts,
            }),
        }
    }
}
