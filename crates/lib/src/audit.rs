//! Execution audit trail and activity log.
//!
//! One `ExecutionRecord` is appended per invocation attempt that reaches the
//! rendering stage, success or failure; records are never updated or deleted
//! here. Activity entries are fire-and-forget: a failed activity write is
//! logged and never affects the execution result.

use crate::store::{load_json, save_json, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failure,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failure => "failure",
        }
    }
}

/// Immutable record of one invocation attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: u64,
    pub command_id: u64,
    pub operator_id: u64,
    /// Caller-supplied parameter map, serialized as JSON.
    pub parameters: String,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub error_message: String,
    pub duration_ms: u64,
    #[serde(default)]
    pub ip_address: String,
    pub created_at: DateTime<Utc>,
}

/// Everything the auditor needs to append one record.
#[derive(Debug, Clone)]
pub struct ExecutionAttempt {
    pub command_id: u64,
    pub operator_id: u64,
    pub parameters: String,
    pub status: ExecutionStatus,
    pub result: String,
    pub error_message: String,
    pub duration_ms: u64,
    pub ip_address: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecutionData {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    records: Vec<ExecutionRecord>,
}

/// Append-only execution history (`executions.json` in the data directory).
pub struct ExecutionStore {
    path: PathBuf,
    inner: RwLock<ExecutionData>,
}

impl ExecutionStore {
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let data: ExecutionData = load_json(&path).await;
        Self {
            path,
            inner: RwLock::new(data),
        }
    }

    /// Append one record and persist. The only write path; nothing mutates or
    /// removes existing records.
    pub async fn append(&self, attempt: ExecutionAttempt) -> Result<ExecutionRecord, StoreError> {
        let mut data = self.inner.write().await;
        data.next_id = data.next_id.max(1);
        let record = ExecutionRecord {
            id: data.next_id,
            command_id: attempt.command_id,
            operator_id: attempt.operator_id,
            parameters: attempt.parameters,
            status: attempt.status,
            result: attempt.result,
            error_message: attempt.error_message,
            duration_ms: attempt.duration_ms,
            ip_address: attempt.ip_address,
            created_at: Utc::now(),
        };
        data.next_id += 1;
        data.records.push(record.clone());
        save_json(&self.path, &*data)?;
        Ok(record)
    }

    /// History for one command, newest first, with the unpaged total.
    pub async fn list_for_command(
        &self,
        command_id: u64,
        limit: usize,
        offset: usize,
    ) -> (Vec<ExecutionRecord>, u64) {
        self.page(|r| r.command_id == command_id, limit, offset).await
    }

    /// History for one operator, newest first, with the unpaged total.
    pub async fn list_for_operator(
        &self,
        operator_id: u64,
        limit: usize,
        offset: usize,
    ) -> (Vec<ExecutionRecord>, u64) {
        self.page(|r| r.operator_id == operator_id, limit, offset).await
    }

    async fn page<F>(&self, keep: F, limit: usize, offset: usize) -> (Vec<ExecutionRecord>, u64)
    where
        F: Fn(&ExecutionRecord) -> bool,
    {
        let data = self.inner.read().await;
        let total = data.records.iter().filter(|r| keep(r)).count() as u64;
        let page = data
            .records
            .iter()
            .rev()
            .filter(|r| keep(r))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        (page, total)
    }
}

/// One entry in the general activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub id: u64,
    pub operator_id: u64,
    pub activity_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityData {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    records: Vec<ActivityRecord>,
}

/// Activity log sink. The pipeline records through this seam so the log's
/// storage stays swappable and failures stay invisible to callers.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn record(
        &self,
        operator_id: u64,
        activity_type: &str,
        description: &str,
        ip_address: &str,
        user_agent: &str,
    );
}

/// Append-only activity log (`activities.json` in the data directory).
pub struct ActivityStore {
    path: PathBuf,
    inner: RwLock<ActivityData>,
}

impl ActivityStore {
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let data: ActivityData = load_json(&path).await;
        Self {
            path,
            inner: RwLock::new(data),
        }
    }

    pub async fn append(
        &self,
        operator_id: u64,
        activity_type: &str,
        description: &str,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<ActivityRecord, StoreError> {
        let mut data = self.inner.write().await;
        data.next_id = data.next_id.max(1);
        let record = ActivityRecord {
            id: data.next_id,
            operator_id,
            activity_type: activity_type.to_string(),
            description: description.to_string(),
            ip_address: ip_address.to_string(),
            user_agent: user_agent.to_string(),
            created_at: Utc::now(),
        };
        data.next_id += 1;
        data.records.push(record.clone());
        save_json(&self.path, &*data)?;
        Ok(record)
    }

    /// Newest first, optional type filter, with the unpaged total.
    pub async fn list(
        &self,
        activity_type: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> (Vec<ActivityRecord>, u64) {
        let data = self.inner.read().await;
        let keep = |r: &&ActivityRecord| activity_type.map_or(true, |t| r.activity_type == t);
        let total = data.records.iter().filter(keep).count() as u64;
        let page = data
            .records
            .iter()
            .rev()
            .filter(keep)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        (page, total)
    }
}

#[async_trait]
impl ActivitySink for ActivityStore {
    async fn record(
        &self,
        operator_id: u64,
        activity_type: &str,
        description: &str,
        ip_address: &str,
        user_agent: &str,
    ) {
        if let Err(e) = self
            .append(operator_id, activity_type, description, ip_address, user_agent)
            .await
        {
            log::warn!("activity log write failed: {}", e);
        }
    }
}

/// Writes the audit trail for the execution pipeline: one execution record per
/// attempt, plus an activity entry for completed executions.
pub struct Auditor {
    executions: Arc<ExecutionStore>,
    activities: Arc<dyn ActivitySink>,
}

impl Auditor {
    pub fn new(executions: Arc<ExecutionStore>, activities: Arc<dyn ActivitySink>) -> Self {
        Self {
            executions,
            activities,
        }
    }

    pub async fn log_execution(
        &self,
        attempt: ExecutionAttempt,
    ) -> Result<ExecutionRecord, StoreError> {
        self.executions.append(attempt).await
    }

    pub async fn record_activity(
        &self,
        operator_id: u64,
        activity_type: &str,
        description: &str,
        ip_address: &str,
        user_agent: &str,
    ) {
        self.activities
            .record(operator_id, activity_type, description, ip_address, user_agent)
            .await;
    }
}
