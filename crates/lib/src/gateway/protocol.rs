//! Gateway HTTP API types: the response envelope and request/query shapes.

use crate::params::ParamMap;
use serde::{Deserialize, Serialize};

/// Wire envelope: `{ "error": bool, "message", "data"?, "meta"? }`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub error: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

impl Envelope {
    pub fn ok(message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            error: false,
            message: message.into(),
            data: Some(data),
            meta: None,
        }
    }

    pub fn ok_paged(
        message: impl Into<String>,
        data: serde_json::Value,
        meta: PageMeta,
    ) -> Self {
        Self {
            error: false,
            message: message.into(),
            data: Some(data),
            meta: Some(meta),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            data: None,
            meta: None,
        }
    }
}

/// Pagination echo for list responses.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
}

/// Body of `POST /api/commands/:id/execute`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteParams {
    #[serde(default)]
    pub parameters: ParamMap,
}

/// Success payload of an execute call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResult {
    pub execution_id: u64,
    pub command: String,
    pub result: String,
    pub duration_ms: u64,
    pub status: String,
}

/// Query for `GET /api/commands`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// Common limit/offset query. Limit defaults to 10 (min 1), offset to 0.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

impl PageQuery {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(10).max(1)
    }

    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

/// Query for `GET /api/activities`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default, rename = "type")]
    pub activity_type: Option<String>,
}

impl ActivityQuery {
    pub fn page(&self) -> PageQuery {
        PageQuery {
            limit: self.limit,
            offset: self.offset,
        }
    }
}
