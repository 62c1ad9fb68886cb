//! API call history
//!
//! Every request the HTTP transport sends is recorded here together with an
//! equivalent cURL command, so a user can replay exactly what the explorer
//! asked the graph API. The log is bounded and newest-first.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Default number of calls kept
pub const DEFAULT_CAPACITY: usize = 50;

/// A request to render as cURL
#[derive(Debug, Clone)]
pub struct CurlRequest {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

/// One recorded API call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCallLog {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub curl: String,
    pub method: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Bounded, newest-first log of API calls
#[derive(Debug)]
pub struct CallLog {
    capacity: usize,
    calls: Mutex<VecDeque<ApiCallLog>>,
}

impl CallLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            calls: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    /// Record a call before its response arrives; returns the entry id
    pub fn record(&self, request: &CurlRequest) -> String {
        let entry = ApiCallLog {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            curl: to_curl(request),
            method: request.method.clone(),
            url: request.url.clone(),
            status: None,
            duration_ms: None,
            error: None,
        };
        let id = entry.id.clone();

        let mut calls = self.lock();
        calls.push_front(entry);
        calls.truncate(self.capacity);
        id
    }

    /// Attach the outcome of a recorded call; unknown ids are ignored
    pub fn update(
        &self,
        id: &str,
        status: Option<u16>,
        duration_ms: Option<u64>,
        error: Option<String>,
    ) {
        let mut calls = self.lock();
        if let Some(call) = calls.iter_mut().find(|c| c.id == id) {
            if status.is_some() {
                call.status = status;
            }
            if duration_ms.is_some() {
                call.duration_ms = duration_ms;
            }
            if error.is_some() {
                call.error = error;
            }
        }
    }

    /// Snapshot of the log, newest first
    pub fn entries(&self) -> Vec<ApiCallLog> {
        self.lock().iter().cloned().collect()
    }

    /// cURL commands of the logged calls, oldest first so they replay in order
    pub fn curl_commands(&self) -> Vec<String> {
        self.lock().iter().rev().map(|c| c.curl.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<ApiCallLog>> {
        // a poisoned log is still a usable log
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for CallLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Quote for a POSIX shell
fn shell_escape(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Render a request as a cURL command line
pub fn to_curl(request: &CurlRequest) -> String {
    let mut parts = vec![
        "curl".to_string(),
        "-X".to_string(),
        request.method.clone(),
        shell_escape(&request.url),
    ];

    for (key, value) in &request.headers {
        parts.push("-H".to_string());
        parts.push(shell_escape(&format!("{key}: {value}")));
    }

    if let Some(body) = &request.body {
        let body = match body {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        parts.push("-d".to_string());
        parts.push(shell_escape(&body));
    }

    parts.join(" ")
}
