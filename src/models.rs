// Core data models for rlsprobe

use crate::errors::ScanError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Ordinal sensitivity classification. Ordering matters: an entity's severity
/// is the maximum over its sensitive fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Safe => write!(f, "safe"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Outcome of probing one entity's collection endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessState {
    Accessible,
    Blocked,
    Errored,
}

/// How a sensitive field was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DetectionMethod {
    #[serde(rename = "column_name")]
    ColumnName,
    #[serde(rename = "content_pattern")]
    ContentPattern,
}

/// Column metadata from the schema document (or inferred from sampled rows)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub format: Option<String>,
}

impl ColumnInfo {
    /// Column with no schema information, inferred from a sampled row key
    pub fn inferred(name: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: "unknown".to_string(),
            format: None,
        }
    }
}

/// A queryable entity exposed by the REST surface
#[derive(Debug, Clone, Serialize)]
pub struct EntityDescriptor {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

impl EntityDescriptor {
    pub fn new(name: String, columns: Vec<ColumnInfo>) -> Self {
        Self { name, columns }
    }
}

/// A field flagged by the sensitivity classifier
#[derive(Debug, Clone, Serialize)]
pub struct SensitiveField {
    pub field_name: String,
    pub severity: Severity,
    pub detection_method: DetectionMethod,
    pub value_type: Option<String>,
    pub obfuscated_samples: Vec<String>,
}

/// Per-entity scan outcome. Immutable once the scan of that entity completes.
///
/// `severity` is None when access was blocked or the scan errored; otherwise
/// it is the classifier's verdict.
#[derive(Debug, Clone, Serialize)]
pub struct EntityScanResult {
    pub name: String,
    pub access_state: AccessState,
    pub http_status: Option<u16>,
    pub row_count: u64,
    pub sample_rows: Vec<Value>,
    pub columns: Vec<ColumnInfo>,
    pub sensitive_fields: Vec<SensitiveField>,
    pub severity: Option<Severity>,
    pub error: Option<String>,
}

impl EntityScanResult {
    /// Entity rejected with 401/403. Not a vulnerability and not an error.
    pub fn blocked(name: &str, status: u16) -> Self {
        Self {
            name: name.to_string(),
            access_state: AccessState::Blocked,
            http_status: Some(status),
            row_count: 0,
            sample_rows: Vec::new(),
            columns: Vec::new(),
            sensitive_fields: Vec::new(),
            severity: None,
            error: None,
        }
    }

    /// Entity whose scan failed after retries; isolated, never aborts the run.
    pub fn errored(name: &str, status: Option<u16>, error: String) -> Self {
        Self {
            name: name.to_string(),
            access_state: AccessState::Errored,
            http_status: status,
            row_count: 0,
            sample_rows: Vec::new(),
            columns: Vec::new(),
            sensitive_fields: Vec::new(),
            severity: None,
            error: Some(error),
        }
    }
}

/// Aggregate counts over one run's entity results
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    pub total_entities: usize,
    pub vulnerable_entities: usize,
    pub critical_entities: usize,
    pub high_entities: usize,
    pub medium_entities: usize,
    pub safe_entities: usize,
    pub blocked_entities: usize,
    pub total_sensitive_fields: usize,
    pub total_exposed_rows: u64,
}

/// A per-entity error that did not abort the run
#[derive(Debug, Clone, Serialize)]
pub struct PartialFailure {
    pub name: String,
    pub error: String,
}

/// Terminal artifact of one assessment run
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentResult {
    pub endpoint_base_url: String,
    pub timestamp: String,
    pub connection_ok: bool,
    pub entities: Vec<EntityScanResult>,
    pub summary: ScanSummary,
    pub partial_failures: Vec<PartialFailure>,
    pub errors: Vec<String>,
}

/// Discovered endpoint/token pair. Held for one run, never persisted.
#[derive(Debug, Clone)]
pub struct Credential {
    pub endpoint_base_url: String,
    pub bearer_token: String,
}

impl Credential {
    /// Shape validation only: URL-like base, token-like credential.
    pub fn new(endpoint_base_url: &str, bearer_token: &str) -> Result<Self, ScanError> {
        let url = endpoint_base_url.trim().trim_end_matches('/');
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ScanError::InvalidCredential {
                reason: format!("endpoint is not a URL: {}", endpoint_base_url),
            });
        }
        let token = bearer_token.trim();
        if token.is_empty() || token.chars().any(char::is_whitespace) {
            return Err(ScanError::InvalidCredential {
                reason: "bearer token is empty or contains whitespace".to_string(),
            });
        }
        Ok(Self {
            endpoint_base_url: url.to_string(),
            bearer_token: token.to_string(),
        })
    }

    /// URL of a REST resource under this endpoint; empty path is the schema root
    pub fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.endpoint_base_url, path)
    }

    /// Headers every REST request carries: apikey, bearer auth, JSON accept
    pub fn rest_headers(&self) -> Result<HeaderMap, ScanError> {
        let token = HeaderValue::from_str(&self.bearer_token).map_err(|_| {
            ScanError::InvalidCredential {
                reason: "bearer token contains non-header characters".to_string(),
            }
        })?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.bearer_token))
            .map_err(|_| ScanError::InvalidCredential {
                reason: "bearer token contains non-header characters".to_string(),
            })?;
        let mut headers = HeaderMap::new();
        headers.insert("apikey", token);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

/// Scan stage reported through the progress sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStage {
    Connection,
    Enumeration,
    Analysis,
    Complete,
}

/// Best-effort progress notification. Consumers must not mutate these.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    pub message: String,
    pub current: Option<usize>,
    pub total: Option<usize>,
    pub batch_index: Option<usize>,
    pub total_batches: Option<usize>,
    pub summary: Option<ScanSummary>,
    pub partial_failures: Option<usize>,
}

impl ProgressEvent {
    pub fn stage(stage: ProgressStage, message: String) -> Self {
        Self {
            stage,
            message,
            current: None,
            total: None,
            batch_index: None,
            total_batches: None,
            summary: None,
            partial_failures: None,
        }
    }
}
