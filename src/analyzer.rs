// Batched concurrent assessment for rlsprobe
//
// One retried fetch per enumerated entity, in bounded-size concurrent
// groups. Groups run strictly in enumeration order; within a group the
// scans run concurrently and are gathered before the group's progress
// event fires. A failure scanning one entity never aborts the run.

use crate::client::{ProbeClient, DEFAULT_MAX_ATTEMPTS};
use crate::errors::ScanError;
use crate::models::{
    AssessmentResult, Credential, EntityDescriptor, EntityScanResult, PartialFailure,
    ProgressEvent, ProgressStage, ScanSummary,
};
use crate::schema;
use crate::sensitivity::{classify_entity, summarize, SAMPLE_ROW_LIMIT};
use chrono::Utc;
use futures::future::join_all;
use reqwest::header::{HeaderValue, CONTENT_RANGE};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

pub const DEFAULT_BATCH_SIZE: usize = 5;
const BATCH_PAUSE_MS: u64 = 200;

/// Tuning knobs for one run. `cancel` is checked at coarse checkpoints;
/// an in-flight batch cannot be interrupted.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub batch_size: usize,
    pub sample_limit: usize,
    pub max_attempts: u32,
    pub batch_pause: Duration,
    pub cancel: Arc<AtomicBool>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            sample_limit: SAMPLE_ROW_LIMIT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            batch_pause: Duration::from_millis(BATCH_PAUSE_MS),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Fire-and-forget progress publisher. Publishing never blocks and never
/// fails the run; a dropped receiver just discards events.
#[derive(Clone, Default)]
pub struct ProgressSink {
    tx: Option<UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    /// Sink that discards every event
    pub fn none() -> Self {
        Self { tx: None }
    }

    /// Sink paired with a receiver for a live listener
    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn publish(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            // Listener may be gone; dropped events are fine
            let _ = tx.send(event);
        }
    }
}

/// Run a full exposure assessment against one endpoint.
///
/// Connection test and enumeration failures abort the run early with a
/// "could not start" result: `connection_ok` false or a populated `errors`
/// list, and empty `entities`. Per-entity failures are isolated into that
/// entity's result and `partial_failures`.
pub async fn run_assessment(
    credential: &Credential,
    options: &ScanOptions,
    progress: &ProgressSink,
) -> AssessmentResult {
    let mut result = AssessmentResult {
        endpoint_base_url: credential.endpoint_base_url.clone(),
        timestamp: Utc::now().to_rfc3339(),
        connection_ok: false,
        entities: Vec::new(),
        summary: ScanSummary::default(),
        partial_failures: Vec::new(),
        errors: Vec::new(),
    };

    let client = match ProbeClient::new(options.max_attempts) {
        Ok(client) => client,
        Err(e) => {
            result.errors.push(e.to_string());
            return result;
        }
    };

    if options.cancel.load(Ordering::Relaxed) {
        result.errors.push("scan cancelled".to_string());
        return result;
    }

    progress.publish(ProgressEvent::stage(
        ProgressStage::Connection,
        "Testing API connection...".to_string(),
    ));
    let connection = schema::test_connection(&client, credential).await;
    result.connection_ok = connection.ok;
    if !connection.ok {
        let error = ScanError::ConnectionFailed {
            reason: match connection.status {
                Some(status) => format!("HTTP {}", status),
                None => "no response from endpoint".to_string(),
            },
        };
        result.errors.push(error.to_string());
        return result;
    }

    if options.cancel.load(Ordering::Relaxed) {
        result.errors.push("scan cancelled".to_string());
        return result;
    }

    progress.publish(ProgressEvent::stage(
        ProgressStage::Enumeration,
        "Enumerating exposed entities...".to_string(),
    ));
    let enumerated = match schema::enumerate(&client, credential).await {
        Ok(enumerated) => enumerated,
        Err(e) => {
            result.errors.push(format!("failed to enumerate entities: {}", e));
            return result;
        }
    };

    let entities = enumerated.entities;
    let total = entities.len();
    progress.publish(ProgressEvent {
        total: Some(total),
        ..ProgressEvent::stage(
            ProgressStage::Enumeration,
            format!("Found {} entities", total),
        )
    });

    let total_batches = total.div_ceil(options.batch_size.max(1));
    debug!(total, total_batches, "starting batched analysis");

    for (batch_index, batch) in entities.chunks(options.batch_size.max(1)).enumerate() {
        if options.cancel.load(Ordering::Relaxed) {
            result.errors.push("scan cancelled".to_string());
            break;
        }

        let scans = batch
            .iter()
            .map(|descriptor| scan_entity(&client, credential, descriptor, options.sample_limit));

        // Barrier: the whole group lands before its progress event fires
        for outcome in join_all(scans).await {
            let ScanOutcome { entity, failure } = outcome;
            if let Some(error) = failure {
                warn!(entity = %entity.name, error = %error, "entity scan failed");
                result.partial_failures.push(PartialFailure {
                    name: entity.name.clone(),
                    error,
                });
            }
            result.entities.push(entity);
        }

        progress.publish(ProgressEvent {
            current: Some(result.entities.len()),
            total: Some(total),
            batch_index: Some(batch_index + 1),
            total_batches: Some(total_batches),
            ..ProgressEvent::stage(
                ProgressStage::Analysis,
                format!("Analyzed {}/{} entities", result.entities.len(), total),
            )
        });

        // Stay under target rate limits between groups
        if batch_index + 1 < total_batches {
            tokio::time::sleep(options.batch_pause).await;
        }
    }

    result.summary = summarize(&result.entities);
    progress.publish(ProgressEvent {
        summary: Some(result.summary.clone()),
        partial_failures: Some(result.partial_failures.len()),
        ..ProgressEvent::stage(ProgressStage::Complete, "Scan complete".to_string())
    });

    result
}

struct ScanOutcome {
    entity: EntityScanResult,
    failure: Option<String>,
}

impl ScanOutcome {
    fn clean(entity: EntityScanResult) -> Self {
        Self {
            entity,
            failure: None,
        }
    }

    fn failed(entity: EntityScanResult, error: String) -> Self {
        Self {
            entity,
            failure: Some(error),
        }
    }
}

/// Scan a single entity: one retried GET for a row sample plus exact count.
async fn scan_entity(
    client: &ProbeClient,
    credential: &Credential,
    descriptor: &EntityDescriptor,
    sample_limit: usize,
) -> ScanOutcome {
    let name = &descriptor.name;
    let url = credential.rest_url(&format!("{}?limit={}", name, sample_limit));

    let mut headers = match credential.rest_headers() {
        Ok(headers) => headers,
        Err(e) => {
            return ScanOutcome::failed(
                EntityScanResult::errored(name, None, e.to_string()),
                e.to_string(),
            )
        }
    };
    headers.insert("prefer", HeaderValue::from_static("count=exact"));

    let response = match client.fetch_with_retry(&url, &headers).await {
        Ok(response) => response,
        Err(e) => {
            return ScanOutcome::failed(
                EntityScanResult::errored(name, e.status(), e.to_string()),
                e.to_string(),
            )
        }
    };

    let status = response.status().as_u16();

    if status == 401 || status == 403 {
        return ScanOutcome::clean(EntityScanResult::blocked(name, status));
    }

    if !response.status().is_success() {
        let error = ScanError::ClientRejection {
            url: url.clone(),
            status,
        };
        return ScanOutcome::failed(
            EntityScanResult::errored(name, Some(status), error.to_string()),
            error.to_string(),
        );
    }

    // Exact total arrives as the tail of the Content-Range header
    let exact_count = response
        .headers()
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range_total);

    let rows: Vec<Value> = match response.json::<Value>().await {
        Ok(Value::Array(rows)) => rows,
        Ok(_) => Vec::new(),
        Err(e) => {
            let error = format!("invalid response body from {}: {}", url, e);
            return ScanOutcome::failed(
                EntityScanResult::errored(name, Some(status), error.clone()),
                error,
            );
        }
    };

    let sample: Vec<Value> = rows.into_iter().take(sample_limit).collect();

    let mut entity = classify_entity(name, &sample, &descriptor.columns);
    entity.http_status = Some(status);
    entity.row_count = exact_count.unwrap_or(sample.len() as u64);

    ScanOutcome::clean(entity)
}

fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.parse().ok()
}
