// Schema discovery for rlsprobe
// Parses the root OpenAPI-style schema document into entity descriptors

use crate::client::ProbeClient;
use crate::errors::ScanError;
use crate::models::{ColumnInfo, Credential, EntityDescriptor};
use serde_json::Value;
use tracing::debug;

/// Outcome of the pre-enumeration connection test
#[derive(Debug, Clone, Copy)]
pub struct ConnectionStatus {
    pub ok: bool,
    pub status: Option<u16>,
}

/// Entities plus the raw schema document they came from.
/// The document lives only for the duration of one scan.
#[derive(Debug)]
pub struct EnumeratedSchema {
    pub entities: Vec<EntityDescriptor>,
    pub raw_schema: Value,
}

/// Probe the schema root once to confirm the credential is accepted at all.
pub async fn test_connection(client: &ProbeClient, credential: &Credential) -> ConnectionStatus {
    let headers = match credential.rest_headers() {
        Ok(h) => h,
        Err(_) => return ConnectionStatus { ok: false, status: None },
    };
    match client.fetch_with_retry(&credential.rest_url(""), &headers).await {
        Ok(response) => ConnectionStatus {
            ok: response.status().is_success(),
            status: Some(response.status().as_u16()),
        },
        Err(_) => ConnectionStatus { ok: false, status: None },
    }
}

/// Fetch and parse the root schema document.
///
/// Entity names come strictly from the document's `definitions` map; path
/// listings duplicate entities and include parameterized segments, so they
/// are never consulted. Names containing path-parameter braces or empty
/// after trimming are dropped; the survivors are de-duplicated in
/// first-seen order.
pub async fn enumerate(
    client: &ProbeClient,
    credential: &Credential,
) -> Result<EnumeratedSchema, ScanError> {
    let url = credential.rest_url("");
    let headers = credential.rest_headers()?;
    let response = client.fetch_with_retry(&url, &headers).await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ScanError::SchemaUnavailable {
            status: status.as_u16(),
        });
    }

    let raw_schema: Value = response.json().await.map_err(|source| ScanError::Transport {
        url: url.clone(),
        source,
    })?;

    let mut names: Vec<String> = Vec::new();
    if let Some(definitions) = raw_schema.get("definitions").and_then(|d| d.as_object()) {
        for name in definitions.keys() {
            let trimmed = name.trim();
            if trimmed.is_empty() || trimmed.contains('{') || trimmed.contains('}') {
                continue;
            }
            if !names.iter().any(|n| n == trimmed) {
                names.push(trimmed.to_string());
            }
        }
    }

    debug!(entities = names.len(), "schema enumerated");

    let entities = names
        .into_iter()
        .map(|name| {
            let columns = columns_from_definition(&raw_schema, &name);
            EntityDescriptor::new(name, columns)
        })
        .collect();

    Ok(EnumeratedSchema {
        entities,
        raw_schema,
    })
}

/// Column metadata from one definition's property list. An entity with no
/// matching definition gets an empty column list, backfilled later from
/// sampled row keys.
pub fn columns_from_definition(schema: &Value, entity_name: &str) -> Vec<ColumnInfo> {
    let mut columns = Vec::new();

    let properties = schema
        .get("definitions")
        .and_then(|d| d.get(entity_name))
        .and_then(|def| def.get("properties"))
        .and_then(|p| p.as_object());

    if let Some(properties) = properties {
        for (column_name, column_def) in properties {
            columns.push(ColumnInfo {
                name: column_name.clone(),
                data_type: column_def
                    .get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or("unknown")
                    .to_string(),
                format: column_def
                    .get("format")
                    .and_then(|f| f.as_str())
                    .map(|f| f.to_string()),
            });
        }
    }

    columns
}
