// Sensitive Field Classification
//
// STATIC ANALYSIS of column names and sampled values. This module never
// touches the network; the analyzer hands it rows it already fetched.
//
// Two independent detection passes, merged by field name:
// - Column-name pass: curated pattern families over each column name,
//   severity from a fixed term table. First claim on a field wins.
// - Content pass: strict value-shape validators over string values of the
//   first few sampled rows; unclaimed hits enter at severity High with
//   obfuscated sample values.
//
// Example:
//   Input:  entity "profiles", rows [{"email": "alice@example.com", ...}]
//   Output: EntityScanResult {
//             severity: High,
//             sensitive_fields: [{field_name: "email", ...}]
//           }

use crate::models::{
    AccessState, ColumnInfo, DetectionMethod, EntityScanResult, SensitiveField, Severity,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

/// Rows kept as sample data on each entity result
pub const SAMPLE_ROW_LIMIT: usize = 15;

/// Rows whose values go through the content pass
const CONTENT_SAMPLE_ROWS: usize = 3;

/// Obfuscated samples kept per sensitive field
const MAX_OBFUSCATED_SAMPLES: usize = 2;

// Severity lookup, term -> severity class. Contains-matched against the
// normalized (lowercase, dashes folded to underscores) field name.
const CRITICAL_FIELD_TERMS: &[&str] = &[
    "password", "passwd", "pwd", "secret", "private_key", "api_key", "apikey",
    "credit_card", "card_number", "cvv", "ssn", "social_security",
];
const HIGH_FIELD_TERMS: &[&str] = &[
    "email", "phone", "token", "jwt", "session_id", "passport", "driver_license",
    "bank_account", "iban", "medical", "health_record",
];
const MEDIUM_FIELD_TERMS: &[&str] = &[
    "address", "birth_date", "dob", "full_name", "payment", "billing",
];

lazy_static! {
    // Pattern families tested against the wordified field name (separators
    // folded to spaces so snake_case and kebab-case hit word boundaries).
    static ref AUTH_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\b(password|passwd|pwd)\b").unwrap(),
        Regex::new(r"(?i)\b(api ?key|apikey)\b").unwrap(),
        Regex::new(r"(?i)\b(secret|private ?key)\b").unwrap(),
        Regex::new(r"(?i)\b(token|jwt)\b").unwrap(),
        Regex::new(r"(?i)\b(session ?(id|key))\b").unwrap(),
    ];

    static ref PII_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\b(e ?mail)\b").unwrap(),
        Regex::new(r"(?i)\b(phone|mobile|telephone)\b").unwrap(),
        Regex::new(r"(?i)\b(ssn|social ?security)\b").unwrap(),
        Regex::new(r"(?i)\b(passport|driver ?license)\b").unwrap(),
        Regex::new(r"(?i)\b(birth ?date|dob|date ?of ?birth)\b").unwrap(),
        Regex::new(r"(?i)\b(address|street)\b").unwrap(),
        Regex::new(r"(?i)\b((full|first|last) ?name)\b").unwrap(),
    ];

    static ref FINANCIAL_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\b(credit ?card|card ?number|cc ?num)\b").unwrap(),
        Regex::new(r"(?i)\b(cvv|cvc|card ?code)\b").unwrap(),
        Regex::new(r"(?i)\b(iban|routing ?number|account ?number)\b").unwrap(),
        Regex::new(r"(?i)\b(bank ?account|financial)\b").unwrap(),
        Regex::new(r"(?i)\b(payment|billing)\b").unwrap(),
    ];

    static ref HEALTH_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\b(medical|health ?record)\b").unwrap(),
        Regex::new(r"(?i)\b(diagnosis|prescription)\b").unwrap(),
        Regex::new(r"(?i)\b(patient ?id|mrn)\b").unwrap(),
    ];

    // Strict value-shape validators for the content pass
    static ref EMAIL_VALUE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref CARD_VALUE: Regex = Regex::new(r"^[0-9]{13,19}$").unwrap();
    static ref SSN_VALUE: Regex = Regex::new(r"^\d{3}-?\d{2}-?\d{4}$").unwrap();
    static ref PHONE_VALUE: Regex =
        Regex::new(r"^\+?\(?[0-9]{3}\)?[-\s.]?[0-9]{3}[-\s.]?[0-9]{4,6}$").unwrap();
}

fn wordify(field_name: &str) -> String {
    field_name.to_lowercase().replace(['_', '-'], " ")
}

fn normalize(field_name: &str) -> String {
    field_name.to_lowercase().replace('-', "_")
}

/// Whether a column name belongs to any sensitive pattern family
pub fn is_sensitive_field(field_name: &str) -> bool {
    let worded = wordify(field_name);
    AUTH_PATTERNS
        .iter()
        .chain(PII_PATTERNS.iter())
        .chain(FINANCIAL_PATTERNS.iter())
        .chain(HEALTH_PATTERNS.iter())
        .any(|pattern| pattern.is_match(&worded))
}

/// Severity class for a sensitive column name
pub fn field_severity(field_name: &str) -> Severity {
    let normalized = normalize(field_name);
    if CRITICAL_FIELD_TERMS.iter().any(|t| normalized.contains(t)) {
        return Severity::Critical;
    }
    if HIGH_FIELD_TERMS.iter().any(|t| normalized.contains(t)) {
        return Severity::High;
    }
    if MEDIUM_FIELD_TERMS.iter().any(|t| normalized.contains(t)) {
        return Severity::Medium;
    }
    Severity::Low
}

/// Classify a string value against the shape validators.
/// Returns the matched value type, or None.
pub fn validate_sensitive_value(value: &str) -> Option<&'static str> {
    if EMAIL_VALUE.is_match(value) {
        return Some("email");
    }
    let digits = value.replace([' ', '-'], "");
    if CARD_VALUE.is_match(&digits) {
        return Some("credit_card");
    }
    if SSN_VALUE.is_match(value) {
        return Some("ssn");
    }
    if PHONE_VALUE.is_match(value) {
        return Some("phone");
    }
    None
}

fn last_chars(value: &str, count: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    chars[chars.len().saturating_sub(count)..].iter().collect()
}

/// Mask a sensitive value for display. Type-specific: enough survives to
/// recognize the leak, not enough to reuse it.
pub fn obfuscate_value(value: &str, value_type: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    match value_type {
        "email" => {
            let mut parts = value.splitn(2, '@');
            let local = parts.next().unwrap_or("");
            let domain = parts.next().unwrap_or("");
            match local.chars().next() {
                Some(first) => format!("{}***@{}", first, domain),
                None => format!("***@{}", domain),
            }
        }
        "phone" => format!("***-***-{}", last_chars(value, 4)),
        "credit_card" => format!("****-****-****-{}", last_chars(value, 4)),
        "ssn" => format!("***-**-{}", last_chars(value, 4)),
        _ => {
            if value.chars().count() > 10 {
                let chars: Vec<char> = value.chars().collect();
                let head: String = chars[..3].iter().collect();
                format!("{}...{}", head, last_chars(value, 3))
            } else {
                "***".to_string()
            }
        }
    }
}

/// Classify one entity's fetched rows and column metadata.
///
/// `http_status` and the exact-count row total are the analyzer's knowledge;
/// it overwrites them on the returned result. Severity rules: max over
/// detected fields; rows exposed but nothing matched is still Medium (the
/// access-control defect stands on its own); zero rows is Safe.
pub fn classify_entity(
    entity_name: &str,
    rows: &[Value],
    schema_columns: &[ColumnInfo],
) -> EntityScanResult {
    let first_row_keys: Vec<String> = rows
        .first()
        .and_then(|row| row.as_object())
        .map(|object| object.keys().cloned().collect())
        .unwrap_or_default();

    // No schema information: infer the exposed columns from sampled row keys
    let columns = if schema_columns.is_empty() {
        first_row_keys
            .iter()
            .map(|key| ColumnInfo::inferred(key))
            .collect()
    } else {
        schema_columns.to_vec()
    };

    if rows.is_empty() {
        return EntityScanResult {
            name: entity_name.to_string(),
            access_state: AccessState::Accessible,
            http_status: None,
            row_count: 0,
            sample_rows: Vec::new(),
            columns,
            sensitive_fields: Vec::new(),
            severity: Some(Severity::Safe),
            error: None,
        };
    }

    let mut fields: Vec<SensitiveField> = Vec::new();

    // Column-name pass
    for key in &first_row_keys {
        if is_sensitive_field(key) && !fields.iter().any(|f| &f.field_name == key) {
            fields.push(SensitiveField {
                field_name: key.clone(),
                severity: field_severity(key),
                detection_method: DetectionMethod::ColumnName,
                value_type: None,
                obfuscated_samples: Vec::new(),
            });
        }
    }

    // Content pass over the first few rows
    for row in rows.iter().take(CONTENT_SAMPLE_ROWS) {
        if let Some(object) = row.as_object() {
            for (key, value) in object {
                if let Some(text) = value.as_str() {
                    if let Some(value_type) = validate_sensitive_value(text) {
                        let index = match fields.iter().position(|f| &f.field_name == key) {
                            Some(existing) => existing,
                            None => {
                                fields.push(SensitiveField {
                                    field_name: key.clone(),
                                    severity: Severity::High,
                                    detection_method: DetectionMethod::ContentPattern,
                                    value_type: Some(value_type.to_string()),
                                    obfuscated_samples: Vec::new(),
                                });
                                fields.len() - 1
                            }
                        };
                        if fields[index].obfuscated_samples.len() < MAX_OBFUSCATED_SAMPLES {
                            fields[index]
                                .obfuscated_samples
                                .push(obfuscate_value(text, value_type));
                        }
                    }
                }
            }
        }
    }

    let severity = fields
        .iter()
        .map(|f| f.severity)
        .max()
        .unwrap_or(Severity::Medium);

    EntityScanResult {
        name: entity_name.to_string(),
        access_state: AccessState::Accessible,
        http_status: None,
        row_count: rows.len() as u64,
        sample_rows: rows.iter().take(SAMPLE_ROW_LIMIT).cloned().collect(),
        columns,
        sensitive_fields: fields,
        severity: Some(severity),
        error: None,
    }
}
