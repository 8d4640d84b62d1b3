/// Tests for the sensitivity classifier
/// Field pattern families, value validators, obfuscation, and entity verdicts
use rlsprobe::models::{DetectionMethod, Severity};
use rlsprobe::sensitivity::{
    classify_entity, field_severity, is_sensitive_field, obfuscate_value, validate_sensitive_value,
};
use serde_json::{json, Value};

#[test]
fn test_sensitive_field_detection() {
    assert!(is_sensitive_field("password"));
    assert!(is_sensitive_field("password_hash"));
    assert!(is_sensitive_field("api-key"));
    assert!(is_sensitive_field("Email"));
    assert!(is_sensitive_field("credit_card"));
    assert!(is_sensitive_field("health_record"));

    assert!(!is_sensitive_field("title"));
    assert!(!is_sensitive_field("created_at"));
    assert!(!is_sensitive_field("user_id"));
}

#[test]
fn test_field_severity_table() {
    // Severity comes from the fixed term table, not the pattern families
    assert_eq!(field_severity("password"), Severity::Critical);
    assert_eq!(field_severity("password_hash"), Severity::Critical);
    assert_eq!(field_severity("ssn"), Severity::Critical);
    assert_eq!(field_severity("api_key"), Severity::Critical);

    assert_eq!(field_severity("email"), Severity::High);
    assert_eq!(field_severity("phone"), Severity::High);
    assert_eq!(field_severity("refresh_token"), Severity::High);

    assert_eq!(field_severity("address"), Severity::Medium);
    assert_eq!(field_severity("billing"), Severity::Medium);

    // Sensitive shape with no severity term falls through to low
    assert_eq!(field_severity("street"), Severity::Low);
}

#[test]
fn test_value_validators() {
    assert_eq!(validate_sensitive_value("alice@example.com"), Some("email"));
    assert_eq!(validate_sensitive_value("4111111111111111"), Some("credit_card"));
    assert_eq!(
        validate_sensitive_value("4111-1111-1111-1111"),
        Some("credit_card")
    );
    assert_eq!(validate_sensitive_value("123-45-6789"), Some("ssn"));
    assert_eq!(validate_sensitive_value("555-123-4567"), Some("phone"));

    assert_eq!(validate_sensitive_value("hello world"), None);
    assert_eq!(validate_sensitive_value("42"), None);
}

#[test]
fn test_obfuscation_masks() {
    assert_eq!(
        obfuscate_value("alice@example.com", "email"),
        "a***@example.com"
    );
    assert_eq!(obfuscate_value("555-123-4567", "phone"), "***-***-4567");
    assert_eq!(
        obfuscate_value("4111111111111111", "credit_card"),
        "****-****-****-1111"
    );
    assert_eq!(obfuscate_value("123-45-6789", "ssn"), "***-**-6789");

    // Fallback: first three and last three characters survive
    assert_eq!(obfuscate_value("supersecretvalue", "other"), "sup...lue");
    assert_eq!(obfuscate_value("short", "other"), "***");
}

#[test]
fn test_password_column_classifies_critical() {
    let rows = vec![json!({"id": 1, "password_hash": "x1y2z3"})];
    let result = classify_entity("accounts", &rows, &[]);

    assert_eq!(result.severity, Some(Severity::Critical));
    let field = result
        .sensitive_fields
        .iter()
        .find(|f| f.field_name == "password_hash")
        .expect("password_hash should be detected");
    assert_eq!(field.severity, Severity::Critical);
    assert_eq!(field.detection_method, DetectionMethod::ColumnName);
}

#[test]
fn test_zero_rows_classifies_safe() {
    let rows: Vec<Value> = Vec::new();
    let result = classify_entity("logs", &rows, &[]);

    assert_eq!(result.severity, Some(Severity::Safe));
    assert_eq!(result.row_count, 0);
    assert!(result.sensitive_fields.is_empty());
}

#[test]
fn test_exposed_rows_without_matches_classify_medium() {
    // Accessible data with nothing sensitive is still an access-control defect
    let rows: Vec<Value> = (0..10).map(|i| json!({"id": i, "title": "post"})).collect();
    let result = classify_entity("posts", &rows, &[]);

    assert_eq!(result.severity, Some(Severity::Medium));
    assert!(result.sensitive_fields.is_empty());
    assert_eq!(result.row_count, 10);
}

#[test]
fn test_content_pattern_detection_with_samples() {
    // Column name gives nothing away; the values do
    let rows = vec![
        json!({"id": 1, "contact": "alice@example.com"}),
        json!({"id": 2, "contact": "bob@example.org"}),
        json!({"id": 3, "contact": "carol@example.net"}),
    ];
    let result = classify_entity("members", &rows, &[]);

    let field = result
        .sensitive_fields
        .iter()
        .find(|f| f.field_name == "contact")
        .expect("contact should be detected by content");
    assert_eq!(field.detection_method, DetectionMethod::ContentPattern);
    assert_eq!(field.severity, Severity::High);
    assert_eq!(field.value_type.as_deref(), Some("email"));

    // At most two obfuscated samples are kept
    assert_eq!(
        field.obfuscated_samples,
        vec!["a***@example.com", "b***@example.org"]
    );
    assert_eq!(result.severity, Some(Severity::High));
}

#[test]
fn test_column_name_pass_wins_over_content() {
    // Field claimed by the column pass keeps its method and severity
    let rows = vec![json!({"ssn": "123-45-6789"})];
    let result = classify_entity("people", &rows, &[]);

    let field = result
        .sensitive_fields
        .iter()
        .find(|f| f.field_name == "ssn")
        .expect("ssn should be detected");
    assert_eq!(field.detection_method, DetectionMethod::ColumnName);
    assert_eq!(field.severity, Severity::Critical);
    // Content pass still attaches obfuscated samples to the claimed field
    assert_eq!(field.obfuscated_samples, vec!["***-**-6789"]);
}

#[test]
fn test_content_pass_limited_to_first_three_rows() {
    let mut rows: Vec<Value> = (0..3).map(|i| json!({"note": format!("row {}", i)})).collect();
    rows.push(json!({"note": "dave@example.com"}));

    let result = classify_entity("notes", &rows, &[]);
    assert!(result.sensitive_fields.is_empty());
    // Rows exposed without matches still force medium
    assert_eq!(result.severity, Some(Severity::Medium));
}

#[test]
fn test_columns_inferred_from_row_keys() {
    let rows = vec![json!({"id": 1, "email": "a@b.co"})];
    let result = classify_entity("profiles", &rows, &[]);

    let names: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
    assert!(names.contains(&"id"));
    assert!(names.contains(&"email"));
    assert!(result.columns.iter().all(|c| c.data_type == "unknown"));
}

#[test]
fn test_sample_rows_truncated() {
    let rows: Vec<Value> = (0..20).map(|i| json!({"id": i})).collect();
    let result = classify_entity("big", &rows, &[]);

    assert_eq!(result.sample_rows.len(), 15);
    assert_eq!(result.row_count, 20);
}

#[test]
fn test_low_only_fields_classify_low() {
    // "street" matches a pattern family but no severity term
    let rows = vec![json!({"street": "1 Main St"})];
    let result = classify_entity("addresses", &rows, &[]);

    assert_eq!(result.severity, Some(Severity::Low));
}
