/// Tests for run-level risk scoring and summaries
/// Weights are pinned exactly; the score is a documented heuristic
use rlsprobe::models::{
    AccessState, DetectionMethod, EntityScanResult, SensitiveField, Severity,
};
use rlsprobe::sensitivity::{critical_findings, risk_level, risk_score, summarize, RiskLevel};

fn accessible(name: &str, severity: Severity, field_count: usize, row_count: u64) -> EntityScanResult {
    let sensitive_fields = (0..field_count)
        .map(|i| SensitiveField {
            field_name: format!("field_{}", i),
            severity,
            detection_method: DetectionMethod::ColumnName,
            value_type: None,
            obfuscated_samples: Vec::new(),
        })
        .collect();
    EntityScanResult {
        name: name.to_string(),
        access_state: AccessState::Accessible,
        http_status: Some(200),
        row_count,
        sample_rows: Vec::new(),
        columns: Vec::new(),
        sensitive_fields,
        severity: Some(severity),
        error: None,
    }
}

#[test]
fn test_risk_score_exact_weights() {
    // critical 25 + 2 fields * 3 + 10 rows * 0.5 = 36
    let entities = vec![accessible("users", Severity::Critical, 2, 10)];
    assert_eq!(risk_score(&entities), 36);

    // high 15 + 1 field * 3 + 4 rows * 0.5 = 20
    let entities = vec![accessible("posts", Severity::High, 1, 4)];
    assert_eq!(risk_score(&entities), 20);

    // medium 8, no fields, no rows
    let entities = vec![accessible("logs", Severity::Medium, 0, 0)];
    assert_eq!(risk_score(&entities), 8);
}

#[test]
fn test_risk_score_row_contribution_capped() {
    // 1000 rows contribute 20, not 500: medium 8 + 20 = 28
    let entities = vec![accessible("events", Severity::Medium, 0, 1000)];
    assert_eq!(risk_score(&entities), 28);
}

#[test]
fn test_risk_score_ignores_blocked() {
    let mut blocked = EntityScanResult::blocked("vault", 403);
    blocked.row_count = 0;
    let entities = vec![blocked, accessible("logs", Severity::Medium, 0, 0)];
    assert_eq!(risk_score(&entities), 8);
}

#[test]
fn test_risk_score_clamped_at_100() {
    let entities: Vec<EntityScanResult> = (0..10)
        .map(|i| accessible(&format!("t{}", i), Severity::Critical, 5, 100))
        .collect();
    assert_eq!(risk_score(&entities), 100);
}

#[test]
fn test_risk_score_monotone_in_each_component() {
    let base = vec![accessible("a", Severity::Medium, 1, 5)];
    let base_score = risk_score(&base);

    // More severe entity
    assert!(risk_score(&[accessible("a", Severity::High, 1, 5)]) >= base_score);
    // More sensitive fields
    assert!(risk_score(&[accessible("a", Severity::Medium, 2, 5)]) >= base_score);
    // More rows
    assert!(risk_score(&[accessible("a", Severity::Medium, 1, 6)]) >= base_score);
    // Another vulnerable entity
    let mut more = base.clone();
    more.push(accessible("b", Severity::Medium, 0, 0));
    assert!(risk_score(&more) >= base_score);
}

#[test]
fn test_risk_level_thresholds() {
    assert_eq!(risk_level(0), RiskLevel::Low);
    assert_eq!(risk_level(24), RiskLevel::Low);
    assert_eq!(risk_level(25), RiskLevel::Medium);
    assert_eq!(risk_level(49), RiskLevel::Medium);
    assert_eq!(risk_level(50), RiskLevel::High);
    assert_eq!(risk_level(74), RiskLevel::High);
    assert_eq!(risk_level(75), RiskLevel::Critical);
    assert_eq!(risk_level(100), RiskLevel::Critical);
}

#[test]
fn test_summarize_counts() {
    let entities = vec![
        accessible("a", Severity::Critical, 2, 10),
        accessible("b", Severity::High, 1, 5),
        accessible("c", Severity::Medium, 0, 3),
        accessible("d", Severity::Safe, 0, 0),
        EntityScanResult::blocked("e", 401),
    ];
    let summary = summarize(&entities);

    assert_eq!(summary.total_entities, 5);
    assert_eq!(summary.vulnerable_entities, 3);
    assert_eq!(summary.critical_entities, 1);
    assert_eq!(summary.high_entities, 1);
    assert_eq!(summary.medium_entities, 1);
    assert_eq!(summary.safe_entities, 1);
    assert_eq!(summary.blocked_entities, 1);
    assert_eq!(summary.total_sensitive_fields, 3);
    assert_eq!(summary.total_exposed_rows, 18);
}

#[test]
fn test_summarize_errored_not_vulnerable() {
    // Errored entities count toward the total but never as vulnerable
    let entities = vec![
        EntityScanResult::errored("x", None, "boom".to_string()),
        accessible("y", Severity::Medium, 0, 1),
    ];
    let summary = summarize(&entities);

    assert_eq!(summary.total_entities, 2);
    assert_eq!(summary.vulnerable_entities, 1);
    assert_eq!(summary.blocked_entities, 0);
}

#[test]
fn test_critical_findings_ordering_and_cap() {
    let entities = vec![
        accessible("medium_table", Severity::Medium, 0, 50),
        accessible("high_table", Severity::High, 1, 5),
        accessible("critical_small", Severity::Critical, 1, 2),
        accessible("critical_big", Severity::Critical, 1, 200),
        EntityScanResult::blocked("vault", 403),
    ];
    let findings = critical_findings(&entities);

    // Severity first, then exposed rows
    assert_eq!(findings[0].entity, "critical_big");
    assert_eq!(findings[1].entity, "critical_small");
    assert_eq!(findings[2].entity, "high_table");
    assert_eq!(findings[3].entity, "medium_table");
    assert!(findings.iter().all(|f| f.entity != "vault"));

    let many: Vec<EntityScanResult> = (0..8)
        .map(|i| accessible(&format!("t{}", i), Severity::Critical, 1, i as u64))
        .collect();
    assert_eq!(critical_findings(&many).len(), 5);
}
