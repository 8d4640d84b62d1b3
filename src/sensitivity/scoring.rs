// Run-Level Risk Scoring
//
// Aggregates per-entity classifier output into a summary, an overall score,
// and a short list of the worst findings. The score is a heuristic weighting
// of exposure indicators, not a probabilistic model; the weight table below
// is the whole definition.

use crate::models::{AccessState, EntityScanResult, ScanSummary, Severity};
use std::fmt;

/// Score contribution per indicator. Row contribution is capped so one huge
/// table cannot saturate the score by itself.
#[derive(Debug, Clone, Copy)]
pub struct RiskWeights {
    pub critical_entity: f64,
    pub high_entity: f64,
    pub medium_entity: f64,
    pub sensitive_field: f64,
    pub exposed_row: f64,
    pub row_contribution_cap: f64,
}

pub const RISK_WEIGHTS: RiskWeights = RiskWeights {
    critical_entity: 25.0,
    high_entity: 15.0,
    medium_entity: 8.0,
    sensitive_field: 3.0,
    exposed_row: 0.5,
    row_contribution_cap: 20.0,
};

/// Aggregate counts for one run. Blocked entities are counted apart and
/// never as vulnerable; errored entities count only toward the total.
pub fn summarize(entities: &[EntityScanResult]) -> ScanSummary {
    let mut summary = ScanSummary {
        total_entities: entities.len(),
        ..ScanSummary::default()
    };

    for entity in entities {
        summary.total_sensitive_fields += entity.sensitive_fields.len();

        if entity.access_state == AccessState::Blocked {
            summary.blocked_entities += 1;
            continue;
        }

        match entity.severity {
            Some(Severity::Critical) => {
                summary.critical_entities += 1;
                summary.vulnerable_entities += 1;
                summary.total_exposed_rows += entity.row_count;
            }
            Some(Severity::High) => {
                summary.high_entities += 1;
                summary.vulnerable_entities += 1;
                summary.total_exposed_rows += entity.row_count;
            }
            Some(Severity::Medium) => {
                summary.medium_entities += 1;
                summary.vulnerable_entities += 1;
                summary.total_exposed_rows += entity.row_count;
            }
            _ => summary.safe_entities += 1,
        }
    }

    summary
}

/// Overall risk score in [0, 100]
pub fn risk_score(entities: &[EntityScanResult]) -> u32 {
    let weights = RISK_WEIGHTS;
    let mut score = 0.0f64;

    for entity in entities {
        if entity.access_state == AccessState::Blocked {
            continue;
        }

        score += match entity.severity {
            Some(Severity::Critical) => weights.critical_entity,
            Some(Severity::High) => weights.high_entity,
            Some(Severity::Medium) => weights.medium_entity,
            _ => 0.0,
        };

        score += entity.sensitive_fields.len() as f64 * weights.sensitive_field;
        score += (entity.row_count as f64 * weights.exposed_row).min(weights.row_contribution_cap);
    }

    score.round().min(100.0) as u32
}

/// Ordinal band for a risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

pub fn risk_level(score: u32) -> RiskLevel {
    if score >= 75 {
        RiskLevel::Critical
    } else if score >= 50 {
        RiskLevel::High
    } else if score >= 25 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// One of the worst findings of a run, for headline reporting
#[derive(Debug, Clone)]
pub struct CriticalFinding {
    pub severity: Severity,
    pub entity: String,
    pub message: String,
    pub row_count: u64,
}

const MAX_CRITICAL_FINDINGS: usize = 5;

/// Top findings ordered by severity, then exposed row count
pub fn critical_findings(entities: &[EntityScanResult]) -> Vec<CriticalFinding> {
    let mut findings = Vec::new();

    for entity in entities {
        if entity.access_state == AccessState::Blocked {
            continue;
        }

        let critical: Vec<&str> = entity
            .sensitive_fields
            .iter()
            .filter(|f| f.severity == Severity::Critical)
            .map(|f| f.field_name.as_str())
            .collect();
        let high: Vec<&str> = entity
            .sensitive_fields
            .iter()
            .filter(|f| f.severity == Severity::High)
            .map(|f| f.field_name.as_str())
            .collect();

        if !critical.is_empty() {
            findings.push(CriticalFinding {
                severity: Severity::Critical,
                entity: entity.name.clone(),
                message: format!(
                    "{} critical field(s) exposed: {}",
                    critical.len(),
                    critical.join(", ")
                ),
                row_count: entity.row_count,
            });
        } else if !high.is_empty() {
            findings.push(CriticalFinding {
                severity: Severity::High,
                entity: entity.name.clone(),
                message: format!(
                    "{} sensitive field(s) exposed: {}",
                    high.len(),
                    high.join(", ")
                ),
                row_count: entity.row_count,
            });
        } else if entity.row_count > 0 && entity.severity == Some(Severity::Medium) {
            findings.push(CriticalFinding {
                severity: Severity::Medium,
                entity: entity.name.clone(),
                message: format!("{} rows publicly accessible", entity.row_count),
                row_count: entity.row_count,
            });
        }
    }

    findings.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(b.row_count.cmp(&a.row_count))
    });
    findings.truncate(MAX_CRITICAL_FINDINGS);
    findings
}
