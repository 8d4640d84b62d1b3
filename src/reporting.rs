// Reporting and output for rlsprobe
// Supports JSON, CSV, and Markdown export of one assessment run

use crate::models::{AccessState, AssessmentResult};
use crate::sensitivity::{critical_findings, risk_level, risk_score};
use chrono::Local;
use std::fs::File;
use std::io::Write;

/// Escape CSV field to prevent formula injection attacks
/// Cells starting with =, +, -, @, or tab are prefixed with single quote
fn escape_csv_field(field: &str) -> String {
    if field.is_empty() {
        return String::new();
    }

    let first_char = field.chars().next().unwrap();
    let needs_escaping = matches!(first_char, '=' | '+' | '-' | '@' | '\t');

    if needs_escaping || field.contains(',') || field.contains('"') {
        if needs_escaping {
            format!("\"'{}\"", field.replace('"', "\"\""))
        } else {
            format!("\"{}\"", field.replace('"', "\"\""))
        }
    } else {
        field.to_string()
    }
}

fn access_label(state: AccessState) -> &'static str {
    match state {
        AccessState::Accessible => "accessible",
        AccessState::Blocked => "blocked",
        AccessState::Errored => "errored",
    }
}

fn severity_label(entity: &crate::models::EntityScanResult) -> String {
    match (entity.severity, entity.access_state) {
        (Some(severity), _) => severity.to_string(),
        (None, AccessState::Blocked) => "protected".to_string(),
        (None, _) => "unknown".to_string(),
    }
}

/// Full machine-readable report
pub fn export_json(result: &AssessmentResult) -> Result<String, std::io::Error> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let filename = format!("rlsprobe_report_{}.json", timestamp);
    let mut file = File::create(&filename)?;

    let body = serde_json::to_string_pretty(result)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    file.write_all(body.as_bytes())?;

    Ok(filename)
}

pub fn export_csv(result: &AssessmentResult) -> Result<String, std::io::Error> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let filename = format!("rlsprobe_report_{}.csv", timestamp);
    let mut file = File::create(&filename)?;

    writeln!(file, "Entity,Access,Severity,Rows,SensitiveFields")?;
    for entity in &result.entities {
        let severity = severity_label(entity);
        let fields: Vec<&str> = entity
            .sensitive_fields
            .iter()
            .map(|f| f.field_name.as_str())
            .collect();
        writeln!(
            file,
            "{},{},{},{},{}",
            escape_csv_field(&entity.name),
            access_label(entity.access_state),
            escape_csv_field(&severity),
            entity.row_count,
            escape_csv_field(&fields.join("; ")),
        )?;
    }

    Ok(filename)
}

pub fn export_markdown(result: &AssessmentResult) -> Result<String, std::io::Error> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let filename = format!("rlsprobe_report_{}.md", timestamp);
    let mut file = File::create(&filename)?;

    let score = risk_score(&result.entities);

    writeln!(file, "# Exposure Assessment Report\n")?;
    writeln!(file, "- Target: {}", result.endpoint_base_url)?;
    writeln!(file, "- Scanned: {}", result.timestamp)?;
    writeln!(file, "- Risk score: {} ({})\n", score, risk_level(score))?;

    let summary = &result.summary;
    writeln!(file, "## Summary\n")?;
    writeln!(
        file,
        "{} entities scanned: {} vulnerable ({} critical, {} high, {} medium), {} safe, {} blocked. {} sensitive fields, {} exposed rows.\n",
        summary.total_entities,
        summary.vulnerable_entities,
        summary.critical_entities,
        summary.high_entities,
        summary.medium_entities,
        summary.safe_entities,
        summary.blocked_entities,
        summary.total_sensitive_fields,
        summary.total_exposed_rows,
    )?;

    let findings = critical_findings(&result.entities);
    if !findings.is_empty() {
        writeln!(file, "## Top findings\n")?;
        for finding in findings {
            writeln!(
                file,
                "- **{}** `{}`: {}",
                finding.severity, finding.entity, finding.message
            )?;
        }
        writeln!(file)?;
    }

    writeln!(file, "## Entities\n")?;
    for entity in &result.entities {
        let severity = severity_label(entity);
        writeln!(
            file,
            "- **{}** ({}): severity {}, {} rows, {} sensitive field(s)",
            entity.name,
            access_label(entity.access_state),
            severity,
            entity.row_count,
            entity.sensitive_fields.len(),
        )?;
    }

    if !result.partial_failures.is_empty() {
        writeln!(file, "\n## Partial failures\n")?;
        for failure in &result.partial_failures {
            writeln!(file, "- `{}`: {}", failure.name, failure.error)?;
        }
    }

    Ok(filename)
}
