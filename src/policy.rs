// Row-level security policy synthesis
//
// Detects an access-pattern shape from column names and emits idempotent
// remediation SQL scoped to that shape. Identifiers are quote-escaped
// before interpolation; unusual entity or column names must not produce
// malformed SQL.

use crate::models::{AccessState, ColumnInfo, EntityScanResult, Severity};
use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    static ref OWNER_COLUMN: Regex =
        Regex::new(r"(?i)^(user_id|owner_id|created_by|author_id|uid)$").unwrap();
    static ref TENANT_COLUMN: Regex =
        Regex::new(r"(?i)^(org_id|organization_id|tenant_id|company_id|workspace_id)$").unwrap();
    static ref PUBLIC_FLAG_COLUMN: Regex =
        Regex::new(r"(?i)^(is_public|public|published)$").unwrap();
}

/// Access-pattern shape inferred from column names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPattern {
    UserIsolated,
    MultiTenant,
    PublicOptional,
    Generic,
}

impl fmt::Display for AccessPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessPattern::UserIsolated => write!(f, "user-isolated"),
            AccessPattern::MultiTenant => write!(f, "multi-tenant"),
            AccessPattern::PublicOptional => write!(f, "public-optional"),
            AccessPattern::Generic => write!(f, "generic"),
        }
    }
}

/// Detection result with the columns that drove it
#[derive(Debug, Clone)]
pub struct DetectedPattern {
    pub pattern: AccessPattern,
    pub owner_column: Option<String>,
    pub tenant_column: Option<String>,
    pub public_column: Option<String>,
}

/// Classify columns into an access-pattern shape.
/// Priority: owner column, then tenant column, then public flag.
pub fn detect_access_pattern(columns: &[ColumnInfo]) -> DetectedPattern {
    let owner_column = columns
        .iter()
        .find(|c| OWNER_COLUMN.is_match(&c.name))
        .map(|c| c.name.clone());
    let tenant_column = columns
        .iter()
        .find(|c| TENANT_COLUMN.is_match(&c.name))
        .map(|c| c.name.clone());
    let public_column = columns
        .iter()
        .find(|c| PUBLIC_FLAG_COLUMN.is_match(&c.name))
        .map(|c| c.name.clone());

    // A public flag next to an owner column is the public-optional shape;
    // the owner column feeds the private-row check of that policy.
    let pattern = if public_column.is_some() && owner_column.is_some() {
        AccessPattern::PublicOptional
    } else if owner_column.is_some() {
        AccessPattern::UserIsolated
    } else if tenant_column.is_some() {
        AccessPattern::MultiTenant
    } else if public_column.is_some() {
        AccessPattern::PublicOptional
    } else {
        AccessPattern::Generic
    };

    DetectedPattern {
        pattern,
        owner_column,
        tenant_column,
        public_column,
    }
}

/// Double-quote an SQL identifier, escaping embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Remediation SQL for one entity plus the pattern that shaped it
#[derive(Debug, Clone)]
pub struct GeneratedPolicy {
    pub sql: String,
    pub pattern: AccessPattern,
}

/// Generate idempotent RLS remediation SQL for one entity: enable RLS,
/// drop any pre-existing named policies, create pattern-scoped policies.
pub fn generate_policy(entity_name: &str, columns: &[ColumnInfo]) -> GeneratedPolicy {
    let detected = detect_access_pattern(columns);
    let table = quote_identifier(entity_name);

    let mut sql = format!(
        r#"-- ============================================
-- RLS policies for: {entity_name}
-- Pattern: {pattern}
-- Generated: {timestamp}
-- ============================================

-- Enable row level security
ALTER TABLE {table} ENABLE ROW LEVEL SECURITY;

-- Drop existing policies (clean slate)
DROP POLICY IF EXISTS "select_policy" ON {table};
DROP POLICY IF EXISTS "insert_policy" ON {table};
DROP POLICY IF EXISTS "update_policy" ON {table};
DROP POLICY IF EXISTS "delete_policy" ON {table};

"#,
        entity_name = entity_name,
        pattern = detected.pattern,
        timestamp = Utc::now().to_rfc3339(),
        table = table,
    );

    match detected.pattern {
        AccessPattern::UserIsolated => {
            let owner = quote_identifier(detected.owner_column.as_deref().unwrap_or("user_id"));
            sql.push_str(&format!(
                r#"-- Users can only access their own rows

CREATE POLICY "select_policy"
ON {table}
FOR SELECT
TO authenticated
USING ({owner} = auth.uid());

CREATE POLICY "insert_policy"
ON {table}
FOR INSERT
TO authenticated
WITH CHECK ({owner} = auth.uid());

CREATE POLICY "update_policy"
ON {table}
FOR UPDATE
TO authenticated
USING ({owner} = auth.uid())
WITH CHECK ({owner} = auth.uid());

CREATE POLICY "delete_policy"
ON {table}
FOR DELETE
TO authenticated
USING ({owner} = auth.uid());
"#,
                table = table,
                owner = owner,
            ));
        }
        AccessPattern::MultiTenant => {
            let tenant = quote_identifier(detected.tenant_column.as_deref().unwrap_or("org_id"));
            sql.push_str(&format!(
                r#"-- Users can access rows belonging to their organization

CREATE POLICY "select_policy"
ON {table}
FOR SELECT
TO authenticated
USING (
    {tenant} IN (
        SELECT org_id FROM user_organizations
        WHERE user_id = auth.uid()
    )
);

CREATE POLICY "insert_policy"
ON {table}
FOR INSERT
TO authenticated
WITH CHECK (
    {tenant} IN (
        SELECT org_id FROM user_organizations
        WHERE user_id = auth.uid()
    )
);

-- Note: adjust the user_organizations table name to match the target schema
"#,
                table = table,
                tenant = tenant,
            ));
        }
        AccessPattern::PublicOptional => {
            let public = quote_identifier(detected.public_column.as_deref().unwrap_or("is_public"));
            let owner = quote_identifier(detected.owner_column.as_deref().unwrap_or("user_id"));
            sql.push_str(&format!(
                r#"-- Public rows readable by all, private rows only by owner

CREATE POLICY "select_policy"
ON {table}
FOR SELECT
TO authenticated
USING (
    {public} = true
    OR {owner} = auth.uid()
);

CREATE POLICY "insert_policy"
ON {table}
FOR INSERT
TO authenticated
WITH CHECK (auth.uid() IS NOT NULL);
"#,
                table = table,
                public = public,
                owner = owner,
            ));
        }
        AccessPattern::Generic => {
            sql.push_str(&format!(
                r#"-- Restrict to authenticated users only

CREATE POLICY "select_policy"
ON {table}
FOR SELECT
TO authenticated
USING (auth.uid() IS NOT NULL);

CREATE POLICY "insert_policy"
ON {table}
FOR INSERT
TO authenticated
WITH CHECK (auth.uid() IS NOT NULL);

-- WARNING: these policies let every authenticated user access all rows.
-- Review and customize for the actual access requirements.
"#,
                table = table,
            ));
        }
    }

    GeneratedPolicy {
        sql,
        pattern: detected.pattern,
    }
}

/// Whether an entity belongs in the bulk migration: accessible with a
/// non-safe verdict. Blocked and errored entities are skipped.
fn needs_remediation(entity: &EntityScanResult) -> bool {
    entity.access_state == AccessState::Accessible
        && entity.severity.is_some()
        && entity.severity != Some(Severity::Safe)
}

/// One transactional migration covering every entity that needs remediation
pub fn generate_bulk_migration(entities: &[EntityScanResult]) -> String {
    let vulnerable: Vec<&EntityScanResult> =
        entities.iter().filter(|e| needs_remediation(e)).collect();

    if vulnerable.is_empty() {
        return "-- No vulnerable entities found. All entities are protected!\n".to_string();
    }

    let mut migration = format!(
        r#"-- ============================================
-- RLS MIGRATION
-- Generated: {}
-- Vulnerable entities: {}
-- ============================================
--
-- Review each policy, test in a development environment first,
-- then run in the SQL console of the target project.

BEGIN;

"#,
        Utc::now().to_rfc3339(),
        vulnerable.len(),
    );

    for (index, entity) in vulnerable.iter().enumerate() {
        migration.push_str(&generate_policy(&entity.name, &entity.columns).sql);
        if index + 1 < vulnerable.len() {
            migration.push_str("\n-- ============================================\n\n");
        }
    }

    migration.push_str("\nCOMMIT;\n");
    migration
}
