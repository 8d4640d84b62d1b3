// Main CLI entry point for rlsprobe
// Uses clap for argument parsing

use base64::{engine::general_purpose, Engine as _};
use chrono::Local;
use clap::{Arg, Command};
use rlsprobe::analyzer::{run_assessment, ProgressSink, ScanOptions};
use rlsprobe::extractor::{extract_credentials, DiscoveredCredentials};
use rlsprobe::models::{Credential, ProgressStage};
use rlsprobe::policy::generate_bulk_migration;
use rlsprobe::reporting::{export_csv, export_json, export_markdown};
use rlsprobe::sensitivity::{critical_findings, risk_level, risk_score};
use serde_json::Value;
use std::path::Path;
use walkdir::WalkDir;

/// Extract the role claim from a bearer token by decoding its payload segment
fn extract_token_role(token: &str) -> Option<String> {
    // Token format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    // Payload is base64url without padding
    let decoded = general_purpose::URL_SAFE_NO_PAD.decode(parts[1]).ok()?;
    let payload = String::from_utf8(decoded).ok()?;
    let json: Value = serde_json::from_str(&payload).ok()?;

    json.get("role")
        .and_then(|role| role.as_str())
        .map(|role| role.to_string())
}

/// Read one file, or every readable file under a directory
fn read_input_texts(input: &str) -> Vec<String> {
    let path = Path::new(input);
    let mut texts = Vec::new();

    if path.is_dir() {
        for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() {
                // Non-UTF-8 files are not scrape output; skip them
                if let Ok(text) = std::fs::read_to_string(entry.path()) {
                    texts.push(text);
                }
            }
        }
    } else if let Ok(text) = std::fs::read_to_string(path) {
        texts.push(text);
    }

    texts
}


#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let matches = Command::new("rlsprobe")
        .version("0.1.0")
        .author("Jake Abendroth")
        .about("Black-box row-level security exposure scanner for PostgREST-style APIs")
        .after_help("EXAMPLES:\n  rlsprobe --target-url https://abc.supabase.co --api-key TOKEN\n  rlsprobe -i scraped-scripts/ --remediation-sql\n\nOPTIONS:\n  --remediation-sql    Write a bulk RLS migration for vulnerable entities\n  --json-report        Output JSON report (default: on)\n  --csv-report         Output CSV report (default: off)\n  --markdown-report    Output Markdown report (default: off)")
        .arg(Arg::new("target_url")
            .short('u')
            .long("target-url")
            .num_args(1)
            .help("Base URL of the target API"))
        .arg(Arg::new("api_key")
            .short('k')
            .long("api-key")
            .num_args(1)
            .help("Bearer token for the target API"))
        .arg(Arg::new("input")
            .short('i')
            .long("input")
            .num_args(1)
            .help("File or directory of scraped text to mine for credentials"))
        .arg(Arg::new("batch_size")
            .long("batch-size")
            .num_args(1)
            .default_value("5")
            .help("Entities scanned concurrently per batch"))
        .arg(Arg::new("sample_limit")
            .long("sample-limit")
            .num_args(1)
            .default_value("15")
            .help("Rows sampled per entity"))
        .arg(Arg::new("remediation_sql")
            .long("remediation-sql")
            .action(clap::ArgAction::SetTrue)
            .help("Write a bulk RLS migration for vulnerable entities"))
        .arg(Arg::new("json_report")
            .long("json-report")
            .action(clap::ArgAction::SetTrue)
            .help("Output JSON report (default: on)"))
        .arg(Arg::new("csv_report")
            .long("csv-report")
            .action(clap::ArgAction::SetTrue)
            .help("Output CSV report (default: off)"))
        .arg(Arg::new("markdown_report")
            .long("markdown-report")
            .action(clap::ArgAction::SetTrue)
            .help("Output Markdown report (default: off)"))
        .get_matches();

    let batch_size: usize = matches
        .get_one::<String>("batch_size")
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| {
            eprintln!("Invalid --batch-size value");
            std::process::exit(2);
        });
    let sample_limit: usize = matches
        .get_one::<String>("sample_limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| {
            eprintln!("Invalid --sample-limit value");
            std::process::exit(2);
        });

    // Resolve the credential: direct flags, or mined from scraped text
    let credential = match (
        matches.get_one::<String>("target_url"),
        matches.get_one::<String>("api_key"),
        matches.get_one::<String>("input"),
    ) {
        (Some(url), Some(key), _) => match Credential::new(url, key) {
            Ok(credential) => credential,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(2);
            }
        },
        (_, _, Some(input)) => {
            let texts = read_input_texts(input);
            if texts.is_empty() {
                eprintln!("No readable text found at {}", input);
                std::process::exit(1);
            }

            let mut discovered = DiscoveredCredentials::default();
            for text in &texts {
                discovered.merge(extract_credentials(text));
            }
            println!(
                "Discovered {} candidate URL(s) and {} candidate token(s).",
                discovered.urls.len(),
                discovered.tokens.len()
            );

            match (discovered.urls.first(), discovered.tokens.first()) {
                (Some(url), Some(token)) => match Credential::new(url, token) {
                    Ok(credential) => credential,
                    Err(e) => {
                        eprintln!("{}", e);
                        std::process::exit(1);
                    }
                },
                _ => {
                    eprintln!("Could not discover both an endpoint URL and a token.");
                    std::process::exit(1);
                }
            }
        }
        _ => {
            eprintln!("Provide --target-url with --api-key, or --input with scraped text.");
            std::process::exit(2);
        }
    };

    // Report the credential's embedded role so reviewers know what they hold
    match extract_token_role(&credential.bearer_token) {
        Some(role) => {
            println!("Token role: {}", role);
            if role == "service_role" {
                println!("Warning: service_role tokens bypass RLS; findings will overstate anonymous exposure.");
            }
        }
        None => println!("Warning: could not decode a role claim from the token."),
    }

    let options = ScanOptions {
        batch_size,
        sample_limit,
        ..ScanOptions::default()
    };

    let (progress, mut progress_rx) = ProgressSink::channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            match event.stage {
                ProgressStage::Analysis => {
                    if let (Some(current), Some(total)) = (event.current, event.total) {
                        println!("[{}/{}] {}", current, total, event.message);
                    }
                }
                _ => println!("{}", event.message),
            }
        }
    });

    let result = run_assessment(&credential, &options, &progress).await;
    drop(progress);
    let _ = printer.await;

    if !result.connection_ok || !result.errors.is_empty() {
        for error in &result.errors {
            eprintln!("Error: {}", error);
        }
        if result.entities.is_empty() {
            std::process::exit(1);
        }
    }

    // Console summary
    let summary = &result.summary;
    let score = risk_score(&result.entities);
    println!();
    println!(
        "Scanned {} entities: {} vulnerable ({} critical, {} high, {} medium), {} safe, {} blocked",
        summary.total_entities,
        summary.vulnerable_entities,
        summary.critical_entities,
        summary.high_entities,
        summary.medium_entities,
        summary.safe_entities,
        summary.blocked_entities,
    );
    println!(
        "Sensitive fields: {}, exposed rows: {}",
        summary.total_sensitive_fields, summary.total_exposed_rows
    );
    println!("Risk score: {}/100 ({})", score, risk_level(score));

    for finding in critical_findings(&result.entities) {
        println!("[{}] {}: {}", finding.severity, finding.entity, finding.message);
    }

    if !result.partial_failures.is_empty() {
        println!(
            "Completed with {} partial failure(s); see the report for details.",
            result.partial_failures.len()
        );
    }

    // Export results
    let json_report = matches.get_flag("json_report")
        || (!matches.get_flag("csv_report") && !matches.get_flag("markdown_report"));
    if json_report {
        match export_json(&result) {
            Ok(filename) => println!("JSON report written to {}", filename),
            Err(e) => eprintln!("Failed to write JSON report: {}", e),
        }
    }
    if matches.get_flag("csv_report") {
        match export_csv(&result) {
            Ok(filename) => println!("CSV report written to {}", filename),
            Err(e) => eprintln!("Failed to write CSV report: {}", e),
        }
    }
    if matches.get_flag("markdown_report") {
        match export_markdown(&result) {
            Ok(filename) => println!("Markdown report written to {}", filename),
            Err(e) => eprintln!("Failed to write Markdown report: {}", e),
        }
    }

    if matches.get_flag("remediation_sql") {
        let migration = generate_bulk_migration(&result.entities);
        let filename = format!("rlsprobe_migration_{}.sql", Local::now().format("%Y%m%d_%H%M%S"));
        match std::fs::write(&filename, migration) {
            Ok(()) => println!("Remediation SQL written to {}", filename),
            Err(e) => eprintln!("Failed to write remediation SQL: {}", e),
        }
    }
}
