//! Score a patient bundle from the command line.
//!
//! Usage: score-patient <bundle.json> [config.json] [model.json]
//!
//! Reads a FHIR Bundle (or resource array) and prints the PRECISE-HBR
//! score report, risk category, and the bleeding/thrombosis tradeoff
//! estimate.

use std::fs;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing_subscriber::EnvFilter;

use precise_hbr_core::config::{builtin_tradeoff_model, load_tradeoff_model};
use precise_hbr_core::scoring::{display_info, Scorer};
use precise_hbr_core::{ReferenceConfig, TradeoffCalculator};
use precise_hbr_fhir::patient_data_from_str;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(bundle_path) = args.next() else {
        bail!("usage: score-patient <bundle.json> [config.json] [model.json]");
    };
    let config = match args.next() {
        Some(path) => ReferenceConfig::from_path(&path)
            .with_context(|| format!("loading reference configuration from {path}"))?,
        None => ReferenceConfig::builtin(),
    };
    let model = match args.next() {
        Some(path) => load_tradeoff_model(&path)
            .with_context(|| format!("loading tradeoff model from {path}"))?,
        None => builtin_tradeoff_model(),
    };

    let bundle_json = fs::read_to_string(&bundle_path)
        .with_context(|| format!("reading {bundle_path}"))?;
    let today = Utc::now().date_naive();
    let patient = patient_data_from_str(&bundle_json, &config, today)?;

    let scorer = Scorer::new(&config);
    let report = scorer.calculate_score(&patient.bundle, &patient.demographics);
    let info = display_info(report.total_score);

    if let Some(name) = &patient.demographics.name {
        println!("Patient: {name}");
    }
    println!("PRECISE-HBR score: {}", report.total_score);
    println!("Risk category:     {}", info.full_label);
    println!("{}", info.recommendation);
    println!();
    println!("Components:");
    for component in &report.components {
        let marker = if component.is_arc_hbr_element { "  · " } else { "  - " };
        let stale = if component.is_outdated { "  [outdated]" } else { "" };
        println!(
            "{marker}{}: {} ({:+.2}){stale}",
            component.parameter, component.value, component.score
        );
    }
    if !report.missing_fields.is_empty() {
        let missing: Vec<String> = report
            .missing_fields
            .iter()
            .map(|f| f.to_string())
            .collect();
        println!();
        println!(
            "Missing data: {} — score computed with caveats.",
            missing.join(", ")
        );
    }

    let tradeoff = TradeoffCalculator::new(&config, &model);
    let result = tradeoff.calculate(&patient.bundle, &patient.demographics, &patient.flags);
    println!();
    println!("Bleeding/thrombosis tradeoff (1-year):");
    println!("  Bleeding:   {:.2}%", result.bleeding_score);
    for factor in &result.bleeding_factors {
        println!("    - {factor}");
    }
    println!("  Thrombotic: {:.2}%", result.thrombotic_score);
    for factor in &result.thrombotic_factors {
        println!("    - {factor}");
    }
    if let Some(warning) = &result.warning {
        println!("  Note: {warning}");
    }

    Ok(())
}
