//! Validate command - load the configuration and cross-check its documents.

use anyhow::Result;
use gantry_executor::EngineConfig;
use std::path::Path;

/// Run the validate command.
pub fn run(config: &Path) -> Result<()> {
    let file = config.display().to_string();
    if !config.exists() {
        anyhow::bail!("Config file not found: {}", file);
    }

    tracing::info!(file = %file, "Validating configuration");

    println!("Validation Results for: {}", file);
    println!("========================{}", "=".repeat(file.len()));
    println!();

    let engine = match EngineConfig::load(config) {
        Ok(engine) => engine,
        Err(e) => {
            println!("✗ Configuration failed to load:");
            for message in e.details() {
                println!("  - {}", message);
            }
            println!();
            println!("✗ Validation FAILED");
            anyhow::bail!("configuration validation failed");
        }
    };
    println!("✓ API definition and pipeline library loaded");
    println!("✓ Every endpoint references an existing pipeline");
    println!();

    let executor = &engine.executor;
    let templates: Vec<&str> = executor.api().templates().collect();
    let pipelines: Vec<&str> = executor.pipelines().ids().collect();
    let connections: Vec<&str> = executor.connections().names().collect();

    println!("Summary:");
    println!("  Paths: {}", templates.len());
    println!("  Pipelines: {}", pipelines.len());
    println!("  SQL connections: {}", connections.len());

    let referenced: std::collections::HashSet<&str> = executor
        .api()
        .points()
        .map(|p| p.pipeline_id.as_str())
        .collect();
    let mut has_warnings = false;
    for id in &pipelines {
        if !referenced.contains(id) {
            has_warnings = true;
            println!();
            println!("⚠ WARNING: Pipeline '{}' is not referenced by any endpoint", id);
        }
    }

    println!();
    println!("========================{}", "=".repeat(file.len()));
    if has_warnings {
        println!("⚠ Validation passed with warnings");
    } else {
        println!("✓ Validation PASSED");
    }
    Ok(())
}
