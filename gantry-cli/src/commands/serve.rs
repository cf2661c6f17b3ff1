//! Serve command - run the HTTP adapter from a configuration file.

use anyhow::{Context, Result};
use gantry_executor::EngineConfig;
use std::path::Path;

/// Run the serve command.
pub async fn run(config: &Path, host: Option<&str>, port: Option<u16>) -> Result<()> {
    let mut engine = EngineConfig::load(config)
        .with_context(|| format!("failed to load {}", config.display()))?;
    if let Some(host) = host {
        engine.server.host = host.to_string();
    }
    if let Some(port) = port {
        engine.server.port = port;
    }

    let server = &engine.server;
    tracing::info!(host = %server.host, port = server.port, "starting gantry server");

    println!("Starting Gantry server...");
    println!();
    println!("Server: http://{}:{}", server.host, server.port);
    println!();
    println!("Endpoints:");
    for template in engine.executor.api().templates() {
        println!("  {template}");
    }
    println!();
    println!("Press Ctrl+C to stop.");
    println!();

    engine
        .into_server()
        .run()
        .await
        .context("server stopped with an error")?;

    println!("Server stopped.");
    Ok(())
}
