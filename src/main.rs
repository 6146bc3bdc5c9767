//! Kit Readiness Runner
//!
//! Loads a kit catalog, the vehicles under review and a homologation export
//! from JSON files, then prints the kit suggestions and the scheduling
//! readiness of every vehicle.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use kit_readiness::catalog::{JsonFileCatalog, JsonFileHomologation, JsonFileVehicles};
use kit_readiness::config::ConfigManager;
use kit_readiness::matching::{equivalence_class_of, format_with_quantity, merge_quantities, normalize};
use kit_readiness::session::SchedulingSession;
use kit_readiness::telemetry::init_logging;

// ──────────────────────────────────────────────────────────────────────────────
// MAIN ENTRY POINT
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let manager = ConfigManager::from_env();
    let config = manager
        .load()
        .await
        .with_context(|| format!("Failed to load config {}", manager.path().display()))?;

    init_logging(&config.log_filter)?;
    info!("Using config {}", manager.path().display());

    let session = SchedulingSession::with_rules(
        Arc::new(JsonFileCatalog::new(&config.catalog_path)),
        Arc::new(JsonFileVehicles::new(&config.vehicles_path)),
        Arc::new(JsonFileHomologation::new(&config.homologation_path)),
        &config.rules,
    );

    let report = session.refresh().await?;

    println!("\n{}", "═".repeat(60));
    println!("Kit readiness · session {}", report.session_id);
    println!("{} kits · {} vehicles", report.kit_count, report.vehicles.len());
    println!("{}\n", "═".repeat(60));

    for vehicle in &report.vehicles {
        let status = if vehicle.verdict.ready { "READY" } else { "BLOCKED" };
        println!("{}  [{}]", vehicle.plate, status);

        if vehicle.suggestions.is_empty() {
            println!("  no kit suggestions");
        }
        for (rank, suggestion) in vehicle.suggestions.iter().enumerate() {
            println!("  {}. {} ({} matched)", rank + 1, suggestion.kit_id, suggestion.match_count);
        }
        if let Some(kit) = session.ranked_kits(&vehicle.plate).await.first() {
            let lines: Vec<String> = kit
                .accessories
                .iter()
                .map(|item| format_with_quantity(&item.raw_name, item.quantity))
                .collect();
            let contents: Vec<String> = merge_quantities(&lines)
                .iter()
                .map(|line| format_with_quantity(&line.name, line.quantity))
                .collect();
            println!("  top kit ships: {}", contents.join(", "));
        }
        for name in &vehicle.verdict.pending {
            match equivalence_class_of(&normalize(name)) {
                Some(class) => println!("  pending homologation: {} ({})", name, class.concept),
                None => println!("  pending homologation: {}", name),
            }
        }
        if !vehicle.verdict.blocking.is_empty() {
            println!("  not homologated: {}", vehicle.verdict.blocking.join(", "));
        }
        println!();
    }

    Ok(())
}
