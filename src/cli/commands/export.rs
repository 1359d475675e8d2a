//! Export command implementation
//!
//! This module implements the `export` command for exporting city objects
//! from the city database into visualization bundles.

use crate::config::{load_config, CityKmlConfig};
use crate::core::export::{ExportCoordinator, ExportErrorType, ExportSummary};
use crate::domain::{CityObjectClass, DisplayForm, Lod};
use clap::Args;
use tokio::sync::watch;

/// Arguments for the export command
#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Dry run mode - run the pipeline without writing bundle files
    #[arg(long)]
    pub dry_run: bool,

    /// Override city object classes to export (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub classes: Vec<CityObjectClass>,

    /// Override display forms (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub display_forms: Vec<DisplayForm>,

    /// Override the level of detail (0-4)
    #[arg(long)]
    pub lod: Option<u8>,

    /// Export only these object ids (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub object_ids: Vec<i64>,

    /// Override the number of export workers
    #[arg(long)]
    pub workers: Option<usize>,
}

impl ExportArgs {
    /// Applies command-line overrides on top of the loaded configuration
    ///
    /// # Errors
    ///
    /// Returns an error for an out-of-range LOD.
    pub fn apply_overrides(&self, config: &mut CityKmlConfig) -> Result<(), String> {
        if !self.classes.is_empty() {
            tracing::info!(classes = ?self.classes, "Overriding classes from CLI");
            config.export.classes = self.classes.clone();
        }

        if !self.display_forms.is_empty() {
            tracing::info!(display_forms = ?self.display_forms, "Overriding display forms from CLI");
            config.export.display_forms = self.display_forms.clone();
        }

        if let Some(level) = self.lod {
            config.export.lod = Lod::new(level)?;
            tracing::info!(lod = level, "Overriding LOD from CLI");
        }

        if !self.object_ids.is_empty() {
            tracing::info!(count = self.object_ids.len(), "Overriding object ids from CLI");
            config.export.object_ids = self.object_ids.clone();
        }

        if let Some(workers) = self.workers {
            tracing::info!(workers = workers, "Overriding worker count from CLI");
            config.export.workers = workers;
        }

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.export.dry_run = true;
        }

        Ok(())
    }

    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let mut config = match load_config(config_path) {
            Ok(config) => config,
            Err(e) => {
                crate::log_error_with_context!(&e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        if let Err(e) = self.apply_overrides(&mut config) {
            eprintln!("Invalid option: {e}");
            return Ok(2);
        }

        // Overrides may have broken an otherwise valid file
        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2); // Configuration error exit code
        }

        if config.export.dry_run {
            tracing::info!("Dry run mode enabled - no bundles will be written");
            println!("🔍 DRY RUN MODE - No bundle files will be written");
            println!();
        }

        // Confirmation prompt (unless --yes or dry-run)
        if !self.yes && !config.export.dry_run {
            print_plan(&config);
            print!("Proceed with export? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Export cancelled.");
                return Ok(0);
            }
        }

        crate::log_export_start!(
            &config.export.classes,
            &config.export.display_forms,
            config.export.lod
        );

        let coordinator = match ExportCoordinator::new(config, shutdown_signal).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create export coordinator");
                eprintln!("Failed to initialize export: {e}");
                return Ok(4); // Connection error exit code
            }
        };

        println!("🚀 Starting export...");
        println!();

        let summary = match coordinator.execute_export().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Export failed");
                eprintln!("Export failed: {e}");
                return Ok(if e.is_connection_lost() { 4 } else { 5 });
            }
        };

        crate::log_export_complete!(summary.processed, summary.duration);
        print_summary(&summary);

        Ok(exit_code(&summary))
    }
}

fn print_plan(config: &CityKmlConfig) {
    let export = &config.export;
    println!("Export Configuration:");
    println!("  Classes: {:?}", export.classes);
    println!("  Display forms: {:?}", export.display_forms);
    println!("  LOD: {}", export.lod);
    println!(
        "  Objects: {}",
        if export.object_ids.is_empty() {
            "All".to_string()
        } else {
            format!("{:?}", export.object_ids)
        }
    );
    println!("  Workers: {}", export.workers);
    println!("  Output: {}", export.output_dir.display());
    println!();
}

fn print_summary(summary: &ExportSummary) {
    println!();
    println!("📊 Export Summary:");
    println!("  Work items: {}", summary.items_dispatched);
    println!("  Group members: {}", summary.group_members);
    println!("  Processed: {}", summary.processed);
    println!("  Skipped (no geometry): {}", summary.skipped);
    println!("  Failed: {}", summary.failed);
    println!("  Bundles: {}", summary.total_bundles());
    println!("  Bundles written: {}", summary.bundles_written);
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!("  Success Rate: {:.2}%", summary.success_rate());
    for (class, bundles) in &summary.bundles_by_class {
        println!(
            "    {class}: {bundles} bundle(s), {} object(s)",
            summary.objects_by_class.get(class).copied().unwrap_or(0)
        );
    }
    println!();

    if !summary.errors.is_empty() {
        println!("⚠️  Errors encountered:");
        for error in &summary.errors {
            println!("  - {:?}: {}", error.error_type, error.message);
            if let Some(context) = &error.context {
                println!("    Context: {context}");
            }
        }
        println!();
    }
}

/// Maps a finished export onto the process exit code
pub fn exit_code(summary: &ExportSummary) -> i32 {
    let has = |kind: ExportErrorType| summary.errors.iter().any(|e| e.error_type == kind);

    if summary.interrupted {
        println!("⚠️  Export interrupted. {} item(s) left unprocessed.", summary.unprocessed);
        tracing::info!("Export interrupted by user signal");
        130 // SIGINT exit code (standard Unix convention)
    } else if has(ExportErrorType::Configuration) {
        2
    } else if summary.workers > 0 && summary.workers_lost == summary.workers {
        println!("❌ All database connections were lost");
        4
    } else if summary.is_successful() {
        println!("✅ Export completed successfully!");
        0
    } else {
        println!("⚠️  Export completed with failures");
        1 // Partial success
    }
}
