//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the CityKML configuration file and its balloon templates.

use crate::balloon::compile_file;
use crate::config::{load_config, redact_connection_string, CityKmlConfig};
use crate::core::reader::has_geometry_at;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Also compile every configured balloon template file
    #[arg(long)]
    pub check_templates: bool,
}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates every section
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration is valid");
                c
            }
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        print_summary(&config);

        if self.check_templates {
            let broken = check_templates(&config);
            if broken > 0 {
                println!("❌ {broken} balloon template(s) failed to compile");
                return Ok(2);
            }
        }
        Ok(0)
    }
}

fn print_summary(config: &CityKmlConfig) {
    let export = &config.export;
    println!();
    println!("Configuration Summary:");
    println!("  Log Level: {}", config.application.log_level);
    println!(
        "  Database: {}",
        redact_connection_string(&config.database.connection_string)
    );
    println!("  Schema: {}", config.database.schema);
    println!("  Max Connections: {}", config.database.max_connections);
    println!("  Workers: {}", export.workers);
    println!("  LOD: {}", export.lod);
    println!("  Display Forms: {:?}", export.display_forms);
    println!("  Classes: {:?}", export.classes);
    for class in &export.classes {
        if !has_geometry_at(*class, export.lod) {
            println!("  ⚠️  {class} has no geometry at LOD {}", export.lod);
        }
        let limit = export.group_limit(*class);
        if limit > 1 {
            println!("  Group Limit ({class}): {limit}");
        }
    }
    println!("  Output: {}", export.output_dir.display());
    println!("  Balloons: {}", config.balloon.len());
    println!();
}

/// Compiles every configured template file; returns how many failed
fn check_templates(config: &CityKmlConfig) -> usize {
    let mut broken = 0;
    for (class, balloon) in &config.balloon {
        let Some(path) = balloon
            .template_file
            .as_ref()
            .filter(|_| balloon.content_source.uses_file())
        else {
            continue;
        };
        match compile_file(path) {
            Ok(template) => println!(
                "✅ {class}: {} ({} statement(s))",
                path.display(),
                template.statements().len()
            ),
            Err(e) => {
                broken += 1;
                println!("❌ {class}: {}: {e}", path.display());
            }
        }
    }
    broken
}
