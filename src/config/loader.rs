//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::CityKmlConfig;
use super::secret::secret_string;
use crate::domain::errors::CityKmlError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into CityKmlConfig
/// 4. Applies environment variable overrides (CITYKML_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use citykml::config::loader::load_config;
///
/// let config = load_config("citykml.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<CityKmlConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(CityKmlError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        CityKmlError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text, applying substitution, overrides and validation
///
/// # Errors
///
/// Same as [`load_config`], minus file access.
pub fn parse_config(contents: &str) -> Result<CityKmlConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: CityKmlConfig = toml::from_str(&contents)
        .map_err(|e| CityKmlError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        CityKmlError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| CityKmlError::Other(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let processed = re.replace_all(line, |cap: &regex::Captures<'_>| {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    cap[0].to_string()
                }
            }
        });
        lines.push(processed.into_owned());
    }

    if !missing_vars.is_empty() {
        return Err(CityKmlError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| CityKmlError::Configuration(format!("Invalid value for {name}: {e}")))
}

fn parse_list<T: std::str::FromStr>(name: &str, value: &str) -> Result<Vec<T>>
where
    T::Err: std::fmt::Display,
{
    value
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_override(name, s))
        .collect()
}

/// Applies environment variable overrides using CITYKML_* prefix
///
/// Environment variables follow the pattern: CITYKML_<SECTION>_<KEY>
/// For example: CITYKML_DATABASE_SCHEMA, CITYKML_EXPORT_WORKERS.
/// List values are comma separated.
fn apply_env_overrides(config: &mut CityKmlConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("CITYKML_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Database overrides
    if let Ok(val) = std::env::var("CITYKML_DATABASE_CONNECTION_STRING") {
        config.database.connection_string = secret_string(val);
    }
    if let Ok(val) = std::env::var("CITYKML_DATABASE_SCHEMA") {
        config.database.schema = val;
    }
    if let Ok(val) = std::env::var("CITYKML_DATABASE_MAX_CONNECTIONS") {
        config.database.max_connections =
            parse_override("CITYKML_DATABASE_MAX_CONNECTIONS", &val)?;
    }

    // Export overrides
    if let Ok(val) = std::env::var("CITYKML_EXPORT_WORKERS") {
        config.export.workers = parse_override("CITYKML_EXPORT_WORKERS", &val)?;
    }
    if let Ok(val) = std::env::var("CITYKML_EXPORT_LOD") {
        let level: u8 = parse_override("CITYKML_EXPORT_LOD", &val)?;
        config.export.lod = level.try_into().map_err(CityKmlError::Configuration)?;
    }
    if let Ok(val) = std::env::var("CITYKML_EXPORT_DISPLAY_FORMS") {
        config.export.display_forms = parse_list("CITYKML_EXPORT_DISPLAY_FORMS", &val)?;
    }
    if let Ok(val) = std::env::var("CITYKML_EXPORT_CLASSES") {
        config.export.classes = parse_list("CITYKML_EXPORT_CLASSES", &val)?;
    }
    if let Ok(val) = std::env::var("CITYKML_EXPORT_OBJECT_IDS") {
        config.export.object_ids = parse_list("CITYKML_EXPORT_OBJECT_IDS", &val)?;
    }
    if let Ok(val) = std::env::var("CITYKML_EXPORT_OUTPUT_DIR") {
        config.export.output_dir = val.into();
    }
    if let Ok(val) = std::env::var("CITYKML_EXPORT_DRY_RUN") {
        config.export.dry_run = val.parse().unwrap_or(false);
    }

    // Logging overrides
    if let Ok(val) = std::env::var("CITYKML_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("CITYKML_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
