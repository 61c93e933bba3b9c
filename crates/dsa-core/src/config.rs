//! Policy configuration loading
//!
//! Policies are written as TOML or YAML with the [`MigrationPolicy`] field
//! names, for example:
//!
//! ```toml
//! active_source = "primary"
//! compare_enabled = true
//! consult_order = ["primary", "secondary"]
//! ```
//!
//! Overrides (`DSA_ACTIVE_SOURCE`, `DSA_COMPARE_ENABLED`,
//! `DSA_IDENTIFIER_SPACE`) flip a deployed policy without editing the file.

use crate::error::ConfigError;
use crate::policy::{MigrationPolicy, ValidatedPolicy};
use crate::types::Source;
use std::path::Path;

/// Override key for the active source
pub const ENV_ACTIVE_SOURCE: &str = "DSA_ACTIVE_SOURCE";
/// Override key for the compare flag
pub const ENV_COMPARE_ENABLED: &str = "DSA_COMPARE_ENABLED";
/// Override key for the identifier space
pub const ENV_IDENTIFIER_SPACE: &str = "DSA_IDENTIFIER_SPACE";

/// Parse a TOML policy
///
/// # Errors
/// `ConfigError::Toml` on malformed input
pub fn policy_from_toml_str(input: &str) -> Result<MigrationPolicy, ConfigError> {
    Ok(toml::from_str(input)?)
}

/// Parse a YAML policy
///
/// # Errors
/// `ConfigError::Yaml` on malformed input
pub fn policy_from_yaml_str(input: &str) -> Result<MigrationPolicy, ConfigError> {
    Ok(serde_yaml::from_str(input)?)
}

/// Read, parse and validate a policy file
///
/// The format follows the extension: `.toml`, `.yaml` or `.yml`.
///
/// # Errors
/// - `ConfigError::Io` if the file cannot be read
/// - `ConfigError::UnsupportedFormat` for other extensions
/// - parse errors, and `ConfigError::Policy` if validation fails
pub fn load_policy(path: impl AsRef<Path>) -> Result<ValidatedPolicy, ConfigError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let policy = match extension.as_str() {
        "toml" => policy_from_toml_str(&contents)?,
        "yaml" | "yml" => policy_from_yaml_str(&contents)?,
        other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
    };

    tracing::info!(path = %path.display(), "Loaded migration policy");
    Ok(policy.validate()?)
}

/// Apply overrides from `lookup` (keys are the `ENV_*` constants)
///
/// # Errors
/// `ConfigError::InvalidOverride` if a value cannot be parsed
pub fn apply_overrides<F>(
    mut policy: MigrationPolicy,
    lookup: F,
) -> Result<MigrationPolicy, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_ACTIVE_SOURCE) {
        policy.active_source = parse_source(ENV_ACTIVE_SOURCE, &value)?;
    }

    if let Some(value) = lookup(ENV_COMPARE_ENABLED) {
        policy.compare_enabled = match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                return Err(ConfigError::InvalidOverride {
                    key: ENV_COMPARE_ENABLED.to_string(),
                    value,
                })
            }
        };
    }

    if let Some(value) = lookup(ENV_IDENTIFIER_SPACE) {
        policy.identifier_space = Some(parse_source(ENV_IDENTIFIER_SPACE, &value)?);
    }

    Ok(policy)
}

/// Apply overrides from the process environment
///
/// # Errors
/// `ConfigError::InvalidOverride` if a variable cannot be parsed
pub fn apply_env_overrides(policy: MigrationPolicy) -> Result<MigrationPolicy, ConfigError> {
    apply_overrides(policy, |key| std::env::var(key).ok())
}

fn parse_source(key: &str, value: &str) -> Result<Source, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}
