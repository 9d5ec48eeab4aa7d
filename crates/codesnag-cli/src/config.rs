//! Configuration file loading and command-line overrides.

use anyhow::{Context, Result};
use codesnag_lint::{Configuration, RuleRegistry};
use std::fs;
use std::path::Path;

/// Loads a configuration file; `.yaml`/`.yml` are read as YAML, anything
/// else as JSON. Missing fields take their defaults.
pub fn load_configuration(path: &Path) -> Result<Configuration> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let config = if is_yaml {
        serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse YAML configuration: {}", path.display()))?
    } else {
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON configuration: {}", path.display()))?
    };
    Ok(config)
}

/// Applies `--disable` and `--only` on top of a loaded configuration.
///
/// `--only` enables exactly the listed ids and disables every other
/// registered rule, replacing whatever the file said.
pub fn apply_overrides(
    mut config: Configuration,
    registry: &RuleRegistry,
    disable_rules: &[String],
    only_rules: Option<&str>,
) -> Configuration {
    if let Some(only) = only_rules {
        let ids: Vec<String> = only
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        config.enabled_rules = ids.iter().cloned().collect();
        config.disabled_rules = registry
            .rules()
            .map(|rule| rule.id().to_string())
            .filter(|id| !ids.contains(id))
            .collect();
    }
    for id in disable_rules {
        config.enabled_rules.remove(id);
        config.disabled_rules.insert(id.clone());
    }
    config
}
