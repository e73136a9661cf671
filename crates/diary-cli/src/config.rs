//! Persistent CLI configuration file.

use std::path::{Path, PathBuf};

use diary_core::config::DiaryConfig;

const CONFIG_DIR_NAME: &str = "diary";
const CONFIG_FILE_NAME: &str = "config.json";

/// Override for the config file location, mostly for scripting.
pub const ENV_CONFIG_PATH: &str = "DIARY_CONFIG";

pub fn default_config_path() -> Result<PathBuf, String> {
    if let Some(path) = std::env::var_os(ENV_CONFIG_PATH) {
        return Ok(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or_else(|| "Failed to resolve CLI config directory".to_string())
}

/// Read the config file. A missing file yields defaults.
pub fn load_from_path(path: &Path) -> Result<DiaryConfig, String> {
    if !path.exists() {
        return Ok(DiaryConfig::default());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
    DiaryConfig::from_json(&raw)
        .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))
}

pub fn save_to_path(config: &DiaryConfig, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|error| {
            format!(
                "Failed to create config directory {}: {}",
                parent.display(),
                error
            )
        })?;
    }

    let mut normalized = config.clone();
    normalized.normalize();
    let serialized = serde_json::to_string_pretty(&normalized)
        .map_err(|error| format!("Failed to serialize config: {error}"))?;
    std::fs::write(path, serialized)
        .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
}

/// Config file values overlaid with `DIARY_*` environment variables.
pub fn load_effective() -> Result<DiaryConfig, String> {
    let path = default_config_path()?;
    Ok(load_from_path(&path)?.with_process_env())
}
