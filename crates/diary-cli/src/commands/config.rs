use diary_core::config::DiaryConfig;

use crate::config::{default_config_path, load_effective, load_from_path, save_to_path};
use crate::error::CliError;

/// Values passed to `diary config init`.
#[derive(Debug, Default)]
pub struct ConfigUpdate {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub admin_email: Option<String>,
    pub search_debounce_ms: Option<u64>,
}

impl ConfigUpdate {
    pub fn apply(self, mut config: DiaryConfig) -> DiaryConfig {
        if let Some(url) = self.supabase_url {
            config.supabase_url = Some(url);
        }
        if let Some(key) = self.supabase_anon_key {
            config.supabase_anon_key = Some(key);
        }
        if let Some(email) = self.admin_email {
            config.admin_email = email;
        }
        if let Some(ms) = self.search_debounce_ms {
            config.search_debounce_ms = ms;
        }
        config.normalize();
        config
    }
}

pub fn run_config_init(update: ConfigUpdate) -> Result<(), CliError> {
    let path = default_config_path().map_err(CliError::Config)?;
    let existing = if path.exists() {
        load_from_path(&path).map_err(CliError::Config)?
    } else {
        DiaryConfig::default()
    };

    let config = update.apply(existing);
    save_to_path(&config, &path).map_err(CliError::Config)?;
    println!("{}", path.display());
    if config.admin_email.is_empty() {
        eprintln!("Warning: no admin email set; the administrator panel is unreachable.");
    }
    Ok(())
}

pub fn run_config_show() -> Result<(), CliError> {
    let config = load_effective().map_err(CliError::Config)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
