//! Settings loading.
//!
//! Sources, lowest precedence first: built-in defaults, the settings file,
//! `POWER_TUNER_*` environment variables (after `.env` is loaded), then
//! command-line flags applied by the caller.

use config::{Config, Environment, File};
use power_tuner_analytics::settings::{SettingKey, ENV_PREFIX};
use power_tuner_analytics::TunerSettings;
use std::path::Path;

/// Settings file looked up in the working directory, any supported extension.
pub const DEFAULT_SETTINGS_FILE: &str = "power-tuner";

fn environment() -> Environment {
    let mut env = Environment::with_prefix(ENV_PREFIX)
        .try_parsing(true)
        .list_separator(",");
    for key in SettingKey::ALL.iter().filter(|k| k.is_list()) {
        env = env.with_list_parse_key(key.key());
    }
    env
}

/// Load settings from an optional file and the environment.
///
/// An explicit `path` must exist; the default file is optional.
pub fn load_settings(path: Option<&Path>) -> Result<TunerSettings, config::ConfigError> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    let file = match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_SETTINGS_FILE).required(false),
    };

    Config::builder()
        .add_source(file)
        .add_source(environment())
        .build()?
        .try_deserialize()
}
