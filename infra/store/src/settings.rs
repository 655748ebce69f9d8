use crate::error::{StoreError, StoreErrorExt};
use anvil_domain::constants::{
    DEFAULT_CONFIG_DOMAIN, DEFAULT_CONFIG_FILE_NAME, DEFAULT_CONFIG_FOLDER, DOMAIN_FILE_EXTENSION,
};
use config::{Config, Environment};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of the environment variables read by [`StoreSettings::from_env`].
pub const ENV_PREFIX: &str = "ANVIL";

/// Bootstrap location of the property store.
///
/// These are the values the store needs before any domain exists. Once the default
/// domain is loaded, its `configFolder` / `configFileName` entries take over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub config_domain: String,
    pub config_folder: PathBuf,
    pub config_file_name: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            config_domain: DEFAULT_CONFIG_DOMAIN.to_owned(),
            config_folder: PathBuf::from(DEFAULT_CONFIG_FOLDER),
            config_file_name: DEFAULT_CONFIG_FILE_NAME.to_owned(),
        }
    }
}

impl StoreSettings {
    /// Defaults overlaid with `ANVIL__CONFIG_DOMAIN`, `ANVIL__CONFIG_FOLDER` and
    /// `ANVIL__CONFIG_FILE_NAME`.
    ///
    /// # Errors
    /// Returns [`StoreError::Settings`] if the environment holds values that cannot be
    /// deserialized into the settings.
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// Same as [`StoreSettings::from_env`] with a custom variable prefix.
    ///
    /// # Errors
    /// Returns [`StoreError::Settings`] on malformed environment values.
    pub fn from_env_with_prefix(prefix: &str) -> Result<Self, StoreError> {
        Self::from_environment(Environment::with_prefix(prefix).separator("__"))
    }

    fn from_environment(environment: Environment) -> Result<Self, StoreError> {
        let defaults = Self::default();

        let settings = Config::builder()
            .set_default("config_domain", defaults.config_domain)
            .context("Invalid default for config_domain")?
            .set_default("config_folder", defaults.config_folder.display().to_string())
            .context("Invalid default for config_folder")?
            .set_default("config_file_name", defaults.config_file_name)
            .context("Invalid default for config_file_name")?
            .add_source(environment)
            .build()
            .context("Failed to build store settings")?
            .try_deserialize::<Self>()
            .context("Failed to deserialize store settings")?;

        debug!(settings = ?settings, "Resolved store settings");
        Ok(settings)
    }

    #[must_use = "Sets the default domain name"]
    pub fn with_config_domain(mut self, name: impl Into<String>) -> Self {
        self.config_domain = name.into();
        self
    }

    #[must_use = "Sets the folder holding domain files"]
    pub fn with_config_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.config_folder = folder.into();
        self
    }

    #[must_use = "Sets the file name of the default domain"]
    pub fn with_config_file_name(mut self, name: impl Into<String>) -> Self {
        self.config_file_name = name.into();
        self
    }

    /// Backing file of `domain` inside `folder`.
    #[must_use]
    pub fn domain_file(&self, folder: &Path, domain: &str, file_name: &str) -> PathBuf {
        if domain == self.config_domain {
            folder.join(file_name)
        } else {
            folder.join(format!("{domain}.{DOMAIN_FILE_EXTENSION}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_well_known_values() {
        let settings = StoreSettings::default();
        assert_eq!(settings.config_domain, "default");
        assert_eq!(settings.config_folder, PathBuf::from("config"));
        assert_eq!(settings.config_file_name, "default.config");
    }

    #[test]
    fn domain_files_sit_next_to_the_default_file() {
        let settings = StoreSettings::default();
        let folder = Path::new("cfg");
        assert_eq!(settings.domain_file(folder, "default", "main.config"), folder.join("main.config"));
        assert_eq!(settings.domain_file(folder, "net", "main.config"), folder.join("net.config"));
    }

    #[test]
    fn environment_overrides_defaults() {
        let vars = config::Map::from([
            ("ANVIL__CONFIG_FOLDER".to_owned(), "/etc/anvil".to_owned()),
            ("ANVIL__CONFIG_FILE_NAME".to_owned(), "main.config".to_owned()),
        ]);
        let env = Environment::with_prefix(ENV_PREFIX).separator("__").source(Some(vars));

        let settings = StoreSettings::from_environment(env).expect("settings");
        assert_eq!(settings.config_domain, "default");
        assert_eq!(settings.config_folder, PathBuf::from("/etc/anvil"));
        assert_eq!(settings.config_file_name, "main.config");
    }

    #[test]
    fn empty_environment_keeps_defaults() {
        let env = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .source(Some(config::Map::new()));
        let settings = StoreSettings::from_environment(env).expect("settings");
        assert_eq!(settings, StoreSettings::default());
    }
}
