//! Layered configuration loading.
//!
//! Sources, later ones winning:
//!
//! | Layer | Source                                                  |
//! |-------|---------------------------------------------------------|
//! | 1     | [`SwitchyardConfig::default`]                           |
//! | 2     | `switchyard.<profile>.toml` next to the main file       |
//! | 3     | `switchyard.toml` (or `config.toml`, `switchyard.yaml`) |
//! | 4     | `SWITCHYARD_*` variables, `__` separating levels        |
//! | 5     | [`ConfigLoader::merge`] / [`ConfigLoader::set`]         |
//!
//! `SWITCHYARD_DISPATCH__DEFAULT_TIMEOUT_MS=3000` lands in
//! `dispatch.default_timeout_ms`. `SWITCHYARD_PROFILE` picks the profile and
//! never reaches the schema.
//!
//! TOML files need the `toml-config` feature (on by default), YAML files
//! `yaml-config`. With both enabled each format is searched independently.
//!
//! ```rust,ignore
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./deploy/switchyard.toml")
//!     .load()?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Serialized};
#[cfg(any(feature = "toml-config", feature = "yaml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::SwitchyardConfig;
use super::validation::validate_config;

const ENV_PREFIX: &str = "SWITCHYARD_";
const PROFILE_VAR: &str = "SWITCHYARD_PROFILE";

// ─── Profile ─────────────────────────────────────────────────────────────────

/// Deployment profile, selecting `switchyard.<profile>.*` overlay files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Profile::Development => "development",
            Profile::Production => "production",
            Profile::Custom(name) => name.as_str(),
        }
    }

    /// Profile named by `SWITCHYARD_PROFILE`, or development.
    pub fn from_env() -> Self {
        match std::env::var(PROFILE_VAR) {
            Ok(name) => Profile::parse(&name),
            Err(_) => Profile::Development,
        }
    }

    fn parse(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "dev" | "development" => Profile::Development,
            "prod" | "production" => Profile::Production,
            _ => Profile::Custom(name),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── File formats ────────────────────────────────────────────────────────────

/// A configuration file syntax compiled into this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    #[cfg(feature = "toml-config")]
    Toml,
    #[cfg(feature = "yaml-config")]
    Yaml,
}

impl FileFormat {
    /// Formats searched when no explicit file is given.
    const ENABLED: &'static [FileFormat] = &[
        #[cfg(feature = "toml-config")]
        FileFormat::Toml,
        #[cfg(feature = "yaml-config")]
        FileFormat::Yaml,
    ];

    fn for_path(path: &Path) -> ConfigResult<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        Self::ENABLED
            .iter()
            .copied()
            .find(|format| format.file_names().iter().any(|n| n.ends_with(&format!(".{ext}"))))
            .ok_or_else(|| ConfigError::UnsupportedFormat(ext.to_string()))
    }

    /// Base file names, most preferred first.
    fn file_names(self) -> &'static [&'static str] {
        match self {
            #[cfg(feature = "toml-config")]
            FileFormat::Toml => &["switchyard.toml", "config.toml"],
            #[cfg(feature = "yaml-config")]
            FileFormat::Yaml => &["switchyard.yaml", "switchyard.yml"],
        }
    }

    #[allow(unused_variables)]
    fn merge_into(self, figment: Figment, path: &Path) -> Figment {
        match self {
            #[cfg(feature = "toml-config")]
            FileFormat::Toml => figment.merge(Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            FileFormat::Yaml => figment.merge(Yaml::file(path)),
        }
    }
}

/// `dir/switchyard.toml` becomes `dir/switchyard.<profile>.toml`.
fn profile_variant(path: &Path, profile: &Profile) -> Option<PathBuf> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    Some(path.with_file_name(format!("{stem}.{profile}.{ext}")))
}

// ─── Loader ──────────────────────────────────────────────────────────────────

/// Builder over the configuration sources; [`load`](Self::load) resolves them.
pub struct ConfigLoader {
    profile: Profile,
    file: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
    env: bool,
    overrides: Figment,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            profile: Profile::from_env(),
            file: None,
            search_paths: Vec::new(),
            env: true,
            overrides: Figment::new(),
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Loads exactly this file (plus its profile variant) instead of searching.
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_owned());
        self
    }

    /// Directory to search for config files. Without any, the current
    /// directory and the user config directory are searched.
    pub fn search_path(mut self, dir: impl AsRef<Path>) -> Self {
        self.search_paths.push(dir.as_ref().to_owned());
        self
    }

    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// `~/.config/switchyard` on Linux.
    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join("switchyard")),
            None => self,
        }
    }

    pub fn with_env(mut self) -> Self {
        self.env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.env = false;
        self
    }

    /// Merges a full configuration on top of every other source.
    pub fn merge(mut self, config: SwitchyardConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Sets one dotted key on top of every other source, e.g.
    /// `.set("dispatch.trace_routes", true)`.
    pub fn set<V: serde::Serialize>(mut self, key: &str, value: V) -> Self {
        self.overrides = self.overrides.merge(Serialized::default(key, value));
        self
    }

    /// Resolves every source, then extracts and validates the result.
    pub fn load(self) -> ConfigResult<SwitchyardConfig> {
        let profile = self.profile.clone();
        let config: SwitchyardConfig = self.into_figment()?.extract()?;
        validate_config(&config)?;

        debug!(
            %profile,
            level = %config.logging.level,
            timeout_ms = config.dispatch.default_timeout_ms,
            unrouted_batch = ?config.dispatch.unrouted_batch,
            "Configuration resolved"
        );
        Ok(config)
    }

    fn into_figment(self) -> ConfigResult<Figment> {
        let defaults = Figment::from(Serialized::defaults(SwitchyardConfig::default()));

        let mut figment = match &self.file {
            Some(path) => self.merge_explicit(defaults, path)?,
            None => self.merge_searched(defaults),
        };

        if self.env {
            trace!(prefix = ENV_PREFIX, "Merging environment");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["PROFILE"]).split("__"));
        }
        Ok(figment.merge(self.overrides))
    }

    fn merge_explicit(&self, figment: Figment, path: &Path) -> ConfigResult<Figment> {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound(path.to_owned()));
        }
        let format = FileFormat::for_path(path)?;
        Ok(self.merge_with_profile(figment, format, path))
    }

    /// First matching base name per format, searched directory by directory.
    fn merge_searched(&self, mut figment: Figment) -> Figment {
        let dirs = self.effective_search_paths();
        let mut found = false;

        for &format in FileFormat::ENABLED {
            let hit = dirs.iter().find_map(|dir| {
                format
                    .file_names()
                    .iter()
                    .map(|name| dir.join(name))
                    .find(|candidate| candidate.is_file())
            });
            if let Some(path) = hit {
                figment = self.merge_with_profile(figment, format, &path);
                found = true;
            }
        }

        if !found {
            warn!(searched = ?dirs, "No configuration file found, using defaults");
        }
        figment
    }

    /// Merges the profile variant of `path` (if present), then `path`.
    fn merge_with_profile(&self, mut figment: Figment, format: FileFormat, path: &Path) -> Figment {
        if let Some(variant) = profile_variant(path, &self.profile).filter(|p| p.is_file()) {
            debug!(path = %variant.display(), profile = %self.profile, "Merging profile file");
            figment = format.merge_into(figment, &variant);
        }
        info!(path = %path.display(), "Merging configuration file");
        format.merge_into(figment, path)
    }

    fn effective_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join("switchyard")))
            .collect()
    }
}

/// Searches the current and user config directories, then the environment.
pub fn load_config() -> ConfigResult<SwitchyardConfig> {
    ConfigLoader::new().load()
}

/// Loads `path` (and its profile variant), then the environment.
pub fn load_config_from_file(path: impl AsRef<Path>) -> ConfigResult<SwitchyardConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnroutedBatch;
    use figment::Jail;

    #[test]
    fn empty_directory_yields_defaults() {
        Jail::expect_with(|jail| {
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config, SwitchyardConfig::default());
            Ok(())
        });
    }

    #[test]
    fn profile_names() {
        assert_eq!(Profile::parse("PROD"), Profile::Production);
        assert_eq!(Profile::parse(" dev "), Profile::Development);
        assert_eq!(Profile::parse("Staging"), Profile::Custom("staging".into()));
        assert_eq!(Profile::Custom("qa".into()).to_string(), "qa");
    }

    #[test]
    fn profile_from_environment() {
        Jail::expect_with(|jail| {
            jail.set_env(PROFILE_VAR, "production");
            assert_eq!(Profile::from_env(), Profile::Production);
            Ok(())
        });
    }

    #[test]
    fn later_layers_win() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "switchyard.production.toml",
                r#"
                [dispatch]
                default_timeout_ms = 1000
                trace_routes = true
                "#,
            )?;
            jail.create_file(
                "switchyard.toml",
                r#"
                [dispatch]
                default_timeout_ms = 5000

                [logging]
                level = "warn"
                "#,
            )?;
            jail.set_env("SWITCHYARD_LOGGING__LEVEL", "debug");
            jail.set_env("SWITCHYARD_PROFILE", "production");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .set("dispatch.unrouted_batch", "retry")
                .load()
                .map_err(|e| e.to_string())?;

            // main file over profile file, env over both
            assert_eq!(config.dispatch.default_timeout_ms, 5000);
            assert!(config.dispatch.trace_routes);
            assert_eq!(config.logging.level, "debug");
            assert_eq!(config.dispatch.unrouted_batch, UnroutedBatch::Retry);
            Ok(())
        });
    }

    #[test]
    fn explicit_file_with_profile_variant() {
        Jail::expect_with(|jail| {
            jail.create_file("deploy.toml", "[runtime]\nmax_line_bytes = 2048\n")?;
            jail.create_file("deploy.qa.toml", "[dispatch]\ntrace_routes = true\n")?;

            let config = ConfigLoader::new()
                .profile("qa")
                .file(jail.directory().join("deploy.toml"))
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.runtime.max_line_bytes, 2048);
            assert!(config.dispatch.trace_routes);
            Ok(())
        });
    }

    #[test]
    fn missing_explicit_file() {
        let err = ConfigLoader::new()
            .file("/nonexistent/switchyard.toml")
            .without_env()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("switchyard.ini", "level = debug\n")?;
            let err = ConfigLoader::new()
                .file(jail.directory().join("switchyard.ini"))
                .without_env()
                .load()
                .unwrap_err();
            assert!(matches!(err, ConfigError::UnsupportedFormat(ext) if ext == "ini"));
            Ok(())
        });
    }

    #[test]
    fn zero_timeout_fails_validation() {
        Jail::expect_with(|jail| {
            jail.set_env("SWITCHYARD_DISPATCH__DEFAULT_TIMEOUT_MS", "0");
            let err = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .unwrap_err();
            assert!(matches!(err, ConfigError::ValidationError { .. }));
            Ok(())
        });
    }

    #[test]
    fn type_mismatch_is_a_parse_error() {
        Jail::expect_with(|jail| {
            jail.create_file("switchyard.toml", "[runtime]\nmax_line_bytes = \"lots\"\n")?;
            let err = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .unwrap_err();
            assert!(matches!(err, ConfigError::ParseError(_)));
            Ok(())
        });
    }
}
