//! Settings loaded from `~/.config/reelsource/config.toml`.
//!
//! Every field has a default, so a missing file or a partial one is fine.
//! The debrid token may also come from `REELSOURCE_DEBRID_TOKEN`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::debrid::torbox::TORBOX_API_BASE;
use crate::error::ConfigurationError;
use crate::fetch::{FetchOptions, ProxyRoute};

pub const TOKEN_ENV: &str = "REELSOURCE_DEBRID_TOKEN";
pub const CONFIG_FILE: &str = "config.toml";
pub const PROVIDERS_FILE: &str = "providers.json";

/// Built-in source used when third-party mode is off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveSource {
    #[default]
    Aggregator,
    Dmm,
}

/// A relay proxy entry in the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub name: String,
    /// `{url}` is replaced by the encoded target, `{raw}` by the target as is.
    pub template: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub third_party_mode: bool,
    pub active_source: ActiveSource,
    pub debrid_token: Option<String>,
    pub debrid_url: String,

    pub aggregator_url: String,
    /// Path segment name carrying the credential, as in `{key}={token}`.
    pub aggregator_token_key: String,

    pub dmm_url: String,
    /// Ask the DMM source to return only cached results.
    pub dmm_prefilter: bool,

    pub proxies: Vec<ProxyConfig>,
    pub selected_proxy: Option<String>,

    pub attempt_timeout_secs: u64,
    pub direct_retries: u32,

    pub aggregator_timeout_secs: u64,
    pub dmm_timeout_secs: u64,
    pub provider_timeout_secs: u64,
    pub debrid_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            third_party_mode: false,
            active_source: ActiveSource::Aggregator,
            debrid_token: None,
            debrid_url: TORBOX_API_BASE.to_string(),
            aggregator_url: "https://torrentio.strem.fun".to_string(),
            aggregator_token_key: "torbox".to_string(),
            dmm_url: "https://debridmediamanager.com".to_string(),
            dmm_prefilter: false,
            proxies: Vec::new(),
            selected_proxy: None,
            attempt_timeout_secs: 8,
            direct_retries: 3,
            aggregator_timeout_secs: 15,
            dmm_timeout_secs: 30,
            provider_timeout_secs: 10,
            debrid_timeout_secs: 60,
        }
    }
}

impl Settings {
    /// Load from the default config directory, applying env overrides.
    pub fn load() -> Result<Self, ConfigurationError> {
        Self::load_from(&config_dir().join(CONFIG_FILE))
    }

    /// Load from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigurationError> {
        let mut settings = if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
            Self::parse(&content).map_err(|source| ConfigurationError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            Self::default()
        };

        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                settings.debrid_token = Some(token);
            }
        }
        Ok(settings)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// The debrid token, if one is set and not blank.
    pub fn credential(&self) -> Option<&str> {
        self.debrid_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn proxy_routes(&self) -> Vec<ProxyRoute> {
        self.proxies
            .iter()
            .map(|p| ProxyRoute::new(p.name.clone(), p.template.clone()))
            .collect()
    }

    /// Fetch options for unauthenticated source calls.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::default()
            .with_attempt_timeout(Duration::from_secs(self.attempt_timeout_secs.max(1)))
            .with_direct_retries(self.direct_retries)
    }

    pub fn aggregator_timeout(&self) -> Duration {
        Duration::from_secs(self.aggregator_timeout_secs)
    }

    pub fn dmm_timeout(&self) -> Duration {
        Duration::from_secs(self.dmm_timeout_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn debrid_timeout(&self) -> Duration {
        Duration::from_secs(self.debrid_timeout_secs)
    }
}

/// `{config_dir}/reelsource`, or `./reelsource` when no config dir exists.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reelsource")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::parse("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.active_source, ActiveSource::Aggregator);
        assert_eq!(settings.aggregator_timeout(), Duration::from_secs(15));
        assert_eq!(settings.dmm_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn parses_partial_file() {
        let settings = Settings::parse(
            r#"
third_party_mode = true
active_source = "dmm"
debrid_token = "abc"
selected_proxy = "relay"

[[proxies]]
name = "relay"
template = "https://relay.example/?url={url}"
"#,
        )
        .unwrap();
        assert!(settings.third_party_mode);
        assert_eq!(settings.active_source, ActiveSource::Dmm);
        assert_eq!(settings.credential(), Some("abc"));
        assert_eq!(settings.proxy_routes().len(), 1);
        assert_eq!(settings.provider_timeout_secs, 10);
    }

    #[test]
    fn blank_token_is_no_credential() {
        let settings = Settings {
            debrid_token: Some("   ".to_string()),
            ..Settings::default()
        };
        assert_eq!(settings.credential(), None);
    }

    #[test]
    fn unknown_source_is_rejected() {
        assert!(Settings::parse(r#"active_source = "usenet""#).is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.aggregator_token_key, "torbox");
    }

    #[test]
    fn unreadable_toml_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "third_party_mode = [").unwrap();
        let err = Settings::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse { .. }));
        assert!(err.to_string().contains(CONFIG_FILE));
    }
}
