use std::env;
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::MediaWikiClientConfig;
use crate::error::BotError;
use crate::pipeline::PipelineOptions;

pub const DEFAULT_USER_AGENT: &str = "catbot/0.1 (unused category propagation bot)";
pub const DEFAULT_AR_API_URL: &str = "https://ar.wikipedia.org/w/api.php";
pub const DEFAULT_EN_API_URL: &str = "https://en.wikipedia.org/w/api.php";
pub const DEFAULT_CONFIG_FILENAME: &str = "catbot.toml";
pub const DEFAULT_UNUSED_LIMIT: usize = 1000;

pub const USERNAME_ENV: &str = "WM_USERNAME";
pub const PASSWORD_ENV: &str = "PASSWORD";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct FileConfig {
    #[serde(default)]
    pub sites: SitesSection,
    #[serde(default)]
    pub run: RunSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct SitesSection {
    pub ar_api_url: Option<String>,
    pub en_api_url: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct RunSection {
    pub unused_limit: Option<usize>,
}

/// Load and parse a FileConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<FileConfig> {
    if !config_path.exists() {
        return Ok(FileConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: FileConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> crate::error::Result<Self> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> crate::error::Result<Self> {
        let username = lookup_value(lookup, USERNAME_ENV);
        let password = lookup_value(lookup, PASSWORD_ENV);
        match (username, password) {
            (Some(username), Some(password)) => Ok(Self { username, password }),
            _ => Err(BotError::Configuration(format!(
                "credentials not found; set {USERNAME_ENV} and {PASSWORD_ENV}"
            ))),
        }
    }
}

/// Values supplied on the command line. They win over every other source.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub ask: bool,
    pub unused_limit: Option<usize>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub credentials: Credentials,
    pub ask: bool,
    pub unused_limit: usize,
    pub categories: Vec<String>,
    pub ar_site: MediaWikiClientConfig,
    pub en_site: MediaWikiClientConfig,
}

impl BotConfig {
    /// Resolve from the process environment: flag > env > file > default.
    pub fn resolve(file: &FileConfig, overrides: &RunOverrides) -> crate::error::Result<Self> {
        Self::resolve_with(file, overrides, &process_env)
    }

    pub fn resolve_with(
        file: &FileConfig,
        overrides: &RunOverrides,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> crate::error::Result<Self> {
        let credentials = Credentials::from_lookup(lookup)?;

        let unused_limit = match overrides.unused_limit {
            Some(limit) => limit,
            None => match lookup_value(lookup, "CATBOT_UNUSED_LIMIT") {
                Some(raw) => raw.parse::<usize>().map_err(|_| {
                    BotError::Configuration(format!("CATBOT_UNUSED_LIMIT is not a number: {raw}"))
                })?,
                None => file.run.unused_limit.unwrap_or(DEFAULT_UNUSED_LIMIT),
            },
        };

        let user_agent = file
            .sites
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let ar_site = MediaWikiClientConfig::from_lookup(
            lookup,
            "AR_WIKI_API_URL",
            file.sites.ar_api_url.as_deref().unwrap_or(DEFAULT_AR_API_URL),
            &user_agent,
        );
        let en_site = MediaWikiClientConfig::from_lookup(
            lookup,
            "EN_WIKI_API_URL",
            file.sites.en_api_url.as_deref().unwrap_or(DEFAULT_EN_API_URL),
            &user_agent,
        );

        Ok(Self {
            credentials,
            ask: overrides.ask,
            unused_limit,
            categories: overrides.categories.clone(),
            ar_site,
            en_site,
        })
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            unused_limit: self.unused_limit,
            categories: self.categories.clone(),
            ..PipelineOptions::default()
        }
    }
}

pub(crate) fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

pub(crate) fn lookup_value(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
