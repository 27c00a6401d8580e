//! Settings file management

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::app::options::{ApiOptions, DeployerOptions, DEFAULT_API_URL, DEFAULT_REGION};
use crate::archive::DEFAULT_MAX_UNPACK_BYTES;
use crate::deploy::waiter::WaitOptions;
use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::logs::LogLevel;
use crate::utils::PROJECT_NAME;

/// Environment variable overriding the configured secret key
pub const SECRET_KEY_ENV: &str = "SCW_SECRET_KEY";

/// Deployer settings
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// API configuration
    #[serde(default)]
    pub api: ApiSettings,

    /// Seconds between two status polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Give up waiting for a build after this many seconds
    #[serde(default)]
    pub deploy_timeout_secs: Option<u64>,

    /// Ceiling on extracted archive bytes
    #[serde(default = "default_max_unpack_bytes")]
    pub max_unpack_bytes: u64,

    /// HTTP request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Container CLI used by `doctor`
    #[serde(default = "default_container_binary")]
    pub container_binary: String,
}

fn default_poll_interval() -> u64 {
    2
}

fn default_max_unpack_bytes() -> u64 {
    DEFAULT_MAX_UNPACK_BYTES
}

fn default_http_timeout() -> u64 {
    30
}

fn default_container_binary() -> String {
    "docker".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            api: ApiSettings::default(),
            poll_interval_secs: default_poll_interval(),
            deploy_timeout_secs: None,
            max_unpack_bytes: default_max_unpack_bytes(),
            http_timeout_secs: default_http_timeout(),
            container_binary: default_container_binary(),
        }
    }
}

/// API settings
#[derive(Debug, Deserialize)]
pub struct ApiSettings {
    /// Base URL for the API
    #[serde(default = "default_api_url")]
    pub base_url: String,

    /// Region
    #[serde(default = "default_region")]
    pub region: String,

    /// Project new namespaces are created in
    #[serde(default)]
    pub project_id: Option<String>,

    /// Secret key; the environment wins when both are set
    #[serde(default)]
    pub secret_key: Option<SecretString>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            region: default_region(),
            project_id: None,
            secret_key: None,
        }
    }
}

impl Settings {
    /// Default location, `~/.config/fndeploy/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME").filter(|h| !h.is_empty())?;
        Some(
            PathBuf::from(home)
                .join(".config")
                .join(PROJECT_NAME)
                .join("settings.json"),
        )
    }

    /// Read settings from `path`, falling back to defaults when it is missing
    pub async fn load(path: &Path) -> Result<Self, DeployError> {
        match File::new(path).read_json_opt::<Settings>().await? {
            Some(settings) => Ok(settings),
            None => {
                debug!("No settings file at {}, using defaults", path.display());
                Ok(Self::default())
            }
        }
    }

    pub fn deployer_options(&self) -> DeployerOptions {
        let wait = WaitOptions {
            interval: Duration::from_secs(self.poll_interval_secs),
            timeout: self.deploy_timeout_secs.map(Duration::from_secs),
        };

        DeployerOptions {
            wait: wait.clone(),
            namespace_wait: wait,
            max_unpack_bytes: self.max_unpack_bytes,
            project_id: self.api.project_id.clone(),
            container_binary: self.container_binary.clone(),
        }
    }

    /// API options, taking the secret key from the environment first
    pub fn api_options(&self) -> Result<ApiOptions, DeployError> {
        let secret_key = match std::env::var(SECRET_KEY_ENV) {
            Ok(key) if !key.is_empty() => SecretString::from(key),
            _ => match &self.api.secret_key {
                Some(key) => SecretString::from(key.expose_secret().to_string()),
                None => {
                    return Err(DeployError::Config(format!(
                        "no secret key configured, set {} or api.secret_key",
                        SECRET_KEY_ENV
                    )))
                }
            },
        };

        Ok(ApiOptions {
            base_url: self.api.base_url.clone(),
            region: self.api.region.clone(),
            timeout: Duration::from_secs(self.http_timeout_secs),
            secret_key,
        })
    }
}
