//! Runtime options derived from settings

use std::time::Duration;

use secrecy::SecretString;

use crate::archive::DEFAULT_MAX_UNPACK_BYTES;
use crate::deploy::waiter::WaitOptions;

/// Scaleway-style public API endpoint
pub const DEFAULT_API_URL: &str = "https://api.scaleway.com";

/// Region used when none is configured
pub const DEFAULT_REGION: &str = "fr-par";

/// Options for the deployer itself
#[derive(Debug, Clone)]
pub struct DeployerOptions {
    /// Polling of functions while they build
    pub wait: WaitOptions,

    /// Polling of namespaces while they are created
    pub namespace_wait: WaitOptions,

    /// Ceiling on downloaded and extracted archive bytes
    pub max_unpack_bytes: u64,

    /// Project new namespaces are created in, if not the key's default
    pub project_id: Option<String>,

    /// Container CLI checked for the optional container runtime
    pub container_binary: String,
}

impl Default for DeployerOptions {
    fn default() -> Self {
        Self {
            wait: WaitOptions::default(),
            namespace_wait: WaitOptions::default(),
            max_unpack_bytes: DEFAULT_MAX_UNPACK_BYTES,
            project_id: None,
            container_binary: "docker".to_string(),
        }
    }
}

/// Options for the HTTP API client
#[derive(Debug)]
pub struct ApiOptions {
    /// API base URL, without the product path
    pub base_url: String,

    /// Region the functions live in
    pub region: String,

    /// Request timeout
    pub timeout: Duration,

    /// Secret key sent as `X-Auth-Token`
    pub secret_key: SecretString,
}

impl ApiOptions {
    pub fn new(secret_key: SecretString) -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            region: DEFAULT_REGION.to_string(),
            timeout: Duration::from_secs(30),
            secret_key,
        }
    }
}
