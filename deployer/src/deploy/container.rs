//! Optional local container runtime, initialized on first use

use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::DeployError;

/// A value built at most once, on first request
///
/// The outcome of the first initialization is cached whether it succeeded
/// or not. Later callers get the same client or the same failure, without
/// a retry.
#[derive(Debug)]
pub struct LazyInit<T> {
    state: Mutex<Option<Result<Arc<T>, String>>>,
}

impl<T> Default for LazyInit<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(None),
        }
    }
}

impl<T> LazyInit<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value, running `init` if nobody has yet
    ///
    /// Concurrent first callers wait on the lock; only one runs `init`.
    pub async fn get_or_init<F, Fut>(&self, init: F) -> Result<Arc<T>, DeployError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DeployError>>,
    {
        let mut state = self.state.lock().await;

        if state.is_none() {
            let outcome = init().await.map(Arc::new).map_err(|e| e.to_string());
            if let Err(e) = &outcome {
                warn!("Initialization failed, not retrying: {}", e);
            }
            *state = Some(outcome);
        }

        match state.as_ref() {
            Some(Ok(value)) => Ok(Arc::clone(value)),
            Some(Err(message)) => Err(DeployError::Unavailable(message.clone())),
            None => Err(DeployError::Internal("lazy value missing".to_string())),
        }
    }

    /// Whether initialization already ran
    pub async fn is_initialized(&self) -> bool {
        self.state.lock().await.is_some()
    }
}

/// Handle on a local container engine CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRuntime {
    binary: String,
    server_version: String,
}

impl ContainerRuntime {
    /// Check `binary` for a reachable engine
    pub async fn connect(binary: &str) -> Result<Self, DeployError> {
        debug!("Probing container engine with {} version", binary);

        let output = Command::new(binary)
            .args(["version", "--format", "{{.Server.Version}}"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DeployError::Unavailable(format!("failed to run {}: {}", binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DeployError::Unavailable(format!(
                "{} version failed: {}",
                binary,
                stderr.trim()
            )));
        }

        let server_version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!("Connected to container engine {} ({})", binary, server_version);

        Ok(Self {
            binary: binary.to_string(),
            server_version,
        })
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn server_version(&self) -> &str {
        &self.server_version
    }
}
