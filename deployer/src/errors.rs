//! Error types for the deployer

use thiserror::Error;

/// Main error type for the deployer
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Resource not owned by this tool: {0}")]
    NotOwned(String),

    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Runtime not supported: {0}")]
    RuntimeUnsupported(String),

    #[error("Archive exceeds the {limit} bytes extraction limit")]
    ArchiveTooLarge { limit: u64 },

    #[error("Path traversal rejected: {0}")]
    PathTraversalRejected(String),

    #[error("Uploading code archive failed: status code {status}")]
    UploadFailed { status: u16 },

    #[error("Downloading code archive failed: status code {status}")]
    DownloadFailed { status: u16 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Deadline exceeded after {0:?}")]
    DeadlineExceeded(std::time::Duration),

    #[error("Remote API error ({status}): {message}")]
    RemoteApi { status: u16, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{step}: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<DeployError>,
    },
}

impl DeployError {
    /// The innermost error, with every step layer removed
    pub fn root(&self) -> &DeployError {
        let mut err = self;
        while let DeployError::Step { source, .. } = err {
            err = source;
        }
        err
    }

    /// Steps the error travelled through, outermost first
    pub fn steps(&self) -> Vec<&'static str> {
        let mut steps = Vec::new();
        let mut err = self;
        while let DeployError::Step { step, source } = err {
            steps.push(*step);
            err = source;
        }
        steps
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), DeployError::Cancelled)
    }
}

impl From<tokio::task::JoinError> for DeployError {
    fn from(err: tokio::task::JoinError) -> Self {
        DeployError::Internal(format!("blocking task failed: {}", err))
    }
}

/// Attach the name of the failing operation to an error
pub trait StepContext<T> {
    fn step(self, step: &'static str) -> Result<T, DeployError>;
}

impl<T, E> StepContext<T> for Result<T, E>
where
    E: Into<DeployError>,
{
    fn step(self, step: &'static str) -> Result<T, DeployError> {
        self.map_err(|e| DeployError::Step {
            step,
            source: Box::new(e.into()),
        })
    }
}
