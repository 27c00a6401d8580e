//! Deployment progress reporting

use std::fmt;
use std::sync::Arc;

use colored::Colorize;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info};

use functions_api::models::Function;

use crate::errors::DeployError;
use crate::utils::generate_uuid;

/// Steps of a deployment, in the order they are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeploymentStep {
    CreatingArchive = 0,
    UploadingCode = 1,
    BuildStarted = 2,
    Building = 3,
    PushingImage = 4,
    Deploying = 5,
    /// Number of steps; the cursor never moves past it
    Total = 6,
}

impl DeploymentStep {
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn emoji(self) -> Option<&'static str> {
        match self {
            DeploymentStep::CreatingArchive => Some("📂"),
            DeploymentStep::UploadingCode => Some("📤"),
            DeploymentStep::BuildStarted => Some("🏗️"),
            DeploymentStep::Building => Some("🛠️"),
            DeploymentStep::PushingImage => Some("📦"),
            DeploymentStep::Deploying => Some("🚀"),
            DeploymentStep::Total => None,
        }
    }

    /// The following step, saturating at `Total`
    pub fn next(self) -> Self {
        match self {
            DeploymentStep::CreatingArchive => DeploymentStep::UploadingCode,
            DeploymentStep::UploadingCode => DeploymentStep::BuildStarted,
            DeploymentStep::BuildStarted => DeploymentStep::Building,
            DeploymentStep::Building => DeploymentStep::PushingImage,
            DeploymentStep::PushingImage => DeploymentStep::Deploying,
            DeploymentStep::Deploying | DeploymentStep::Total => DeploymentStep::Total,
        }
    }
}

impl fmt::Display for DeploymentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentStep::CreatingArchive => "creating_archive",
            DeploymentStep::UploadingCode => "uploading_code",
            DeploymentStep::BuildStarted => "build_started",
            DeploymentStep::Building => "building",
            DeploymentStep::PushingImage => "pushing_image",
            DeploymentStep::Deploying => "deploying",
            DeploymentStep::Total => "total",
        };
        f.write_str(name)
    }
}

/// Opaque token correlating notifications with the request that caused them
pub type ProgressToken = serde_json::Value;

/// A single progress update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressNotification {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<ProgressToken>,
    pub progress: f64,
    pub total: f64,
}

/// Destination of progress notifications
///
/// Delivery is fire-and-forget: a failure is logged by the reporter and
/// never interrupts the deployment.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, notification: &ProgressNotification) -> Result<(), DeployError>;
}

/// Sink relying on the reporter's own log lines
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn notify(&self, _notification: &ProgressNotification) -> Result<(), DeployError> {
        Ok(())
    }
}

/// Sink forwarding notifications over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressNotification>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn notify(&self, notification: &ProgressNotification) -> Result<(), DeployError> {
        self.tx
            .send(notification.clone())
            .map_err(|_| DeployError::Internal("progress receiver dropped".to_string()))
    }
}

/// Sink printing one line per notification to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn notify(&self, notification: &ProgressNotification) -> Result<(), DeployError> {
        let counter = format!("[{}/{}]", notification.progress, notification.total);
        eprintln!("{} {}", counter.dimmed(), notification.message.bold());
        Ok(())
    }
}

/// Forward-moving progress cursor for one function deployment
pub struct ProgressReporter {
    deployment_id: String,
    function_name: String,
    token: Option<ProgressToken>,
    sink: Arc<dyn ProgressSink>,
    current: DeploymentStep,
    last_build_message: Option<String>,
}

impl ProgressReporter {
    pub fn new(
        function_name: impl Into<String>,
        token: Option<ProgressToken>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            deployment_id: generate_uuid(),
            function_name: function_name.into(),
            token,
            sink,
            current: DeploymentStep::CreatingArchive,
            last_build_message: None,
        }
    }

    pub fn deployment_id(&self) -> &str {
        &self.deployment_id
    }

    pub fn current_step(&self) -> DeploymentStep {
        self.current
    }

    pub fn notify_code_archive_creation(&mut self) {
        self.notify_fixed(DeploymentStep::CreatingArchive, "Creating code archive");
    }

    pub fn notify_code_uploading(&mut self) {
        self.notify_fixed(DeploymentStep::UploadingCode, "Uploading code...");
    }

    pub fn notify_build_started(&mut self) {
        self.notify_fixed(DeploymentStep::BuildStarted, "Starting build...");
    }

    /// Move the cursor back to `BuildStarted` and forget the last build message
    ///
    /// Call before `notify_build_started`, so build messages observed while
    /// polling land on the steps after it.
    pub fn start_build_phase(&mut self) {
        self.current = DeploymentStep::BuildStarted;
        self.last_build_message = None;
    }

    /// Report the build message of a freshly polled function, once per change
    pub fn observe_build(&mut self, function: &Function) {
        let Some(message) = function.build_message.as_deref() else {
            return;
        };
        if message.is_empty() || self.last_build_message.as_deref() == Some(message) {
            return;
        }

        self.last_build_message = Some(message.to_string());
        let formatted = format_build_message(self.current, message);
        self.emit(formatted);
        self.advance();
    }

    fn notify_fixed(&mut self, step: DeploymentStep, text: &str) {
        let message = match step.emoji() {
            Some(emoji) => format!("{} {}", emoji, text),
            None => text.to_string(),
        };
        self.emit(message);
        self.advance();
    }

    fn advance(&mut self) {
        self.current = self.current.next();
    }

    fn emit(&self, message: String) {
        info!(
            deployment_id = %self.deployment_id,
            function_name = %self.function_name,
            step = self.current.index(),
            "Function deployment progressed: {}",
            message
        );

        let notification = ProgressNotification {
            message,
            token: self.token.clone(),
            progress: f64::from(self.current.index()),
            total: f64::from(DeploymentStep::Total.index()),
        };

        if let Err(e) = self.sink.notify(&notification) {
            error!("Notifying progress: {}", e);
        }
    }
}

/// Render a build pipeline message for display at `step`
///
/// `"build: installing deps"` becomes `"🛠️ Installing deps"` at `Building`.
/// The phase label before the first `:` is dropped.
pub fn format_build_message(step: DeploymentStep, message: &str) -> String {
    let body = match message.split_once(':') {
        Some((_, body)) => body,
        None => message,
    };

    let Some(emoji) = step.emoji() else {
        return body.to_string();
    };

    let body = body.trim();
    let mut chars = body.chars();
    match chars.next() {
        None => emoji.to_string(),
        Some(first) => format!("{} {}{}", emoji, first.to_uppercase(), chars.as_str()),
    }
}
