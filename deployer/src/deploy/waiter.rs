//! Polling remote resources until they settle

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use functions_api::models::{Function, FunctionStatus, Namespace, NamespaceStatus};

use crate::api::FunctionApi;
use crate::cancel::Cancellation;
use crate::errors::DeployError;

/// Waiter options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOptions {
    /// Pause between two polls
    pub interval: Duration,

    /// Give up after this long; wait forever when `None`
    pub timeout: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: None,
        }
    }
}

/// Poll `fetch` until `is_terminal` holds for the returned snapshot
///
/// `on_tick` sees every snapshot, the terminal one included. Both the
/// fetch and the pause between polls race `cancel` and the deadline.
pub async fn wait_until<T, F, Fut, P, C>(
    options: &WaitOptions,
    cancel: &Cancellation,
    mut fetch: F,
    is_terminal: P,
    mut on_tick: C,
) -> Result<T, DeployError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DeployError>>,
    P: Fn(&T) -> bool,
    C: FnMut(&T),
{
    let deadline = options.timeout.map(|timeout| Instant::now() + timeout);

    loop {
        let snapshot = with_deadline(deadline, options, cancel.run(fetch())).await?;
        on_tick(&snapshot);

        if is_terminal(&snapshot) {
            return Ok(snapshot);
        }

        with_deadline(
            deadline,
            options,
            cancel.run(async {
                tokio::time::sleep(options.interval).await;
                Ok::<_, DeployError>(())
            }),
        )
        .await?;
    }
}

async fn with_deadline<T>(
    deadline: Option<Instant>,
    options: &WaitOptions,
    fut: impl Future<Output = Result<T, DeployError>>,
) -> Result<T, DeployError> {
    match (deadline, options.timeout) {
        (Some(deadline), Some(timeout)) => tokio::time::timeout_at(deadline, fut)
            .await
            .map_err(|_| DeployError::DeadlineExceeded(timeout))?,
        _ => fut.await,
    }
}

/// Terminal function statuses
pub fn is_function_settled(status: FunctionStatus) -> bool {
    matches!(
        status,
        FunctionStatus::Created
            | FunctionStatus::Error
            | FunctionStatus::Locked
            | FunctionStatus::Ready
    )
}

/// Terminal namespace statuses
pub fn is_namespace_settled(status: NamespaceStatus) -> bool {
    matches!(
        status,
        NamespaceStatus::Ready | NamespaceStatus::Error | NamespaceStatus::Locked
    )
}

/// Wait for a function to reach a terminal status
pub async fn wait_for_function<C>(
    api: &dyn FunctionApi,
    function_id: &str,
    options: &WaitOptions,
    cancel: &Cancellation,
    on_tick: C,
) -> Result<Function, DeployError>
where
    C: FnMut(&Function),
{
    debug!("Waiting for function {}", function_id);

    let function = wait_until(
        options,
        cancel,
        || api.get_function(function_id),
        |f: &Function| is_function_settled(f.status),
        on_tick,
    )
    .await?;

    info!("Function {} settled as {}", function_id, function.status);
    Ok(function)
}

/// Wait for a namespace to reach a terminal status
pub async fn wait_for_namespace(
    api: &dyn FunctionApi,
    namespace_id: &str,
    options: &WaitOptions,
    cancel: &Cancellation,
) -> Result<Namespace, DeployError> {
    debug!("Waiting for namespace {}", namespace_id);

    let namespace = wait_until(
        options,
        cancel,
        || api.get_namespace(namespace_id),
        |ns: &Namespace| is_namespace_settled(ns.status),
        |_| {},
    )
    .await?;

    info!("Namespace {} settled as {}", namespace_id, namespace.status);
    Ok(namespace)
}
