//! Function deployment orchestration

use std::sync::Arc;

use tracing::{debug, info, warn};

use functions_api::models::{Function, FunctionStatus, UpdateFunctionRequest};

use crate::api::{get_function_by_name, get_namespace_by_name, FunctionApi};
use crate::app::options::DeployerOptions;
use crate::archive::{create_code_archive, TransferClient};
use crate::cancel::Cancellation;
use crate::deploy::container::{ContainerRuntime, LazyInit};
use crate::deploy::ownership::check_ownership;
use crate::deploy::progress::{LogSink, ProgressReporter, ProgressSink, ProgressToken};
use crate::deploy::requests::{CreateAndDeployFunctionInput, UpdateFunctionInput};
use crate::deploy::tags::{code_archive_digest, set_code_archive_digest};
use crate::deploy::waiter::wait_for_function;
use crate::errors::{DeployError, StepContext};
use crate::models::FunctionSummary;

/// Deploys local directories as serverless functions
///
/// Methods hold no per-call state and may run concurrently.
pub struct Deployer {
    api: Arc<dyn FunctionApi>,
    transfer: TransferClient,
    options: DeployerOptions,
    sink: Arc<dyn ProgressSink>,
    container: LazyInit<ContainerRuntime>,
}

impl Deployer {
    pub fn new(api: Arc<dyn FunctionApi>, transfer: TransferClient, options: DeployerOptions) -> Self {
        Self {
            api,
            transfer,
            options,
            sink: Arc::new(LogSink),
            container: LazyInit::new(),
        }
    }

    /// Send progress notifications to `sink` instead of the log only
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn api(&self) -> &dyn FunctionApi {
        self.api.as_ref()
    }

    pub fn transfer(&self) -> &TransferClient {
        &self.transfer
    }

    pub fn options(&self) -> &DeployerOptions {
        &self.options
    }

    /// The local container engine, checked on first call only
    pub async fn container_runtime(&self) -> Result<Arc<ContainerRuntime>, DeployError> {
        let binary = self.options.container_binary.clone();
        self.container
            .get_or_init(|| async move { ContainerRuntime::connect(&binary).await })
            .await
    }

    /// Create a function in an existing namespace, upload its code and wait
    /// for the first build to settle
    ///
    /// The function is created before the code is packed so that invalid
    /// configuration fails fast. Nothing is rolled back on a later failure.
    pub async fn create_and_deploy(
        &self,
        input: &CreateAndDeployFunctionInput,
        token: Option<ProgressToken>,
        cancel: &Cancellation,
    ) -> Result<FunctionSummary, DeployError> {
        let api = self.api();
        let mut progress = ProgressReporter::new(&input.function_name, token, self.sink.clone());

        let namespace = cancel
            .run(get_namespace_by_name(api, &input.namespace_name))
            .await
            .step("getting namespace by name")?;

        let runtimes = cancel
            .run(api.list_runtimes())
            .await
            .step("listing runtimes")?;
        if !runtimes
            .iter()
            .any(|runtime| runtime.name.eq_ignore_ascii_case(&input.runtime))
        {
            return Err(DeployError::RuntimeUnsupported(input.runtime.clone()));
        }

        let request = input
            .to_api(&namespace.id)
            .step("converting create request")?;
        let function = cancel
            .run(api.create_function(&request))
            .await
            .step("creating function")?;
        info!("Created function {} ({})", function.name, function.id);

        progress.notify_code_archive_creation();
        let archive = cancel
            .run(create_code_archive(input.directory.clone()))
            .await
            .step("creating archive")?;

        // The id only exists once created, so the digest is recorded separately.
        let record_digest = UpdateFunctionRequest {
            tags: Some(set_code_archive_digest(&function.tags, archive.digest())),
            redeploy: Some(false),
            ..Default::default()
        };
        let function = cancel
            .run(api.update_function(&function.id, &record_digest))
            .await
            .step("recording code archive digest")?;

        let upload_url = cancel
            .run(api.get_upload_url(&function.id, archive.size()))
            .await
            .step("getting upload URL")?;

        progress.notify_code_uploading();
        self.transfer
            .upload(&archive, &upload_url.url, cancel)
            .await
            .step("uploading archive")?;
        drop(archive);

        cancel
            .run(api.deploy_function(&function.id))
            .await
            .step("deploying function")?;

        let function = self
            .watch_build(&function.id, &mut progress, cancel)
            .await
            .step("waiting for function")?;

        Ok(FunctionSummary::from(&function))
    }

    /// Update the code and configuration of a function created by this tool
    ///
    /// Code whose digest matches the recorded one is not uploaded again once
    /// the function has been deployed, and an update that changes nothing is
    /// not sent.
    pub async fn update(
        &self,
        input: &UpdateFunctionInput,
        token: Option<ProgressToken>,
        cancel: &Cancellation,
    ) -> Result<FunctionSummary, DeployError> {
        let api = self.api();
        let mut progress = ProgressReporter::new(&input.function_name, token, self.sink.clone());

        let function = cancel
            .run(get_function_by_name(api, &input.function_name))
            .await
            .step("getting function by name")?;
        check_ownership(&function.tags, &format!("function {:?}", function.name))
            .step("checking ownership")?;

        progress.notify_code_archive_creation();
        let archive = cancel
            .run(create_code_archive(input.directory.clone()))
            .await
            .step("creating archive")?;

        // A created function that was never deployed may carry the digest of
        // an upload that failed, so only a deployed one can skip the upload.
        let has_deployed_code = function.status != FunctionStatus::Created;
        let should_upload = match code_archive_digest(&function.tags) {
            Some(digest) if has_deployed_code && archive.compare_digest(digest) => {
                info!(
                    function_name = %input.function_name,
                    digest,
                    "Code archive digest matches existing one, skipping upload"
                );
                false
            }
            _ => true,
        };

        if should_upload {
            let upload_url = cancel
                .run(api.get_upload_url(&function.id, archive.size()))
                .await
                .step("getting upload URL")?;

            progress.notify_code_uploading();
            self.transfer
                .upload(&archive, &upload_url.url, cancel)
                .await
                .step("uploading archive")?;
        }

        let mut request = input
            .to_api(&function, archive.digest())
            .step("converting update request")?;
        drop(archive);

        if should_upload {
            request.redeploy = Some(true);
        }

        let function = if request.is_empty() {
            debug!("Function {} is up to date", function.name);
            function
        } else {
            cancel
                .run(api.update_function(&function.id, &request))
                .await
                .step("updating function")?
        };

        if !should_upload {
            return Ok(FunctionSummary::from(&function));
        }

        let function = self
            .watch_build(&function.id, &mut progress, cancel)
            .await
            .step("waiting for function")?;

        Ok(FunctionSummary::from(&function))
    }

    /// Report the build and poll the function until it settles
    async fn watch_build(
        &self,
        function_id: &str,
        progress: &mut ProgressReporter,
        cancel: &Cancellation,
    ) -> Result<Function, DeployError> {
        progress.start_build_phase();
        progress.notify_build_started();

        let function = wait_for_function(
            self.api(),
            function_id,
            &self.options.wait,
            cancel,
            |function| progress.observe_build(function),
        )
        .await?;

        if function.status == FunctionStatus::Error {
            warn!(
                "Function {} failed to deploy: {}",
                function.name,
                function.error_message.as_deref().unwrap_or("unknown error")
            );
        }

        Ok(function)
    }
}
