//! Namespace and function housekeeping

use std::path::Path;

use tracing::info;

use functions_api::models::CreateNamespaceRequest;

use crate::api::{get_function_by_name, get_namespace_by_name};
use crate::cancel::Cancellation;
use crate::deploy::ownership::check_ownership;
use crate::deploy::orchestrator::Deployer;
use crate::deploy::tags::set_created_by;
use crate::deploy::waiter::wait_for_namespace;
use crate::errors::{DeployError, StepContext};
use crate::models::{FunctionSummary, NamespaceSummary};

impl Deployer {
    /// Create a namespace owned by this tool and wait until it is usable
    pub async fn create_namespace(
        &self,
        name: &str,
        tags: Vec<String>,
        cancel: &Cancellation,
    ) -> Result<NamespaceSummary, DeployError> {
        let request = CreateNamespaceRequest {
            name: name.to_string(),
            project_id: self.options().project_id.clone(),
            tags: set_created_by(tags),
        };

        let namespace = cancel
            .run(self.api().create_namespace(&request))
            .await
            .step("creating namespace")?;
        info!("Created namespace {} ({})", namespace.name, namespace.id);

        let namespace = wait_for_namespace(
            self.api(),
            &namespace.id,
            &self.options().namespace_wait,
            cancel,
        )
        .await
        .step("waiting for namespace")?;

        Ok(NamespaceSummary::from(&namespace))
    }

    /// Delete a namespace, and every function in it, if this tool created it
    pub async fn delete_namespace(
        &self,
        name: &str,
        cancel: &Cancellation,
    ) -> Result<NamespaceSummary, DeployError> {
        let namespace = cancel
            .run(get_namespace_by_name(self.api(), name))
            .await
            .step("getting namespace by name")?;
        check_ownership(&namespace.tags, &format!("namespace {:?}", name))
            .step("checking ownership")?;

        let namespace = cancel
            .run(self.api().delete_namespace(&namespace.id))
            .await
            .step("deleting namespace")?;
        info!("Deleting namespace {} ({})", namespace.name, namespace.id);

        Ok(NamespaceSummary::from(&namespace))
    }

    /// Delete a function if this tool created it
    pub async fn delete_function(
        &self,
        name: &str,
        cancel: &Cancellation,
    ) -> Result<FunctionSummary, DeployError> {
        let function = cancel
            .run(get_function_by_name(self.api(), name))
            .await
            .step("getting function by name")?;
        check_ownership(&function.tags, &format!("function {:?}", name))
            .step("checking ownership")?;

        let function = cancel
            .run(self.api().delete_function(&function.id))
            .await
            .step("deleting function")?;
        info!("Deleting function {} ({})", function.name, function.id);

        Ok(FunctionSummary::from(&function))
    }

    /// Download the code of a function into the existing directory `to_dir`
    ///
    /// Read-only, so any function can be downloaded regardless of ownership.
    pub async fn download_function(
        &self,
        name: &str,
        to_dir: &Path,
        cancel: &Cancellation,
    ) -> Result<FunctionSummary, DeployError> {
        let function = cancel
            .run(get_function_by_name(self.api(), name))
            .await
            .step("getting function by name")?;

        let download_url = cancel
            .run(self.api().get_download_url(&function.id))
            .await
            .step("getting download URL")?;

        self.transfer()
            .download_and_extract(
                &download_url.url,
                to_dir,
                self.options().max_unpack_bytes,
                cancel,
            )
            .await
            .step("downloading archive")?;
        info!("Downloaded function {} into {}", function.name, to_dir.display());

        Ok(FunctionSummary::from(&function))
    }
}
