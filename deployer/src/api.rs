//! Remote function API capability

use async_trait::async_trait;
use functions_api::models::{
    CreateFunctionRequest, CreateNamespaceRequest, DownloadUrl, Function, Namespace, Runtime,
    UpdateFunctionRequest, UploadUrl,
};

use crate::errors::DeployError;

/// Operations the deployer needs from the serverless functions API
///
/// Implemented over HTTP by [`crate::http::HttpClient`] and in memory by the
/// test adapter.
#[async_trait]
pub trait FunctionApi: Send + Sync {
    async fn get_namespace(&self, id: &str) -> Result<Namespace, DeployError>;

    /// List namespaces, optionally filtered by name on the server side
    async fn list_namespaces(&self, name: Option<&str>) -> Result<Vec<Namespace>, DeployError>;

    async fn create_namespace(
        &self,
        request: &CreateNamespaceRequest,
    ) -> Result<Namespace, DeployError>;

    async fn delete_namespace(&self, id: &str) -> Result<Namespace, DeployError>;

    async fn get_function(&self, id: &str) -> Result<Function, DeployError>;

    /// List functions, optionally filtered by name on the server side
    async fn list_functions(&self, name: Option<&str>) -> Result<Vec<Function>, DeployError>;

    async fn create_function(
        &self,
        request: &CreateFunctionRequest,
    ) -> Result<Function, DeployError>;

    async fn update_function(
        &self,
        id: &str,
        request: &UpdateFunctionRequest,
    ) -> Result<Function, DeployError>;

    async fn delete_function(&self, id: &str) -> Result<Function, DeployError>;

    /// Start building and deploying the last uploaded code
    async fn deploy_function(&self, id: &str) -> Result<Function, DeployError>;

    /// Presigned URL for a code archive of exactly `content_length` bytes
    async fn get_upload_url(&self, id: &str, content_length: u64)
        -> Result<UploadUrl, DeployError>;

    async fn get_download_url(&self, id: &str) -> Result<DownloadUrl, DeployError>;

    async fn list_runtimes(&self) -> Result<Vec<Runtime>, DeployError>;
}

/// Resolve a namespace by its exact name
pub async fn get_namespace_by_name(
    api: &dyn FunctionApi,
    name: &str,
) -> Result<Namespace, DeployError> {
    api.list_namespaces(Some(name))
        .await?
        .into_iter()
        .find(|ns| ns.name == name)
        .ok_or_else(|| DeployError::NotFound(format!("namespace {:?}", name)))
}

/// Resolve a function by its exact name
pub async fn get_function_by_name(
    api: &dyn FunctionApi,
    name: &str,
) -> Result<Function, DeployError> {
    api.list_functions(Some(name))
        .await?
        .into_iter()
        .find(|function| function.name == name)
        .ok_or_else(|| DeployError::NotFound(format!("function {:?}", name)))
}
