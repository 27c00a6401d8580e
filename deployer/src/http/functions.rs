//! Functions API endpoints

use async_trait::async_trait;
use serde::Serialize;

use functions_api::models::{
    CreateFunctionRequest, CreateNamespaceRequest, DownloadUrl, Function, ListFunctionsResponse,
    ListNamespacesResponse, ListRuntimesResponse, Namespace, Runtime, UpdateFunctionRequest,
    UploadUrl,
};

use crate::api::FunctionApi;
use crate::errors::DeployError;
use crate::http::client::{HttpClient, PAGE_SIZE};

/// Empty JSON body for action endpoints
#[derive(Serialize)]
struct Empty {}

impl HttpClient {
    /// Query parameters for one page of a name-filtered listing
    fn page_query(page: u32, name: Option<&str>) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("page", page.to_string()),
            ("page_size", PAGE_SIZE.to_string()),
        ];
        if let Some(name) = name {
            query.push(("name", name.to_string()));
        }
        query
    }
}

#[async_trait]
impl FunctionApi for HttpClient {
    async fn get_namespace(&self, id: &str) -> Result<Namespace, DeployError> {
        self.get(&format!("/namespaces/{}", id), &[]).await
    }

    async fn list_namespaces(&self, name: Option<&str>) -> Result<Vec<Namespace>, DeployError> {
        let mut namespaces = Vec::new();
        let mut page = 1;
        loop {
            let response: ListNamespacesResponse =
                self.get("/namespaces", &Self::page_query(page, name)).await?;
            let received = response.namespaces.len();
            namespaces.extend(response.namespaces);

            if received == 0 || namespaces.len() as u64 >= response.total_count {
                return Ok(namespaces);
            }
            page += 1;
        }
    }

    async fn create_namespace(
        &self,
        request: &CreateNamespaceRequest,
    ) -> Result<Namespace, DeployError> {
        self.post("/namespaces", request).await
    }

    async fn delete_namespace(&self, id: &str) -> Result<Namespace, DeployError> {
        self.delete(&format!("/namespaces/{}", id)).await
    }

    async fn get_function(&self, id: &str) -> Result<Function, DeployError> {
        self.get(&format!("/functions/{}", id), &[]).await
    }

    async fn list_functions(&self, name: Option<&str>) -> Result<Vec<Function>, DeployError> {
        let mut functions = Vec::new();
        let mut page = 1;
        loop {
            let response: ListFunctionsResponse =
                self.get("/functions", &Self::page_query(page, name)).await?;
            let received = response.functions.len();
            functions.extend(response.functions);

            if received == 0 || functions.len() as u64 >= response.total_count {
                return Ok(functions);
            }
            page += 1;
        }
    }

    async fn create_function(
        &self,
        request: &CreateFunctionRequest,
    ) -> Result<Function, DeployError> {
        self.post("/functions", request).await
    }

    async fn update_function(
        &self,
        id: &str,
        request: &UpdateFunctionRequest,
    ) -> Result<Function, DeployError> {
        self.patch(&format!("/functions/{}", id), request).await
    }

    async fn delete_function(&self, id: &str) -> Result<Function, DeployError> {
        self.delete(&format!("/functions/{}", id)).await
    }

    async fn deploy_function(&self, id: &str) -> Result<Function, DeployError> {
        self.post(&format!("/functions/{}/deploy", id), &Empty {})
            .await
    }

    async fn get_upload_url(
        &self,
        id: &str,
        content_length: u64,
    ) -> Result<UploadUrl, DeployError> {
        self.get(
            &format!("/functions/{}/upload-url", id),
            &[("content_length", content_length.to_string())],
        )
        .await
    }

    async fn get_download_url(&self, id: &str) -> Result<DownloadUrl, DeployError> {
        self.get(&format!("/functions/{}/download-url", id), &[])
            .await
    }

    async fn list_runtimes(&self) -> Result<Vec<Runtime>, DeployError> {
        let response: ListRuntimesResponse = self.get("/runtimes", &[]).await?;
        Ok(response.runtimes)
    }
}
