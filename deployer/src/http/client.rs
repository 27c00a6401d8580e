//! HTTP client implementation

use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use functions_api::models::ErrorResponse;

use crate::app::options::ApiOptions;
use crate::errors::DeployError;
use crate::utils::user_agent;

/// Header carrying the API secret key
pub const AUTH_HEADER: &str = "X-Auth-Token";

/// Page size used when listing resources
pub const PAGE_SIZE: u32 = 100;

/// HTTP client for the functions API
pub struct HttpClient {
    client: Client,
    base_url: String,
    secret_key: SecretString,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(options: ApiOptions) -> Result<Self, DeployError> {
        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(user_agent())
            .build()?;

        // Validate early so a typo fails before the first request.
        url::Url::parse(&options.base_url)
            .map_err(|e| DeployError::Config(format!("invalid API URL {:?}: {}", options.base_url, e)))?;

        let base_url = format!(
            "{}/functions/v1beta1/regions/{}",
            options.base_url.trim_end_matches('/'),
            options.region
        );

        Ok(Self {
            client,
            base_url,
            secret_key: options.secret_key,
        })
    }

    /// Get the base URL, including product and region
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        self.client
            .request(method, &url)
            .header(AUTH_HEADER, self.secret_key.expose_secret())
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, DeployError> {
        let response = self.request(Method::GET, path).query(query).send().await?;
        decode(Method::GET, response).await
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, DeployError> {
        let response = self.request(Method::POST, path).json(body).send().await?;
        decode(Method::POST, response).await
    }

    /// Make a PATCH request
    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, DeployError> {
        let response = self.request(Method::PATCH, path).json(body).send().await?;
        decode(Method::PATCH, response).await
    }

    /// Make a DELETE request
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, DeployError> {
        let response = self.request(Method::DELETE, path).send().await?;
        decode(Method::DELETE, response).await
    }
}

async fn decode<T: DeserializeOwned>(method: Method, response: Response) -> Result<T, DeployError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!("HTTP {} failed: {} - {}", method, status, body);

        let message = serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .map(|e| e.message)
            .filter(|m| !m.is_empty())
            .unwrap_or(body);

        return Err(DeployError::RemoteApi {
            status: status.as_u16(),
            message,
        });
    }

    let body = response.json().await?;
    Ok(body)
}
