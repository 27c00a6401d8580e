//! API models

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Function status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionStatus {
    Ready,
    Deleting,
    Error,
    Locked,
    Creating,
    Pending,
    Created,
    #[default]
    #[serde(other)]
    Unknown,
}

impl FunctionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionStatus::Unknown => "unknown",
            FunctionStatus::Ready => "ready",
            FunctionStatus::Deleting => "deleting",
            FunctionStatus::Error => "error",
            FunctionStatus::Locked => "locked",
            FunctionStatus::Creating => "creating",
            FunctionStatus::Pending => "pending",
            FunctionStatus::Created => "created",
        }
    }
}

impl fmt::Display for FunctionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Namespace status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceStatus {
    Ready,
    Deleting,
    Error,
    Locked,
    Creating,
    Pending,
    #[default]
    #[serde(other)]
    Unknown,
}

impl NamespaceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamespaceStatus::Unknown => "unknown",
            NamespaceStatus::Ready => "ready",
            NamespaceStatus::Deleting => "deleting",
            NamespaceStatus::Error => "error",
            NamespaceStatus::Locked => "locked",
            NamespaceStatus::Creating => "creating",
            NamespaceStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for NamespaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A function namespace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: NamespaceStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub region: String,
}

/// A serverless function
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub namespace_id: String,
    #[serde(default)]
    pub status: FunctionStatus,
    #[serde(default)]
    pub runtime: String,
    #[serde(default)]
    pub handler: String,
    #[serde(default)]
    pub timeout: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Latest message reported by the build pipeline
    #[serde(default)]
    pub build_message: Option<String>,
    #[serde(default)]
    pub domain_name: String,
    #[serde(default)]
    pub min_scale: Option<u32>,
    #[serde(default)]
    pub max_scale: Option<u32>,
    #[serde(default)]
    pub memory_limit: Option<u32>,
    #[serde(default)]
    pub environment_variables: HashMap<String, String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A function runtime offered by the platform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Runtime {
    pub name: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub status: String,
}

/// Secret environment variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Secret {
    pub key: String,
    pub value: Option<String>,
}

/// Create namespace request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateNamespaceRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub tags: Vec<String>,
}

/// Create function request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateFunctionRequest {
    pub namespace_id: String,
    pub name: String,
    pub runtime: String,
    pub handler: String,
    /// Timeout as whole seconds, e.g. `"300s"`
    pub timeout: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    #[serde(default)]
    pub environment_variables: HashMap<String, String>,
    #[serde(default)]
    pub secret_environment_variables: Vec<Secret>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_scale: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_scale: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<u32>,
}

/// Partial function update; absent fields are left untouched by the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateFunctionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_scale: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_scale: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeploy: Option<bool>,
}

impl UpdateFunctionRequest {
    /// True when the request would not change anything
    pub fn is_empty(&self) -> bool {
        self == &UpdateFunctionRequest::default()
    }
}

/// Presigned upload URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadUrl {
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, Vec<String>>,
}

/// Presigned download URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadUrl {
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, Vec<String>>,
}

/// List namespaces response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListNamespacesResponse {
    pub namespaces: Vec<Namespace>,
    #[serde(default)]
    pub total_count: u64,
}

/// List functions response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListFunctionsResponse {
    pub functions: Vec<Function>,
    #[serde(default)]
    pub total_count: u64,
}

/// List runtimes response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRuntimesResponse {
    pub runtimes: Vec<Runtime>,
    #[serde(default)]
    pub total_count: u64,
}

/// Error body returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}
