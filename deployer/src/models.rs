//! Results returned to callers

use serde::{Deserialize, Serialize};

use functions_api::models::{Function, Namespace};

/// A deployed function, as reported back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSummary {
    pub id: String,
    pub name: String,
    pub namespace_id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_message: String,
    pub runtime: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub endpoint: String,
}

impl From<&Function> for FunctionSummary {
    fn from(function: &Function) -> Self {
        Self {
            id: function.id.clone(),
            name: function.name.clone(),
            namespace_id: function.namespace_id.clone(),
            description: function.description.clone().unwrap_or_default(),
            tags: function.tags.clone(),
            status: function.status.to_string(),
            error_message: function.error_message.clone().unwrap_or_default(),
            runtime: function.runtime.clone(),
            endpoint: format!("https://{}", function.domain_name),
        }
    }
}

/// A function namespace, as reported back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceSummary {
    pub id: String,
    pub name: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_message: String,
    pub project_id: String,
    pub region: String,
}

impl From<&Namespace> for NamespaceSummary {
    fn from(namespace: &Namespace) -> Self {
        Self {
            id: namespace.id.clone(),
            name: namespace.name.clone(),
            status: namespace.status.to_string(),
            error_message: namespace.error_message.clone().unwrap_or_default(),
            project_id: namespace.project_id.clone(),
            region: namespace.region.clone(),
        }
    }
}
