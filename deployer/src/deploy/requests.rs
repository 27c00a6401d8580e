//! Caller-facing deployment inputs and their conversion to API requests

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use functions_api::models::{CreateFunctionRequest, Function, Secret, UpdateFunctionRequest};

use crate::deploy::tags::{code_archive_digest, set_code_archive_digest, set_created_by};
use crate::errors::DeployError;
use crate::utils::{format_api_duration, parse_duration};

/// Create a function from a local directory and deploy it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateAndDeployFunctionInput {
    /// Directory holding the function code
    pub directory: PathBuf,
    pub function_name: String,
    /// Existing namespace to create the function in
    pub namespace_name: String,
    pub runtime: String,
    /// Entry point, e.g. `handler.handle`
    pub handler: String,
    /// Duration string such as `300s` or `5m`
    pub timeout: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub environment_variables: HashMap<String, String>,
    #[serde(default)]
    pub secret_environment_variables: BTreeMap<String, String>,
    #[serde(default)]
    pub min_scale: Option<u32>,
    #[serde(default)]
    pub max_scale: Option<u32>,
    #[serde(default)]
    pub memory_limit: Option<u32>,
}

impl CreateAndDeployFunctionInput {
    pub fn to_api(&self, namespace_id: &str) -> Result<CreateFunctionRequest, DeployError> {
        let timeout = parse_duration(&self.timeout)?;

        let secrets = self
            .secret_environment_variables
            .iter()
            .map(|(key, value)| Secret {
                key: key.clone(),
                value: Some(value.clone()),
            })
            .collect();

        Ok(CreateFunctionRequest {
            namespace_id: namespace_id.to_string(),
            name: self.function_name.clone(),
            runtime: self.runtime.clone(),
            handler: self.handler.clone(),
            timeout: format_api_duration(timeout),
            description: self.description.clone(),
            tags: set_created_by(self.tags.clone()),
            environment_variables: self.environment_variables.clone(),
            secret_environment_variables: secrets,
            min_scale: self.min_scale,
            max_scale: self.max_scale,
            memory_limit: self.memory_limit,
        })
    }
}

/// Update the code or configuration of an existing function
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFunctionInput {
    /// Directory holding the function code
    pub directory: PathBuf,
    pub function_name: String,
    #[serde(default)]
    pub runtime: Option<String>,
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub timeout: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Replaces the current tags when set; ownership and digest tags are kept
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub min_scale: Option<u32>,
    #[serde(default)]
    pub max_scale: Option<u32>,
    #[serde(default)]
    pub memory_limit: Option<u32>,
}

impl UpdateFunctionInput {
    /// Build the partial update for `current`, whose new code has `digest`
    ///
    /// Sending an unchanged runtime or handler makes the platform redeploy,
    /// so both are only included when they differ.
    pub fn to_api(
        &self,
        current: &Function,
        digest: &str,
    ) -> Result<UpdateFunctionRequest, DeployError> {
        let timeout = self
            .timeout
            .as_deref()
            .map(parse_duration)
            .transpose()?
            .map(format_api_duration);

        let tags = match &self.tags {
            Some(tags) => Some(set_code_archive_digest(
                &set_created_by(tags.clone()),
                digest,
            )),
            None if code_archive_digest(&current.tags) != Some(digest) => {
                Some(set_code_archive_digest(&current.tags, digest))
            }
            None => None,
        };

        let runtime = self
            .runtime
            .as_ref()
            .filter(|runtime| !runtime.eq_ignore_ascii_case(&current.runtime))
            .cloned();

        let handler = self
            .handler
            .as_ref()
            .filter(|handler| **handler != current.handler)
            .cloned();

        Ok(UpdateFunctionRequest {
            runtime,
            handler,
            timeout,
            description: self.description.clone(),
            tags,
            min_scale: self.min_scale,
            max_scale: self.max_scale,
            memory_limit: self.memory_limit,
            redeploy: None,
        })
    }
}
