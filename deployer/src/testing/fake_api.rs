//! In-memory functions API

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use functions_api::models::{
    CreateFunctionRequest, CreateNamespaceRequest, DownloadUrl, Function, FunctionStatus,
    Namespace, NamespaceStatus, Runtime, UpdateFunctionRequest, UploadUrl,
};

use crate::api::FunctionApi;
use crate::errors::DeployError;

/// A request received by [`FakeFunctionApi`]
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    GetNamespace(String),
    ListNamespaces(Option<String>),
    CreateNamespace(CreateNamespaceRequest),
    DeleteNamespace(String),
    GetFunction(String),
    ListFunctions(Option<String>),
    CreateFunction(CreateFunctionRequest),
    UpdateFunction(String, UpdateFunctionRequest),
    DeleteFunction(String),
    DeployFunction(String),
    GetUploadUrl { id: String, content_length: u64 },
    GetDownloadUrl(String),
    ListRuntimes,
}

impl ApiCall {
    /// Name of the trait method that received the call
    pub fn method(&self) -> &'static str {
        match self {
            ApiCall::GetNamespace(_) => "get_namespace",
            ApiCall::ListNamespaces(_) => "list_namespaces",
            ApiCall::CreateNamespace(_) => "create_namespace",
            ApiCall::DeleteNamespace(_) => "delete_namespace",
            ApiCall::GetFunction(_) => "get_function",
            ApiCall::ListFunctions(_) => "list_functions",
            ApiCall::CreateFunction(_) => "create_function",
            ApiCall::UpdateFunction(..) => "update_function",
            ApiCall::DeleteFunction(_) => "delete_function",
            ApiCall::DeployFunction(_) => "deploy_function",
            ApiCall::GetUploadUrl { .. } => "get_upload_url",
            ApiCall::GetDownloadUrl(_) => "get_download_url",
            ApiCall::ListRuntimes => "list_runtimes",
        }
    }

    /// Whether the call changes remote state or hands out a write URL
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            ApiCall::CreateNamespace(_)
                | ApiCall::DeleteNamespace(_)
                | ApiCall::CreateFunction(_)
                | ApiCall::UpdateFunction(..)
                | ApiCall::DeleteFunction(_)
                | ApiCall::DeployFunction(_)
                | ApiCall::GetUploadUrl { .. }
        )
    }
}

/// One status a function moves through while building
pub type BuildStep = (FunctionStatus, Option<String>);

#[derive(Debug, Default)]
struct State {
    namespaces: Vec<Namespace>,
    functions: Vec<Function>,
    runtimes: Vec<Runtime>,
    calls: Vec<ApiCall>,
    build_script: Vec<BuildStep>,
    builds: HashMap<String, VecDeque<BuildStep>>,
    failures: HashMap<&'static str, (u16, String)>,
    transfer_base_url: String,
    next_id: u32,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{:04}", prefix, self.next_id)
    }

    fn function_mut(&mut self, id: &str) -> Result<&mut Function, DeployError> {
        self.functions
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| not_found("function", id))
    }

    fn start_build(&mut self, id: &str) -> Result<Function, DeployError> {
        let script: VecDeque<BuildStep> = self.build_script.iter().cloned().collect();
        self.builds.insert(id.to_string(), script);

        let function = self.function_mut(id)?;
        function.status = FunctionStatus::Pending;
        function.build_message = None;
        Ok(function.clone())
    }
}

fn not_found(kind: &str, id: &str) -> DeployError {
    DeployError::RemoteApi {
        status: 404,
        message: format!("{} {} not found", kind, id),
    }
}

/// Functions API keeping everything in memory
///
/// Every deploy, and every update that redeploys, replays the build script
/// one step per `get_function` call. Calls are recorded in order.
#[derive(Debug)]
pub struct FakeFunctionApi {
    state: Mutex<State>,
}

impl Default for FakeFunctionApi {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeFunctionApi {
    pub fn new() -> Self {
        let runtimes = ["python313", "node22", "go124"]
            .iter()
            .map(|name| Runtime {
                name: name.to_string(),
                status: "available".to_string(),
                ..Default::default()
            })
            .collect();

        let build_script = vec![
            (FunctionStatus::Pending, None),
            (
                FunctionStatus::Pending,
                Some("build: building function image".to_string()),
            ),
            (
                FunctionStatus::Pending,
                Some("registry: pushing image to registry".to_string()),
            ),
            (
                FunctionStatus::Pending,
                Some("deploy: deploying function".to_string()),
            ),
            (FunctionStatus::Ready, None),
        ];

        Self {
            state: Mutex::new(State {
                runtimes,
                build_script,
                transfer_base_url: "http://127.0.0.1:9".to_string(),
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record `call`, failing it if a failure was registered for its method
    fn record(&self, call: ApiCall) -> Result<MutexGuard<'_, State>, DeployError> {
        let mut state = self.state();
        let method = call.method();
        state.calls.push(call);

        if let Some((status, message)) = state.failures.get(method) {
            return Err(DeployError::RemoteApi {
                status: *status,
                message: message.clone(),
            });
        }
        Ok(state)
    }

    /// Add a ready namespace
    pub fn with_namespace(self, name: &str, tags: &[&str]) -> Self {
        {
            let mut state = self.state();
            let id = state.next_id("ns");
            state.namespaces.push(Namespace {
                id,
                name: name.to_string(),
                status: NamespaceStatus::Ready,
                tags: tags.iter().map(|t| t.to_string()).collect(),
                project_id: "project-0001".to_string(),
                region: "fr-par".to_string(),
                ..Default::default()
            });
        }
        self
    }

    /// Add an existing function as is
    pub fn with_function(self, function: Function) -> Self {
        self.state().functions.push(function);
        self
    }

    /// Base of the presigned URLs handed out, e.g. a local test server
    pub fn with_transfer_base_url(self, url: &str) -> Self {
        self.state().transfer_base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Statuses and build messages a function goes through once deployed
    pub fn with_build_script(self, script: Vec<(FunctionStatus, Option<&str>)>) -> Self {
        self.state().build_script = script
            .into_iter()
            .map(|(status, message)| (status, message.map(str::to_string)))
            .collect();
        self
    }

    /// Make every call to `method` fail with a remote API error
    pub fn fail_on(self, method: &'static str, status: u16, message: &str) -> Self {
        self.state()
            .failures
            .insert(method, (status, message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.state().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<ApiCall> {
        self.state()
            .calls
            .iter()
            .filter(|call| call.is_mutating())
            .cloned()
            .collect()
    }

    /// Number of calls made to `method`
    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.method() == method)
            .count()
    }

    pub fn function_by_name(&self, name: &str) -> Option<Function> {
        self.state()
            .functions
            .iter()
            .find(|f| f.name == name)
            .cloned()
    }

    pub fn namespace_by_name(&self, name: &str) -> Option<Namespace> {
        self.state()
            .namespaces
            .iter()
            .find(|ns| ns.name == name)
            .cloned()
    }
}

#[async_trait]
impl FunctionApi for FakeFunctionApi {
    async fn get_namespace(&self, id: &str) -> Result<Namespace, DeployError> {
        let mut state = self.record(ApiCall::GetNamespace(id.to_string()))?;
        let namespace = state
            .namespaces
            .iter_mut()
            .find(|ns| ns.id == id)
            .ok_or_else(|| not_found("namespace", id))?;

        let snapshot = namespace.clone();
        if namespace.status == NamespaceStatus::Pending {
            namespace.status = NamespaceStatus::Ready;
        }
        Ok(snapshot)
    }

    async fn list_namespaces(&self, name: Option<&str>) -> Result<Vec<Namespace>, DeployError> {
        let state = self.record(ApiCall::ListNamespaces(name.map(str::to_string)))?;
        Ok(state
            .namespaces
            .iter()
            .filter(|ns| name.is_none_or(|name| ns.name.contains(name)))
            .cloned()
            .collect())
    }

    async fn create_namespace(
        &self,
        request: &CreateNamespaceRequest,
    ) -> Result<Namespace, DeployError> {
        let mut state = self.record(ApiCall::CreateNamespace(request.clone()))?;
        let namespace = Namespace {
            id: state.next_id("ns"),
            name: request.name.clone(),
            status: NamespaceStatus::Pending,
            tags: request.tags.clone(),
            project_id: request
                .project_id
                .clone()
                .unwrap_or_else(|| "project-0001".to_string()),
            region: "fr-par".to_string(),
            ..Default::default()
        };
        state.namespaces.push(namespace.clone());
        Ok(namespace)
    }

    async fn delete_namespace(&self, id: &str) -> Result<Namespace, DeployError> {
        let mut state = self.record(ApiCall::DeleteNamespace(id.to_string()))?;
        let index = state
            .namespaces
            .iter()
            .position(|ns| ns.id == id)
            .ok_or_else(|| not_found("namespace", id))?;

        let mut namespace = state.namespaces.remove(index);
        state.functions.retain(|f| f.namespace_id != id);
        namespace.status = NamespaceStatus::Deleting;
        Ok(namespace)
    }

    async fn get_function(&self, id: &str) -> Result<Function, DeployError> {
        let mut state = self.record(ApiCall::GetFunction(id.to_string()))?;
        let step = state.builds.get_mut(id).and_then(|script| script.pop_front());

        let function = state.function_mut(id)?;
        if let Some((status, message)) = step {
            function.status = status;
            function.build_message = message;
        }
        Ok(function.clone())
    }

    async fn list_functions(&self, name: Option<&str>) -> Result<Vec<Function>, DeployError> {
        let state = self.record(ApiCall::ListFunctions(name.map(str::to_string)))?;
        Ok(state
            .functions
            .iter()
            .filter(|f| name.is_none_or(|name| f.name.contains(name)))
            .cloned()
            .collect())
    }

    async fn create_function(
        &self,
        request: &CreateFunctionRequest,
    ) -> Result<Function, DeployError> {
        let mut state = self.record(ApiCall::CreateFunction(request.clone()))?;
        let namespace = state
            .namespaces
            .iter()
            .find(|ns| ns.id == request.namespace_id)
            .cloned()
            .ok_or_else(|| not_found("namespace", &request.namespace_id))?;

        if state.functions.iter().any(|f| f.name == request.name) {
            return Err(DeployError::RemoteApi {
                status: 409,
                message: format!("function {} already exists", request.name),
            });
        }

        let function = Function {
            id: state.next_id("fn"),
            name: request.name.clone(),
            namespace_id: namespace.id.clone(),
            status: FunctionStatus::Created,
            runtime: request.runtime.clone(),
            handler: request.handler.clone(),
            timeout: Some(request.timeout.clone()),
            description: request.description.clone(),
            tags: request.tags.clone(),
            domain_name: format!(
                "{}{}-{}.functions.fnc.fr-par.scw.cloud",
                namespace.name, namespace.id, request.name
            ),
            min_scale: request.min_scale,
            max_scale: request.max_scale,
            memory_limit: request.memory_limit,
            environment_variables: request.environment_variables.clone(),
            ..Default::default()
        };
        state.functions.push(function.clone());
        Ok(function)
    }

    async fn update_function(
        &self,
        id: &str,
        request: &UpdateFunctionRequest,
    ) -> Result<Function, DeployError> {
        let mut state = self.record(ApiCall::UpdateFunction(id.to_string(), request.clone()))?;

        let function = state.function_mut(id)?;
        if let Some(runtime) = &request.runtime {
            function.runtime = runtime.clone();
        }
        if let Some(handler) = &request.handler {
            function.handler = handler.clone();
        }
        if let Some(timeout) = &request.timeout {
            function.timeout = Some(timeout.clone());
        }
        if let Some(description) = &request.description {
            function.description = Some(description.clone());
        }
        if let Some(tags) = &request.tags {
            function.tags = tags.clone();
        }
        if request.min_scale.is_some() {
            function.min_scale = request.min_scale;
        }
        if request.max_scale.is_some() {
            function.max_scale = request.max_scale;
        }
        if request.memory_limit.is_some() {
            function.memory_limit = request.memory_limit;
        }

        let redeploys = match request.redeploy {
            Some(redeploy) => redeploy,
            None => request.runtime.is_some() || request.handler.is_some(),
        };
        if redeploys {
            return state.start_build(id);
        }
        Ok(function.clone())
    }

    async fn delete_function(&self, id: &str) -> Result<Function, DeployError> {
        let mut state = self.record(ApiCall::DeleteFunction(id.to_string()))?;
        let index = state
            .functions
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| not_found("function", id))?;

        let mut function = state.functions.remove(index);
        function.status = FunctionStatus::Deleting;
        Ok(function)
    }

    async fn deploy_function(&self, id: &str) -> Result<Function, DeployError> {
        let mut state = self.record(ApiCall::DeployFunction(id.to_string()))?;
        state.start_build(id)
    }

    async fn get_upload_url(
        &self,
        id: &str,
        content_length: u64,
    ) -> Result<UploadUrl, DeployError> {
        let mut state = self.record(ApiCall::GetUploadUrl {
            id: id.to_string(),
            content_length,
        })?;
        state.function_mut(id)?;

        Ok(UploadUrl {
            url: format!("{}/upload/{}", state.transfer_base_url, id),
            headers: HashMap::from([(
                "content-length".to_string(),
                vec![content_length.to_string()],
            )]),
        })
    }

    async fn get_download_url(&self, id: &str) -> Result<DownloadUrl, DeployError> {
        let mut state = self.record(ApiCall::GetDownloadUrl(id.to_string()))?;
        state.function_mut(id)?;

        Ok(DownloadUrl {
            url: format!("{}/download/{}", state.transfer_base_url, id),
            headers: HashMap::new(),
        })
    }

    async fn list_runtimes(&self) -> Result<Vec<Runtime>, DeployError> {
        let state = self.record(ApiCall::ListRuntimes)?;
        Ok(state.runtimes.clone())
    }
}
