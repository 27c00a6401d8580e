//! Namespace and function housekeeping tests

use fndeploy::archive::pack_directory;
use fndeploy::cancel::Cancellation;
use fndeploy::deploy::tags::TAG_CREATED_BY;
use fndeploy::errors::DeployError;
use fndeploy::testing::{ApiCall, FakeFunctionApi};
use functions_api::models::{Function, FunctionStatus};

use crate::support::{fast_options, python_project, Harness};

fn function(tags: &[&str]) -> Function {
    Function {
        id: "fn-0042".to_string(),
        name: "hello".to_string(),
        namespace_id: "ns-0001".to_string(),
        status: FunctionStatus::Ready,
        runtime: "python313".to_string(),
        handler: "handler.handle".to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        domain_name: "prod-hello.functions.fnc.fr-par.scw.cloud".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_create_namespace_waits_until_ready() {
    let harness = Harness::new(FakeFunctionApi::new()).await;

    let summary = harness
        .deployer
        .create_namespace("staging", vec!["team=web".to_string()], &Cancellation::never())
        .await
        .unwrap();

    assert_eq!(summary.name, "staging");
    assert_eq!(summary.status, "ready");
    assert!(harness.api.call_count("get_namespace") >= 2);

    let namespace = harness.api.namespace_by_name("staging").unwrap();
    assert!(namespace.tags.contains(&"team=web".to_string()));
    assert!(namespace.tags.contains(&TAG_CREATED_BY.to_string()));
}

#[tokio::test]
async fn test_delete_owned_namespace() {
    let harness = Harness::new(FakeFunctionApi::new().with_namespace("prod", &[TAG_CREATED_BY])).await;

    let summary = harness
        .deployer
        .delete_namespace("prod", &Cancellation::never())
        .await
        .unwrap();

    assert_eq!(summary.status, "deleting");
    assert!(harness.api.namespace_by_name("prod").is_none());
}

#[tokio::test]
async fn test_delete_foreign_namespace_is_refused() {
    let harness = Harness::new(FakeFunctionApi::new().with_namespace("prod", &["team=web"])).await;

    let err = harness
        .deployer
        .delete_namespace("prod", &Cancellation::never())
        .await
        .unwrap_err();

    assert!(matches!(err.root(), DeployError::NotOwned(_)));
    assert_eq!(err.steps(), vec!["checking ownership"]);
    assert!(harness.api.mutating_calls().is_empty());
    assert!(harness.api.namespace_by_name("prod").is_some());
}

#[tokio::test]
async fn test_delete_owned_function() {
    let harness = Harness::new(FakeFunctionApi::new().with_function(function(&[TAG_CREATED_BY]))).await;

    let summary = harness
        .deployer
        .delete_function("hello", &Cancellation::never())
        .await
        .unwrap();

    assert_eq!(summary.status, "deleting");
    assert_eq!(
        harness.api.mutating_calls(),
        vec![ApiCall::DeleteFunction("fn-0042".to_string())]
    );
}

#[tokio::test]
async fn test_delete_foreign_function_is_refused() {
    let harness = Harness::new(FakeFunctionApi::new().with_function(function(&[]))).await;

    let err = harness
        .deployer
        .delete_function("hello", &Cancellation::never())
        .await
        .unwrap_err();

    assert!(matches!(err.root(), DeployError::NotOwned(_)));
    assert!(harness.api.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_download_any_function() {
    let project = python_project();
    let harness = Harness::new(FakeFunctionApi::new().with_function(function(&["team=web"]))).await;
    let archive = pack_directory(project.path()).unwrap();
    harness
        .server
        .blobs
        .put("fn-0042", std::fs::read(archive.path()).unwrap());
    let out = tempfile::tempdir().unwrap();

    let summary = harness
        .deployer
        .download_function("hello", out.path(), &Cancellation::never())
        .await
        .unwrap();

    assert_eq!(summary.id, "fn-0042");
    assert_eq!(
        std::fs::read_to_string(out.path().join("lib/greet.py")).unwrap(),
        "def greet():\n    return 'Hello, world'\n"
    );
    assert_eq!(
        std::fs::metadata(out.path().join("static/payload.txt")).unwrap().len(),
        10_000
    );
    assert!(harness.api.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_download_missing_object() {
    let harness = Harness::new(FakeFunctionApi::new().with_function(function(&[]))).await;
    let out = tempfile::tempdir().unwrap();

    let err = harness
        .deployer
        .download_function("hello", out.path(), &Cancellation::never())
        .await
        .unwrap_err();

    assert!(matches!(err.root(), DeployError::DownloadFailed { status: 404 }));
    assert_eq!(err.steps(), vec!["downloading archive"]);
}

#[tokio::test]
async fn test_download_into_missing_directory() {
    let harness = Harness::new(FakeFunctionApi::new().with_function(function(&[]))).await;
    let out = tempfile::tempdir().unwrap();

    let err = harness
        .deployer
        .download_function("hello", &out.path().join("absent"), &Cancellation::never())
        .await
        .unwrap_err();

    assert!(matches!(err.root(), DeployError::DirectoryNotFound(_)));
}

#[tokio::test]
async fn test_download_respects_size_limit() {
    let project = python_project();
    let mut options = fast_options();
    options.max_unpack_bytes = 1000;
    let harness =
        Harness::with_options(FakeFunctionApi::new().with_function(function(&[])), options).await;
    let archive = pack_directory(project.path()).unwrap();
    harness
        .server
        .blobs
        .put("fn-0042", std::fs::read(archive.path()).unwrap());
    let out = tempfile::tempdir().unwrap();

    let err = harness
        .deployer
        .download_function("hello", out.path(), &Cancellation::never())
        .await
        .unwrap_err();

    assert!(matches!(err.root(), DeployError::ArchiveTooLarge { limit: 1000 }));
    assert!(!out.path().join("static/payload.txt").exists());
}
