//! fndeploy - Entry Point
//!
//! Deploys local directories as serverless functions.

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use colored::Colorize;
use serde::Serialize;
use tracing::{error, info};

use fndeploy::app::settings::Settings;
use fndeploy::archive::TransferClient;
use fndeploy::cancel::{CancelHandle, Cancellation};
use fndeploy::deploy::progress::ConsoleSink;
use fndeploy::deploy::requests::{CreateAndDeployFunctionInput, UpdateFunctionInput};
use fndeploy::deploy::Deployer;
use fndeploy::http::HttpClient;
use fndeploy::logs::{init_logging, LogLevel, LogOptions};
use fndeploy::utils::version_info;

const USAGE: &str = "\
Usage: fndeploy <command> [--key=value ...]

Commands:
  deploy            --dir --name --namespace --runtime --handler [--timeout=300s]
                    [--description] [--tags=a,b] [--env=K=V,...] [--secrets=K=V,...]
                    [--min-scale] [--max-scale] [--memory]
  update            --dir --name [--runtime] [--handler] [--timeout] [--description]
                    [--tags=a,b] [--min-scale] [--max-scale] [--memory]
  download          --name --to
  delete            --name
  create-namespace  --name [--tags=a,b]
  delete-namespace  --name
  doctor

Global options:
  --config=<path>  --log-level=<level>  --log-json  --log-dir=<path>  --version";

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let mut command: Option<String> = None;
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in env::args().skip(1) {
        if let Some(flag) = arg.strip_prefix("--") {
            match flag.split_once('=') {
                Some((key, value)) => cli_args.insert(key.to_string(), value.to_string()),
                None => cli_args.insert(flag.to_string(), "true".to_string()),
            };
        } else if command.is_none() {
            command = Some(arg);
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("Failed to render version: {e}"),
        }
        return;
    }

    let Some(command) = command else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    if let Err(e) = run(&command, &cli_args).await {
        error!("{} failed: {:#}", command, e);
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(command: &str, cli_args: &HashMap<String, String>) -> anyhow::Result<()> {
    // Retrieve the settings file
    let settings_path = match cli_args.get("config") {
        Some(path) => PathBuf::from(path),
        None => Settings::default_path()
            .ok_or_else(|| anyhow!("cannot locate the settings file, pass --config"))?,
    };
    let settings = Settings::load(&settings_path)
        .await
        .with_context(|| format!("reading settings from {}", settings_path.display()))?;

    // Initialize logging
    let log_level = match cli_args.get("log-level") {
        Some(level) => level.parse::<LogLevel>().map_err(|e| anyhow!(e))?,
        None => settings.log_level,
    };
    let log_options = LogOptions {
        log_level,
        json_format: cli_args.contains_key("log-json"),
        log_dir: cli_args.get("log-dir").map(PathBuf::from),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    // Cancel in-flight work on Ctrl+C or SIGTERM
    let (cancel_handle, cancel) = CancelHandle::new();
    tokio::spawn(async move {
        await_shutdown_signal().await;
        cancel_handle.cancel();
    });

    let options = settings.deployer_options();
    let transfer = TransferClient::new(Duration::from_secs(settings.http_timeout_secs))?;

    let api = HttpClient::new(settings.api_options()?)?;
    info!("Using functions API at {}", api.base_url());
    let deployer = Deployer::new(Arc::new(api), transfer, options)
        .with_progress_sink(Arc::new(ConsoleSink));

    match command {
        "deploy" => {
            let input = deploy_input(cli_args)?;
            print_json(&deployer.create_and_deploy(&input, None, &cancel).await?)
        }
        "update" => {
            let input = update_input(cli_args)?;
            print_json(&deployer.update(&input, None, &cancel).await?)
        }
        "download" => {
            let to = PathBuf::from(required(cli_args, "to")?);
            let name = required(cli_args, "name")?;
            print_json(&deployer.download_function(name, &to, &cancel).await?)
        }
        "delete" => {
            let name = required(cli_args, "name")?;
            print_json(&deployer.delete_function(name, &cancel).await?)
        }
        "create-namespace" => {
            let name = required(cli_args, "name")?;
            let tags = list(cli_args, "tags").unwrap_or_default();
            print_json(&deployer.create_namespace(name, tags, &cancel).await?)
        }
        "delete-namespace" => {
            let name = required(cli_args, "name")?;
            print_json(&deployer.delete_namespace(name, &cancel).await?)
        }
        "doctor" => doctor(&settings, &deployer, &cancel).await,
        other => bail!("unknown command {:?}\n\n{}", other, USAGE),
    }
}

/// Check credentials, API reachability and the local container engine
async fn doctor(settings: &Settings, deployer: &Deployer, cancel: &Cancellation) -> anyhow::Result<()> {
    let version = version_info();
    println!("{} {} ({})", "fndeploy".bold(), version.version, version.git_hash);
    println!("API:      {} ({})", settings.api.base_url, settings.api.region);

    let runtimes = cancel
        .run(deployer.api().list_runtimes())
        .await
        .context("listing runtimes")?;
    let names: Vec<&str> = runtimes.iter().map(|r| r.name.as_str()).collect();
    println!("Runtimes: {}", names.join(", ").green());

    match deployer.container_runtime().await {
        Ok(runtime) => println!(
            "Engine:   {} {}",
            runtime.binary(),
            runtime.server_version().green()
        ),
        Err(e) => println!("Engine:   {}", e.to_string().yellow()),
    }

    Ok(())
}

fn deploy_input(cli_args: &HashMap<String, String>) -> anyhow::Result<CreateAndDeployFunctionInput> {
    Ok(CreateAndDeployFunctionInput {
        directory: PathBuf::from(required(cli_args, "dir")?),
        function_name: required(cli_args, "name")?.to_string(),
        namespace_name: required(cli_args, "namespace")?.to_string(),
        runtime: required(cli_args, "runtime")?.to_string(),
        handler: required(cli_args, "handler")?.to_string(),
        timeout: cli_args
            .get("timeout")
            .cloned()
            .unwrap_or_else(|| "300s".to_string()),
        description: cli_args.get("description").cloned(),
        tags: list(cli_args, "tags").unwrap_or_default(),
        environment_variables: pairs(cli_args, "env")?.into_iter().collect(),
        secret_environment_variables: pairs(cli_args, "secrets")?,
        min_scale: number(cli_args, "min-scale")?,
        max_scale: number(cli_args, "max-scale")?,
        memory_limit: number(cli_args, "memory")?,
    })
}

fn update_input(cli_args: &HashMap<String, String>) -> anyhow::Result<UpdateFunctionInput> {
    Ok(UpdateFunctionInput {
        directory: PathBuf::from(required(cli_args, "dir")?),
        function_name: required(cli_args, "name")?.to_string(),
        runtime: cli_args.get("runtime").cloned(),
        handler: cli_args.get("handler").cloned(),
        timeout: cli_args.get("timeout").cloned(),
        description: cli_args.get("description").cloned(),
        tags: list(cli_args, "tags"),
        min_scale: number(cli_args, "min-scale")?,
        max_scale: number(cli_args, "max-scale")?,
        memory_limit: number(cli_args, "memory")?,
    })
}

fn required<'a>(cli_args: &'a HashMap<String, String>, key: &str) -> anyhow::Result<&'a str> {
    cli_args
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("missing --{}=<value>", key))
}

fn list(cli_args: &HashMap<String, String>, key: &str) -> Option<Vec<String>> {
    cli_args.get(key).map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
}

fn pairs(cli_args: &HashMap<String, String>, key: &str) -> anyhow::Result<BTreeMap<String, String>> {
    list(cli_args, key)
        .unwrap_or_default()
        .into_iter()
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => Ok((k.to_string(), v.to_string())),
            None => Err(anyhow!("--{} expects KEY=VALUE pairs, got {:?}", key, pair)),
        })
        .collect()
}

fn number(cli_args: &HashMap<String, String>, key: &str) -> anyhow::Result<Option<u32>> {
    cli_args
        .get(key)
        .map(|value| {
            value
                .parse::<u32>()
                .with_context(|| format!("--{} expects a number", key))
        })
        .transpose()
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (Ok(mut sigterm), Ok(mut sigint)) =
            (signal(SignalKind::terminate()), signal(SignalKind::interrupt()))
        else {
            error!("Failed to install signal handlers");
            return std::future::pending().await;
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, cancelling...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, cancelling...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_err() {
            error!("Failed to listen for Ctrl+C");
            return std::future::pending().await;
        }
        info!("Ctrl+C received, cancelling...");
    }
}
