//! codespawn - create containerized editor instances
//!
//! ## Usage
//!
//! ```sh
//! codespawn create --name <name> --workspace <path> [--port <port>]
//!                  [--password <pw>] [--extensions a,b] [--cpu <cpus>]
//!                  [--memory <mem>] [--env KEY=VALUE]... [--runtime docker|podman]
//! codespawn records
//! ```
//!
//! `create` prints a JSON result on stdout. Logs go to stderr and are
//! filtered with `RUST_LOG` (default `info`).

use codespawn::config::parse_extension_list;
use codespawn::{CliGateway, Config, InstanceSpec, Provisioner, RecordStore};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// =============================================================================
// CLI Parsing
// =============================================================================

#[derive(Debug)]
enum Command {
    Create(InstanceSpec),
    Records,
    Version,
    Help,
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    if args.len() < 2 {
        return Ok(Command::Help);
    }

    match args[1].as_str() {
        "create" => parse_create(&args[2..]).map(Command::Create),
        "records" => Ok(Command::Records),
        "version" | "--version" | "-V" => Ok(Command::Version),
        "help" | "--help" | "-h" => Ok(Command::Help),
        unknown => Err(format!("unknown command: {}", unknown)),
    }
}

fn parse_create(args: &[String]) -> Result<InstanceSpec, String> {
    let mut spec = InstanceSpec::default();
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = args
            .get(i + 1)
            .cloned()
            .ok_or_else(|| format!("{} requires a value", flag))?;
        match flag {
            "--name" | "-n" => spec.name = value,
            "--workspace" | "-w" => spec.workspace_path = value,
            "--port" | "-p" => {
                spec.port = Some(
                    value
                        .parse()
                        .map_err(|_| format!("invalid port: {}", value))?,
                )
            }
            "--password" => spec.password = Some(value),
            "--extensions" => spec.extensions = Some(parse_extension_list(&value)),
            "--cpu" => spec.cpu_limit = Some(value),
            "--memory" => spec.memory_limit = Some(value),
            "--env" | "-e" => {
                let (key, val) = value
                    .split_once('=')
                    .ok_or_else(|| format!("--env expects KEY=VALUE, got {}", value))?;
                spec.environment.insert(key.to_string(), val.to_string());
            }
            "--runtime" | "-r" => spec.runtime = Some(value),
            other => return Err(format!("unknown option: {}", other)),
        }
        i += 2;
    }
    Ok(spec)
}

// =============================================================================
// Command Implementations
// =============================================================================

async fn cmd_create(config: Config, spec: InstanceSpec) -> Result<(), String> {
    let provisioner = Provisioner::new(config, Arc::new(CliGateway::new()));
    let response = provisioner.create(&spec).await;
    let json = response.to_json().map_err(|e| e.to_string())?;
    println!("{}", json);

    if response.success {
        Ok(())
    } else {
        Err("instance was not created".to_string())
    }
}

fn cmd_records(config: &Config) -> Result<(), String> {
    let store = RecordStore::with_path(config.records_dir.clone());
    for name in store.list().map_err(|e| e.to_string())? {
        println!("{}", name);
    }
    Ok(())
}

fn cmd_version() {
    println!("codespawn {}", env!("CARGO_PKG_VERSION"));
}

fn cmd_help() {
    println!(
        "codespawn - create containerized editor instances

USAGE:
    codespawn create --name <name> --workspace <path> [OPTIONS]
    codespawn records
    codespawn version

CREATE OPTIONS:
    -p, --port <port>           Host port (allocated if omitted)
        --password <pw>         Editor password (\"\" for none; default from config)
        --extensions <a,b>      Extension identifiers
        --cpu <cpus>            CPU limit
        --memory <mem>          Memory limit
    -e, --env <KEY=VALUE>       Container environment (repeatable)
    -r, --runtime <engine>      docker or podman (detected if omitted)

ENVIRONMENT:
    CODESPAWN_DEFAULT_PASSWORD, CODESPAWN_DEFAULT_EXTENSIONS,
    CODESPAWN_CPU_LIMIT, CODESPAWN_MEMORY_LIMIT,
    CODESPAWN_RUNTIME (auto|docker|podman), CODESPAWN_RECORDS_DIR"
    );
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let config = Config::from_env();

    let result = match parse_args(&args) {
        Ok(Command::Create(spec)) => cmd_create(config, spec).await,
        Ok(Command::Records) => cmd_records(&config),
        Ok(Command::Version) => {
            cmd_version();
            Ok(())
        }
        Ok(Command::Help) => {
            cmd_help();
            Ok(())
        }
        Err(e) => {
            eprintln!("error: {}", e);
            cmd_help();
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
