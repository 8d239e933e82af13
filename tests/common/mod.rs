//! Shared fakes for integration tests.
//!
//! `FakeGateway` scripts engine behavior without any real container engine;
//! `FakeProbe` reports port occupancy from a fixed set.

#![allow(dead_code)]

use async_trait::async_trait;
use codespawn::{Config, EngineGateway, EngineKind, EngineOutput, Error, PortProbe, Result};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

// =============================================================================
// Fake Engine Gateway
// =============================================================================

type LaunchHook = Box<dyn Fn() + Send + Sync>;

pub struct FakeGateway {
    installed: HashSet<EngineKind>,
    responsive: HashSet<EngineKind>,
    launch_output: Mutex<EngineOutput>,
    launch_error: Option<String>,
    launch_hook: Option<LaunchHook>,
    status: Mutex<String>,
    status_error: bool,
    calls: Mutex<Vec<(EngineKind, Vec<String>)>>,
}

impl FakeGateway {
    /// No engine installed.
    pub fn new() -> Self {
        Self {
            installed: HashSet::new(),
            responsive: HashSet::new(),
            launch_output: Mutex::new(EngineOutput::success("f00dcafe\n")),
            launch_error: None,
            launch_hook: None,
            status: Mutex::new("Up 2 seconds".to_string()),
            status_error: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Engine installed with its service running.
    pub fn with_engine(mut self, engine: EngineKind) -> Self {
        self.installed.insert(engine);
        self.responsive.insert(engine);
        self
    }

    /// Engine binary present but its service is down.
    pub fn with_stopped_engine(mut self, engine: EngineKind) -> Self {
        self.installed.insert(engine);
        self
    }

    pub fn with_launch_output(self, output: EngineOutput) -> Self {
        *self.launch_output.lock().unwrap() = output;
        self
    }

    /// `run` fails to spawn, as when the binary vanished or timed out.
    pub fn with_launch_error(mut self, message: &str) -> Self {
        self.launch_error = Some(message.to_string());
        self
    }

    /// Runs `hook` when `run` is invoked, before the scripted output.
    pub fn with_launch_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.launch_hook = Some(Box::new(hook));
        self
    }

    /// `ps` fails to spawn.
    pub fn with_status_error(mut self) -> Self {
        self.status_error = true;
        self
    }

    pub fn with_status(self, status: &str) -> Self {
        *self.status.lock().unwrap() = status.to_string();
        self
    }

    pub fn calls(&self) -> Vec<(EngineKind, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of availability/service probes issued so far.
    pub fn probe_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|(_, args)| matches!(args[0].as_str(), "--version" | "info"))
            .count()
    }

    /// Arguments of every `run` invocation.
    pub fn launches(&self) -> Vec<(EngineKind, Vec<String>)> {
        self.calls()
            .into_iter()
            .filter(|(_, args)| args[0] == "run")
            .collect()
    }
}

#[async_trait]
impl EngineGateway for FakeGateway {
    async fn invoke(&self, engine: EngineKind, args: &[String]) -> Result<EngineOutput> {
        self.calls.lock().unwrap().push((engine, args.to_vec()));

        match args[0].as_str() {
            "--version" if self.installed.contains(&engine) => {
                Ok(EngineOutput::success(format!("{} version 99.0.0", engine)))
            }
            "--version" => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{}: command not found", engine),
            ))),
            "info" if self.responsive.contains(&engine) => Ok(EngineOutput::success("ok")),
            "info" => Ok(EngineOutput::failure(
                1,
                format!("Cannot connect to the {} daemon", engine),
            )),
            "run" => {
                if let Some(hook) = &self.launch_hook {
                    hook();
                }
                match &self.launch_error {
                    Some(message) => Err(Error::Io(std::io::Error::other(message.clone()))),
                    None => Ok(self.launch_output.lock().unwrap().clone()),
                }
            }
            "ps" if self.status_error => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("{} ps: connection reset", engine),
            ))),
            "ps" => Ok(EngineOutput::success(format!(
                "{}\n",
                self.status.lock().unwrap()
            ))),
            other => Ok(EngineOutput::failure(125, format!("unknown command {}", other))),
        }
    }
}

// =============================================================================
// Fake Port Probe
// =============================================================================

pub struct FakeProbe {
    busy: HashSet<u16>,
    /// When set, only these ports are free.
    only_free: Option<HashSet<u16>>,
    calls: AtomicUsize,
}

impl FakeProbe {
    pub fn all_free() -> Self {
        Self {
            busy: HashSet::new(),
            only_free: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn all_busy() -> Self {
        Self::only_free(&[])
    }

    pub fn busy(ports: &[u16]) -> Self {
        Self {
            busy: ports.iter().copied().collect(),
            only_free: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn only_free(ports: &[u16]) -> Self {
        Self {
            busy: HashSet::new(),
            only_free: Some(ports.iter().copied().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PortProbe for FakeProbe {
    async fn is_port_free(&self, port: u16) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.only_free {
            Some(free) => free.contains(&port),
            None => !self.busy.contains(&port),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Default configuration with records under `dir`.
pub fn test_config(dir: &Path) -> Config {
    Config::from_lookup(|_| None).with_records_dir(dir)
}

/// Number of entries in a directory, zero if it does not exist.
pub fn entry_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
