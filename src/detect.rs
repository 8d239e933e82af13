//! Container runtime detection with an explicitly scoped cache.
//!
//! Detection probes the candidate engines in [`EngineKind::ALL`] order.
//! An engine is usable when its binary answers `--version` *and* its
//! service answers `info`; a missing binary and a stopped service are
//! both treated as "try the next candidate".
//!
//! The resolved engine is stored in a [`RuntimeCache`] owned by the host
//! (usually shared via `Arc` between provisioners). Once populated, the
//! cache is returned without re-probing for the lifetime of that object.

use crate::constants::ENGINE_PROBE_TIMEOUT;
use crate::engine::{EngineGateway, EngineKind};
use crate::error::{Error, Result};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

// =============================================================================
// Runtime Cache
// =============================================================================

/// Process- or session-wide memo of the resolved engine.
///
/// Written at most once by detection, or replaced wholesale by an explicit
/// override. Readers never observe a partial update.
#[derive(Debug, Default)]
pub struct RuntimeCache {
    inner: RwLock<Option<EngineKind>>,
}

impl RuntimeCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached engine, if any.
    pub fn get(&self) -> Option<EngineKind> {
        match self.inner.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Stores an engine, replacing any previous value.
    pub fn set(&self, engine: EngineKind) {
        match self.inner.write() {
            Ok(mut guard) => *guard = Some(engine),
            Err(poisoned) => *poisoned.into_inner() = Some(engine),
        }
    }

    /// Clears the cache so the next resolution probes again.
    pub fn reset(&self) {
        match self.inner.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

// =============================================================================
// Runtime Detector
// =============================================================================

/// Resolves which container engine to use.
pub struct RuntimeDetector {
    gateway: Arc<dyn EngineGateway>,
    cache: Arc<RuntimeCache>,
    probe_timeout: Duration,
}

impl RuntimeDetector {
    /// Creates a detector with a fresh, private cache.
    pub fn new(gateway: Arc<dyn EngineGateway>) -> Self {
        Self::with_cache(gateway, Arc::new(RuntimeCache::new()))
    }

    /// Creates a detector sharing an existing cache.
    pub fn with_cache(gateway: Arc<dyn EngineGateway>, cache: Arc<RuntimeCache>) -> Self {
        Self {
            gateway,
            cache,
            probe_timeout: ENGINE_PROBE_TIMEOUT,
        }
    }

    /// Returns the cache backing this detector.
    pub fn cache(&self) -> &Arc<RuntimeCache> {
        &self.cache
    }

    /// Resolves the engine to use.
    ///
    /// An explicit override is accepted verbatim, without probing, and
    /// overwrites the cache. Otherwise a cached value is returned as-is;
    /// failing that, candidates are probed in priority order.
    pub async fn resolve(&self, explicit: Option<EngineKind>) -> Result<EngineKind> {
        if let Some(engine) = explicit {
            debug!("using explicit runtime override: {}", engine);
            self.cache.set(engine);
            return Ok(engine);
        }

        if let Some(engine) = self.cache.get() {
            debug!("using cached runtime: {}", engine);
            return Ok(engine);
        }

        for engine in EngineKind::ALL {
            if self.is_usable(engine).await {
                info!("detected container runtime: {}", engine);
                self.cache.set(engine);
                return Ok(engine);
            }
        }

        let tried: Vec<String> = EngineKind::ALL.iter().map(|e| e.to_string()).collect();
        warn!("no container runtime available (tried {})", tried.join(", "));
        Err(Error::NoRuntimeAvailable { tried })
    }

    /// Returns true if the engine binary runs and its service responds.
    async fn is_usable(&self, engine: EngineKind) -> bool {
        if !self.probe(engine, "--version").await {
            debug!("{} binary not invocable", engine);
            return false;
        }
        if !self.probe(engine, "info").await {
            debug!("{} installed but its service is not responding", engine);
            return false;
        }
        true
    }

    async fn probe(&self, engine: EngineKind, arg: &str) -> bool {
        let args = [arg.to_string()];
        match timeout(self.probe_timeout, self.gateway.invoke(engine, &args)).await {
            Ok(Ok(output)) => output.is_success(),
            Ok(Err(e)) => {
                debug!("{} {} failed: {}", engine, arg, e);
                false
            }
            Err(_) => {
                debug!("{} {} timed out after {:?}", engine, arg, self.probe_timeout);
                false
            }
        }
    }
}
