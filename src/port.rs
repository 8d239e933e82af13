//! Host port probing and bounded random allocation.
//!
//! [`TcpPortProbe`] checks a single port by binding a TCP listener on all
//! interfaces. [`PortAllocator`] samples candidates uniformly from
//! [`PORT_RANGE_START`]..=[`PORT_RANGE_END`] and returns the first one the
//! probe reports free, giving up after [`MAX_PORT_ATTEMPTS`].
//!
//! Nothing is reserved: a port reported free may be taken by another
//! process before the engine binds it. The orchestrator recovers from that
//! race at launch time.

use crate::constants::{MAX_PORT_ATTEMPTS, PORT_RANGE_END, PORT_RANGE_START};
use crate::error::{Error, Result};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tracing::{debug, warn};

// =============================================================================
// Port Probe
// =============================================================================

/// Checks whether a host port can be bound.
#[async_trait]
pub trait PortProbe: Send + Sync {
    /// Returns true if the port is free.
    async fn is_port_free(&self, port: u16) -> bool;
}

/// [`PortProbe`] that binds a real TCP listener on `0.0.0.0`.
///
/// Only `AddrInUse` counts as occupied. Any other bind failure (e.g.
/// permission denied) is reported as free; the listener never outlives
/// the call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpPortProbe;

#[async_trait]
impl PortProbe for TcpPortProbe {
    async fn is_port_free(&self, port: u16) -> bool {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                drop(listener);
                true
            }
            Err(e) if e.kind() == ErrorKind::AddrInUse => false,
            Err(e) => {
                debug!("probe of port {} failed ({}), treating as free", port, e);
                true
            }
        }
    }
}

// =============================================================================
// Port Allocator
// =============================================================================

/// Picks free host ports by bounded random sampling.
pub struct PortAllocator {
    probe: Arc<dyn PortProbe>,
    rng: Mutex<StdRng>,
}

impl PortAllocator {
    /// Creates an allocator seeded from OS entropy.
    pub fn new(probe: Arc<dyn PortProbe>) -> Self {
        Self {
            probe,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Creates an allocator with a deterministic candidate sequence.
    pub fn with_seed(probe: Arc<dyn PortProbe>, seed: u64) -> Self {
        Self {
            probe,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Returns the probe used by this allocator.
    pub fn probe(&self) -> &Arc<dyn PortProbe> {
        &self.probe
    }

    /// Returns a free port in the allocation range.
    pub async fn allocate(&self) -> Result<u16> {
        self.allocate_excluding(&[]).await
    }

    /// Returns a free port in the allocation range that is not in `exclude`.
    ///
    /// A sampled candidate found in `exclude` consumes an attempt without
    /// being probed.
    pub async fn allocate_excluding(&self, exclude: &[u16]) -> Result<u16> {
        for attempt in 1..=MAX_PORT_ATTEMPTS {
            let candidate = self.sample();
            if exclude.contains(&candidate) {
                debug!("attempt {}: port {} excluded", attempt, candidate);
                continue;
            }
            if self.probe.is_port_free(candidate).await {
                debug!("attempt {}: allocated port {}", attempt, candidate);
                return Ok(candidate);
            }
            debug!("attempt {}: port {} in use", attempt, candidate);
        }

        warn!("port allocation gave up after {} attempts", MAX_PORT_ATTEMPTS);
        Err(Error::PortExhaustion {
            attempts: MAX_PORT_ATTEMPTS,
        })
    }

    fn sample(&self) -> u16 {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rng.gen_range(PORT_RANGE_START..=PORT_RANGE_END)
    }
}
