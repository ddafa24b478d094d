//! One-shot readiness signal for the discovery service.
//!
//! The gate stays unresolved until the loader's registries become available.
//! [`ReadinessGate::initialize`] builds the [`Discovery`] service and resolves
//! the gate; a second initialization is a misuse and fails.

use std::sync::{Arc, OnceLock};

use tokio::sync::watch;
use tracing::{error, info};

use crate::{Discovery, DiscoveryConfig, Error, Result, loader::Loader};

/// Process-wide gate returned by [`ReadinessGate::global`].
static GLOBAL_GATE: OnceLock<ReadinessGate> = OnceLock::new();

/// Unresolved until the discovery service exists; resolved at most once.
#[derive(Debug)]
pub struct ReadinessGate {
    /// Holds the service once initialized.
    tx: watch::Sender<Option<Arc<Discovery>>>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    /// Create an unresolved gate.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// The process-wide gate.
    pub fn global() -> &'static Self {
        GLOBAL_GATE.get_or_init(Self::new)
    }

    /// Build the discovery service over `loader` and resolve the gate.
    pub fn initialize(
        &self,
        loader: Arc<dyn Loader>,
        config: DiscoveryConfig,
    ) -> Result<Arc<Discovery>> {
        let mut outcome = Err(Error::AlreadyInitialized);
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            match Discovery::new(loader, config) {
                Ok(discovery) => {
                    *slot = Some(discovery.clone());
                    outcome = Ok(discovery);
                    true
                }
                Err(e) => {
                    outcome = Err(e);
                    false
                }
            }
        });
        match &outcome {
            Ok(_) => info!("module discovery ready"),
            Err(Error::AlreadyInitialized) => error!("module discovery initialized twice"),
            Err(e) => error!("module discovery initialization failed: {e}"),
        }
        outcome
    }

    /// True once initialized.
    pub fn is_ready(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// The service, if initialized.
    pub fn get(&self) -> Option<Arc<Discovery>> {
        self.tx.borrow().clone()
    }

    /// Wait until the service is initialized.
    pub async fn ready(&self) -> Result<Arc<Discovery>> {
        let mut rx = self.tx.subscribe();
        let slot = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| Error::GateClosed)?;
        slot.clone().ok_or(Error::GateClosed)
    }
}
