//! Minimal test support utilities for `modscan` consumers.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::runtime::Builder;

use crate::{Discovery, DiscoveryConfig, MemoryLoader};

/// Fresh in-memory loader with a discovery service wired to it.
///
/// Panics if the configuration's chunk matcher is invalid.
pub fn discovery_with(config: DiscoveryConfig) -> (MemoryLoader, Arc<Discovery>) {
    let loader = MemoryLoader::new();
    let discovery =
        Discovery::new(Arc::new(loader.clone()), config).expect("valid discovery config");
    (loader, discovery)
}

/// Run an async test body on a dedicated current-thread Tokio runtime and shut it down promptly.
///
/// The body runs on the calling thread, so thread-local tracing subscribers
/// installed by the test stay in effect.
pub fn run_async_test<F>(fut: F)
where
    F: Future<Output = ()>,
{
    struct RuntimeGuard(Option<tokio::runtime::Runtime>);

    impl Drop for RuntimeGuard {
        fn drop(&mut self) {
            if let Some(rt) = self.0.take() {
                rt.shutdown_timeout(Duration::from_millis(50));
            }
        }
    }

    let guard = RuntimeGuard(Some(
        Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("build test runtime"),
    ));

    if let Some(rt) = guard.0.as_ref() {
        rt.block_on(fut);
    }
}
