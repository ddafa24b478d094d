//! Write-once values that start unresolved.

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use tokio::sync::Notify;

use crate::{Error, Result};

/// Shared state behind a [`Deferred`].
struct Slot<T> {
    /// Resolved value.
    value: OnceLock<T>,
    /// Wakes async waiters on resolution.
    notify: Notify,
}

/// A value container resolved exactly once by a producer.
///
/// Clones observe the same slot.
pub struct Deferred<T> {
    /// Shared slot.
    slot: Arc<Slot<T>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deferred<T> {
    /// Create an unresolved container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Slot {
                value: OnceLock::new(),
                notify: Notify::new(),
            }),
        }
    }

    /// Resolve with `value`. A second resolution fails and leaves the first in place.
    pub fn resolve(&self, value: T) -> Result<()> {
        self.slot
            .value
            .set(value)
            .map_err(|_| Error::AlreadyResolved)?;
        self.slot.notify.notify_waiters();
        Ok(())
    }

    /// The resolved value, if any.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.slot.value.get()
    }

    /// True once resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.slot.value.get().is_some()
    }
}

impl<T: Clone> Deferred<T> {
    /// Wait for resolution and return a clone of the value.
    pub async fn wait(&self) -> T {
        loop {
            let notified = self.slot.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(value) = self.slot.value.get() {
                return value.clone();
            }
            notified.await;
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("value", &self.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_once() {
        let d = Deferred::new();
        assert!(d.get().is_none());
        d.resolve(1).unwrap();
        assert!(matches!(d.resolve(2), Err(Error::AlreadyResolved)));
        assert_eq!(d.get(), Some(&1));
    }

    #[tokio::test]
    async fn waiters_wake_on_resolve() {
        let d: Deferred<u32> = Deferred::new();
        let producer = d.clone();
        let waiter = tokio::spawn(async move { d.wait().await });
        tokio::task::yield_now().await;
        producer.resolve(5).unwrap();
        assert_eq!(waiter.await.unwrap(), 5);
    }
}
