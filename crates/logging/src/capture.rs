//! Capture tracing events in memory.
//!
//! Install [`layer`] (or use [`capture_scope`]) to record every event emitted
//! while the subscriber is active. Tests use this to assert on warnings and
//! errors without scraping stdout.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{
    Event, Level, Subscriber,
    subscriber::{self, DefaultGuard},
};
use tracing_subscriber::{
    layer::{Context, Layer},
    prelude::*,
    registry,
};

use crate::fmt::{RenderedLog, render_event};

/// Shared buffer of captured events.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    /// Events in emission order.
    entries: Arc<Mutex<Vec<RenderedLog>>>,
}

impl CapturedLogs {
    /// Snapshot of captured events.
    pub fn entries(&self) -> Vec<RenderedLog> {
        self.entries.lock().clone()
    }

    /// Captured events at exactly `level`.
    pub fn at(&self, level: Level) -> Vec<RenderedLog> {
        self.entries
            .lock()
            .iter()
            .filter(|r| r.level == level)
            .cloned()
            .collect()
    }

    /// True if an event at `level` contains `needle` in its rendered line.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|r| r.level == level && r.line().contains(needle))
    }

    /// Drop everything captured so far.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Tracing layer appending rendered events to a [`CapturedLogs`] buffer.
pub struct CaptureLayer {
    /// Destination buffer.
    logs: CapturedLogs,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.logs.entries.lock().push(render_event(event));
    }
}

/// Create a capture layer and the buffer it writes to.
pub fn layer() -> (CaptureLayer, CapturedLogs) {
    let logs = CapturedLogs::default();
    (CaptureLayer { logs: logs.clone() }, logs)
}

/// Capture events on the current thread until the returned guard drops.
pub fn capture_scope() -> (DefaultGuard, CapturedLogs) {
    let (layer, logs) = layer();
    let guard = subscriber::set_default(registry().with(layer));
    (guard, logs)
}
