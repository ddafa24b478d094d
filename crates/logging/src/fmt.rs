//! Render `tracing` events into concise logfmt strings.

use std::fmt::{Debug, Write};

use tracing::{
    Event, Level,
    field::{Field, Visit},
};

/// Fields extracted from a tracing event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLog {
    /// Severity level.
    pub level: Level,
    /// Event target (typically the module path).
    pub target: String,
    /// The `message` field, if any.
    pub message: String,
    /// Remaining fields rendered as `key=value` pairs.
    pub fields: String,
}

impl RenderedLog {
    /// Message followed by the rendered fields, logfmt style.
    pub fn line(&self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message.clone(),
            (true, false) => self.fields.clone(),
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }
}

/// Collects the message and `key=value` pairs of an event.
#[derive(Default)]
struct LogfmtVisitor {
    /// Captured `message` field.
    msg: Option<String>,
    /// Accumulated non-message fields.
    fields: String,
}

impl Visit for LogfmtVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.msg = Some(value.to_string());
        } else {
            let _ignored = write!(&mut self.fields, "{}=\"{}\" ", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        if field.name() == "message" {
            self.msg = Some(format!("{:?}", value));
        } else {
            let _ignored = write!(&mut self.fields, "{}={:?} ", field.name(), value);
        }
    }
}

/// Extract level, target, message and remaining fields from an event.
pub fn render_event(event: &Event<'_>) -> RenderedLog {
    let meta = event.metadata();
    let mut vis = LogfmtVisitor::default();
    event.record(&mut vis);
    RenderedLog {
        level: *meta.level(),
        target: meta.target().to_string(),
        message: vis.msg.unwrap_or_default(),
        fields: vis.fields.trim_end().to_string(),
    }
}
