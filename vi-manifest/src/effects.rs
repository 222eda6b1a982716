//! Side effects requested by the event handlers
//!
//! The dispatcher and the rebuild worker decide what should happen and return
//! it as data; `EffectRunner` is the only place that touches the bus or the
//! store on their behalf.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, Level};
use vi_common::bus::MessageBus;
use vi_common::storage::ObjectStore;

use crate::dispatcher::RebuildRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Structured fields of a `Log` effect; unset fields are not recorded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFields {
    pub message_id: Option<String>,
    pub bucket: Option<String>,
    pub name: Option<String>,
    pub org_id: Option<String>,
    pub vehicle_key: Option<String>,
    pub folder: Option<String>,
    pub count: Option<usize>,
    pub path: Option<String>,
    pub reason: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Publish a rebuild request
    Publish {
        topic: String,
        message: RebuildRequest,
    },
    /// Create or replace one object
    WriteObject {
        path: String,
        bytes: Vec<u8>,
        content_type: String,
    },
    /// Structured log line
    Log {
        level: LogLevel,
        event: &'static str,
        fields: LogFields,
    },
}

impl Effect {
    pub fn log(level: LogLevel, event: &'static str) -> Self {
        Self::Log {
            level,
            event,
            fields: LogFields::default(),
        }
    }

    /// Set fields of a `Log` effect; no-op for other variants
    fn set(mut self, update: impl FnOnce(&mut LogFields)) -> Self {
        if let Self::Log { fields, .. } = &mut self {
            update(fields);
        }
        self
    }

    pub fn message_id(self, id: impl fmt::Display) -> Self {
        self.set(|f| f.message_id = Some(id.to_string()))
    }

    pub fn bucket(self, bucket: impl fmt::Display) -> Self {
        self.set(|f| f.bucket = Some(bucket.to_string()))
    }

    pub fn name(self, name: impl fmt::Display) -> Self {
        self.set(|f| f.name = Some(name.to_string()))
    }

    pub fn org_id(self, org: impl fmt::Display) -> Self {
        self.set(|f| f.org_id = Some(org.to_string()))
    }

    pub fn vehicle_key(self, key: impl fmt::Display) -> Self {
        self.set(|f| f.vehicle_key = Some(key.to_string()))
    }

    pub fn folder(self, folder: impl fmt::Display) -> Self {
        self.set(|f| f.folder = Some(folder.to_string()))
    }

    pub fn count(self, count: usize) -> Self {
        self.set(|f| f.count = Some(count))
    }

    pub fn path(self, path: impl fmt::Display) -> Self {
        self.set(|f| f.path = Some(path.to_string()))
    }

    pub fn reason(self, reason: impl fmt::Display) -> Self {
        self.set(|f| f.reason = Some(reason.to_string()))
    }

    pub fn error(self, error: impl fmt::Display) -> Self {
        self.set(|f| f.error = Some(error.to_string()))
    }
}

/// What a batch of effects did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    pub published: usize,
    /// First failure; effects after it were not applied
    pub failed: Option<String>,
}

#[derive(Clone)]
pub struct EffectRunner {
    store: Arc<dyn ObjectStore>,
    bus: MessageBus,
}

impl EffectRunner {
    pub fn new(store: Arc<dyn ObjectStore>, bus: MessageBus) -> Self {
        Self { store, bus }
    }

    /// Apply `effects` in order, stopping at the first failed publish or write
    pub async fn apply(&self, effects: Vec<Effect>) -> ApplyReport {
        let mut report = ApplyReport::default();

        for effect in effects {
            match effect {
                Effect::Log { level, event, fields } => emit_log(level, event, &fields),
                Effect::Publish { topic, message } => {
                    match self.bus.publish(&topic, &message).await {
                        Ok(sent) => {
                            debug!(topic = %topic, message_id = %sent.message_id, "Published");
                            report.published += 1;
                        }
                        Err(e) => {
                            error!(topic = %topic, error = %e, "Publish failed");
                            report.failed = Some(e.to_string());
                            break;
                        }
                    }
                }
                Effect::WriteObject {
                    path,
                    bytes,
                    content_type,
                } => {
                    if let Err(e) = self.store.put(&path, bytes, &content_type).await {
                        error!(
                            bucket = %self.store.bucket(),
                            path = %path,
                            error = %e,
                            "Object write failed"
                        );
                        report.failed = Some(e.to_string());
                        break;
                    }
                }
            }
            report.applied += 1;
        }

        report
    }
}

fn emit_log(level: LogLevel, event: &'static str, fields: &LogFields) {
    macro_rules! emit {
        ($level:expr) => {
            tracing::event!(
                $level,
                message_id = fields.message_id.as_deref(),
                bucket = fields.bucket.as_deref(),
                name = fields.name.as_deref(),
                org_id = fields.org_id.as_deref(),
                vehicle_key = fields.vehicle_key.as_deref(),
                folder = fields.folder.as_deref(),
                count = fields.count,
                path = fields.path.as_deref(),
                reason = fields.reason.as_deref(),
                error = fields.error.as_deref(),
                "{}",
                event
            )
        };
    }
    match level {
        LogLevel::Debug => emit!(Level::DEBUG),
        LogLevel::Info => emit!(Level::INFO),
        LogLevel::Warn => emit!(Level::WARN),
        LogLevel::Error => emit!(Level::ERROR),
    }
}
