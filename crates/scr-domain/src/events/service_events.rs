//! Registry change notifications

use crate::value_objects::{Capability, ServiceRecord};

/// What happened to a service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceEventKind {
    /// A service was registered
    Registered,
    /// A service's properties were replaced (fired even when unchanged)
    Modified,
    /// A service was unregistered
    Unregistering,
}

/// A registry change, carrying the record as of the change
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceEvent {
    /// Kind of change
    pub kind: ServiceEventKind,
    /// Record snapshot after a registration or modification, before removal
    pub record: ServiceRecord,
}

impl ServiceEvent {
    /// Create an event
    pub fn new(kind: ServiceEventKind, record: ServiceRecord) -> Self {
        Self { kind, record }
    }

    /// Capability of the affected service
    pub fn capability(&self) -> &Capability {
        self.record.capability()
    }
}
