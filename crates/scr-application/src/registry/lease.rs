//! Scoped service acquisition

use super::usage::{Consumer, ServiceUsage};
use scr_domain::value_objects::{ServiceObject, ServiceRecord, downcast_service};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A service object held on behalf of one consumer
///
/// Dropping the lease releases exactly the object it obtained, on every exit
/// path. Prototype-scoped objects go back to their factory immediately;
/// cached objects are released when their last lease goes.
pub struct ServiceLease {
    usage: Arc<ServiceUsage>,
    consumer: Consumer,
    record: ServiceRecord,
    object: ServiceObject,
}

impl ServiceLease {
    pub(crate) fn new(
        usage: Arc<ServiceUsage>,
        consumer: Consumer,
        record: ServiceRecord,
        object: ServiceObject,
    ) -> Self {
        Self {
            usage,
            consumer,
            record,
            object,
        }
    }

    /// The leased object
    pub fn service(&self) -> &ServiceObject {
        &self.object
    }

    /// Record snapshot at acquisition time
    pub fn record(&self) -> &ServiceRecord {
        &self.record
    }

    /// Who holds the lease
    pub fn consumer(&self) -> &Consumer {
        &self.consumer
    }

    /// Downcast the leased object
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        downcast_service::<T>(&self.object)
    }

    /// Replace the record snapshot after a property update of the same service
    pub(crate) fn refresh(&mut self, record: ServiceRecord) {
        self.record = record;
    }
}

impl Drop for ServiceLease {
    fn drop(&mut self) {
        self.usage.release(&self.consumer, &self.record, &self.object);
    }
}

impl fmt::Debug for ServiceLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceLease")
            .field("service_id", &self.record.id())
            .field("capability", self.record.capability())
            .field("consumer", &self.consumer)
            .finish()
    }
}
