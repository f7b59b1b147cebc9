//! Deferred work
//!
//! Registry and configuration notifications only enqueue work. A thread
//! that enters the lifecycle manager becomes a drainer and processes queued
//! work after its own operation completes; nested entries on the same
//! thread run inline and leave their follow-up work to the outer drainer.

use parking_lot::Mutex;
use scr_domain::value_objects::{Capability, InstanceId};
use std::collections::{HashSet, VecDeque};
use std::thread::{self, ThreadId};

/// A unit of deferred lifecycle work
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Work {
    /// Services of a capability changed
    ServiceChanged(Capability),
    /// A configuration was updated or deleted
    ConfigurationChanged {
        pid: String,
        factory_pid: Option<String>,
    },
    /// Dispose an instance whose last consumer went away
    Dispose(InstanceId),
}

#[derive(Default)]
pub(crate) struct WorkQueue {
    pending: Mutex<VecDeque<Work>>,
    draining: Mutex<HashSet<ThreadId>>,
}

impl WorkQueue {
    pub(crate) fn push(&self, work: Work) {
        let mut pending = self.pending.lock();
        if !pending.contains(&work) {
            pending.push_back(work);
        }
    }

    pub(crate) fn pop(&self) -> Option<Work> {
        self.pending.lock().pop_front()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Mark the current thread as drainer; `false` when it already is one
    pub(crate) fn enter(&self) -> bool {
        self.draining.lock().insert(thread::current().id())
    }

    pub(crate) fn leave(&self) {
        self.draining.lock().remove(&thread::current().id());
    }
}

/// Clears the drainer mark even when a callback panics
pub(crate) struct DrainScope<'a> {
    queue: &'a WorkQueue,
}

impl<'a> DrainScope<'a> {
    pub(crate) fn new(queue: &'a WorkQueue) -> Self {
        Self { queue }
    }
}

impl Drop for DrainScope<'_> {
    fn drop(&mut self) {
        self.queue.leave();
    }
}
