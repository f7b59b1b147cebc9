//! Application Layer - Service Component Runtime
//!
//! The dependency resolution and dynamic rebinding engine.
//!
//! ## Architecture
//!
//! | Module | Role |
//! |--------|------|
//! | [`registry`] | Service store, lookup, change notification and scoped acquisition |
//! | [`matching`] | Candidate selection for one reference |
//! | [`binding`] | Static/dynamic and reluctant/greedy rebind decisions |
//! | [`lifecycle`] | Component state table and transitions |
//! | [`factory`] | Factory components and per-acquisition instances |
//! | [`condition`] | Condition gating |
//! | [`runtime`] | Facade wiring everything together |
//!
//! Control flows from registry events to the matcher, then the policy
//! engine, then lifecycle transitions. Factories are driven explicitly by
//! callers.
//!
//! ## Dependencies
//!
//! This crate depends only on `scr-domain` plus concurrency and logging
//! libraries. Configuration storage and the event bus are reached through
//! the domain ports.

pub mod binding;
pub mod component;
pub mod condition;
pub mod factory;
pub mod lifecycle;
pub mod matching;
pub mod registry;
pub mod runtime;

pub use binding::{BindingPolicyEngine, RebindDecision, RebindPlan};
pub use component::{Binding, Component, ComponentContext, ComponentType};
pub use condition::ConditionGate;
pub use factory::{ComponentFactoryManager, ComponentInstanceHandle};
pub use lifecycle::{ComponentLifecycleManager, LifecycleOptions};
pub use matching::{EffectiveReference, ReferenceMatcher, Resolution};
pub use registry::{
    Consumer, ListenerId, ServiceFactory, ServiceLease, ServiceListener, ServiceProvider,
    ServiceRegistry,
};
pub use runtime::{RuntimeBuilder, ServiceComponentRuntime};
