//! Domain constants
//!
//! Reserved property keys and capability names shared by the registry,
//! the lifecycle manager and the collaborators.

// ============================================================================
// RESERVED SERVICE PROPERTIES
// ============================================================================

/// Unique, monotonic service identifier (set by the registry)
pub const SERVICE_ID: &str = "service.id";

/// Integer ranking used to order candidates, highest first
pub const SERVICE_RANKING: &str = "service.ranking";

/// Service scope name (set by the registry)
pub const SERVICE_SCOPE: &str = "service.scope";

/// Capability a service was registered under (set by the registry)
pub const OBJECT_CLASS: &str = "objectClass";

/// Persistent identifier of a configuration
pub const SERVICE_PID: &str = "service.pid";

/// Factory persistent identifier of a factory configuration
pub const SERVICE_FACTORY_PID: &str = "service.factoryPid";

// ============================================================================
// RESERVED COMPONENT PROPERTIES
// ============================================================================

/// Name of the component type that produced an instance or service
pub const COMPONENT_NAME: &str = "component.name";

/// Identifier of the component instance
pub const COMPONENT_ID: &str = "component.id";

/// Factory identifier of a factory component
pub const COMPONENT_FACTORY: &str = "component.factory";

/// Suffix of the administrative target override (`<reference>.target`)
pub const TARGET_SUFFIX: &str = ".target";

/// Suffix of the administrative minimum cardinality override
/// (`<reference>.cardinality.minimum`)
pub const CARDINALITY_MINIMUM_SUFFIX: &str = ".cardinality.minimum";

/// Prefix marking private properties that are never propagated to services
pub const PRIVATE_PROPERTY_PREFIX: char = '.';

// ============================================================================
// CONDITIONS
// ============================================================================

/// Reserved capability under which condition markers are registered
pub const CONDITION_CAPABILITY: &str = "scr.condition";

/// Identifying property of a condition marker
pub const CONDITION_ID: &str = "condition.id";

// ============================================================================
// COMPONENT FACTORIES
// ============================================================================

/// Reserved capability under which satisfied component factories are published
pub const COMPONENT_FACTORY_CAPABILITY: &str = "scr.component.factory";

// ============================================================================
// EVENTS
// ============================================================================

/// Reserved capability of event handler services
pub const EVENT_HANDLER_CAPABILITY: &str = "scr.event.handler";

/// Topics an event handler subscribes to (string or list)
pub const EVENT_TOPICS: &str = "event.topics";

/// Optional filter an event handler applies to event properties
pub const EVENT_FILTER: &str = "event.filter";

/// Property carrying the topic of a delivered event
pub const EVENT_TOPIC: &str = "event.topic";

/// Topic prefix of component state change events
pub const COMPONENT_EVENT_TOPIC_PREFIX: &str = "scr/component";

/// Topic segment that matches every topic below a prefix
pub const TOPIC_WILDCARD: &str = "*";
