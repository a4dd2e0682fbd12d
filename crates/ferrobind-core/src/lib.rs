//! Ferrobind Core
//!
//! A dynamic binding engine that exposes a foreign object-oriented runtime's
//! class hierarchy to a scripting engine. Proxies are materialized lazily
//! from a precompiled metadata tree:
//!
//! - [`node`]: process-wide MetadataNode registries
//! - [`materialize`]: constructor blueprints with inheritance
//! - [`members`]: overload groups, fields and properties
//! - [`proxy`]: instance, array and package proxies
//! - [`extend`]: subclasses synthesized from script implementation objects
//! - [`lifecycle`]: per-engine caches, namespaces and disposal
//!
//! The scripting engine is modeled by [`engine::Engine`]; the foreign
//! runtime is reached through the [`foreign::ForeignRuntime`] trait.
//!
//! # Example
//!
//! ```ignore
//! let bridge = Bridge::bootstrap(BridgeConfig::load(path)?, runtime)?;
//! let mut engine = Engine::new(bridge);
//! let global = engine.new_object();
//! create_top_level_namespaces(&mut engine, global)?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod bridge;
mod callbacks;
pub mod config;
pub mod engine;
pub mod error;
pub mod extend;
pub mod foreign;
pub mod lifecycle;
pub mod materialize;
pub mod members;
pub mod node;
mod profiler;
pub mod proxy;

#[cfg(test)]
mod testing;

pub use bridge::Bridge;
pub use config::{BridgeConfig, ConfigError};
pub use engine::{Engine, EngineId, ObjectId, StackFrame, Value};
pub use error::{BridgeError, BridgeResult};
pub use extend::implementation_object;
pub use foreign::{ArrayAccess, ClassRef, ClassResolution, FieldAccess, ForeignRuntime, InstanceRegistration, MethodCall};
pub use lifecycle::{create_top_level_namespaces, is_reserved_word, CacheStats};
pub use materialize::{materialize, materialize_by_name, Blueprint};
pub use members::{MethodGroup, ResolvedMethod};
pub use node::{MetadataNode, MetadataRegistry};
pub use proxy::{
    create_extended_js_wrapper, create_js_wrapper, create_wrapper, instance_metadata, resolve_package_child,
    type_metadata_name,
};
