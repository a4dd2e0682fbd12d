//! Diagnostic-naming shims
//!
//! With profiling enabled, constructors and methods are wrapped in a shim
//! function that carries a readable name and a source origin, and that logs
//! the time spent in each forwarded call. Without profiling, `wrap` returns
//! the function unchanged.

use std::sync::Arc;
use std::time::Instant;

use crate::engine::{Engine, NativeCallback, ObjectId, Value};
use crate::error::BridgeResult;
use crate::lifecycle::is_reserved_word;
use crate::members::CONSTRUCTOR_METHOD;

/// Wrap `function` in a shim named after `name`
pub(crate) fn wrap(engine: &mut Engine, function: ObjectId, name: &str, is_constructor: bool) -> ObjectId {
    let config = engine.bridge().config();
    if !config.profiler_enabled || name == CONSTRUCTOR_METHOD {
        return function;
    }
    let origin: Arc<str> = Arc::from(format!("{}{}", config.app_root, name));

    let mut shim_name = name.to_string();
    while is_reserved_word(&shim_name) {
        shim_name.push('_');
    }

    let shim = engine.new_native_function(
        &shim_name,
        NativeCallback::Shim {
            target: function,
            is_constructor,
            origin,
        },
    );
    engine.define_data(shim, "__func", Value::Object(function));
    if let Some(prototype) = engine.own_data(function, "prototype") {
        engine.define_data(shim, "prototype", prototype.clone());
        if let (true, Value::Object(prototype)) = (is_constructor, prototype) {
            engine.define_data(prototype, "constructor", Value::Object(shim));
        }
    }
    shim
}

/// Forward a call received by a shim to the wrapped function
pub(crate) fn forward(
    engine: &mut Engine,
    target: ObjectId,
    is_constructor: bool,
    origin: &str,
    this: Value,
    args: &[Value],
    is_construct: bool,
) -> BridgeResult<Value> {
    let started = Instant::now();
    let result = engine.invoke(target, this, args, is_constructor && is_construct);
    tracing::trace!(
        origin,
        elapsed_us = started.elapsed().as_micros() as u64,
        ok = result.is_ok(),
        "Profiled call"
    );
    result
}
