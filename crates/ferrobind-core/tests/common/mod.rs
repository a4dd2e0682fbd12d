//! Shared fixtures: sample metadata and a recording foreign runtime

#![allow(dead_code)]

use std::sync::Arc;

use ferrobind_core::{
    ArrayAccess, Bridge, BridgeConfig, BridgeResult, ClassRef, ClassResolution, Engine, FieldAccess, ForeignRuntime,
    InstanceRegistration, MethodCall, ObjectId, Value,
};
use ferrobind_metadata::{MetadataBuffers, MetadataWriter, TypeDef};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

/// Classes the fake runtime knows, by handle
const KNOWN_CLASSES: &[&str] = &[
    "java/lang/Object",
    "com/example/A",
    "com/example/B",
    "com/example/Listener",
    "com/example/Skipped",
    "com/example/C",
];

/// Metadata used by every integration test
pub fn sample_buffers() -> MetadataBuffers {
    let mut writer = MetadataWriter::new();
    writer
        .array_marker()
        .add_type(
            "java/lang/Object",
            TypeDef::class()
                .method("hashCode", "()I", 0)
                .method("valueOf", "(I)Ljava/lang/Object;", 1),
        )
        .add_type(
            "com/example/A",
            TypeDef::class()
                .base("java/lang/Object")
                .method("foo", "()V", 0)
                .method("getName", "()Ljava/lang/String;", 0)
                .method("setName", "(Ljava/lang/String;)V", 1)
                .method("explode", "()V", 0)
                .field("count", "I", false)
                .field("MAX", "I", true)
                .property(
                    "name",
                    Some(("getName", "()Ljava/lang/String;")),
                    Some(("setName", "(Ljava/lang/String;)V")),
                )
                .property("secret", None, None)
                .extension_function("apply", "(Lcom/example/A;I)V", 2, "com/example/AKt")
                .static_method("create", "()Lcom/example/A;", 0)
                .static_field("DEFAULT", "Lcom/example/A;", true),
        )
        .add_type("com/example/A$Inner", TypeDef::class().base("java/lang/Object"))
        .add_type(
            "com/example/B",
            TypeDef::class().base("com/example/A").method("foo", "(I)V", 1),
        )
        .add_type(
            "com/example/Listener",
            TypeDef::interface()
                .implementation("com/ferrobind/gen/", true)
                .method("onEvent", "(I)V", 1),
        )
        .add_type(
            "com/example/Skipped",
            TypeDef::class()
                .base("java/lang/Object")
                .method("<init>", "()V", 0)
                .method("legacy", "()V", 0)
                .method("shared", "()V", 0),
        )
        .add_type(
            "com/example/C",
            TypeDef::class()
                .base("com/example/Skipped")
                .method("shared", "()V", 0)
                .method("bar", "()V", 0),
        )
        .add_type("in/reserved/Thing", TypeDef::class().base("java/lang/Object"));
    writer.finish().unwrap()
}

/// Instance registration as seen by the runtime
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub class_name: String,
    pub is_interface: bool,
    pub has_implementation: bool,
    pub base_class_name: Option<String>,
    pub args: usize,
}

/// Method invocation as seen by the runtime
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub target: String,
    pub is_static: bool,
    pub is_super: bool,
    pub is_from_interface: bool,
    pub is_extension: bool,
}

/// Foreign runtime that records every request
#[derive(Default)]
pub struct FakeRuntime {
    pub calls: Mutex<Vec<Call>>,
    pub registrations: Mutex<Vec<Registration>>,
    pub field_writes: Mutex<Vec<(String, Value)>>,
    pub array_writes: Mutex<Vec<(String, u32, Value)>>,
    pub resolutions: Mutex<Vec<String>>,
    generated: Mutex<Vec<String>>,
    peers: Mutex<FxHashMap<(u64, u32), String>>,
    linked: Mutex<FxHashSet<(u64, u32)>>,
}

impl FakeRuntime {
    pub fn call_targets(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.target.clone()).collect()
    }

    fn class_name_of(&self, class: ClassRef) -> String {
        let index = class.0 as usize;
        if index >= 100 {
            return self.generated.lock()[index - 100].clone();
        }
        KNOWN_CLASSES[index].to_string()
    }
}

impl ForeignRuntime for FakeRuntime {
    fn find_class(&self, name: &str) -> Option<ClassRef> {
        KNOWN_CLASSES
            .iter()
            .position(|known| *known == name)
            .map(|index| ClassRef(index as u64))
    }

    fn type_metadata(&self, name: &str) -> Option<String> {
        (name == "com/example/gen/Lazy")
            .then(|| "C com/example/gen/Lazy\nB com/example/B\nM ping (I)V 1\nF level I 0".to_string())
    }

    fn is_assignable_from(&self, class: ClassRef, base: ClassRef) -> bool {
        // C no longer extends Skipped at run time
        !(self.class_name_of(class) == "com/example/C" && self.class_name_of(base) == "com/example/Skipped")
    }

    fn class_object(&self, _engine: &mut Engine, class_name: &str) -> BridgeResult<Value> {
        Ok(Value::string(&format!("class {class_name}")))
    }

    fn resolve_class(&self, request: ClassResolution<'_>) -> BridgeResult<ClassRef> {
        self.resolutions.lock().push(request.full_class_name.to_string());
        let mut generated = self.generated.lock();
        let index = match generated.iter().position(|name| name == request.full_class_name) {
            Some(index) => index,
            None => {
                generated.push(request.full_class_name.to_string());
                generated.len() - 1
            }
        };
        Ok(ClassRef(100 + index as u64))
    }

    fn class_name(&self, class: ClassRef) -> String {
        self.class_name_of(class)
    }

    fn register_instance(&self, request: InstanceRegistration<'_>) -> BridgeResult<()> {
        self.peers.lock().insert(
            (request.engine.id().as_u64(), request.object.as_u32()),
            request.class_name.to_string(),
        );
        self.registrations.lock().push(Registration {
            class_name: request.class_name.to_string(),
            is_interface: request.is_interface,
            has_implementation: request.implementation.is_some(),
            base_class_name: request.base_class_name.map(str::to_string),
            args: request.args.len(),
        });
        Ok(())
    }

    fn has_foreign_object(&self, engine: &Engine, object: ObjectId) -> bool {
        self.peers.lock().contains_key(&(engine.id().as_u64(), object.as_u32()))
    }

    fn is_instance_of(&self, engine: &Engine, object: ObjectId, class: ClassRef) -> bool {
        let class_name = self.class_name_of(class);
        self.peers
            .lock()
            .get(&(engine.id().as_u64(), object.as_u32()))
            .is_some_and(|peer| peer.ends_with(&class_name))
    }

    fn link_identity(&self, engine: &mut Engine, _source: ObjectId, view: ObjectId) {
        self.linked.lock().insert((engine.id().as_u64(), view.as_u32()));
    }

    fn get_field(&self, access: FieldAccess<'_>) -> BridgeResult<Value> {
        let scope = if access.target.is_some() { "instance" } else { "static" };
        Ok(Value::string(&format!(
            "{scope} {}.{}",
            access.declaring_type, access.entry.name
        )))
    }

    fn set_field(&self, access: FieldAccess<'_>, value: Value) -> BridgeResult<()> {
        self.field_writes
            .lock()
            .push((format!("{}.{}", access.declaring_type, access.entry.name), value));
        Ok(())
    }

    fn call_method(&self, call: MethodCall<'_>) -> BridgeResult<Value> {
        if call.method_name == "explode" {
            panic!("boom");
        }
        let target = format!("{}.{}{}", call.class_name, call.method_name, call.entry.signature);
        self.calls.lock().push(Call {
            target: target.clone(),
            is_static: call.is_static,
            is_super: call.is_super,
            is_from_interface: call.is_from_interface,
            is_extension: call.entry.is_extension_function,
        });
        Ok(Value::string(&target))
    }

    fn array_length(&self, _engine: &mut Engine, _array: ObjectId) -> BridgeResult<usize> {
        Ok(3)
    }

    fn array_get(&self, access: ArrayAccess<'_>) -> BridgeResult<Value> {
        Ok(Value::Number(f64::from(access.index) * 10.0))
    }

    fn array_set(&self, access: ArrayAccess<'_>, value: Value) -> BridgeResult<()> {
        self.array_writes
            .lock()
            .push((access.array_type.to_string(), access.index, value));
        Ok(())
    }
}

/// Bridge over the sample metadata with the given configuration
pub fn bridge_with(config: BridgeConfig) -> (Arc<Bridge>, Arc<FakeRuntime>) {
    let runtime = Arc::new(FakeRuntime::default());
    let bridge = Bridge::new(sample_buffers(), runtime.clone(), config).unwrap();
    (bridge, runtime)
}

/// Bridge over the sample metadata with the default configuration
pub fn bridge() -> (Arc<Bridge>, Arc<FakeRuntime>) {
    bridge_with(BridgeConfig::default())
}

/// Construct an instance of `class_name` through its materialized constructor
pub fn new_instance(engine: &mut Engine, class_name: &str, args: &[Value]) -> ObjectId {
    let constructor = ferrobind_core::materialize_by_name(engine, class_name).unwrap().constructor;
    engine.construct(constructor, args).unwrap().as_object().unwrap()
}
