//! Integration tests for dynamic subclassing through `extend`

mod common;

use common::bridge;
use ferrobind_core::{
    create_extended_js_wrapper, implementation_object, instance_metadata, materialize_by_name, type_metadata_name,
    Engine, ObjectId, StackFrame, Value,
};

const GENERATED_A: &str = "com/ferrobind/gen/com/example/A_main_10_5_";

fn extend_fn(engine: &mut Engine, class_name: &str) -> (ObjectId, ObjectId) {
    let constructor = materialize_by_name(engine, class_name).unwrap().constructor;
    let extend = engine.get(constructor, "extend").unwrap().as_object().unwrap();
    (constructor, extend)
}

fn extend(engine: &mut Engine, constructor: ObjectId, extend: ObjectId, args: &[Value]) -> ObjectId {
    engine
        .call(extend, Value::Object(constructor), args)
        .unwrap()
        .as_object()
        .unwrap()
}

#[test]
fn test_extend_from_same_location_is_idempotent() {
    let (bridge, runtime) = bridge();
    let mut engine = Engine::new(bridge);
    let (a, extend_a) = extend_fn(&mut engine, "com/example/A");
    let implementation = engine.new_object();

    engine.push_frame(StackFrame::new("file:///data/app/main.js", 10, 5));
    let first = extend(&mut engine, a, extend_a, &[Value::Object(implementation)]);
    let second = extend(&mut engine, a, extend_a, &[Value::Object(implementation)]);

    assert_eq!(first, second);
    assert_eq!(engine.stats().extended_classes_created, 1);
    assert_eq!(runtime.resolutions.lock().as_slice(), &[GENERATED_A, GENERATED_A]);
    assert_eq!(type_metadata_name(&engine, first).as_deref(), Some(GENERATED_A));
    assert_eq!(engine.prototype_of(first), Some(a));
}

#[test]
fn test_extend_from_other_locations_creates_new_classes() {
    let (bridge, runtime) = bridge();
    let mut engine = Engine::new(bridge);
    let (a, extend_a) = extend_fn(&mut engine, "com/example/A");

    engine.push_frame(StackFrame::new("/data/app/main.js", 10, 5));
    let first_impl = engine.new_object();
    let first = extend(&mut engine, a, extend_a, &[Value::Object(first_impl)]);

    engine.push_frame(StackFrame::new("/data/app/views/list-page.js", 3, 1));
    let second_impl = engine.new_object();
    let second = extend(
        &mut engine,
        a,
        extend_a,
        &[Value::string("Row"), Value::Object(second_impl)],
    );

    assert_ne!(first, second);
    assert_eq!(engine.stats().extended_classes_created, 2);
    assert_eq!(
        runtime.resolutions.lock()[1],
        "com/ferrobind/gen/com/example/A_page_3_1_Row"
    );
}

#[test]
fn test_implementation_object_cannot_be_reused() {
    let (bridge, _) = bridge();
    let mut engine = Engine::new(bridge);
    let (a, extend_a) = extend_fn(&mut engine, "com/example/A");
    let implementation = engine.new_object();

    engine.push_frame(StackFrame::new("/data/app/main.js", 10, 5));
    extend(&mut engine, a, extend_a, &[Value::Object(implementation)]);

    engine.push_frame(StackFrame::new("/data/app/main.js", 11, 5));
    let err = engine
        .call(extend_a, Value::Object(a), &[Value::Object(implementation)])
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("This object is used to extend another class '{GENERATED_A}'")
    );
}

#[test]
fn test_failed_extend_leaves_implementation_reusable() {
    let (bridge, _) = bridge();
    let mut engine = Engine::new(bridge);
    let (a, extend_a) = extend_fn(&mut engine, "com/example/A");
    let object_prototype = materialize_by_name(&mut engine, "java/lang/Object").unwrap().prototype;
    let implementation = engine.new_object();

    // Linking the implementation under A.prototype would close a cycle
    engine.set_prototype(object_prototype, Some(implementation)).unwrap();
    engine.push_frame(StackFrame::new("/data/app/main.js", 10, 5));
    let err = engine
        .call(extend_a, Value::Object(a), &[Value::Object(implementation)])
        .unwrap_err();
    assert_eq!(err.to_string(), "Cyclic __proto__ value");
    assert_eq!(engine.stats().extended_classes_created, 0);

    engine.set_prototype(object_prototype, None).unwrap();
    let class = extend(&mut engine, a, extend_a, &[Value::Object(implementation)]);
    assert_eq!(type_metadata_name(&engine, class).as_deref(), Some(GENERATED_A));
    assert_eq!(engine.stats().extended_classes_created, 1);
}

#[test]
fn test_dotted_name_is_used_verbatim() {
    let (bridge, runtime) = bridge();
    let mut engine = Engine::new(bridge);
    let (a, extend_a) = extend_fn(&mut engine, "com/example/A");
    let implementation = engine.new_object();

    let class = extend(
        &mut engine,
        a,
        extend_a,
        &[Value::string("com.app.MyA"), Value::Object(implementation)],
    );
    assert_eq!(runtime.resolutions.lock().as_slice(), &["com.app.MyA"]);
    assert_eq!(type_metadata_name(&engine, class).as_deref(), Some("com.app.MyA"));
}

#[test]
fn test_extend_argument_errors() {
    let (bridge, _) = bridge();
    let mut engine = Engine::new(bridge);
    let (a, extend_a) = extend_fn(&mut engine, "com/example/A");
    let implementation = Value::Object(engine.new_object());

    let err = engine.construct(extend_a, &[implementation.clone()]).unwrap_err();
    assert_eq!(err.to_string(), "Can't call 'extend' as constructor");

    let err = engine
        .call(extend_a, Value::Object(a), &[Value::Number(1.0), implementation.clone()])
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid extend() call. No name for extend specified at location: "
    );

    engine.push_frame(StackFrame::new("/data/app/main.js", 2, 2));
    let err = engine
        .call(extend_a, Value::Object(a), &[Value::string("bad-name"), implementation.clone()])
        .unwrap_err();
    assert!(err.to_string().contains("contains invalid symbols"));

    engine.push_frame(StackFrame::new("/data/app/main.js", 2, -1));
    let err = engine
        .call(extend_a, Value::Object(a), &[implementation])
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid extend() call. No name specified for extend at location: main line:2 unknown column number"
    );
    assert_eq!(engine.stats().extended_classes_created, 0);
}

#[test]
fn test_typescript_extend_uses_outer_frame() {
    let (bridge, runtime) = bridge();
    let mut engine = Engine::new(bridge);
    let (a, extend_a) = extend_fn(&mut engine, "com/example/A");
    let implementation = engine.new_object();

    engine.push_frame(StackFrame::new("/data/app/app.js", 7, 3));
    engine.push_frame(StackFrame::new("/data/app/tslib.js", 40, 1));
    engine.push_frame(StackFrame::new("/data/app/tslib.js", 41, 1));
    extend(
        &mut engine,
        a,
        extend_a,
        &[Value::string("Ts"), Value::Object(implementation), Value::Bool(true)],
    );
    assert_eq!(
        runtime.resolutions.lock().as_slice(),
        &["com/ferrobind/gen/com/example/A_app_7_3_Ts"]
    );
}

#[test]
fn test_extended_instances() {
    let (bridge, runtime) = bridge();
    let mut engine = Engine::new(bridge);
    let (a, extend_a) = extend_fn(&mut engine, "com/example/A");
    let a_prototype = engine.get(a, "prototype").unwrap().as_object().unwrap();

    let implementation = engine.new_object();
    let foo = engine.new_script_function("foo", |_, _, _| Ok(Value::string("override")));
    engine.define_data(implementation, "foo", Value::Object(foo));

    engine.push_frame(StackFrame::new("/data/app/main.js", 10, 5));
    let class = extend(&mut engine, a, extend_a, &[Value::Object(implementation)]);

    let err = engine.call(class, Value::Undefined, &[]).unwrap_err();
    assert!(err.to_string().starts_with("Incorrectly calling a Java class as a method."));

    let instance = engine
        .construct(class, &[Value::Number(1.0)])
        .unwrap()
        .as_object()
        .unwrap();
    assert!(engine.instance_of(&Value::Object(instance), a).unwrap());
    assert_eq!(implementation_object(&engine, instance), Some(implementation));
    assert_eq!(engine.prototype_of(implementation), Some(a_prototype));
    assert_eq!(instance_metadata(&engine, instance).unwrap().name(), "com/example/A");

    let registration = runtime.registrations.lock()[0].clone();
    assert_eq!(registration.class_name, GENERATED_A);
    assert_eq!(registration.base_class_name.as_deref(), Some("com/example/A"));
    assert!(registration.has_implementation);
    assert_eq!(registration.args, 1);

    // Script overrides shadow the foreign method; the rest dispatch to A
    assert_eq!(engine.call_method(instance, "foo", &[]).unwrap(), Value::string("override"));
    engine.call_method(instance, "getName", &[]).unwrap();
    assert_eq!(runtime.call_targets(), vec!["com/example/A.getName()Ljava/lang/String;"]);
}

#[test]
fn test_super_view_skips_overrides() {
    let (bridge, runtime) = bridge();
    let mut engine = Engine::new(bridge);
    let (a, extend_a) = extend_fn(&mut engine, "com/example/A");
    let a_prototype = engine.get(a, "prototype").unwrap().as_object().unwrap();

    let implementation = engine.new_object();
    let foo = engine.new_script_function("foo", |_, _, _| Ok(Value::string("override")));
    engine.define_data(implementation, "foo", Value::Object(foo));
    let class = extend(&mut engine, a, extend_a, &[Value::Object(implementation)]);
    let instance = engine.construct(class, &[]).unwrap().as_object().unwrap();

    let view = engine.get(instance, "super").unwrap().as_object().unwrap();
    assert_eq!(engine.get(instance, "super").unwrap(), Value::Object(view));
    assert_eq!(engine.prototype_of(view), Some(a_prototype));
    assert!(engine.call_super(view));

    let result = engine.call_method(view, "foo", &[]).unwrap();
    assert_eq!(result, Value::string("com/example/A.foo()V"));
    assert!(runtime.calls.lock()[0].is_super);
}

#[test]
fn test_extended_js_wrapper() {
    let (bridge, _) = bridge();
    let mut engine = Engine::new(bridge);
    let (a, extend_a) = extend_fn(&mut engine, "com/example/A");
    let implementation = engine.new_object();
    engine.push_frame(StackFrame::new("/data/app/main.js", 10, 5));
    let class = extend(&mut engine, a, extend_a, &[Value::Object(implementation)]);

    assert!(create_extended_js_wrapper(&mut engine, "com/example/Unknown").unwrap().is_none());
    let wrapper = create_extended_js_wrapper(&mut engine, GENERATED_A).unwrap().unwrap();
    let prototype = engine.get(class, "prototype").unwrap().as_object();
    assert_eq!(engine.prototype_of(wrapper), prototype);
    assert_eq!(implementation_object(&engine, wrapper), Some(implementation));

    // The synthesized name resolves to the base node
    let node = engine.bridge().registry().lookup(GENERATED_A).unwrap();
    assert_eq!(node.name(), "com/example/A");
}

#[test]
fn test_implementation_object_fallbacks() {
    let (bridge, _) = bridge();
    let mut engine = Engine::new(bridge);

    let marked = engine.new_object();
    let prototype = engine.new_object();
    engine.define_data(marked, "__isPrototypeImplementationObject", Value::Bool(true));
    engine.define_data(marked, "prototype", Value::Object(prototype));
    assert_eq!(implementation_object(&engine, marked), Some(prototype));

    let activity = engine.new_object();
    let activity_impl = engine.new_object();
    engine.set_activity_implementation(activity, activity_impl);
    assert_eq!(implementation_object(&engine, activity), Some(activity_impl));

    let plain = engine.new_object();
    assert_eq!(implementation_object(&engine, plain), None);
}
