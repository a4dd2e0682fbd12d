//! Integration tests for the metadata tree
//!
//! Trees are produced with `MetadataWriter` and read back through
//! `MetadataReader`, both directly and through files on disk.

use ferrobind_metadata::*;

fn sample_buffers() -> MetadataBuffers {
    let mut writer = MetadataWriter::new();
    writer
        .array_marker()
        .add_type(
            "java/lang/Object",
            TypeDef::class()
                .method("hashCode", "()I", 0)
                .method("equals", "(Ljava/lang/Object;)Z", 1)
                .static_method("valueOf", "(I)Ljava/lang/Object;", 1),
        )
        .add_type(
            "android/view/View",
            TypeDef::class()
                .base("java/lang/Object")
                .field("mID", "I", false)
                .field("NO_ID", "I", true)
                .property("enabled", Some(("isEnabled", "()Z")), Some(("setEnabled", "(Z)V")))
                .extension_function("doOnLayout", "(Landroid/view/View;Lkotlin/jvm/functions/Function1;)V", 2, "androidx/core/view/ViewKt")
                .static_field("VISIBLE", "I", true),
        )
        .add_type(
            "android/view/View$OnClickListener",
            TypeDef::interface()
                .implementation("com/tns/gen/", true)
                .method("onClick", "(Landroid/view/View;)V", 1),
        );
    writer.finish().unwrap()
}

#[test]
fn test_type_names_and_kinds() {
    let reader = MetadataReader::from_buffers(sample_buffers()).unwrap();

    let object = reader.tree_node_by_name("java/lang/Object").unwrap();
    assert_eq!(reader.read_type_name(object), "java/lang/Object");
    assert_eq!(reader.kind(object), NodeKind::Class);

    let listener = reader.tree_node_by_name("android/view/View$OnClickListener").unwrap();
    assert_eq!(reader.read_type_name(listener), "android/view/View$OnClickListener");
    assert_eq!(reader.kind(listener), NodeKind::Interface);

    let view = reader.parent(listener);
    assert_eq!(&*reader.name(view), "View");
    assert_eq!(reader.find_child(view, "OnClickListener"), Some(listener));

    let java = reader.find_child(reader.root(), "java").unwrap();
    assert_eq!(reader.kind(java), NodeKind::Package);
    assert!(reader.tree_node_by_name("java/lang/Missing").is_none());
}

#[test]
fn test_base_and_interface_implementation() {
    let reader = MetadataReader::from_buffers(sample_buffers()).unwrap();
    let view = reader.tree_node_by_name("android/view/View").unwrap();
    let object = reader.tree_node_by_name("java/lang/Object").unwrap();
    assert_eq!(reader.base_class_node(view).unwrap(), Some(object));
    assert_eq!(reader.base_class_node(object).unwrap(), None);

    let listener = reader.tree_node_by_name("android/view/View$OnClickListener").unwrap();
    let implementation = reader.interface_implementation(listener).unwrap().unwrap();
    assert_eq!(implementation.name, "com/tns/gen/");
    assert!(implementation.is_prefix);
    assert!(reader.interface_implementation(view).unwrap().is_none());
}

#[test]
fn test_members_decode_every_section() {
    let reader = MetadataReader::from_buffers(sample_buffers()).unwrap();
    let view = reader.tree_node_by_name("android/view/View").unwrap();
    let members = reader.members(view).unwrap();

    assert_eq!(members.instance_fields.len(), 2);
    assert!(members.instance_fields[1].is_final);
    assert!(!members.instance_fields[0].is_final);

    let property = &members.properties[0];
    assert_eq!(property.name, "enabled");
    assert_eq!(property.getter.as_ref().unwrap().name, "isEnabled");
    assert_eq!(property.setter.as_ref().unwrap().name, "setEnabled");

    let extension = &members.extension_functions[0];
    assert!(extension.is_extension_function);
    assert_eq!(extension.declaring_type.as_deref(), Some("androidx/core/view/ViewKt"));

    assert!(members.static_fields[0].is_static);
    assert!(members.static_fields[0].is_final);

    let object = reader.tree_node_by_name("java/lang/Object").unwrap();
    let members = reader.members(object).unwrap();
    assert_eq!(members.instance_methods.len(), 2);
    assert!(members.static_methods[0].is_static);
}

#[test]
fn test_packages_have_no_members() {
    let reader = MetadataReader::from_buffers(sample_buffers()).unwrap();
    let lang = reader.tree_node_by_name("java/lang").unwrap();
    assert!(reader.members(lang).unwrap().is_empty());
}

#[test]
fn test_array_nodes_are_created_on_demand() {
    let reader = MetadataReader::from_buffers(sample_buffers()).unwrap();
    let before = reader.node_count();

    let strings = reader.get_or_create_tree_node_by_name("[Ljava/lang/String;").unwrap();
    assert!(reader.is_array_type(strings));
    assert_eq!(reader.read_type_name(strings), "[Ljava/lang/String;");
    assert_eq!(reader.node_count(), before + 1);

    let again = reader.get_or_create_tree_node_by_name("[Ljava/lang/String;").unwrap();
    assert_eq!(strings, again);
    assert_eq!(reader.node_count(), before + 1);

    let object = reader.tree_node_by_name("java/lang/Object").unwrap();
    assert!(!reader.is_array_type(object));
}

struct GeneratedTypes;

impl TypeMetadataProvider for GeneratedTypes {
    fn type_metadata(&self, name: &str) -> Option<String> {
        match name {
            "com/tns/gen/java/lang/Object_main_3_4_" => Some(
                "C com/tns/gen/java/lang/Object_main_3_4_\nB java/lang/Object\nM run ()V 0\nF tag Ljava/lang/String; 0"
                    .to_string(),
            ),
            "com/tns/gen/Outer$Inner" => Some("C com/tns/gen/Outer$Inner\nB java/lang/Object\nM run ()V 0".to_string()),
            _ => None,
        }
    }
}

#[test]
fn test_lazy_provider_registers_inline_types() {
    let reader = MetadataReader::from_buffers(sample_buffers())
        .unwrap()
        .with_provider(Box::new(GeneratedTypes));

    let id = reader
        .get_or_create_tree_node_by_name("com/tns/gen/java/lang/Object_main_3_4_")
        .unwrap();
    assert_eq!(reader.read_type_name(id), "com/tns/gen/java/lang/Object_main_3_4_");
    assert!(reader.inline_metadata(id).is_some());

    let members = reader.members(id).unwrap();
    assert_eq!(members.instance_methods[0].name, "run");
    assert_eq!(members.instance_fields[0].name, "tag");

    let object = reader.tree_node_by_name("java/lang/Object").unwrap();
    assert_eq!(reader.base_class_node(id).unwrap(), Some(object));

    let err = reader.get_or_create_tree_node_by_name("com/unknown/Type").unwrap_err();
    assert_eq!(err, MetadataError::UnknownType("com/unknown/Type".to_string()));
}

#[test]
fn test_lazy_nested_type_keeps_dollar_separator() {
    let reader = MetadataReader::from_buffers(sample_buffers())
        .unwrap()
        .with_provider(Box::new(GeneratedTypes));

    let id = reader.get_or_create_tree_node_by_name("com/tns/gen/Outer$Inner").unwrap();
    assert_eq!(reader.read_type_name(id), "com/tns/gen/Outer$Inner");
    assert_eq!(reader.name(id).as_ref(), "Inner");

    let outer = reader.parent(id);
    assert_eq!(reader.name(outer).as_ref(), "Outer");
    assert!(reader.kind(outer).is_type());
    assert_eq!(reader.kind(reader.parent(outer)), NodeKind::Package);

    // A second lookup walks the same nodes
    assert_eq!(reader.tree_node_by_name("com/tns/gen/Outer$Inner"), Some(id));
    assert_eq!(reader.get_or_create_tree_node_by_name("com/tns/gen/Outer$Inner").unwrap(), id);
}

#[test]
fn test_malformed_node_buffer() {
    let mut buffers = sample_buffers();
    buffers.nodes.pop();
    assert!(matches!(
        MetadataReader::from_buffers(buffers),
        Err(MetadataError::MalformedNodes { .. })
    ));
}

#[test]
fn test_child_link_cycle_is_rejected() {
    let mut buffers = sample_buffers();
    // Point the first record after the root back at the root's first child
    let root_first_child = buffers.nodes[8..12].to_vec();
    buffers.nodes[NODE_RECORD_SIZE + 12..NODE_RECORD_SIZE + 16].copy_from_slice(&root_first_child);
    assert!(matches!(
        MetadataReader::from_buffers(buffers),
        Err(MetadataError::InvalidLink(_))
    ));
}

#[test]
fn test_load_from_dir_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let metadata_dir = dir.path().join("metadata");
    sample_buffers().write_to_dir(&metadata_dir).unwrap();

    let loaded = MetadataBuffers::load_from_dir(&metadata_dir).unwrap();
    assert_eq!(loaded, sample_buffers());

    let reader = MetadataReader::from_buffers(loaded).unwrap();
    assert!(reader.tree_node_by_name("android/view/View").is_some());
}
