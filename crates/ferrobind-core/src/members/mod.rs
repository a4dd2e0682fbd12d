//! Member resolver
//!
//! Turns a type's [`TypeMembers`] into script-visible members: one
//! [`MethodGroup`] per method name, an accessor per field, and a getter/setter
//! pair per property. Instance members go on the blueprint's prototype,
//! static members on its constructor.
//!
//! # Overload groups
//!
//! Extension functions and regular instance methods that share a name are
//! merged into one group. A group links to the same-named group of the
//! nearest materialized base type, so inherited overloads that are not
//! redeclared stay reachable; see [`MethodGroup::resolve`].

mod dispatch;

use std::rc::Rc;
use std::sync::Arc;

use ferrobind_metadata::{MetadataEntry, TypeMembers};
use rustc_hash::FxHashMap;

use crate::engine::{Accessor, Engine, NativeCallback, ObjectId, Value};
use crate::error::BridgeResult;
use crate::node::MetadataNode;
use crate::profiler;

pub(crate) use dispatch::{field_get, field_set, invoke_method, property_get, property_set};

/// Name of the constructor pseudo-method
pub const CONSTRUCTOR_METHOD: &str = "<init>";

/// Method table of a blueprint, by method name
pub type MethodTable = FxHashMap<String, Rc<MethodGroup>>;

/// All same-named overloads of one type
pub struct MethodGroup {
    node: Arc<MetadataNode>,
    name: String,
    candidates: Vec<MetadataEntry>,
    parent: Option<Rc<MethodGroup>>,
}

/// Overload selected for a call
#[derive(Debug, Clone, Copy)]
pub struct ResolvedMethod<'a> {
    /// Matched candidate
    pub entry: &'a MetadataEntry,
    /// Class to invoke the method on
    pub class_name: &'a str,
}

impl MethodGroup {
    fn new(node: Arc<MetadataNode>, candidates: Vec<MetadataEntry>, parent: Option<Rc<MethodGroup>>) -> Self {
        let name = candidates.first().map(|c| c.name.clone()).unwrap_or_default();
        Self {
            node,
            name,
            candidates,
            parent,
        }
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type that declared this group
    pub fn node(&self) -> &Arc<MetadataNode> {
        &self.node
    }

    /// Overloads in declaration order
    pub fn candidates(&self) -> &[MetadataEntry] {
        &self.candidates
    }

    /// Same-named group of the base type
    pub fn parent(&self) -> Option<&Rc<MethodGroup>> {
        self.parent.as_ref()
    }

    /// Pick the overload for a call with `argc` arguments
    ///
    /// Candidates are scanned in declaration order and the first whose
    /// parameter count equals `argc` wins (`argc + 1` for extension
    /// functions, whose receiver is an explicit leading parameter). The
    /// parent group is consulted only when nothing in this group matches.
    pub fn resolve(&self, argc: usize) -> Option<ResolvedMethod<'_>> {
        let mut current = Some(self);
        while let Some(group) = current {
            for entry in &group.candidates {
                let matches = if entry.is_extension_function {
                    entry.param_count == argc + 1
                } else {
                    entry.param_count == argc
                };
                if matches {
                    let class_name = match (&entry.declaring_type, entry.is_extension_function) {
                        (Some(declaring), true) => declaring.as_str(),
                        _ => group.node.name(),
                    };
                    return Some(ResolvedMethod { entry, class_name });
                }
            }
            current = group.parent.as_deref();
        }
        None
    }
}

/// Foreign field exposed as an accessor
#[derive(Debug)]
pub struct FieldAccessor {
    /// Field metadata, with the declaring type filled in
    pub entry: MetadataEntry,
}

/// Getter/setter pair resolved to method names
#[derive(Debug)]
pub struct PropertyAccessor {
    /// Property name
    pub name: String,
    /// Getter method name
    pub getter_name: Option<String>,
    /// Setter method name
    pub setter_name: Option<String>,
}

/// Ordered same-name grouping of method entries
#[derive(Default)]
struct GroupBuilder {
    order: Vec<String>,
    entries: FxHashMap<String, Vec<MetadataEntry>>,
}

impl GroupBuilder {
    fn push(&mut self, entry: MetadataEntry) {
        if !self.entries.contains_key(&entry.name) {
            self.order.push(entry.name.clone());
        }
        self.entries.entry(entry.name.clone()).or_default().push(entry);
    }

    /// Add `entry` unless a candidate with the same signature exists
    fn push_missing(&mut self, entry: MetadataEntry) -> bool {
        let duplicate = self
            .entries
            .get(&entry.name)
            .is_some_and(|existing| existing.iter().any(|e| e.signature == entry.signature));
        if duplicate {
            return false;
        }
        self.push(entry);
        true
    }

    fn into_groups(mut self) -> Vec<Vec<MetadataEntry>> {
        self.order
            .iter()
            .filter_map(|name| self.entries.remove(name))
            .collect()
    }
}

/// Install instance methods, fields and properties on `prototype`
///
/// Methods of skipped base types are merged into the groups unless an
/// overload with the same signature is already present. Returns the groups
/// this type declares.
pub(crate) fn install_instance_members(
    engine: &mut Engine,
    node: &Arc<MetadataNode>,
    prototype: ObjectId,
    members: &TypeMembers,
    skipped: &[TypeMembers],
    inherited: &MethodTable,
) -> BridgeResult<MethodTable> {
    let mut builder = GroupBuilder::default();
    for entry in members.extension_functions.iter().chain(&members.instance_methods) {
        builder.push(entry.clone());
    }
    for skipped_members in skipped {
        for entry in &skipped_members.instance_methods {
            if entry.name != CONSTRUCTOR_METHOD {
                builder.push_missing(entry.clone());
            }
        }
    }

    let mut own = MethodTable::default();
    for candidates in builder.into_groups() {
        let name = candidates[0].name.clone();
        let group = Rc::new(MethodGroup::new(node.clone(), candidates, inherited.get(&name).cloned()));
        let function = engine.new_native_function(&name, NativeCallback::Method(group.clone()));
        let function = profiler::wrap(engine, function, &name, false);
        engine.define_data(prototype, name.as_str(), Value::Object(function));
        own.insert(name, group);
    }

    for field in &members.instance_fields {
        install_field(engine, node, prototype, field);
    }

    for property in &members.properties {
        let accessor = PropertyAccessor {
            name: property.name.clone(),
            getter_name: property.getter.as_ref().map(|g| g.name.clone()),
            setter_name: property.setter.as_ref().map(|s| s.name.clone()),
        };
        engine.define_accessor(
            prototype,
            property.name.as_str(),
            Accessor::Property(Rc::new(accessor)),
        );
    }

    Ok(own)
}

/// Install static methods and fields on `constructor`
pub(crate) fn install_static_members(
    engine: &mut Engine,
    node: &Arc<MetadataNode>,
    constructor: ObjectId,
    members: &TypeMembers,
) -> BridgeResult<()> {
    let mut builder = GroupBuilder::default();
    for entry in &members.static_methods {
        builder.push(entry.clone());
    }
    for candidates in builder.into_groups() {
        let name = candidates[0].name.clone();
        let group = Rc::new(MethodGroup::new(node.clone(), candidates, None));
        let function = engine.new_native_function(&name, NativeCallback::Method(group));
        let function = profiler::wrap(engine, function, &name, false);
        engine.define_data(constructor, name.as_str(), Value::Object(function));
    }

    for field in &members.static_fields {
        install_field(engine, node, constructor, field);
    }
    Ok(())
}

fn install_field(engine: &mut Engine, node: &MetadataNode, target: ObjectId, field: &MetadataEntry) {
    let mut entry = field.clone();
    if entry.declaring_type.is_none() {
        entry.declaring_type = Some(node.name().to_string());
    }
    let name = entry.name.clone();
    engine.define_accessor(target, name.as_str(), Accessor::Field(Rc::new(FieldAccessor { entry })));
}
