//! Materialization of compiled scripts into plain definition records.
//!
//! This is the hand-off to whatever builds runtime objects: resolved roots
//! become [`ObjectDef`] trees with typed values, detached from arena
//! handles. Abstract templates are skipped, and every materialized object's
//! node is stamped with a fresh [`ContextHandle`] so later passes can find
//! the runtime object a node produced.

use serde::Serialize;

use super::ast::{AtomNumber, ContextHandle, NodeArena, NodeId, NodeKind};

/// A typed property value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Int(v) => Some(*v as f32),
            Value::Float(v) => Some(*v as f32),
            Value::Str(_) => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int(v) if *v >= 0 => Some(*v as u64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Str(s) if s == "true" => Some(true),
            Value::Str(s) if s == "false" => Some(false),
            Value::Int(0) => Some(false),
            Value::Int(1) => Some(true),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyDef {
    pub name: String,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectDef {
    pub class: String,
    pub name: String,
    pub properties: Vec<PropertyDef>,
    pub children: Vec<ObjectDef>,
}

impl ObjectDef {
    /// First property with the given name.
    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// First child object of the given class.
    pub fn child_of_class(&self, class: &str) -> Option<&ObjectDef> {
        self.children.iter().find(|c| c.class == class)
    }
}

/// Materialize resolved roots into definition records, stamping context
/// handles on every object node that produced one.
pub fn build_definitions(arena: &mut NodeArena, roots: &[NodeId]) -> Vec<ObjectDef> {
    let mut next_handle = 1u64;
    let mut defs = Vec::new();
    for &root in roots {
        if let Some(def) = build_object(arena, root, &mut next_handle) {
            defs.push(def);
        }
    }
    defs
}

fn build_object(arena: &mut NodeArena, id: NodeId, next_handle: &mut u64) -> Option<ObjectDef> {
    let (class, name, child_ids) = match &arena.node(id).kind {
        NodeKind::Object(o) if !o.is_abstract => {
            (o.class.clone(), o.name.clone(), o.children.clone())
        }
        _ => return None,
    };

    arena.set_context(id, ContextHandle(*next_handle));
    *next_handle += 1;

    let mut properties = Vec::new();
    let mut children = Vec::new();
    for child in child_ids {
        match &arena.node(child).kind {
            NodeKind::Property(p) => {
                let values = p.values.iter().map(|&v| value_of(arena, v)).collect();
                properties.push(PropertyDef {
                    name: p.name.clone(),
                    values,
                });
            }
            NodeKind::Object(_) => {
                if let Some(def) = build_object(arena, child, next_handle) {
                    children.push(def);
                }
            }
            // Variable sets and stray atoms carry no runtime content.
            _ => {}
        }
    }

    Some(ObjectDef {
        class,
        name,
        properties,
        children,
    })
}

fn value_of(arena: &NodeArena, id: NodeId) -> Value {
    let node = arena.node(id);
    match &node.kind {
        NodeKind::Atom(a) => match a.number() {
            Some(AtomNumber::Int(v)) => Value::Int(v),
            Some(AtomNumber::Float(v)) => Value::Float(v),
            None => Value::Str(a.value.clone()),
        },
        _ => Value::Str(node.value_text().to_string()),
    }
}
