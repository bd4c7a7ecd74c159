//! Abstract-node tree for compiled scripts.
//!
//! Nodes live in a [`NodeArena`] and refer to each other through stable
//! [`NodeId`] handles. The arena owns every node; `parent` and `context`
//! fields are plain handles, never owning references, so links stay valid
//! as the arena grows.

use std::cell::OnceCell;
use std::collections::HashMap;

/// Stable handle to a node in a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Opaque handle tying a node to the runtime object built from it. Owned by
/// the consumer side; the node only stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(pub u64);

/// A classified script node.
#[derive(Debug, Clone)]
pub struct AbstractNode {
    /// File the node came from. Imported nodes keep their own file.
    pub file: String,
    pub line: usize,
    /// Enclosing node, if any. Non-owning back-reference.
    pub parent: Option<NodeId>,
    /// Set by the materializer once a runtime object exists for this node.
    pub context: Option<ContextHandle>,
    pub kind: NodeKind,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Atom(AtomNode),
    Object(ObjectNode),
    Property(PropertyNode),
    Import(ImportNode),
    VariableSet { name: String, value: String },
    VariableAccess { name: String },
}

impl AbstractNode {
    pub fn new(file: impl Into<String>, line: usize, parent: Option<NodeId>, kind: NodeKind) -> Self {
        Self {
            file: file.into(),
            line,
            parent,
            context: None,
            kind,
        }
    }

    /// The node's primary text: atom value, object class, property name,
    /// import target, or variable name.
    pub fn value_text(&self) -> &str {
        match &self.kind {
            NodeKind::Atom(a) => &a.value,
            NodeKind::Object(o) => &o.class,
            NodeKind::Property(p) => &p.name,
            NodeKind::Import(i) => &i.target,
            NodeKind::VariableSet { name, .. } => name,
            NodeKind::VariableAccess { name } => name,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match &self.kind {
            NodeKind::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectNode> {
        match &mut self.kind {
            NodeKind::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_property(&self) -> Option<&PropertyNode> {
        match &self.kind {
            NodeKind::Property(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_atom(&self) -> Option<&AtomNode> {
        match &self.kind {
            NodeKind::Atom(a) => Some(a),
            _ => None,
        }
    }
}

/// A leaf value. The raw text is the source of truth; numeric meaning is
/// derived on demand.
#[derive(Debug)]
pub struct AtomNode {
    pub value: String,
    /// Word id assigned by the compiler's registry; 0 when unregistered.
    pub id: u32,
    number: OnceCell<Option<AtomNumber>>,
}

impl AtomNode {
    pub fn new(value: impl Into<String>, id: u32) -> Self {
        Self {
            value: value.into(),
            id,
            number: OnceCell::new(),
        }
    }

    /// Numeric reading of the raw text, classified once and memoized.
    /// Malformed numbers (`1.2.3`) classify as plain strings, never errors.
    pub fn number(&self) -> Option<AtomNumber> {
        *self.number.get_or_init(|| classify_number(&self.value))
    }

    pub fn is_number(&self) -> bool {
        self.number().is_some()
    }
}

// Clones start with an empty cell; the classification is pure, so a
// re-derivation gives the same answer.
impl Clone for AtomNode {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            id: self.id,
            number: OnceCell::new(),
        }
    }
}

/// A parsed numeric atom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AtomNumber {
    Int(i64),
    Float(f64),
}

impl AtomNumber {
    pub fn as_f64(self) -> f64 {
        match self {
            AtomNumber::Int(v) => v as f64,
            AtomNumber::Float(v) => v,
        }
    }

    pub fn as_f32(self) -> f32 {
        self.as_f64() as f32
    }
}

/// Numeric shape: optional sign, digits with at most one decimal point,
/// optional exponent. Integral shapes parse as `Int`, falling back to
/// `Float` on overflow.
fn classify_number(text: &str) -> Option<AtomNumber> {
    let bytes = text.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }
    let mut digits = 0;
    let mut integral = true;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        digits += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        integral = false;
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return None;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        integral = false;
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let mut exp_digits = 0;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            exp_digits += 1;
        }
        if exp_digits == 0 {
            return None;
        }
    }
    if i != bytes.len() {
        return None;
    }
    if integral {
        if let Ok(v) = text.parse::<i64>() {
            return Some(AtomNumber::Int(v));
        }
    }
    text.parse::<f64>().ok().map(AtomNumber::Float)
}

/// An object: `class name [: bases] { children }`.
#[derive(Debug, Clone, Default)]
pub struct ObjectNode {
    pub name: String,
    pub class: String,
    /// Names of objects this one copies from, in declaration order.
    pub bases: Vec<String>,
    /// Numeric id of the class word in the compiler's word registry.
    pub id: u32,
    /// Abstract objects are templates: only usable as bases, never
    /// materialized.
    pub is_abstract: bool,
    pub children: Vec<NodeId>,
    /// Header atoms after the name, not inherited.
    pub values: Vec<NodeId>,
    /// Entries from an `overrides { ... }` block. Matching base children are
    /// suppressed during inheritance.
    pub overrides: Vec<NodeId>,
    /// Set once inheritance has been applied so re-entry is a no-op.
    pub bases_resolved: bool,
    env: HashMap<String, String>,
}

impl ObjectNode {
    pub fn new(class: impl Into<String>, name: impl Into<String>, id: u32) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            id,
            ..Self::default()
        }
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.env.insert(name.into(), value.into());
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }

    pub fn variables(&self) -> &HashMap<String, String> {
        &self.env
    }
}

/// A property: `name value*`.
#[derive(Debug, Clone)]
pub struct PropertyNode {
    pub name: String,
    /// Numeric id of the property word in the compiler's word registry.
    pub id: u32,
    pub values: Vec<NodeId>,
}

impl PropertyNode {
    pub fn new(name: impl Into<String>, id: u32) -> Self {
        Self {
            name: name.into(),
            id,
            values: Vec::new(),
        }
    }
}

/// An `import target as alias` statement, recorded during conversion and
/// spliced away during import resolution.
#[derive(Debug, Clone)]
pub struct ImportNode {
    pub target: String,
    pub alias: String,
}

/// Owns every abstract node. Handles are never invalidated; removal is not
/// supported.
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<AbstractNode>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, node: AbstractNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &AbstractNode {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut AbstractNode {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn set_context(&mut self, id: NodeId, handle: ContextHandle) {
        self.nodes[id.index()].context = Some(handle);
    }

    /// Deep-clone `id` and everything it owns. The clone's parent is the
    /// supplied external parent; every interior parent link points into the
    /// cloned subtree. Contexts are not carried over: the clone has no
    /// runtime object yet.
    pub fn clone_subtree(&mut self, id: NodeId, parent: Option<NodeId>) -> NodeId {
        let mut shell = self.node(id).clone();
        shell.parent = parent;
        shell.context = None;

        let (children, values, overrides) = match &mut shell.kind {
            NodeKind::Object(obj) => (
                std::mem::take(&mut obj.children),
                std::mem::take(&mut obj.values),
                std::mem::take(&mut obj.overrides),
            ),
            NodeKind::Property(prop) => {
                (Vec::new(), std::mem::take(&mut prop.values), Vec::new())
            }
            _ => (Vec::new(), Vec::new(), Vec::new()),
        };

        let new_id = self.alloc(shell);
        let children: Vec<NodeId> = children
            .iter()
            .map(|&c| self.clone_subtree(c, Some(new_id)))
            .collect();
        let values: Vec<NodeId> = values
            .iter()
            .map(|&v| self.clone_subtree(v, Some(new_id)))
            .collect();
        let overrides: Vec<NodeId> = overrides
            .iter()
            .map(|&o| self.clone_subtree(o, Some(new_id)))
            .collect();

        match &mut self.node_mut(new_id).kind {
            NodeKind::Object(obj) => {
                obj.children = children;
                obj.values = values;
                obj.overrides = overrides;
            }
            NodeKind::Property(prop) => {
                prop.values = values;
            }
            _ => {}
        }
        new_id
    }
}
