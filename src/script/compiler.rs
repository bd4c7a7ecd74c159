//! The script compiler.
//!
//! Drives a file through the full pipeline: read, lex, concrete parse,
//! abstract conversion, import expansion, variable resolution, inheritance
//! resolution. Compiled files are cached for the compiler's lifetime; the
//! cache is only dropped through [`ScriptCompiler::clear_cache`] or
//! [`ScriptCompiler::invalidate`].
//!
//! A `ScriptCompiler` is an ordinary value, constructed per loading session
//! and passed explicitly to whoever needs it. It is single-threaded by
//! design; callers wanting parallelism use one compiler per thread.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::ast::{AbstractNode, AtomNode, ImportNode, NodeArena, NodeId, NodeKind, ObjectNode, PropertyNode};
use super::concrete::{ConcreteNode, ConcreteNodeKind, Parser};
use super::error::CompileError;
use super::lexer::Lexer;

/// Head word that marks a template object.
const ABSTRACT_KEYWORD: &str = "abstract";
/// Child block whose statements suppress inherited nodes instead of adding
/// children.
const OVERRIDES_BLOCK: &str = "overrides";

/// The result of a compile call.
#[derive(Debug, Clone)]
pub struct Compiled {
    /// Top-level nodes of the file, imports already spliced in.
    pub roots: Vec<NodeId>,
    /// True when this call compiled the file rather than hitting the cache.
    pub first_compile: bool,
}

pub struct ScriptCompiler {
    arena: NodeArena,
    cache: HashMap<String, Vec<NodeId>>,
    /// Global variable environment, the fallback after every enclosing
    /// object scope has been searched.
    env: HashMap<String, String>,
    /// Consumer-registered vocabulary. Unknown words map to id 0.
    word_ids: HashMap<String, u32>,
    /// Directory import targets and compile names are resolved against.
    root: PathBuf,
    /// Files currently being compiled, for circular-import detection.
    in_flight: Vec<String>,
}

impl ScriptCompiler {
    pub fn new() -> Self {
        Self::with_root(".")
    }

    /// A compiler whose file lookups happen under `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            arena: NodeArena::new(),
            cache: HashMap::new(),
            env: HashMap::new(),
            word_ids: HashMap::new(),
            root: root.into(),
            in_flight: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut NodeArena {
        &mut self.arena
    }

    /// Register a vocabulary word. Object classes, property names, and atoms
    /// matching `word` will carry `id` on their nodes.
    pub fn register_word_id(&mut self, word: impl Into<String>, id: u32) {
        self.word_ids.insert(word.into(), id);
    }

    pub fn word_id(&self, word: &str) -> u32 {
        self.word_ids.get(word).copied().unwrap_or(0)
    }

    pub fn set_global_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.env.insert(name.into(), value.into());
    }

    pub fn global_variable(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }

    /// Drop every cached compile result. Arena nodes are not reclaimed;
    /// handles held by callers stay valid.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Drop one file's cached result so the next compile re-reads it.
    pub fn invalidate(&mut self, file: &str) {
        self.cache.remove(file);
    }

    /// Compile `file` (a path relative to the compiler root), returning its
    /// top-level nodes. Results are cached: the second call for the same
    /// file returns the same roots with `first_compile = false`.
    pub fn compile(&mut self, file: &str) -> Result<Compiled, CompileError> {
        if let Some(roots) = self.cache.get(file) {
            debug!("cache hit for {file}");
            return Ok(Compiled {
                roots: roots.clone(),
                first_compile: false,
            });
        }
        let path = self.root.join(file);
        let source = fs::read_to_string(&path)
            .map_err(|e| CompileError::io(format!("{}: {e}", path.display()), file))?;
        let roots = self.compile_text(file, &source)?;
        self.cache.insert(file.to_string(), roots.clone());
        Ok(Compiled {
            roots,
            first_compile: true,
        })
    }

    /// Compile in-memory text, cached under `name` exactly as a file would
    /// be. Imports inside the text still resolve against the compiler root.
    pub fn compile_source(&mut self, name: &str, source: &str) -> Result<Compiled, CompileError> {
        if let Some(roots) = self.cache.get(name) {
            debug!("cache hit for {name}");
            return Ok(Compiled {
                roots: roots.clone(),
                first_compile: false,
            });
        }
        let roots = self.compile_text(name, source)?;
        self.cache.insert(name.to_string(), roots.clone());
        Ok(Compiled {
            roots,
            first_compile: true,
        })
    }

    fn compile_text(&mut self, file: &str, source: &str) -> Result<Vec<NodeId>, CompileError> {
        if self.in_flight.iter().any(|f| f == file) {
            return Err(CompileError::structure(
                format!("circular import of '{file}'"),
                file,
                0,
            ));
        }
        self.in_flight.push(file.to_string());
        let result = self.run_stages(file, source);
        self.in_flight.pop();
        result
    }

    fn run_stages(&mut self, file: &str, source: &str) -> Result<Vec<NodeId>, CompileError> {
        debug!("compiling {file}");
        let tokens = Lexer::new(file, source).tokenize()?;
        let concrete = Parser::new(file, tokens).parse()?;
        let mut roots = self.convert_to_ast(file, &concrete, None)?;
        let aliases = self.resolve_imports(file, &mut roots)?;
        self.resolve_variables(&roots);
        self.resolve_inheritance(&roots, &aliases)?;
        debug!("compiled {file}: {} top-level nodes", roots.len());
        Ok(roots)
    }

    // --- Conversion: concrete tree -> abstract nodes ---

    fn convert_to_ast(
        &mut self,
        file: &str,
        statements: &[ConcreteNode],
        parent: Option<NodeId>,
    ) -> Result<Vec<NodeId>, CompileError> {
        let mut ids = Vec::with_capacity(statements.len());
        for stmt in statements {
            ids.push(self.convert_statement(file, stmt, parent)?);
        }
        Ok(ids)
    }

    fn convert_statement(
        &mut self,
        file: &str,
        stmt: &ConcreteNode,
        parent: Option<NodeId>,
    ) -> Result<NodeId, CompileError> {
        match stmt.kind {
            ConcreteNodeKind::Import => {
                if parent.is_some() {
                    return Err(CompileError::structure(
                        "imports are only allowed at top level",
                        file,
                        stmt.line,
                    ));
                }
                let import = ImportNode {
                    target: stmt.token.clone(),
                    alias: stmt.children[0].token.clone(),
                };
                Ok(self.arena.alloc(AbstractNode::new(
                    file,
                    stmt.line,
                    parent,
                    NodeKind::Import(import),
                )))
            }
            ConcreteNodeKind::VariableAssign => {
                let name = stmt.token.clone();
                let value = stmt.children[0].token.clone();
                let id = self.arena.alloc(AbstractNode::new(
                    file,
                    stmt.line,
                    parent,
                    NodeKind::VariableSet {
                        name: name.clone(),
                        value: value.clone(),
                    },
                ));
                self.register_variable(id, name, value);
                Ok(id)
            }
            ConcreteNodeKind::Variable => {
                if !stmt.children.is_empty() {
                    return Err(CompileError::structure(
                        format!("variable '${}' cannot head a statement", stmt.token),
                        file,
                        stmt.line,
                    ));
                }
                Ok(self.arena.alloc(AbstractNode::new(
                    file,
                    stmt.line,
                    parent,
                    NodeKind::VariableAccess {
                        name: stmt.token.clone(),
                    },
                )))
            }
            ConcreteNodeKind::Word | ConcreteNodeKind::Quote => {
                self.convert_node_statement(file, stmt, parent)
            }
            // The parser only emits these in the positions handled above.
            ConcreteNodeKind::Colon | ConcreteNodeKind::Block => unreachable!(),
        }
    }

    fn convert_node_statement(
        &mut self,
        file: &str,
        stmt: &ConcreteNode,
        parent: Option<NodeId>,
    ) -> Result<NodeId, CompileError> {
        let mut header: Vec<&ConcreteNode> = Vec::new();
        let mut bases: Option<&ConcreteNode> = None;
        let mut block: Option<&ConcreteNode> = None;
        for child in &stmt.children {
            match child.kind {
                ConcreteNodeKind::Colon => bases = Some(child),
                ConcreteNodeKind::Block => block = Some(child),
                _ => header.push(child),
            }
        }

        let Some(block) = block else {
            // No block: a property statement.
            let prop = PropertyNode::new(stmt.token.clone(), self.word_id(&stmt.token));
            let id = self.arena.alloc(AbstractNode::new(
                file,
                stmt.line,
                parent,
                NodeKind::Property(prop),
            ));
            let values = self.convert_values(file, &header, id)?;
            if let NodeKind::Property(p) = &mut self.arena.node_mut(id).kind {
                p.values = values;
            }
            return Ok(id);
        };

        // A block: an object statement.
        let is_abstract = stmt.token == ABSTRACT_KEYWORD;
        let (class, rest) = if is_abstract {
            let Some((class_node, rest)) = header.split_first() else {
                return Err(CompileError::structure(
                    "expected a class after 'abstract'",
                    file,
                    stmt.line,
                ));
            };
            if class_node.kind == ConcreteNodeKind::Variable {
                return Err(CompileError::structure(
                    "an object class cannot be a variable reference",
                    file,
                    stmt.line,
                ));
            }
            (class_node.token.clone(), rest)
        } else {
            (stmt.token.clone(), header.as_slice())
        };

        let (name, value_nodes) = match rest.split_first() {
            Some((name_node, value_nodes)) => {
                if name_node.kind == ConcreteNodeKind::Variable {
                    return Err(CompileError::structure(
                        "an object name cannot be a variable reference",
                        file,
                        stmt.line,
                    ));
                }
                (name_node.token.clone(), value_nodes)
            }
            None => (String::new(), rest),
        };

        let mut obj = ObjectNode::new(class.clone(), name, self.word_id(&class));
        obj.is_abstract = is_abstract;
        if let Some(colon) = bases {
            obj.bases = colon.children.iter().map(|b| b.token.clone()).collect();
        }
        let id = self
            .arena
            .alloc(AbstractNode::new(file, stmt.line, parent, NodeKind::Object(obj)));

        let values = self.convert_values(file, value_nodes, id)?;

        let mut children = Vec::new();
        let mut overrides = Vec::new();
        for inner in &block.children {
            if is_overrides_block(inner) {
                let entries = self.convert_to_ast(file, &inner.children[0].children, Some(id))?;
                overrides.extend(entries);
            } else {
                children.push(self.convert_statement(file, inner, Some(id))?);
            }
        }

        if let NodeKind::Object(o) = &mut self.arena.node_mut(id).kind {
            o.values = values;
            o.children = children;
            o.overrides = overrides;
        }
        Ok(id)
    }

    fn convert_values(
        &mut self,
        file: &str,
        leaves: &[&ConcreteNode],
        parent: NodeId,
    ) -> Result<Vec<NodeId>, CompileError> {
        let mut ids = Vec::with_capacity(leaves.len());
        for leaf in leaves {
            let kind = match leaf.kind {
                ConcreteNodeKind::Variable => NodeKind::VariableAccess {
                    name: leaf.token.clone(),
                },
                _ => NodeKind::Atom(AtomNode::new(leaf.token.clone(), self.word_id(&leaf.token))),
            };
            ids.push(
                self.arena
                    .alloc(AbstractNode::new(file, leaf.line, Some(parent), kind)),
            );
        }
        Ok(ids)
    }

    /// Record a `$name = value` binding on the nearest enclosing object, or
    /// in the global environment at top level.
    fn register_variable(&mut self, node: NodeId, name: String, value: String) {
        let mut cur = self.arena.node(node).parent;
        while let Some(pid) = cur {
            if let NodeKind::Object(o) = &mut self.arena.node_mut(pid).kind {
                o.set_variable(name, value);
                return;
            }
            cur = self.arena.node(pid).parent;
        }
        self.env.insert(name, value);
    }

    // --- Imports ---

    /// Replace every top-level import node with the compiled roots of its
    /// target file, returning the alias map for base lookups.
    fn resolve_imports(
        &mut self,
        file: &str,
        roots: &mut Vec<NodeId>,
    ) -> Result<HashMap<String, Vec<NodeId>>, CompileError> {
        let mut expanded = Vec::with_capacity(roots.len());
        let mut aliases: HashMap<String, Vec<NodeId>> = HashMap::new();
        for &id in roots.iter() {
            let (target, alias, line) = match &self.arena.node(id).kind {
                NodeKind::Import(imp) => {
                    (imp.target.clone(), imp.alias.clone(), self.arena.node(id).line)
                }
                _ => {
                    expanded.push(id);
                    continue;
                }
            };
            if self.in_flight.iter().any(|f| f == &target) {
                return Err(CompileError::structure(
                    format!("circular import of '{target}'"),
                    file,
                    line,
                ));
            }
            debug!("{file}: importing {target} as {alias}");
            let imported = self.compile(&target)?;
            aliases.insert(alias, imported.roots.clone());
            expanded.extend(imported.roots);
        }
        *roots = expanded;
        Ok(aliases)
    }

    // --- Variables ---

    /// Rewrite every variable-access node into an atom: the bound value when
    /// a scope provides one, the literal `$name` text otherwise.
    fn resolve_variables(&mut self, roots: &[NodeId]) {
        let mut stack: Vec<NodeId> = roots.to_vec();
        while let Some(id) = stack.pop() {
            match &self.arena.node(id).kind {
                NodeKind::Object(o) => {
                    stack.extend(o.children.iter().copied());
                    stack.extend(o.values.iter().copied());
                    stack.extend(o.overrides.iter().copied());
                }
                NodeKind::Property(p) => {
                    stack.extend(p.values.iter().copied());
                }
                NodeKind::VariableAccess { name } => {
                    let name = name.clone();
                    let resolved = self.lookup_variable(id, &name);
                    let value = match resolved {
                        Some(v) => v,
                        None => {
                            let node = self.arena.node(id);
                            warn!(
                                "unresolved script variable ${name} ({}:{})",
                                node.file, node.line
                            );
                            format!("${name}")
                        }
                    };
                    let atom = AtomNode::new(value.clone(), self.word_id(&value));
                    self.arena.node_mut(id).kind = NodeKind::Atom(atom);
                }
                _ => {}
            }
        }
    }

    fn lookup_variable(&self, from: NodeId, name: &str) -> Option<String> {
        let mut cur = self.arena.node(from).parent;
        while let Some(pid) = cur {
            if let NodeKind::Object(o) = &self.arena.node(pid).kind {
                if let Some(v) = o.variable(name) {
                    return Some(v.to_string());
                }
            }
            cur = self.arena.node(pid).parent;
        }
        self.env.get(name).cloned()
    }

    // --- Inheritance ---

    /// Resolve `: base` lists across the root list in order. Bases must be
    /// objects seen earlier (in this file or a spliced import), so cycles
    /// cannot form. Also rejects any object whose class tag names an
    /// abstract template.
    fn resolve_inheritance(
        &mut self,
        roots: &[NodeId],
        aliases: &HashMap<String, Vec<NodeId>>,
    ) -> Result<(), CompileError> {
        let mut named: HashMap<String, NodeId> = HashMap::new();
        let mut abstract_names: HashMap<String, NodeId> = HashMap::new();
        for &root in roots {
            self.resolve_object(root, &named, aliases, &abstract_names)?;
            if let NodeKind::Object(o) = &self.arena.node(root).kind {
                if !o.name.is_empty() {
                    named.insert(o.name.clone(), root);
                    if o.is_abstract {
                        abstract_names.insert(o.name.clone(), root);
                    }
                }
            }
        }
        Ok(())
    }

    fn resolve_object(
        &mut self,
        id: NodeId,
        named: &HashMap<String, NodeId>,
        aliases: &HashMap<String, Vec<NodeId>>,
        abstract_names: &HashMap<String, NodeId>,
    ) -> Result<(), CompileError> {
        let (class, bases, resolved, file, line) = match &self.arena.node(id).kind {
            NodeKind::Object(o) => (
                o.class.clone(),
                o.bases.clone(),
                o.bases_resolved,
                self.arena.node(id).file.clone(),
                self.arena.node(id).line,
            ),
            _ => return Ok(()),
        };

        if abstract_names.contains_key(&class) {
            return Err(CompileError::abstract_instantiation(
                format!("'{class}' is an abstract template and cannot be instantiated"),
                file,
                line,
            ));
        }

        if !resolved {
            let mut inherited = Vec::new();
            for base in &bases {
                let base_id = self.lookup_base(base, named, aliases).ok_or_else(|| {
                    CompileError::missing_base(
                        format!("base object '{base}' not found"),
                        file.clone(),
                        line,
                    )
                })?;
                let base_children = match &self.arena.node(base_id).kind {
                    NodeKind::Object(o) => o.children.clone(),
                    _ => Vec::new(),
                };
                for child in base_children {
                    if self.is_overridden(id, child) {
                        continue;
                    }
                    inherited.push(self.arena.clone_subtree(child, Some(id)));
                }
            }
            if let NodeKind::Object(o) = &mut self.arena.node_mut(id).kind {
                inherited.extend(o.children.iter().copied());
                o.children = inherited;
                o.bases_resolved = true;
            }
        }

        let children = match &self.arena.node(id).kind {
            NodeKind::Object(o) => o.children.clone(),
            _ => Vec::new(),
        };
        for child in children {
            self.resolve_object(child, named, aliases, abstract_names)?;
        }
        Ok(())
    }

    fn lookup_base(
        &self,
        base: &str,
        named: &HashMap<String, NodeId>,
        aliases: &HashMap<String, Vec<NodeId>>,
    ) -> Option<NodeId> {
        if let Some((prefix, rest)) = base.split_once('.') {
            if let Some(roots) = aliases.get(prefix) {
                for &id in roots {
                    if let NodeKind::Object(o) = &self.arena.node(id).kind {
                        if o.name == rest {
                            return Some(id);
                        }
                    }
                }
                // A dotted name that happens to start with an alias may
                // still be a plain object name; fall through.
            }
        }
        named.get(base).copied()
    }

    /// True when one of the derived object's override entries matches the
    /// base child by classification and name.
    fn is_overridden(&self, derived: NodeId, base_child: NodeId) -> bool {
        let overrides = match &self.arena.node(derived).kind {
            NodeKind::Object(o) => &o.overrides,
            _ => return false,
        };
        let child = &self.arena.node(base_child).kind;
        for &ov in overrides {
            let matches = match (&self.arena.node(ov).kind, child) {
                (NodeKind::Property(a), NodeKind::Property(b)) => a.name == b.name,
                (NodeKind::Object(a), NodeKind::Object(b)) => {
                    !a.name.is_empty() && a.name == b.name
                }
                _ => false,
            };
            if matches {
                return true;
            }
        }
        false
    }
}

impl Default for ScriptCompiler {
    fn default() -> Self {
        Self::new()
    }
}

/// `overrides { ... }`: a bare word head whose only child is a block.
fn is_overrides_block(stmt: &ConcreteNode) -> bool {
    stmt.kind == ConcreteNodeKind::Word
        && stmt.token == OVERRIDES_BLOCK
        && stmt.children.len() == 1
        && stmt.children[0].kind == ConcreteNodeKind::Block
}
