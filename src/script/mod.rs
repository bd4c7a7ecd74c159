//! Script compiler: raw text into tokens, concrete nodes, then a typed
//! abstract-node tree with variables and inheritance resolved.
//!
//! The pipeline is driven by [`ScriptCompiler`], an explicit per-session
//! context holding the compiled-file cache and global variable environment.
//! Everything here is single-threaded; callers wanting parallel loading use
//! one compiler per thread.

pub mod ast;
pub mod compiler;
pub mod concrete;
pub mod error;
pub mod lexer;
pub mod token;
pub mod translate;

pub use ast::*;
pub use compiler::{Compiled, ScriptCompiler};
pub use error::{CompileError, ErrorKind};
pub use translate::{build_definitions, ObjectDef, PropertyDef, Value};
