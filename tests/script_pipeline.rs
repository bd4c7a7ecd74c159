//! Script pipeline integration tests: on-disk compiles, imports, caching.
//!
//! Everything here goes through real files under a temp directory, the way
//! an engine's resource loader would drive the compiler.

use std::fs;
use std::path::Path;

use ember::script::{build_definitions, ErrorKind, ObjectDef, ScriptCompiler, Value};

/// Helper: drop a script file into the root directory.
fn write_script(root: &Path, name: &str, source: &str) {
    fs::write(root.join(name), source).unwrap();
}

/// Helper: compile a file and materialize its definitions.
fn compile_defs(compiler: &mut ScriptCompiler, file: &str) -> Vec<ObjectDef> {
    let compiled = compiler.compile(file).expect("compile failed");
    build_definitions(compiler.arena_mut(), &compiled.roots)
}

fn int_value(def: &ObjectDef, property: &str) -> i64 {
    match def.property(property).unwrap().values[0] {
        Value::Int(v) => v,
        ref other => panic!("expected int for {property}, got {other:?}"),
    }
}

// =============================================================================
// Test 1: A script on disk compiles into materialized definitions
// =============================================================================

#[test]
fn disk_script_compiles_to_definitions() {
    let dir = tempfile::tempdir().unwrap();
    write_script(
        dir.path(),
        "glow.pu",
        "system glow {\n rate 120\n mesh_surface_emitter points {\n mesh_name crystal\n distribution homogeneous\n }\n}\n",
    );

    let mut compiler = ScriptCompiler::with_root(dir.path());
    let defs = compile_defs(&mut compiler, "glow.pu");

    assert_eq!(defs.len(), 1);
    let glow = &defs[0];
    assert_eq!(glow.class, "system");
    assert_eq!(glow.name, "glow");
    assert_eq!(int_value(glow, "rate"), 120);
    let points = glow.child_of_class("mesh_surface_emitter").unwrap();
    assert_eq!(points.name, "points");
    assert_eq!(
        points.property("mesh_name").unwrap().values[0],
        Value::Str("crystal".to_string())
    );
}

// =============================================================================
// Test 2: Imports splice in and alias-qualified bases resolve
// =============================================================================

#[test]
fn import_splices_roots_and_resolves_alias_bases() {
    let dir = tempfile::tempdir().unwrap();
    write_script(
        dir.path(),
        "library.pu",
        "abstract system base_glow { rate 40 }\nsystem plain { size 2 }\n",
    );
    write_script(
        dir.path(),
        "main.pu",
        "import \"library.pu\" as lib\nsystem fire : lib.base_glow { angle 15 }\n",
    );

    let mut compiler = ScriptCompiler::with_root(dir.path());
    let compiled = compiler.compile("main.pu").unwrap();
    // base_glow, plain, fire: the import node itself is gone.
    assert_eq!(compiled.roots.len(), 3);

    let defs = build_definitions(compiler.arena_mut(), &compiled.roots);
    // The abstract template is not materialized.
    assert_eq!(defs.len(), 2);
    let fire = defs.iter().find(|d| d.name == "fire").unwrap();
    assert_eq!(int_value(fire, "rate"), 40);
    assert_eq!(int_value(fire, "angle"), 15);

    // The import warmed the cache for the library file.
    assert!(!compiler.compile("library.pu").unwrap().first_compile);
}

// =============================================================================
// Test 3: Inherited properties can be overridden across files
// =============================================================================

#[test]
fn cross_file_inheritance_honors_overrides() {
    let dir = tempfile::tempdir().unwrap();
    write_script(
        dir.path(),
        "base.pu",
        "system flame {\n colour red\n size 5\n}\n",
    );
    write_script(
        dir.path(),
        "torch.pu",
        "import \"base.pu\" as base\n\
         system torch : flame {\n overrides { size }\n size 10\n}\n",
    );

    let mut compiler = ScriptCompiler::with_root(dir.path());
    let defs = compile_defs(&mut compiler, "torch.pu");
    let torch = defs.iter().find(|d| d.name == "torch").unwrap();
    assert_eq!(
        torch.property("colour").unwrap().values[0],
        Value::Str("red".to_string())
    );
    assert_eq!(int_value(torch, "size"), 10);
    // The overridden base value is gone entirely.
    let sizes: Vec<_> = torch.properties.iter().filter(|p| p.name == "size").collect();
    assert_eq!(sizes.len(), 1);
}

// =============================================================================
// Test 4: Circular imports fail instead of recursing
// =============================================================================

#[test]
fn circular_imports_are_structure_errors() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "a.pu", "import \"b.pu\" as b\nsystem a { }\n");
    write_script(dir.path(), "b.pu", "import \"a.pu\" as a\nsystem b { }\n");

    let mut compiler = ScriptCompiler::with_root(dir.path());
    let err = compiler.compile("a.pu").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Structure);
    assert!(err.message.contains("circular"), "message: {}", err.message);
}

// =============================================================================
// Test 5: A missing import target is an I/O error naming the file
// =============================================================================

#[test]
fn missing_import_target_reports_io_error() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "main.pu", "import \"nope.pu\" as gone\n");

    let mut compiler = ScriptCompiler::with_root(dir.path());
    let err = compiler.compile("main.pu").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Io);
    assert_eq!(err.file, "nope.pu");
}

// =============================================================================
// Test 6: Cached results survive file edits until invalidated
// =============================================================================

#[test]
fn cache_serves_stale_results_until_invalidated() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "fx.pu", "system a { }\n");

    let mut compiler = ScriptCompiler::with_root(dir.path());
    let first = compiler.compile("fx.pu").unwrap();
    assert!(first.first_compile);
    assert_eq!(first.roots.len(), 1);

    // Edit the file behind the compiler's back.
    write_script(dir.path(), "fx.pu", "system a { }\nsystem b { }\n");
    let cached = compiler.compile("fx.pu").unwrap();
    assert!(!cached.first_compile);
    assert_eq!(cached.roots, first.roots);

    compiler.invalidate("fx.pu");
    let fresh = compiler.compile("fx.pu").unwrap();
    assert!(fresh.first_compile);
    assert_eq!(fresh.roots.len(), 2);
}

// =============================================================================
// Test 7: Globals seeded before compiling resolve; unknowns stay literal
// =============================================================================

#[test]
fn seeded_globals_resolve_and_unknowns_stay_literal() {
    let dir = tempfile::tempdir().unwrap();
    write_script(
        dir.path(),
        "tinted.pu",
        "system tinted {\n material $tint\n fallback $unset\n}\n",
    );

    let mut compiler = ScriptCompiler::with_root(dir.path());
    compiler.set_global_variable("tint", "ember_red");
    let defs = compile_defs(&mut compiler, "tinted.pu");

    let tinted = &defs[0];
    assert_eq!(
        tinted.property("material").unwrap().values[0],
        Value::Str("ember_red".to_string())
    );
    assert_eq!(
        tinted.property("fallback").unwrap().values[0],
        Value::Str("$unset".to_string())
    );
}

// =============================================================================
// Test 8: Compile errors carry the offending file and line
// =============================================================================

#[test]
fn errors_point_at_the_offending_line() {
    let dir = tempfile::tempdir().unwrap();
    write_script(
        dir.path(),
        "broken.pu",
        "system ok { rate 1 }\nsystem bad {\n",
    );

    let mut compiler = ScriptCompiler::with_root(dir.path());
    let err = compiler.compile("broken.pu").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Parse);
    assert_eq!(err.file, "broken.pu");
    assert_eq!(err.line, 2);

    // The failed file must not be cached.
    write_script(dir.path(), "broken.pu", "system ok { rate 1 }\n");
    assert!(compiler.compile("broken.pu").unwrap().first_compile);
}
