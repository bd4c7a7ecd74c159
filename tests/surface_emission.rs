//! Surface emission integration tests: script source to emitted particles.
//!
//! Each test drives the whole chain: compile a script, materialize the
//! emitter definition, build against a mesh library, then emit.

use ember::emitter::{
    make_box, make_plane, Distribution, MeshData, MeshLibrary, MeshSurfaceEmitter, Particle,
    EMITTER_CLASS,
};
use ember::script::{build_definitions, ScriptCompiler};
use glam::Vec3;

const SEED: u64 = 42;

/// Helper: compile script text and build the first mesh_surface_emitter
/// definition it contains.
fn emitter_from_script(source: &str) -> MeshSurfaceEmitter {
    let mut compiler = ScriptCompiler::new();
    let compiled = compiler
        .compile_source("fx.pu", source)
        .expect("compile failed");
    let roots = compiled.roots;
    let defs = build_definitions(compiler.arena_mut(), &roots);
    let def = defs
        .iter()
        .find_map(|d| d.child_of_class(EMITTER_CLASS))
        .expect("no emitter definition in script");
    MeshSurfaceEmitter::from_def(def).expect("bad emitter definition")
}

/// Helper: emit `count` particles through both hooks.
fn emit(emitter: &mut MeshSurfaceEmitter, count: usize) -> Vec<Particle> {
    (0..count)
        .map(|_| {
            let mut particle = Particle::default();
            assert!(emitter.init_particle_position(&mut particle));
            emitter.init_particle_direction(&mut particle);
            particle
        })
        .collect()
}

/// Helper: a mesh with one tiny triangle on +X and one large on -X.
fn two_island_mesh() -> MeshData {
    let mut mesh = MeshData::new(
        vec![
            [10.0, 0.0, 0.0],
            [10.1, 0.0, 0.0],
            [10.0, 0.0, -0.1],
            [-10.0, 0.0, 0.0],
            [-8.0, 0.0, 0.0],
            [-10.0, 0.0, -2.0],
        ],
        vec![0, 1, 2, 3, 4, 5],
    );
    mesh.normals = Some(vec![[0.0, 1.0, 0.0]; 6]);
    mesh
}

// =============================================================================
// Test 1: Script-defined emitter places particles on the box surface
// =============================================================================

#[test]
fn script_emitter_covers_the_box_surface() {
    let mut emitter = emitter_from_script(
        "system crystals {\n mesh_surface_emitter points {\n mesh_name crystal\n distribution homogeneous\n seed 42\n }\n}",
    );
    let mut library = MeshLibrary::new();
    library.insert("crystal", make_box([2.0, 2.0, 2.0]));
    emitter.build(&library).unwrap();

    for particle in emit(&mut emitter, 300) {
        let p = particle.position;
        let outermost = p.x.abs().max(p.y.abs()).max(p.z.abs());
        assert!(
            (outermost - 1.0).abs() < 1e-5,
            "particle off the box surface: {p:?}"
        );
        // use_normals defaults on, so directions are the face normals.
        assert!((particle.direction.length() - 1.0).abs() < 1e-5);
    }
}

// =============================================================================
// Test 2: Edge mode returns one of the precomputed edge normals, exactly
// =============================================================================

#[test]
fn edge_mode_directions_are_precomputed_edge_normals() {
    let mut mesh = MeshData::new(
        vec![[1.0, 0.0, 1.0], [2.0, 0.0, 1.0], [1.0, 0.0, 2.0]],
        vec![0, 1, 2],
    );
    mesh.normals = Some(vec![[0.0, 1.0, 0.0]; 3]);
    let mut library = MeshLibrary::new();
    library.insert("blade", mesh);

    let mut emitter = MeshSurfaceEmitter::with_seed(SEED);
    emitter.set_distribution(Distribution::Edge);
    emitter.set_mesh("blade", &library).unwrap();

    let tri = *emitter.snapshot().unwrap().triangle(0).unwrap();
    assert_ne!(tri.en1, Vec3::ZERO);
    for particle in emit(&mut emitter, 200) {
        let d = particle.direction;
        assert!(
            d == tri.en1 || d == tri.en2 || d == tri.en3,
            "direction {d:?} is not an edge normal"
        );
    }
}

// =============================================================================
// Test 3: Vertex mode emits from corners only
// =============================================================================

#[test]
fn vertex_mode_emits_corners_only() {
    let mut library = MeshLibrary::new();
    library.insert("plate", make_plane([2.0, 2.0], [1, 1]));

    let mut emitter = MeshSurfaceEmitter::with_seed(SEED);
    emitter.set_distribution(Distribution::Vertex);
    emitter.set_mesh("plate", &library).unwrap();

    for particle in emit(&mut emitter, 100) {
        let p = particle.position;
        assert_eq!(p.x.abs(), 1.0, "x off-corner: {p:?}");
        assert_eq!(p.z.abs(), 1.0, "z off-corner: {p:?}");
        assert_eq!(p.y, 0.0);
    }
}

// =============================================================================
// Test 4: Heterogeneous modes favor opposite ends of the area range
// =============================================================================

#[test]
fn heterogeneous_modes_weight_by_area() {
    let mut library = MeshLibrary::new();
    library.insert("islands", two_island_mesh());

    // Heterogeneous 1: the tiny +X triangle dominates.
    let mut emitter = MeshSurfaceEmitter::with_seed(SEED);
    emitter.set_distribution(Distribution::Heterogeneous1);
    emitter.set_mesh("islands", &library).unwrap();
    let tiny_hits = emit(&mut emitter, 600)
        .iter()
        .filter(|p| p.position.x > 0.0)
        .count();
    assert!(tiny_hits > 500, "tiny triangle hits: {tiny_hits}/600");

    // Heterogeneous 2: the large -X triangle dominates.
    let mut emitter = MeshSurfaceEmitter::with_seed(SEED);
    emitter.set_distribution(Distribution::Heterogeneous2);
    emitter.set_mesh("islands", &library).unwrap();
    let large_hits = emit(&mut emitter, 600)
        .iter()
        .filter(|p| p.position.x < 0.0)
        .count();
    assert!(large_hits > 500, "large triangle hits: {large_hits}/600");
}

// =============================================================================
// Test 5: Rebuilding against an updated library swaps the geometry
// =============================================================================

#[test]
fn rebuild_tracks_library_updates() {
    let mut library = MeshLibrary::new();
    library.insert("stone", make_box([1.0, 1.0, 1.0]));

    let mut emitter = MeshSurfaceEmitter::with_seed(SEED);
    emitter.set_mesh("stone", &library).unwrap();
    assert_eq!(emitter.snapshot().unwrap().triangle_count(), 12);

    library.insert("stone", make_plane([2.0, 2.0], [2, 2]));
    emitter.build(&library).unwrap();
    assert_eq!(emitter.snapshot().unwrap().triangle_count(), 8);
    for particle in emit(&mut emitter, 50) {
        assert_eq!(particle.position.y, 0.0);
        assert!((particle.direction.y - 1.0).abs() < 1e-5);
    }
}

// =============================================================================
// Test 6: The same script and seed reproduce the same particle stream
// =============================================================================

#[test]
fn seeded_scripts_reproduce_particle_streams() {
    let source = "system crystals {\n mesh_surface_emitter points {\n mesh_name crystal\n seed 7\n }\n}";
    let mut library = MeshLibrary::new();
    library.insert("crystal", make_box([2.0, 1.0, 3.0]));

    let mut first = emitter_from_script(source);
    let mut second = emitter_from_script(source);
    first.build(&library).unwrap();
    second.build(&library).unwrap();

    let a = emit(&mut first, 50);
    let b = emit(&mut second, 50);
    assert_eq!(a, b);
}

// =============================================================================
// Test 7: use_normals false leaves particle directions untouched
// =============================================================================

#[test]
fn script_can_disable_normal_directions() {
    let mut emitter = emitter_from_script(
        "system sparks {\n mesh_surface_emitter points {\n mesh_name crystal\n use_normals false\n seed 42\n }\n}",
    );
    let mut library = MeshLibrary::new();
    library.insert("crystal", make_box([1.0, 1.0, 1.0]));
    emitter.build(&library).unwrap();

    let mut particle = Particle::default();
    assert!(emitter.init_particle_position(&mut particle));
    assert!(!emitter.init_particle_direction(&mut particle));
    assert_eq!(particle.direction, Vec3::ZERO);
}
