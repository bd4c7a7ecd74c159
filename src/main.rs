//! Compile a particle script and report what it defines.
//!
//! Errors are printed with their file and line; `--dump` prints the
//! materialized definitions as YAML.

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use ember::script::{build_definitions, ScriptCompiler};

#[derive(Parser, Debug)]
#[command(name = "ember", version, about = "Compile particle-effect scripts")]
struct Args {
    /// Script file to compile.
    script: PathBuf,

    /// Print the materialized definitions as YAML.
    #[arg(long)]
    dump: bool,

    /// Directory imports resolve against (defaults to the script's directory).
    #[arg(long)]
    root: Option<PathBuf>,

    /// Seed a global script variable (repeatable).
    #[arg(long = "var", value_name = "NAME=VALUE")]
    vars: Vec<String>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let root = match &args.root {
        Some(root) => root.clone(),
        None => args
            .script
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let Some(name) = script_name(&args.script, &root) else {
        eprintln!("script path is not valid UTF-8: {}", args.script.display());
        process::exit(1);
    };

    let mut compiler = ScriptCompiler::with_root(&root);
    for var in &args.vars {
        match var.split_once('=') {
            Some((name, value)) => compiler.set_global_variable(name, value),
            None => {
                eprintln!("--var expects NAME=VALUE, got '{var}'");
                process::exit(1);
            }
        }
    }

    let compiled = match compiler.compile(&name) {
        Ok(compiled) => compiled,
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    };

    let defs = build_definitions(compiler.arena_mut(), &compiled.roots);
    println!(
        "compiled {name}: {} root(s), {} definition(s)",
        compiled.roots.len(),
        defs.len()
    );

    if args.dump {
        match serde_yaml::to_string(&defs) {
            Ok(yaml) => print!("{yaml}"),
            Err(err) => {
                eprintln!("failed to serialize definitions: {err}");
                process::exit(1);
            }
        }
    }
}

/// Cache key for the script: its path relative to the import root.
fn script_name(script: &Path, root: &Path) -> Option<String> {
    let relative = script.strip_prefix(root).unwrap_or(script);
    relative.to_str().map(str::to_string)
}
