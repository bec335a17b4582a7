// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Mirrors the derive definitions in src/cli.rs for man page rendering
fn build_cli() -> Command {
    Command::new("rombuilder")
        .version(env!("CARGO_PKG_VERSION"))
        .author("rombuilder contributors")
        .about("Build MiSTer arcade ROM images from MAME zip archives")
        .arg(
            Arg::new("archives")
                .value_name("ARCHIVES")
                .num_args(0..)
                .help("MAME zip archives to build ROM images from"),
        )
        .arg(
            Arg::new("update_definitions")
                .short('u')
                .long("update-definitions")
                .action(ArgAction::SetTrue)
                .help("Refresh ROM definitions from the registry before anything else"),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .value_name("FILTER")
                .num_args(0..=1)
                .help("List known ROM definitions, optionally filtered"),
        )
        .arg(
            Arg::new("output_dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .default_value(".")
                .help("Directory to write ROM images to"),
        )
        .arg(
            Arg::new("definitions")
                .long("definitions")
                .value_name("PATH")
                .help("Path to the definition snapshot (overrides the config file)"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .help("Path to the config file"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
        .arg(
            Arg::new("completions")
                .long("completions")
                .value_name("SHELL")
                .help("Print shell completions and exit"),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("rombuilder.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
