use std::env;
use std::path::PathBuf;

use tvmagic_bundle::{generate, scan};

const TEMPLATE_ROOTS: &[&str] = &["layout", "pages"];
const FILE_ROOTS: &[&str] = &["static"];
const META_TEMPLATE: &str = "bundle.rs.tmpl";

/// Renders `OUT_DIR/bundle.rs` from the web sources whenever they are
/// present, so the default test build compiles the generated table too.
/// Only the `embedded` feature links it into the library.
fn main() {
    println!("cargo::rustc-check-cfg=cfg(bundle_generated)");
    println!("cargo:rerun-if-env-changed=TVMAGIC_WEB_DIR");
    let embedded = env::var_os("CARGO_FEATURE_EMBEDDED").is_some();

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("manifest dir"));
    let web_dir = env::var_os("TVMAGIC_WEB_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| manifest_dir.join("../../web"));
    println!("cargo:rerun-if-changed={}", web_dir.display());
    let source = web_dir.join(META_TEMPLATE);
    if !source.exists() {
        if embedded {
            panic!("missing web sources at {}", web_dir.display());
        }
        return;
    }

    let templates: Vec<String> = TEMPLATE_ROOTS.iter().map(|root| root.to_string()).collect();
    let files: Vec<String> = FILE_ROOTS.iter().map(|root| root.to_string()).collect();
    let manifest = scan(&web_dir, &templates, &files);
    for issue in &manifest.issues {
        println!("cargo:warning=skipped {}: {}", issue.path, issue.message);
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR"));
    let target = out_dir.join("bundle.rs");
    match generate(&manifest, &source, &target) {
        Ok(()) => {
            println!("cargo:rustc-cfg=bundle_generated");
            println!("cargo:rustc-env=TVMAGIC_BUNDLE_WEB_DIR={}", web_dir.display());
        }
        Err(err) if embedded => panic!("failed to generate {}: {}", target.display(), err),
        Err(err) => println!("cargo:warning=bundle not generated: {err}"),
    }

    println!("cargo:rerun-if-changed={}", source.display());
    for root in TEMPLATE_ROOTS.iter().chain(FILE_ROOTS) {
        println!("cargo:rerun-if-changed={}", web_dir.join(root).display());
    }
    for alias in manifest.templates.keys() {
        println!("cargo:rerun-if-changed={}", web_dir.join(alias).display());
    }
    for path in manifest.files.keys() {
        println!(
            "cargo:rerun-if-changed={}",
            web_dir.join("static").join(path.trim_start_matches('/')).display()
        );
    }
}
