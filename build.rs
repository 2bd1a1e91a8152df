// Build script for flutter_rust_bridge code generation
//
// flutter_rust_bridge v2 code generation is run via the CLI tool:
//   flutter_rust_bridge_codegen generate
//
// The generated Dart bindings expose the functions in src/api.rs to the host
// application. Codegen is not invoked from here; run it manually or from the
// Flutter build pipeline. Once it has written src/frb_generated.rs, the
// `frb_generated` cfg switches on the StreamSink entry points that depend on
// the generated glue.

use std::path::Path;

const GENERATED_GLUE: &str = "src/frb_generated.rs";

fn main() {
    // Tell cargo to rerun this build script if api.rs changes
    println!("cargo:rerun-if-changed=src/api.rs");
    println!("cargo:rerun-if-changed={}", GENERATED_GLUE);

    if Path::new(GENERATED_GLUE).exists() {
        println!("cargo:rustc-cfg=frb_generated");
    }
}
