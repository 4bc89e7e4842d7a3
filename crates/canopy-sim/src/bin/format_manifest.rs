//! Prints the static description of all built-in formats as JSON.
//!
//! Build-time artifact for external tooling; not part of the runtime
//! protocol.

use canopy_wrapper::builtin_registry;

fn main() {
    let manifest = builtin_registry().manifest();
    println!(
        "{}",
        serde_json::to_string_pretty(&manifest).expect("manifest is always serializable")
    );
}
