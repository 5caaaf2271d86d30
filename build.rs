// build.rs - record the compiler version for `--version`
use std::env;
use std::process::Command;

/// Ask the active compiler for its version line, e.g. "rustc 1.80.0 (051478957 2024-07-21)"
fn rustc_version() -> Option<String> {
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());

    Command::new(rustc)
        .arg("--version")
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| {
            let version = String::from_utf8_lossy(&output.stdout);
            version.split_whitespace().nth(1).map(|v| format!("rustc {}", v))
        })
}

fn main() {
    println!("cargo:rerun-if-env-changed=RUSTC");

    let version = rustc_version().unwrap_or_else(|| {
        println!("cargo:warning=Unable to determine rustc version");
        "rustc unknown".to_string()
    });

    println!("cargo:rustc-env=GATEKEEPER_RUSTC_VERSION={}", version);
}
