use std::env;
use std::process::Command;

// Build metadata for `leasex --version`. Source tarballs without a git
// checkout can pass LEASEX_BUILD_COMMIT instead.
fn main() {
    println!("cargo:rerun-if-env-changed=LEASEX_BUILD_COMMIT");
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/index");

    let commit = env::var("LEASEX_BUILD_COMMIT")
        .ok()
        .or_else(describe_head)
        .unwrap_or_else(|| "unknown".into());
    println!("cargo:rustc-env=LEASEX_COMMIT={commit}");

    // TARGET is only visible to build scripts; forward it to the binary.
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".into());
    println!("cargo:rustc-env=LEASEX_TARGET={target}");
}

/// Short hash of HEAD, suffixed `-dirty` when the tree has local edits.
fn describe_head() -> Option<String> {
    let out = Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=7", "--exclude=*"])
        .output()
        .ok()?;
    let text = String::from_utf8(out.stdout).ok()?;
    let text = text.trim();
    (out.status.success() && !text.is_empty()).then(|| text.to_string())
}
