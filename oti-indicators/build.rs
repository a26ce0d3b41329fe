//! Stamps the binary with the revision, build time and cargo profile that
//! oti-indicators reports when it starts.

use std::process::Command;

const UNKNOWN: &str = "unknown";

fn main() {
    emit("GIT_HASH", &revision().unwrap_or_else(|| UNKNOWN.into()));
    emit("BUILD_TIMESTAMP", &chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string());
    emit("BUILD_PROFILE", &std::env::var("PROFILE").unwrap_or_else(|_| UNKNOWN.into()));

    // Re-stamp when the checked-out commit moves
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Short commit id, with a `+dirty` suffix for uncommitted changes
fn revision() -> Option<String> {
    let hash = git(&["rev-parse", "--short=10", "HEAD"])?;
    let dirty = git(&["status", "--porcelain", "--untracked-files=no"])
        .map(|status| !status.is_empty())
        .unwrap_or(false);
    Some(if dirty { format!("{}+dirty", hash) } else { hash })
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|out| out.trim().to_string())
}

fn emit(key: &str, value: &str) {
    println!("cargo:rustc-env={}={}", key, value);
}
