// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=CODESCAN_VERSION");

    // Packagers can pin the version explicitly
    let version = std::env::var("CODESCAN_VERSION").unwrap_or_else(|_| describe_version());

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// Version string derived from `git describe`
///
/// "v0.1.0" on a tag becomes "0.1.0", anything else keeps the describe
/// suffix so dev builds stay distinguishable.
fn describe_version() -> String {
    let described = git(&["describe", "--tags", "--always", "--match", "v*"])
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    described
        .strip_prefix('v')
        .map(str::to_string)
        .unwrap_or(described)
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
