//! Compile-time build information.
//!
//! [`App`](crate::App) uses [`version_short`] as its default `--version`
//! string; [`version_info`] gives the long form for `version` commands.

#[cfg(feature = "build-info")]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Multi-line version report.
///
/// ```text
/// argbind 0.3.0 (x86_64-unknown-linux-gnu)
/// Built: Fri, 16 Oct 2026 09:12:44 +0000
/// Commit: a1b2c3d
/// Rustc: rustc 1.82.0
/// ```
#[cfg(feature = "build-info")]
pub fn version_info() -> String {
    format!(
        "{} {} ({})\nBuilt: {}\nCommit: {}\nRustc: {}",
        built_info::PKG_NAME,
        built_info::PKG_VERSION,
        built_info::TARGET,
        built_info::BUILT_TIME_UTC,
        git_commit().unwrap_or("unknown"),
        built_info::RUSTC_VERSION
    )
}

/// Package version only.
#[cfg(feature = "build-info")]
pub fn version_short() -> &'static str {
    built_info::PKG_VERSION
}

#[cfg(feature = "build-info")]
pub fn package_name() -> &'static str {
    built_info::PKG_NAME
}

/// Short commit hash, when built from a git checkout.
#[cfg(feature = "build-info")]
pub fn git_commit() -> Option<&'static str> {
    built_info::GIT_COMMIT_HASH_SHORT
}

#[cfg(not(feature = "build-info"))]
pub fn version_info() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

#[cfg(not(feature = "build-info"))]
pub fn version_short() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(not(feature = "build-info"))]
pub fn package_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}
