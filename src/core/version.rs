//! Build metadata accessors
//!
//! Includes the version.rs generated by the build script so there is a single
//! source of truth for the build time and git revision.

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// Build time string from the build script (UTC)
pub fn build_time() -> &'static str {
    BUILD_TIME
}

/// Short git hash captured by the build script
pub fn git_hash() -> &'static str {
    GIT_HASH
}

/// `0.1.0 (abc1234, built 2025-01-01 00:00:00 UTC)`
pub fn long_version() -> String {
    format!(
        "{} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        GIT_HASH,
        BUILD_TIME
    )
}
