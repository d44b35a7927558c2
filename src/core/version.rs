//! Build metadata and plugin API version accessors.
//! The generated version.rs from the build script is included here so there is a
//! single source of truth for the host and the catalog.

include!(concat!(env!("OUT_DIR"), "/version.rs"));

const FALLBACK_API_VERSION: u32 = 20261018;

/// Plugin API version (`YYYYMMDD`) this host was built against.
pub fn get_api_version() -> u32 {
    PLUGIN_API_VERSION.parse().unwrap_or(FALLBACK_API_VERSION)
}

/// Major component of an API version (the year)
fn api_major(api_version: u32) -> u32 {
    api_version / 10000
}

/// A plugin built against `plugin_api_version` can be hosted when it shares the
/// host's major (year) component.
pub fn is_api_compatible(host_api_version: u32, plugin_api_version: u32) -> bool {
    api_major(host_api_version) == api_major(plugin_api_version)
}

/// Build time string from the build script (UTC)
pub fn build_time() -> &'static str {
    BUILD_TIME
}

/// Short git hash captured by the build script
pub fn git_hash() -> &'static str {
    GIT_HASH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_major_is_year() {
        assert_eq!(api_major(20261018), 2026);
        assert_eq!(api_major(20250101), 2025);
    }

    #[test]
    fn test_compatibility_by_year() {
        assert!(is_api_compatible(20261018, 20260101));
        assert!(!is_api_compatible(20261018, 20251231));
    }

    #[test]
    fn test_host_api_version_is_sane() {
        assert!(get_api_version() >= 20000101);
    }
}
