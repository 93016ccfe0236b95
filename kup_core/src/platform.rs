/// Resolved `{os, arch}` pair used to build download URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    /// Resolve the effective platform from the running host and the
    /// configured architecture. `"auto"` normalizes the host architecture;
    /// any explicit value passes through unchanged.
    pub fn resolve(arch_setting: &str) -> Self {
        let arch = if arch_setting == "auto" {
            normalize_arch(std::env::consts::ARCH)
        } else {
            arch_setting.to_string()
        };

        Self {
            os: host_os().to_string(),
            arch,
        }
    }
}

/// Map vendor synonyms onto the names release artifacts use. Values we don't
/// recognize pass through unchanged.
pub fn normalize_arch(raw: &str) -> String {
    match raw {
        "amd64" | "x86_64" => "amd64".to_string(),
        "arm64" | "aarch64" => "arm64".to_string(),
        other => other.to_string(),
    }
}

/// The host OS under the name download URLs expect ("darwin", not "macos").
pub fn host_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}
