use std::path::Path;

use crate::platform::Platform;

// Release pins for tools whose "latest" URL requires a metadata round-trip.
// The displayed shell command still resolves the latest version at run time.
const KUBECTL_VERSION: &str = "v1.29.0";
const KIND_VERSION: &str = "v0.20.0";

/// Closed set of installable tools. Adding a tool means adding a variant
/// here plus one descriptor in [`all_tools`]; the engines need no change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Kubectl,
    K9s,
    Kind,
}

/// What the downloaded artifact is, which selects the placement strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// The payload is the binary itself.
    Binary,
    /// The payload is a gzip+tar archive containing the binary as `entry`.
    TarGz { entry: &'static str },
}

/// Optional hook run after the binary is in place. A failure here is a
/// warning, not a rollback.
pub type PostInstall = fn(&Path) -> Result<(), String>;

/// Immutable descriptor of one installable tool.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ToolKind,
    pub artifact: ArtifactKind,
    pub explanation: &'static str,
    pub post_install: Option<PostInstall>,
}

/// A descriptor resolved against a concrete platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub url: String,
    pub command: String,
}

impl ToolSpec {
    /// Direct download URL for this tool on the given platform.
    pub fn download_url(&self, platform: &Platform) -> String {
        let (os, arch) = (platform.os.as_str(), platform.arch.as_str());
        match self.kind {
            ToolKind::Kubectl => {
                format!("https://dl.k8s.io/release/{KUBECTL_VERSION}/bin/{os}/{arch}/kubectl")
            }
            ToolKind::K9s => {
                format!(
                    "https://github.com/derailed/k9s/releases/latest/download/k9s_{}_{arch}.tar.gz",
                    k9s_os_label(os)
                )
            }
            ToolKind::Kind => {
                format!("https://kind.sigs.k8s.io/dl/{KIND_VERSION}/kind-{os}-{arch}")
            }
        }
    }

    /// Equivalent shell command, shown in the confirmation dialog and as a
    /// manual fallback when an install fails.
    pub fn manual_command(&self, platform: &Platform, bin_dir: &Path) -> String {
        let (os, arch) = (platform.os.as_str(), platform.arch.as_str());
        let bin = bin_dir.display();
        match self.kind {
            ToolKind::Kubectl => format!(
                "curl -LO \"https://dl.k8s.io/release/$(curl -L -s https://dl.k8s.io/release/stable.txt)/bin/{os}/{arch}/kubectl\" && \\\n\
                 chmod +x kubectl && \\\n\
                 mv kubectl {bin}/kubectl"
            ),
            ToolKind::K9s => {
                let os = k9s_os_label(os);
                format!(
                    "curl -LO \"https://github.com/derailed/k9s/releases/latest/download/k9s_{os}_{arch}.tar.gz\" && \\\n\
                     tar -xzf k9s_{os}_{arch}.tar.gz k9s && \\\n\
                     chmod +x k9s && \\\n\
                     mv k9s {bin}/k9s && \\\n\
                     rm k9s_{os}_{arch}.tar.gz"
                )
            }
            ToolKind::Kind => format!(
                "curl -Lo kind \"https://kind.sigs.k8s.io/dl/latest/kind-{os}-{arch}\" && \\\n\
                 chmod +x kind && \\\n\
                 mv kind {bin}/kind"
            ),
        }
    }
}

// k9s release assets title-case the OS segment.
fn k9s_os_label(os: &str) -> &str {
    match os {
        "darwin" => "Darwin",
        "linux" => "Linux",
        other => other,
    }
}

/// Resolve a descriptor against a platform and install directory.
pub fn resolve(tool: &ToolSpec, platform: &Platform, bin_dir: &Path) -> Resolved {
    Resolved {
        url: tool.download_url(platform),
        command: tool.manual_command(platform, bin_dir),
    }
}

/// All installable tools, in display order.
pub fn all_tools() -> Vec<ToolSpec> {
    vec![kubectl(), k9s(), kind()]
}

pub fn kubectl() -> ToolSpec {
    ToolSpec {
        name: "kubectl",
        description: "Kubernetes command-line tool for running commands against clusters",
        kind: ToolKind::Kubectl,
        artifact: ArtifactKind::Binary,
        explanation: "This command will:\n\
                      1. Fetch the latest stable Kubernetes version number\n\
                      2. Download the kubectl binary for your OS and architecture\n\
                      3. Make it executable (chmod +x)\n\
                      4. Move it to your bin directory",
        post_install: None,
    }
}

pub fn k9s() -> ToolSpec {
    ToolSpec {
        name: "k9s",
        description: "Terminal UI to interact with your Kubernetes clusters",
        kind: ToolKind::K9s,
        artifact: ArtifactKind::TarGz { entry: "k9s" },
        explanation: "This command will:\n\
                      1. Download the latest k9s release archive for your OS and architecture\n\
                      2. Extract the k9s binary from the tar.gz archive\n\
                      3. Make it executable (chmod +x)\n\
                      4. Move it to your bin directory\n\
                      5. Clean up the downloaded archive",
        post_install: None,
    }
}

pub fn kind() -> ToolSpec {
    ToolSpec {
        name: "kind",
        description: "Tool for running local Kubernetes clusters using Docker containers",
        kind: ToolKind::Kind,
        artifact: ArtifactKind::Binary,
        explanation: "This command will:\n\
                      1. Download the latest kind binary for your OS and architecture\n\
                      2. Make it executable (chmod +x)\n\
                      3. Move it to your bin directory",
        post_install: None,
    }
}
