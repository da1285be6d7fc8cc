use std::path::PathBuf;

/// Discovery inputs (spec §4.1, §6 Shipper configuration surface).
#[derive(Debug, Clone, Default)]
pub struct DiscoveryConfig {
    pub log_path_globs: Vec<String>,
    pub custom_paths: Vec<PathBuf>,
    pub container_enabled: bool,
    pub container_root: Option<PathBuf>,
    pub pod_enabled: bool,
    pub pod_root: Option<PathBuf>,
    pub ci_enabled: bool,
    pub ci_roots: Vec<PathBuf>,
}
