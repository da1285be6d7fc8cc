//! Container-runtime log discovery (spec §4.1).
//!
//! Enumerates the per-container log root (one subdirectory per container
//! id) and reads an adjacent container-config document to derive a
//! friendly service name from `image`/`name`, falling back to
//! `container-<first-12-chars-of-id>`.

use std::path::Path;

use opsentra_core::SourceType;
use serde::Deserialize;
use tracing::warn;

use crate::source::SourceDescriptor;

#[derive(Debug, Deserialize, Default)]
struct ContainerConfig {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default, rename = "Config")]
    config: Option<InnerConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct InnerConfig {
    #[serde(default)]
    image: Option<String>,
}

fn friendly_name(container_id: &str, config: Option<&ContainerConfig>) -> String {
    if let Some(cfg) = config {
        if let Some(name) = cfg.name.as_deref().filter(|n| !n.is_empty()) {
            return name.trim_start_matches('/').to_string();
        }
        if let Some(image) = cfg.image.as_deref().or(cfg.config.as_ref().and_then(|c| c.image.as_deref())) {
            if !image.is_empty() {
                return image.to_string();
            }
        }
    }
    let short = &container_id[..container_id.len().min(12)];
    format!("container-{short}")
}

/// Walk `<root>/<container-id>/` directories, one per running container.
pub fn discover(root: &Path) -> Vec<SourceDescriptor> {
    let mut out = Vec::new();
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(component = "discoverer", source_kind = "container", root = %root.display(), error = %err, "failed to read container log root");
            return out;
        }
    };

    for entry in entries.flatten() {
        let container_dir = entry.path();
        if !container_dir.is_dir() {
            continue;
        }
        let container_id = match container_dir.file_name().and_then(|n| n.to_str()) {
            Some(id) => id.to_string(),
            None => continue,
        };

        let log_path = find_log_file(&container_dir, &container_id);
        let log_path = match log_path {
            Some(p) => p,
            None => continue,
        };

        let config = std::fs::read_to_string(container_dir.join("config.v2.json"))
            .ok()
            .and_then(|s| serde_json::from_str::<ContainerConfig>(&s).ok());

        let service = friendly_name(&container_id, config.as_ref());

        out.push(
            SourceDescriptor::new(log_path, SourceType::Container, service)
                .with_metadata("containerId", container_id),
        );
    }

    out
}

fn find_log_file(container_dir: &Path, container_id: &str) -> Option<std::path::PathBuf> {
    let conventional = container_dir.join(format!("{container_id}-json.log"));
    if conventional.is_file() {
        return Some(conventional);
    }
    std::fs::read_dir(container_dir)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .find(|p| p.extension().and_then(|e| e.to_str()) == Some("log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn falls_back_to_id_prefix_without_config() {
        let tmp = tempfile::tempdir().unwrap();
        let container_dir = tmp.path().join("abc123def456ghijk");
        fs::create_dir_all(&container_dir).unwrap();
        fs::write(
            container_dir.join("abc123def456ghijk-json.log"),
            "{}\n",
        )
        .unwrap();

        let found = discover(tmp.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].service, "container-abc123def456");
        assert_eq!(
            found[0].aux_metadata.get("containerId").map(String::as_str),
            Some("abc123def456ghijk")
        );
    }

    #[test]
    fn uses_name_from_config_when_present() {
        let tmp = tempfile::tempdir().unwrap();
        let container_dir = tmp.path().join("abc123def456ghijk");
        fs::create_dir_all(&container_dir).unwrap();
        fs::write(container_dir.join("abc123def456ghijk-json.log"), "{}\n").unwrap();
        fs::write(
            container_dir.join("config.v2.json"),
            r#"{"name":"/my-app","Config":{"image":"my-app:latest"}}"#,
        )
        .unwrap();

        let found = discover(tmp.path());
        assert_eq!(found[0].service, "my-app");
    }
}
