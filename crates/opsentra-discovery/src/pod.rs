//! Pod log tree discovery (spec §4.1): `<root>/<namespace>/<pod>/<container>.log`.

use std::path::Path;

use opsentra_core::SourceType;
use tracing::warn;

use crate::source::SourceDescriptor;

pub fn discover(root: &Path) -> Vec<SourceDescriptor> {
    let mut out = Vec::new();

    let namespaces = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(component = "discoverer", source_kind = "pod", root = %root.display(), error = %err, "failed to read pod log root");
            return out;
        }
    };

    for ns_entry in namespaces.flatten() {
        let ns_dir = ns_entry.path();
        if !ns_dir.is_dir() {
            continue;
        }
        let namespace = match ns_dir.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => continue,
        };

        let pods = match std::fs::read_dir(&ns_dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(component = "discoverer", source_kind = "pod", namespace = %namespace, error = %err, "failed to read namespace directory");
                continue;
            }
        };

        for pod_entry in pods.flatten() {
            let pod_dir = pod_entry.path();
            if !pod_dir.is_dir() {
                continue;
            }
            let pod_name = match pod_dir.file_name().and_then(|n| n.to_str()) {
                Some(n) => n.to_string(),
                None => continue,
            };

            let containers = match std::fs::read_dir(&pod_dir) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(component = "discoverer", source_kind = "pod", pod = %pod_name, error = %err, "failed to read pod directory");
                    continue;
                }
            };

            for container_entry in containers.flatten() {
                let log_path = container_entry.path();
                if log_path.extension().and_then(|e| e.to_str()) != Some("log") {
                    continue;
                }
                let container = log_path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("unknown")
                    .to_string();

                out.push(
                    SourceDescriptor::new(log_path, SourceType::Pod, format!("k8s-{pod_name}"))
                        .with_metadata("namespace", namespace.clone())
                        .with_metadata("pod", pod_name.clone())
                        .with_metadata("container", container),
                );
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn derives_service_and_metadata_from_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let container_dir = tmp.path().join("default").join("web-7f8");
        fs::create_dir_all(&container_dir).unwrap();
        fs::write(container_dir.join("app.log"), "hello\n").unwrap();

        let found = discover(tmp.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].service, "k8s-web-7f8");
        assert_eq!(found[0].aux_metadata.get("namespace").unwrap(), "default");
        assert_eq!(found[0].aux_metadata.get("pod").unwrap(), "web-7f8");
        assert_eq!(found[0].aux_metadata.get("container").unwrap(), "app");
    }
}
