//! Generic glob-based file discovery (spec §4.1) plus operator-specified
//! custom paths.

use std::path::{Path, PathBuf};

use opsentra_core::SourceType;
use tracing::warn;

use crate::service_name;
use crate::source::SourceDescriptor;

fn is_readable(path: &Path) -> bool {
    std::fs::File::open(path).is_ok()
}

pub fn discover(patterns: &[String]) -> Vec<SourceDescriptor> {
    let mut out = Vec::new();

    for pattern in patterns {
        let paths = match glob::glob(pattern) {
            Ok(paths) => paths,
            Err(err) => {
                warn!(component = "discoverer", source_kind = "system", pattern = %pattern, error = %err, "invalid glob pattern");
                continue;
            }
        };

        for entry in paths {
            match entry {
                Ok(path) => {
                    if !is_readable(&path) {
                        warn!(component = "discoverer", source_kind = "system", path = %path.display(), "skipping unreadable path");
                        continue;
                    }
                    let service = service_name::derive(&path);
                    out.push(SourceDescriptor::new(path, SourceType::System, service));
                }
                Err(err) => {
                    warn!(component = "discoverer", source_kind = "system", pattern = %pattern, error = %err, "error expanding glob pattern");
                }
            }
        }
    }

    out
}

/// Operator-specified custom paths, not subject to glob expansion.
pub fn discover_custom(paths: &[PathBuf]) -> Vec<SourceDescriptor> {
    paths
        .iter()
        .filter(|path| {
            let ok = is_readable(path);
            if !ok {
                warn!(component = "discoverer", source_kind = "custom", path = %path.display(), "skipping unreadable custom path");
            }
            ok
        })
        .map(|path| SourceDescriptor::new(path.clone(), SourceType::Custom, service_name::derive(path)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovers_matching_files_and_skips_unreadable() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("app.log"), "hello\n").unwrap();
        let pattern = tmp.path().join("*.log").to_str().unwrap().to_string();

        let found = discover(&[pattern]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].service, "app");
    }
}
