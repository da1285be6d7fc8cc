//! CI job log discovery (spec §4.1): any configured CI root, `**/*.log`,
//! job identifier derived from the path segment following `jobs/`.

use std::path::{Path, PathBuf};

use opsentra_core::SourceType;
use tracing::warn;

use crate::source::SourceDescriptor;

fn job_id(path: &Path) -> String {
    let components: Vec<&str> = path
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();

    components
        .iter()
        .position(|c| *c == "jobs")
        .and_then(|idx| components.get(idx + 1))
        .map(|s| s.to_string())
        .unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unknown-job")
                .to_string()
        })
}

pub fn discover(roots: &[PathBuf]) -> Vec<SourceDescriptor> {
    let mut out = Vec::new();

    for root in roots {
        let pattern = root.join("**").join("*.log");
        let pattern = match pattern.to_str() {
            Some(p) => p,
            None => continue,
        };

        let paths = match glob::glob(pattern) {
            Ok(paths) => paths,
            Err(err) => {
                warn!(component = "discoverer", source_kind = "ci", root = %root.display(), error = %err, "invalid CI glob pattern");
                continue;
            }
        };

        for entry in paths {
            match entry {
                Ok(path) => {
                    let job = job_id(&path);
                    out.push(
                        SourceDescriptor::new(path, SourceType::Ci, format!("ci-{job}"))
                            .with_metadata("jobName", job),
                    );
                }
                Err(err) => {
                    warn!(component = "discoverer", source_kind = "ci", error = %err, "error walking CI log root");
                }
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
    fn derives_job_name_from_jobs_segment() {
        let tmp = tempfile::tempdir().unwrap();
        let job_dir = tmp.path().join("jobs").join("build-42").join("logs");
        fs::create_dir_all(&job_dir).unwrap();
        fs::write(job_dir.join("output.log"), "running\n").unwrap();

        let found = discover(&[tmp.path().to_path_buf()]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].service, "ci-build-42");
        assert_eq!(found[0].aux_metadata.get("jobName").unwrap(), "build-42");
    }
}
