//! Source Discoverer (C1): enumerates and classifies log sources from
//! filesystem roots at shipper startup (spec §4.1).
//!
//! Discovery is performed once. A failure in one source type (a bad glob,
//! an unreadable container root) does not abort discovery of the others —
//! each `discover_*` function degrades to an empty result and logs a
//! structured warning rather than propagating an error.

mod ci;
mod config;
mod container;
mod generic;
mod pod;
mod service_name;
mod source;

pub use config::DiscoveryConfig;
pub use source::SourceDescriptor;

/// Run all enabled discovery strategies and return the flattened set of
/// sources. Never fails: a misconfigured source type simply contributes no
/// descriptors.
pub fn discover_all(config: &DiscoveryConfig) -> Vec<SourceDescriptor> {
    let mut sources = generic::discover(&config.log_path_globs);
    sources.extend(generic::discover_custom(&config.custom_paths));

    if config.container_enabled {
        if let Some(root) = &config.container_root {
            sources.extend(container::discover(root));
        }
    }

    if config.pod_enabled {
        if let Some(root) = &config.pod_root {
            sources.extend(pod::discover(root));
        }
    }

    if config.ci_enabled && !config.ci_roots.is_empty() {
        sources.extend(ci::discover(&config.ci_roots));
    }

    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discover_all_combines_enabled_sources() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("app.log"), "hi\n").unwrap();
        let pattern = tmp.path().join("*.log").to_str().unwrap().to_string();

        let config = DiscoveryConfig {
            log_path_globs: vec![pattern],
            ..Default::default()
        };

        let found = discover_all(&config);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn disabled_source_types_are_skipped() {
        let config = DiscoveryConfig {
            container_enabled: false,
            pod_enabled: false,
            ci_enabled: false,
            ..Default::default()
        };
        assert!(discover_all(&config).is_empty());
    }
}
