//! Service-name derivation for generic files (spec §4.1).

use std::path::Path;

const KNOWN_LOG_EXTENSIONS: &[&str] = &["log", "txt", "out", "err"];

/// Basenames containing these substrings map to the paired canonical
/// service name, checked in this fixed order. Not extended beyond what
/// spec.md §4.1 names.
const WELL_KNOWN: &[(&str, &str)] = &[
    ("nginx", "nginx"),
    ("apache", "apache"),
    ("mysql", "mysql"),
    ("postgres", "postgres"),
    ("redis", "redis"),
    ("mongo", "mongodb"),
];

/// Derive a service name from a generic log file path.
///
/// The last path segment has any known log extension stripped; if the
/// resulting stem contains a well-known basename substring, the canonical
/// name is returned instead of the raw stem.
pub fn derive(path: &Path) -> String {
    let stem = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");

    let mut stem = stem.to_string();
    for ext in KNOWN_LOG_EXTENSIONS {
        let suffix = format!(".{ext}");
        if let Some(stripped) = stem.strip_suffix(&suffix) {
            stem = stripped.to_string();
            break;
        }
    }

    let lower = stem.to_ascii_lowercase();
    for (needle, canonical) in WELL_KNOWN {
        if lower.contains(needle) {
            return (*canonical).to_string();
        }
    }

    stem
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn strips_known_extension() {
        assert_eq!(derive(&PathBuf::from("/var/log/app.log")), "app");
    }

    #[test]
    fn maps_well_known_basenames() {
        assert_eq!(derive(&PathBuf::from("/var/log/nginx/error.log")), "nginx");
        assert_eq!(derive(&PathBuf::from("/var/log/mysql-slow.log")), "mysql");
        assert_eq!(derive(&PathBuf::from("/var/log/mongod.log")), "mongodb");
    }

    #[test]
    fn falls_back_to_stem_for_unknown_service() {
        assert_eq!(derive(&PathBuf::from("/var/log/widget.log")), "widget");
    }
}
