//! Level extraction (spec §4.3, §9 "document the exact ordered regex list").
//!
//! Three primary patterns are tried in this fixed order against the whole
//! line; the first one that matches anywhere wins. If none match, a
//! secondary word-scan heuristic runs with its own fixed priority order.
//! Neither list is extended beyond what spec.md names.

use std::sync::LazyLock;

use regex::Regex;

use crate::record::Level;

const LEVEL_ALT: &str = "error|warn|warning|info|debug|trace|fatal|critical";

/// `[LEVEL]`
static BRACKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)\[({LEVEL_ALT})\]")).unwrap());

/// `LEVEL:`
static COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)\b({LEVEL_ALT}):")).unwrap());

/// A leading ISO-like date followed by LEVEL, e.g. `2025-09-17 10:30:00 INFO: ...`
static DATE_PREFIXED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^\d{{4}}-\d{{2}}-\d{{2}}[T ]\d{{2}}:\d{{2}}:\d{{2}}(?:\.\d+)?(?:Z|[+-]\d{{2}}:?\d{{2}})?\s+({LEVEL_ALT})\b"
    ))
    .unwrap()
});

/// Secondary heuristic word categories, tried in this priority order.
static ERROR_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(error|err|fatal|critical)\b").unwrap());
static WARN_WORDS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\b(warn|warning)\b").unwrap());
static INFO_WORDS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\binfo\b").unwrap());
static DEBUG_WORDS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\b(debug|trace)\b").unwrap());

fn normalize(token: &str) -> Level {
    match token.to_ascii_lowercase().as_str() {
        "error" | "critical" | "err" => Level::Error,
        "warn" | "warning" => Level::Warn,
        "info" => Level::Info,
        "debug" => Level::Debug,
        "trace" => Level::Trace,
        "fatal" => Level::Fatal,
        _ => Level::Info,
    }
}

/// Extract the severity level from a raw log line.
///
/// Pure function: `extract(line)` always yields the same `Level` for the
/// same `line` (spec.md §8, "level extraction idempotence").
pub fn extract(line: &str) -> Level {
    for re in [&*BRACKET, &*COLON, &*DATE_PREFIXED] {
        if let Some(caps) = re.captures(line) {
            return normalize(&caps[1]);
        }
    }

    if ERROR_WORDS.is_match(line) {
        Level::Error
    } else if WARN_WORDS.is_match(line) {
        Level::Warn
    } else if INFO_WORDS.is_match(line) {
        Level::Info
    } else if DEBUG_WORDS.is_match(line) {
        Level::Debug
    } else {
        Level::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracket_form() {
        assert_eq!(extract("[ERROR] upstream timed out"), Level::Error);
        assert_eq!(extract("[warn] disk almost full"), Level::Warn);
    }

    #[test]
    fn colon_form() {
        assert_eq!(extract("INFO: starting worker"), Level::Info);
        assert_eq!(extract("FATAL: core dumped"), Level::Fatal);
    }

    #[test]
    fn date_prefixed_form() {
        assert_eq!(
            extract("2025-09-17 10:30:00 INFO: starting worker"),
            Level::Info
        );
        assert_eq!(
            extract("2025-09-17T10:30:00Z ERROR connection refused"),
            Level::Error
        );
    }

    #[test]
    fn secondary_heuristic_priority() {
        assert_eq!(extract("something went wrong, error encountered"), Level::Error);
        assert_eq!(extract("warning: low memory"), Level::Warn);
        assert_eq!(extract("plain info message here"), Level::Info);
        assert_eq!(extract("debug trace output"), Level::Debug);
    }

    #[test]
    fn defaults_to_info_with_no_signal() {
        assert_eq!(extract("just a regular line of text"), Level::Info);
    }

    #[test]
    fn is_pure() {
        let line = "[WARN] disk 90% full";
        assert_eq!(extract(line), extract(line));
    }
}
