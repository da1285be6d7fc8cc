//! Shared error taxonomy (spec §7).
//!
//! Every component error implements [`ErrorClass`] so the owning task can
//! decide, without matching on variants by hand, whether to retry with
//! backoff, drop-and-log, or treat the failure as fatal.

/// How a component failure should be handled by its owning task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Broker flap, store timeout, transient object-store 5xx: retry with backoff.
    Transient,
    /// Undecodable message, corrupt line: log and drop, pipeline continues.
    ProtocolViolation,
    /// Missing required config, malformed URL: exit non-zero at startup.
    Fatal,
}

pub trait ErrorClassify {
    fn class(&self) -> ErrorClass;

    fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Fatal
    }
}
