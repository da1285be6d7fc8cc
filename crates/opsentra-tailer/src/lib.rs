//! File Tailer (C2) and Record Builder (C3): follow a discovered source
//! across rotation and truncation, and turn each raw line into a
//! structured `LogRecord`.

mod builder;
mod file_watcher;
mod tailer;

pub use builder::build;
pub use file_watcher::{FileWatcher, ReadFrom, RotationCheck};
pub use tailer::{run, TailError};
