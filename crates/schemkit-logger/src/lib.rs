pub mod log;
pub mod severity;
pub mod time;

pub use log::{ConsoleLogger, Logger, MemoryLogger, NullLogger};
pub use severity::LogSeverity;
