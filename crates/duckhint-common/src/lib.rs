//! Shared plumbing for the duckhint inference engine.
//!
//! - [`span`]: file interning and source locations attached to IR nodes
//! - [`config`]: engine configuration loaded from TOML

pub mod config;
pub mod span;

pub use config::{ConfigError, InferConfig};
pub use span::{FileId, FileTable, SourceLoc};
