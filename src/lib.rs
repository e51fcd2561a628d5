//! Runtime for ActionLists: graphs of discrete action nodes that are walked by
//! resumable, skippable cursors under an externally driven tick.

pub mod actions;
pub mod compiler;
pub mod config;
pub mod dsl;
pub mod error;
pub mod expr;
pub mod nodes;
pub mod runtime;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use runtime::engine::Engine;
