pub mod action;
pub mod asset;
pub mod branch;
pub mod context;
pub mod cursor;
pub mod engine;
pub mod graph;
pub mod invocation;
pub mod library;
pub mod presenter;
pub mod registry;
pub mod snapshot;
pub mod storage;
pub mod syscall;
