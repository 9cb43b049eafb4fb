//! trawler: a phase-ordered task execution engine.
//!
//! Entries flow through a fixed phase pipeline (`input` through `exit`)
//! where registered plugins accept, reject, fail, or transform them.
//! Tasks are isolated from each other, rerunnable up to a cap, and
//! cooperatively abortable with guaranteed cleanup.

pub mod config;
pub mod dispatch;
pub mod entry;
pub mod errors;
pub mod phase;
pub mod plugins;
pub mod registry;
pub mod resolver;
pub mod task;
