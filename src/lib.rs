//! dockerdmon - container-engine daemon supervisor
//!
//! Supervises the single long-running `dockerd` process on an embedded
//! device: resolves its startup configuration from the device parameters,
//! launches it with derived arguments, and restarts it whenever a watched
//! parameter changes. Shutdown is graceful-then-forceful, and exactly one
//! daemon instance runs at any time.

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod launcher;
pub mod params;
pub mod settings;
pub mod supervisor;
