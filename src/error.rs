//! Error types for configuration resolution, daemon launch, and supervision

use std::path::PathBuf;
use std::process::ExitStatus;

/// Errors produced while resolving the daemon's startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The selected storage location cannot be used as a data root.
    #[error("storage at {} is unusable: {reason}", .path.display())]
    StorageInvalid { path: PathBuf, reason: String },

    /// TLS was requested but one or more certificate files are absent.
    /// A partial certificate set never proceeds.
    #[error("cannot start with TLS, missing certificate file(s) under {}: {}", .dir.display(), .missing.join(", "))]
    TlsCertsMissing { dir: PathBuf, missing: Vec<String> },
}

/// Errors produced while launching the daemon process.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// The spawn syscall itself failed.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// The process was spawned but was already dead at the first liveness
    /// probe. A successful spawn only proves fork/exec went through, not
    /// that the program is viable.
    #[error("daemon died immediately after launch ({status})")]
    DiedImmediately { status: ExitStatus },
}

/// Errors produced by the process supervisor itself.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// A required kill signal could not be delivered.
    #[error("failed to send {signal} to daemon (pid {pid}): {source}")]
    SignalSend {
        signal: &'static str,
        pid: i32,
        source: nix::errno::Errno,
    },
}
