//! Daemon launcher
//!
//! Builds the daemon's argument vector from a [`Settings`] snapshot and
//! spawns the process. The argument vector is fully deterministic: same
//! snapshot, same command line.

use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::info;

use crate::config::RunConfig;
use crate::constants::{
    DEFAULT_DATA_ROOT, IPC_SOCKET_BIND, TCP_BIND_PLAIN, TCP_BIND_TLS, TLS_CERT_FILES,
};
use crate::error::LaunchError;
use crate::settings::Settings;

/// Build the daemon's argument vector from the settings snapshot.
pub fn build_args(settings: &Settings, cfg: &RunConfig) -> Vec<String> {
    let mut args = vec![
        "--config-file".to_string(),
        cfg.daemon_config_file().display().to_string(),
    ];

    if settings.use_tls {
        let (ca, cert, key) = (TLS_CERT_FILES[0], TLS_CERT_FILES[1], TLS_CERT_FILES[2]);
        args.extend([
            "-H".to_string(),
            TCP_BIND_TLS.to_string(),
            "--tlsverify".to_string(),
            "--tlscacert".to_string(),
            cfg.cert_path(ca).display().to_string(),
            "--tlscert".to_string(),
            cfg.cert_path(cert).display().to_string(),
            "--tlskey".to_string(),
            cfg.cert_path(key).display().to_string(),
        ]);
    } else {
        args.extend([
            "-H".to_string(),
            TCP_BIND_PLAIN.to_string(),
            "--tls=false".to_string(),
        ]);
    }

    if let Some(data_root) = &settings.data_root {
        args.push("--data-root".to_string());
        args.push(data_root.display().to_string());
    }

    if settings.use_ipc_socket {
        args.push("-H".to_string());
        args.push(IPC_SOCKET_BIND.to_string());
    }

    args
}

/// One-line summary of the launch mode for the log.
fn describe(settings: &Settings, cfg: &RunConfig) -> String {
    format!(
        "starting {} in {} using {} as storage {} IPC socket",
        cfg.daemon_program,
        if settings.use_tls { "TLS mode" } else { "unsecured mode" },
        settings
            .data_root
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| DEFAULT_DATA_ROOT.to_string()),
        if settings.use_ipc_socket { "with" } else { "without" },
    )
}

/// Spawn the daemon with arguments derived from `settings`.
///
/// The child is placed in its own process group with no stdin, and the
/// handle is kept alive so the exit status can be collected asynchronously.
/// A non-blocking probe right after the spawn catches processes that were
/// dead on arrival; a successful spawn syscall alone proves nothing about
/// the program's viability.
pub fn launch(settings: &Settings, cfg: &RunConfig) -> Result<Child, LaunchError> {
    let args = build_args(settings, cfg);
    info!("{}", describe(settings, cfg));

    let mut child = Command::new(&cfg.daemon_program)
        .args(&args)
        .stdin(Stdio::null())
        .process_group(0)
        .kill_on_drop(false)
        .spawn()
        .map_err(|source| LaunchError::Spawn {
            command: cfg.daemon_program.clone(),
            source,
        })?;

    match child.try_wait() {
        Ok(Some(status)) => Err(LaunchError::DiedImmediately { status }),
        Ok(None) => Ok(child),
        Err(source) => Err(LaunchError::Spawn {
            command: cfg.daemon_program.clone(),
            source,
        }),
    }
}
