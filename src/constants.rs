//! Global constants for dockerdmon
//!
//! Centralized location for the fixed device paths, parameter names, and
//! timing knobs the supervisor is built around.

/// Application identifier, used for the install prefix and the control socket.
pub const APP_NAME: &str = "dockerdmon";

/// Parameter selecting SD-card-backed storage for the daemon's data root.
pub const PARAM_SD_CARD_SUPPORT: &str = "SDCardSupport";

/// Parameter selecting TLS for the daemon's TCP endpoint.
pub const PARAM_USE_TLS: &str = "UseTLS";

/// Parameter selecting the local IPC socket endpoint.
pub const PARAM_IPC_SOCKET: &str = "IPCSocket";

/// Every parameter whose change triggers a daemon restart.
pub const WATCHED_PARAMETERS: &[&str] =
    &[PARAM_IPC_SOCKET, PARAM_SD_CARD_SUPPORT, PARAM_USE_TLS];

/// Install prefix of the application package on the device.
pub const INSTALL_ROOT: &str = "/usr/local/packages/dockerdmon";

/// Mount point of the SD card storage area reserved for the daemon.
pub const SD_CARD_ROOT: &str = "/var/spool/storage/SD_DISK/dockerd";

/// TLS certificate files required under the install root when TLS is enabled.
/// Order: CA certificate, server certificate, server key.
pub const TLS_CERT_FILES: &[&str] = &["ca.pem", "server-cert.pem", "server-key.pem"];

/// Lock file the daemon can leave behind when it goes down hard.
pub const DAEMON_LOCK_FILE: &str = "/var/run/docker.pid";

/// Program name of the supervised container-engine daemon.
pub const DAEMON_PROGRAM: &str = "dockerd";

/// TCP endpoint the daemon binds when TLS is enabled.
pub const TCP_BIND_TLS: &str = "tcp://0.0.0.0:2376";

/// TCP endpoint the daemon binds when TLS is disabled.
pub const TCP_BIND_PLAIN: &str = "tcp://0.0.0.0:2375";

/// Unix socket endpoint the daemon binds when the IPC socket is enabled.
pub const IPC_SOCKET_BIND: &str = "unix:///var/run/docker.sock";

/// Storage location the daemon falls back to when no data root is passed.
pub const DEFAULT_DATA_ROOT: &str = "/var/lib/docker";

/// Seconds to wait after SIGTERM before escalating to SIGKILL.
pub const STOP_GRACE_SECS: u64 = 10;

/// System mount table consulted to validate SD card filesystems.
pub const MOUNT_TABLE: &str = "/proc/mounts";
