//! Runtime configuration for the supervisor process
//!
//! Collects the fixed device paths from [`crate::constants`] into one
//! overridable struct so tests and relocated installs can point the
//! supervisor somewhere else without touching the defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    DAEMON_LOCK_FILE, DAEMON_PROGRAM, INSTALL_ROOT, MOUNT_TABLE, SD_CARD_ROOT, STOP_GRACE_SECS,
};

/// Resolved runtime configuration, defaults taken from the device layout.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Install prefix holding TLS certificates and the daemon config file.
    pub install_root: PathBuf,
    /// SD card area under which the optional data root is created.
    pub sd_card_root: PathBuf,
    /// Lock file the daemon can leave behind on abnormal exit.
    pub lock_file: PathBuf,
    /// Mount table consulted for filesystem-type validation.
    pub mount_table: PathBuf,
    /// Program name (or path) of the supervised daemon.
    pub daemon_program: String,
    /// Parameter file backing the parameter store.
    pub param_file: PathBuf,
    /// Unix socket on which runtime parameter updates are accepted.
    pub control_socket: PathBuf,
    /// How long `stop` waits after SIGTERM before escalating to SIGKILL.
    pub stop_grace: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        let install_root = PathBuf::from(INSTALL_ROOT);
        Self {
            param_file: install_root.join("localdata/parameters.toml"),
            control_socket: PathBuf::from("/var/run/dockerdmon.sock"),
            install_root,
            sd_card_root: PathBuf::from(SD_CARD_ROOT),
            lock_file: PathBuf::from(DAEMON_LOCK_FILE),
            mount_table: PathBuf::from(MOUNT_TABLE),
            daemon_program: DAEMON_PROGRAM.to_string(),
            stop_grace: Duration::from_secs(STOP_GRACE_SECS),
        }
    }
}

impl RunConfig {
    /// Configuration file handed to the daemon on its command line.
    pub fn daemon_config_file(&self) -> PathBuf {
        self.install_root.join("localdata/daemon.json")
    }

    /// Full path of a TLS certificate file under the install root.
    pub fn cert_path(&self, file_name: &str) -> PathBuf {
        self.install_root.join(file_name)
    }

    /// Data root created on the SD card when SD storage is selected.
    pub fn sd_data_root(&self) -> PathBuf {
        self.sd_card_root.join("data")
    }

    /// Rebase the install-relative paths onto a new install root.
    pub fn with_install_root(mut self, root: &Path) -> Self {
        self.install_root = root.to_path_buf();
        self.param_file = root.join("localdata/parameters.toml");
        self
    }
}
