//! Configuration resolution
//!
//! Turns the three watched parameters plus the filesystem state into a
//! validated [`Settings`] snapshot. Resolution either yields a complete,
//! launch-ready snapshot or a [`ConfigError`]; there is no partially valid
//! state and no silent fallback when a selected option cannot be honored.

pub mod mounts;

use std::fs;
use std::path::PathBuf;

use nix::unistd::{access, AccessFlags};
use tracing::debug;

use crate::config::RunConfig;
use crate::constants::{PARAM_IPC_SOCKET, PARAM_SD_CARD_SUPPORT, PARAM_USE_TLS, TLS_CERT_FILES};
use crate::error::ConfigError;
use crate::params::ParamStore;

/// Filesystems that cannot hold a data root because they lack Unix
/// permission bits.
const UNSUPPORTED_FS_TYPES: &[&str] = &["vfat", "exfat"];

/// Immutable, fully validated snapshot of the daemon's startup settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Storage root for the daemon; `None` means the daemon's own default.
    pub data_root: Option<PathBuf>,
    /// True only when all certificate files were confirmed present.
    pub use_tls: bool,
    /// Whether the daemon also binds its local Unix socket.
    pub use_ipc_socket: bool,
}

/// Resolve a [`Settings`] snapshot from the parameter store and the
/// filesystem. Rebuilt from scratch on every daemon (re)start.
pub fn resolve(store: &dyn ParamStore, cfg: &RunConfig) -> Result<Settings, ConfigError> {
    let settings = Settings {
        data_root: resolve_data_root(store, cfg)?,
        use_tls: resolve_tls(store, cfg)?,
        use_ipc_socket: store.is_yes(PARAM_IPC_SOCKET),
    };
    debug!(?settings, "resolved daemon settings");
    Ok(settings)
}

/// Set up and validate the SD card data root when SD storage is selected.
/// Selecting the SD card and failing validation is a hard error; the
/// resolver never quietly falls back to internal storage.
fn resolve_data_root(store: &dyn ParamStore, cfg: &RunConfig) -> Result<Option<PathBuf>, ConfigError> {
    if !store.is_yes(PARAM_SD_CARD_SUPPORT) {
        return Ok(None);
    }

    let data_root = cfg.sd_data_root();
    fs::create_dir_all(&data_root).map_err(|err| ConfigError::StorageInvalid {
        path: data_root.clone(),
        reason: format!("failed to create data root directory: {err}"),
    })?;

    let fs_type = mounts::filesystem_of_path(&data_root, &cfg.mount_table)
        .map_err(|err| ConfigError::StorageInvalid {
            path: data_root.clone(),
            reason: format!("cannot inspect the mount table: {err}"),
        })?
        .ok_or_else(|| ConfigError::StorageInvalid {
            path: data_root.clone(),
            reason: "could not identify the file system of the SD card".to_string(),
        })?;

    if UNSUPPORTED_FS_TYPES.contains(&fs_type.as_str()) {
        return Err(ConfigError::StorageInvalid {
            path: data_root,
            reason: format!(
                "file system {fs_type} does not support Unix file permissions, \
                 reformat the SD card to a file system that does, such as ext4 or xfs"
            ),
        });
    }

    if let Err(err) = access(&data_root, AccessFlags::W_OK) {
        return Err(ConfigError::StorageInvalid {
            path: data_root,
            reason: format!(
                "directory is not writable by the application user ({err}), \
                 change its permissions or remove it"
            ),
        });
    }

    Ok(Some(data_root))
}

/// Verify every TLS certificate file is present when TLS is selected.
/// A partial certificate set fails with the full list of absent files.
fn resolve_tls(store: &dyn ParamStore, cfg: &RunConfig) -> Result<bool, ConfigError> {
    if !store.is_yes(PARAM_USE_TLS) {
        return Ok(false);
    }

    let missing: Vec<String> = TLS_CERT_FILES
        .iter()
        .filter(|file| !cfg.cert_path(file).exists())
        .map(|file| file.to_string())
        .collect();

    if missing.is_empty() {
        Ok(true)
    } else {
        Err(ConfigError::TlsCertsMissing {
            dir: cfg.install_root.clone(),
            missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::tempdir;

    struct FixedStore(HashMap<String, String>);

    impl ParamStore for FixedStore {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }
    }

    fn store(pairs: &[(&str, &str)]) -> FixedStore {
        FixedStore(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn test_config(dir: &std::path::Path) -> RunConfig {
        RunConfig::default().with_install_root(dir)
    }

    #[test]
    fn everything_off_resolves_to_the_minimal_snapshot() {
        let dir = tempdir().unwrap();
        let settings = resolve(&store(&[]), &test_config(dir.path())).unwrap();
        assert_eq!(
            settings,
            Settings {
                data_root: None,
                use_tls: false,
                use_ipc_socket: false,
            }
        );
    }

    #[test]
    fn ipc_socket_is_a_plain_pass_through() {
        let dir = tempdir().unwrap();
        let settings = resolve(&store(&[("IPCSocket", "yes")]), &test_config(dir.path())).unwrap();
        assert!(settings.use_ipc_socket);
    }

    #[test]
    fn tls_requires_every_certificate_file() {
        let dir = tempdir().unwrap();
        let cfg = test_config(dir.path());
        fs::write(cfg.cert_path("ca.pem"), "ca").unwrap();
        fs::write(cfg.cert_path("server-cert.pem"), "cert").unwrap();
        // server-key.pem intentionally absent.

        let err = resolve(&store(&[("UseTLS", "yes")]), &cfg).unwrap_err();
        match err {
            ConfigError::TlsCertsMissing { missing, .. } => {
                assert_eq!(missing, vec!["server-key.pem".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn tls_error_names_all_absent_files() {
        let dir = tempdir().unwrap();
        let err = resolve(&store(&[("UseTLS", "yes")]), &test_config(dir.path())).unwrap_err();
        match err {
            ConfigError::TlsCertsMissing { missing, .. } => {
                let expected: Vec<String> =
                    TLS_CERT_FILES.iter().map(|f| f.to_string()).collect();
                assert_eq!(missing, expected);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn tls_resolves_when_all_certificates_exist() {
        let dir = tempdir().unwrap();
        let cfg = test_config(dir.path());
        for file in TLS_CERT_FILES {
            fs::write(cfg.cert_path(file), "x").unwrap();
        }
        let settings = resolve(&store(&[("UseTLS", "yes")]), &cfg).unwrap();
        assert!(settings.use_tls);
    }

    #[test]
    fn sd_card_on_vfat_is_rejected() {
        let dir = tempdir().unwrap();
        let mut cfg = test_config(dir.path());
        cfg.sd_card_root = dir.path().join("sd");

        // Fake mount table placing the SD root on vfat.
        let mut table = tempfile::NamedTempFile::new().unwrap();
        writeln!(table, "/dev/mmcblk0p1 {} vfat rw 0 0", dir.path().display()).unwrap();
        cfg.mount_table = table.path().to_path_buf();

        let err = resolve(&store(&[("SDCardSupport", "yes")]), &cfg).unwrap_err();
        match err {
            ConfigError::StorageInvalid { reason, .. } => {
                assert!(reason.contains("vfat"), "reason was: {reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn sd_card_on_ext4_creates_and_returns_the_data_root() {
        let dir = tempdir().unwrap();
        let mut cfg = test_config(dir.path());
        cfg.sd_card_root = dir.path().join("sd");

        let mut table = tempfile::NamedTempFile::new().unwrap();
        writeln!(table, "/dev/mmcblk0p1 {} ext4 rw 0 0", dir.path().display()).unwrap();
        cfg.mount_table = table.path().to_path_buf();

        let settings = resolve(&store(&[("SDCardSupport", "yes")]), &cfg).unwrap();
        let data_root = settings.data_root.expect("data root should be set");
        assert_eq!(data_root, dir.path().join("sd/data"));
        assert!(data_root.is_dir());
    }

    #[test]
    fn sd_card_disabled_never_touches_the_filesystem() {
        let dir = tempdir().unwrap();
        let mut cfg = test_config(dir.path());
        cfg.sd_card_root = dir.path().join("sd");

        let settings = resolve(&store(&[("SDCardSupport", "no")]), &cfg).unwrap();
        assert_eq!(settings.data_root, None);
        assert!(!cfg.sd_card_root.exists());
    }
}
