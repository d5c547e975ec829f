//! Inter-process communication for parameter updates
//!
//! Provides the Unix domain socket server through which device management
//! tooling reads and writes parameters at runtime. Requests and responses are
//! single JSON lines. Every accepted write is persisted through the
//! [`FileStore`] first, then announced as a [`ParamChange`] when the key is
//! one of the watched restart triggers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::constants::WATCHED_PARAMETERS;

use super::{FileStore, ParamChange, ParamStore};

/// Control requests accepted on the socket, one JSON object per line.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlRequest {
    /// Read the current value of a parameter.
    Get { key: String },
    /// Write a parameter, persisting it and notifying the supervisor.
    Set { key: String, value: String },
}

/// Control responses, one JSON object per line.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ControlResponse {
    Ok { value: Option<String> },
    Error { message: String },
}

/// Unix socket server handling runtime parameter reads and writes.
pub struct ControlServer {
    socket_path: PathBuf,
    listener: UnixListener,
    store: Arc<FileStore>,
    changes: mpsc::Sender<ParamChange>,
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        // Clean up the socket file when the server goes away.
        if self.socket_path.exists() {
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}

impl ControlServer {
    /// Bind the control socket, replacing any stale socket file left over
    /// from a previous run.
    pub fn bind(
        socket_path: &Path,
        store: Arc<FileStore>,
        changes: mpsc::Sender<ParamChange>,
    ) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path).with_context(|| {
                format!("failed to remove stale socket {}", socket_path.display())
            })?;
        }
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create socket directory {}", parent.display())
            })?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("failed to bind control socket {}", socket_path.display()))?;

        Ok(Self {
            socket_path: socket_path.to_path_buf(),
            listener,
            store,
            changes,
        })
    }

    /// Accept connections until the process exits. Per-connection failures
    /// are logged and do not take the server down.
    pub async fn serve(self) {
        debug!(socket = %self.socket_path.display(), "control server listening");
        loop {
            match self.listener.accept().await {
                Ok((stream, _)) => {
                    let handler = ConnectionHandler {
                        store: self.store.clone(),
                        changes: self.changes.clone(),
                    };
                    tokio::spawn(async move {
                        if let Err(err) = handler.handle(stream).await {
                            warn!(error = %err, "control connection failed");
                        }
                    });
                }
                Err(err) => {
                    warn!(error = %err, "failed to accept control connection");
                    return;
                }
            }
        }
    }
}

struct ConnectionHandler {
    store: Arc<FileStore>,
    changes: mpsc::Sender<ParamChange>,
}

impl ConnectionHandler {
    async fn handle(&self, stream: UnixStream) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        while let Some(line) = lines.next_line().await.context("failed to read request")? {
            if line.trim().is_empty() {
                continue;
            }
            let response = match serde_json::from_str::<ControlRequest>(&line) {
                Ok(request) => self.process(request).await,
                Err(err) => ControlResponse::Error {
                    message: format!("malformed request: {err}"),
                },
            };

            let mut payload =
                serde_json::to_string(&response).context("failed to serialize response")?;
            payload.push('\n');
            writer
                .write_all(payload.as_bytes())
                .await
                .context("failed to write response")?;
        }

        Ok(())
    }

    async fn process(&self, request: ControlRequest) -> ControlResponse {
        match request {
            ControlRequest::Get { key } => ControlResponse::Ok {
                value: self.store.get(&key),
            },
            ControlRequest::Set { key, value } => {
                if let Err(err) = self.store.set(&key, &value) {
                    return ControlResponse::Error {
                        message: format!("failed to persist {key}: {err}"),
                    };
                }
                if WATCHED_PARAMETERS.contains(&key.as_str()) {
                    let change = ParamChange {
                        key,
                        value: value.clone(),
                    };
                    if self.changes.send(change).await.is_err() {
                        // Supervisor is already shutting down; the write is
                        // persisted and will take effect on the next start.
                        debug!("parameter change dropped, supervisor is gone");
                    }
                }
                ControlResponse::Ok { value: Some(value) }
            }
        }
    }
}
