#![forbid(unsafe_code)]

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dockerdmon::cli;
use dockerdmon::config::RunConfig;
use dockerdmon::params::{ControlServer, FileStore};
use dockerdmon::supervisor::{self, Event, ShutdownFlag, Supervisor};

fn main() -> Result<ExitCode> {
    let cfg = cli::parse_args()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("dockerdmon=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let code = run(cfg)?;
    Ok(if code == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main(flavor = "current_thread")]
async fn run(cfg: RunConfig) -> Result<i32> {
    info!(
        version = env!("DOCKERDMON_VERSION"),
        pid = std::process::id(),
        "dockerdmon starting"
    );

    let store = Arc::new(
        FileStore::load(&cfg.param_file)
            .with_context(|| format!("failed to load parameters from {}", cfg.param_file.display()))?,
    );

    let (event_tx, event_rx) = mpsc::channel(16);
    let shutdown = ShutdownFlag::new();

    // Signal handlers stay minimal: latch the flag, queue one event. The
    // actual shutdown logic runs inside the supervisor loop.
    {
        let shutdown = shutdown.clone();
        let event_tx = event_tx.clone();
        tokio::spawn(async move {
            match supervisor::wait_for_termination().await {
                Ok(()) => {
                    shutdown.request();
                    let _ = event_tx.send(Event::ShutdownRequested).await;
                }
                Err(err) => error!(error = %err, "failed to install signal handlers"),
            }
        });
    }

    // Parameter writes arrive over the control socket and are forwarded to
    // the supervisor as change events.
    let (change_tx, mut change_rx) = mpsc::channel(16);
    let server = ControlServer::bind(&cfg.control_socket, store.clone(), change_tx)
        .context("failed to start the parameter control server")?;
    tokio::spawn(server.serve());
    tokio::spawn(async move {
        while let Some(change) = change_rx.recv().await {
            if event_tx.send(Event::ParameterChanged(change)).await.is_err() {
                break;
            }
        }
    });

    let supervisor = Supervisor::new(store, cfg, event_rx, shutdown);
    Ok(supervisor.run().await)
}
