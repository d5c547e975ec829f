//! Process supervision and the lifecycle event loop
//!
//! One task owns the daemon's whole lifecycle. Termination signals and
//! parameter changes arrive as typed [`Event`]s on a single ordered channel;
//! the child's exit is observed directly on its handle. Because every
//! lifecycle decision runs on this one task, no two operations ever overlap
//! and the state needs no locking.
//!
//! Shutdown is graceful-then-forceful: SIGTERM, a bounded wait that ends the
//! moment the child is reaped, then SIGKILL. A parameter change stops the
//! running daemon with a restart intent set; the intent is consumed exactly
//! once, in the exit handling path, which relaunches with freshly resolved
//! settings or ends supervision.

use std::fs;
use std::io;
use std::ops::ControlFlow;
use std::process::ExitStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::process::Child;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::RunConfig;
use crate::error::SupervisorError;
use crate::launcher;
use crate::params::{ParamChange, ParamStore};
use crate::settings;

/// Exit code reported when supervision ends after any failure.
const EXIT_FAILURE: i32 = 1;

/// Events delivered to the supervisor loop.
#[derive(Debug)]
pub enum Event {
    /// An external termination signal was observed; wind down, no restart.
    ShutdownRequested,
    /// A watched parameter was written.
    ParameterChanged(ParamChange),
}

/// Shared flag recording that a termination signal has been observed.
///
/// Set from the signal listener the moment the signal arrives, so the
/// supervisor can suppress a pending restart even before the corresponding
/// [`Event::ShutdownRequested`] reaches the front of the queue.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Blocks until SIGINT, SIGTERM, or SIGQUIT is delivered.
///
/// The caller owns what happens next; this function only observes the
/// signal. Keeping the handler side this thin means the actual shutdown
/// logic always runs inside the supervisor loop.
pub async fn wait_for_termination() -> io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigquit.recv() => info!("received SIGQUIT"),
    }
    Ok(())
}

/// What the loop observed in one turn.
enum Step {
    DaemonExited(io::Result<ExitStatus>),
    Event(Event),
    SourcesClosed,
}

/// Owns the supervised child and every piece of lifecycle state.
pub struct Supervisor {
    store: Arc<dyn ParamStore>,
    cfg: RunConfig,
    events: mpsc::Receiver<Event>,
    shutdown: ShutdownFlag,
    child: Option<Child>,
    pending_restart: bool,
    exit_code: i32,
}

impl Supervisor {
    pub fn new(
        store: Arc<dyn ParamStore>,
        cfg: RunConfig,
        events: mpsc::Receiver<Event>,
        shutdown: ShutdownFlag,
    ) -> Self {
        Self {
            store,
            cfg,
            events,
            shutdown,
            child: None,
            pending_restart: false,
            exit_code: 0,
        }
    }

    /// Run supervision to completion and return the process exit code.
    ///
    /// Startup failures are fatal; a misconfigured device needs operator
    /// intervention, not a retry loop. After the loop ends, one final
    /// `stop` makes sure nothing is left running.
    pub async fn run(mut self) -> i32 {
        if let Err(err) = self.start().await {
            error!(error = %err, "failed to start the daemon");
            self.exit_code = EXIT_FAILURE;
        } else {
            loop {
                let flow = match self.next_step().await {
                    Step::DaemonExited(result) => self.on_daemon_exit(result).await,
                    Step::Event(Event::ParameterChanged(change)) => {
                        self.on_parameter_changed(change).await
                    }
                    Step::Event(Event::ShutdownRequested) => {
                        info!("termination signal received, shutting down");
                        ControlFlow::Break(())
                    }
                    Step::SourcesClosed => {
                        warn!("event sources closed unexpectedly, shutting down");
                        ControlFlow::Break(())
                    }
                };
                if flow.is_break() {
                    break;
                }
            }
        }

        match self.stop().await {
            Ok(Some(status)) => self.note_daemon_exit(Some(status)),
            Ok(None) => {}
            Err(err) => {
                error!(error = %err, "failed to shut the daemon down");
                self.exit_code = EXIT_FAILURE;
            }
        }

        if self.exit_code == 0 {
            info!("shutting down, daemon stopped cleanly");
        } else {
            warn!(exit_code = self.exit_code, "shutting down after failure");
        }
        self.exit_code
    }

    /// Wait for the next thing the loop has to react to. While a daemon is
    /// tracked its exit competes with the event queue; otherwise only
    /// queued events can wake the loop.
    async fn next_step(&mut self) -> Step {
        match self.child.as_mut() {
            Some(child) => tokio::select! {
                result = child.wait() => Step::DaemonExited(result),
                event = self.events.recv() => match event {
                    Some(event) => Step::Event(event),
                    None => Step::SourcesClosed,
                },
            },
            None => match self.events.recv().await {
                Some(event) => Step::Event(event),
                None => Step::SourcesClosed,
            },
        }
    }

    /// Resolve settings and launch a new daemon. Only called when no child
    /// is tracked; the previous handle must have been cleared first.
    async fn start(&mut self) -> Result<(), SupervisorError> {
        debug_assert!(self.child.is_none(), "start with a live child handle");
        let resolved = settings::resolve(self.store.as_ref(), &self.cfg)?;
        let child = launcher::launch(&resolved, &self.cfg)?;
        self.child = Some(child);
        Ok(())
    }

    /// Stop the running daemon, gracefully first.
    ///
    /// Idempotent: with no child tracked this is an immediate success.
    /// Otherwise SIGTERM is sent (a send failure is logged and ignored,
    /// the process may simply have beaten us to exiting), and the call
    /// waits up to the configured grace period for the child to be reaped.
    /// A child reaped during the wait is returned so the caller can route
    /// the status through [`Self::note_daemon_exit`]; on timeout the
    /// daemon is SIGKILLed, where only a failed kill syscall is an error,
    /// and the exit is observed later by the loop.
    async fn stop(&mut self) -> Result<Option<ExitStatus>, SupervisorError> {
        let Some(child) = self.child.as_mut() else {
            debug!("stop requested but no daemon is running");
            return Ok(None);
        };

        if let Some(pid) = child.id() {
            if let Err(err) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                warn!(pid, error = %err, "failed to send SIGTERM, daemon may already be gone");
            }
        }

        match timeout(self.cfg.stop_grace, child.wait()).await {
            Ok(Ok(status)) => Ok(Some(status)),
            Ok(Err(err)) => {
                warn!(error = %err, "failed to collect daemon exit status");
                self.child = None;
                Ok(None)
            }
            Err(_elapsed) => {
                warn!(
                    grace = ?self.cfg.stop_grace,
                    "daemon did not exit within the grace period, sending SIGKILL"
                );
                if let Some(pid) = self.child.as_ref().and_then(|c| c.id()) {
                    kill(Pid::from_raw(pid as i32), Signal::SIGKILL).map_err(|source| {
                        SupervisorError::SignalSend {
                            signal: "SIGKILL",
                            pid: pid as i32,
                            source,
                        }
                    })?;
                }
                Ok(None)
            }
        }
    }

    /// The single place a daemon exit is recorded: clears the handle,
    /// removes the stale lock file, and notes an abnormal status in the
    /// exit code.
    fn note_daemon_exit(&mut self, status: Option<ExitStatus>) {
        self.child = None;

        // The daemon can leave its lock file behind when it goes down
        // hard; remove it so the next launch does not trip over it.
        if let Err(err) = fs::remove_file(&self.cfg.lock_file) {
            if err.kind() != io::ErrorKind::NotFound {
                debug!(
                    lock_file = %self.cfg.lock_file.display(),
                    error = %err,
                    "could not remove daemon lock file"
                );
            }
        }

        match status {
            Some(status) if status.success() => info!("daemon exited cleanly"),
            Some(status) => {
                error!(%status, "daemon exited with an error");
                self.exit_code = EXIT_FAILURE;
            }
            None => {
                error!("daemon exit status could not be collected");
                self.exit_code = EXIT_FAILURE;
            }
        }
    }

    /// Exit handling as seen from the loop: record the exit, then consume
    /// the restart intent. This is the only place the intent is consumed,
    /// so restart logic runs exactly once per stop. A termination signal
    /// observed in the meantime suppresses the restart.
    async fn on_daemon_exit(&mut self, result: io::Result<ExitStatus>) -> ControlFlow<()> {
        let status = match result {
            Ok(status) => Some(status),
            Err(err) => {
                warn!(error = %err, "failed to collect daemon exit status");
                None
            }
        };
        self.note_daemon_exit(status);

        if self.pending_restart && !self.shutdown.is_requested() {
            self.pending_restart = false;
            match self.start().await {
                Ok(()) => ControlFlow::Continue(()),
                Err(err) => {
                    error!(error = %err, "failed to restart the daemon");
                    self.exit_code = EXIT_FAILURE;
                    ControlFlow::Break(())
                }
            }
        } else {
            // Nothing asked for a restart: this exit ends supervision,
            // whether it was a planned stop or a crash.
            ControlFlow::Break(())
        }
    }

    /// A watched parameter changed: stop the daemon with the restart
    /// intent set. Events arriving during the bounded wait stay queued
    /// and are handled after the stop resolves.
    async fn on_parameter_changed(&mut self, change: ParamChange) -> ControlFlow<()> {
        info!(key = %change.key, value = %change.value, "parameter changed, restarting daemon");
        self.pending_restart = true;

        match self.stop().await {
            Ok(Some(status)) => self.on_daemon_exit(Ok(status)).await,
            Ok(None) => ControlFlow::Continue(()),
            Err(err) => {
                error!(error = %err, "failed to stop the daemon, cannot continue supervising");
                self.exit_code = EXIT_FAILURE;
                ControlFlow::Break(())
            }
        }
    }
}
