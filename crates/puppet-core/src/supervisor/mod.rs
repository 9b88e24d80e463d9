//! Worker process supervision
//!
//! The supervisor is the only component that signals the worker. Shutdown
//! escalates from SIGTERM to SIGKILL, waiting `terminate_grace` after each
//! signal. After `max_escalations` signals the child is handed to a
//! background task that reaps it whenever it finally exits.

mod error;

pub use error::{LaunchError, SupervisorError};

use crate::config::{SupervisorConfig, timeouts};
use parking_lot::Mutex;
use std::fmt;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info, instrument, warn};

/// Lifecycle of the supervised process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    NotRunning,
    Starting,
    Running,
    ShuttingDown,
    /// Exit code, if the process exited normally and was reaped here
    Exited(Option<i32>),
}

/// How shutdown ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    Exited {
        code: Option<i32>,
        escalations: u32,
    },
    /// Still running after every signal; a background task waits for it
    HandedToReaper { escalations: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escalation {
    Terminate,
    Kill,
}

impl fmt::Display for Escalation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminate => f.write_str("SIGTERM"),
            Self::Kill => f.write_str("SIGKILL"),
        }
    }
}

/// Owner of the worker child process
pub struct WorkerSupervisor {
    child: Mutex<Option<Child>>,
    pid: Option<u32>,
    state: Mutex<WorkerState>,
    config: SupervisorConfig,
    escalations: AtomicU32,
}

impl WorkerSupervisor {
    /// Spawn the worker with `args` appended to the configured extra arguments
    ///
    /// A process that exits within a short window counts as a failed launch.
    #[instrument(skip(config, args))]
    pub async fn launch(config: &SupervisorConfig, args: &[String]) -> Result<Self, LaunchError> {
        let path = config.resolve_worker_path();
        if path.components().count() > 1 && !path.exists() {
            return Err(LaunchError::BinaryNotFound { path });
        }

        let mut command = Command::new(&path);
        command
            .args(&config.extra_args)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!("Spawning worker {} {:?}", path.display(), args);
        let mut child = command
            .spawn()
            .map_err(|e| LaunchError::spawn(&path, e))?;

        match tokio::time::timeout(timeouts::supervisor::immediate_exit_window(), child.wait()).await
        {
            Ok(Ok(status)) => {
                return Err(LaunchError::ExitedImmediately {
                    status: status.to_string(),
                });
            }
            Ok(Err(e)) => return Err(LaunchError::spawn(&path, e)),
            Err(_) => {}
        }

        let pid = child.id();
        info!("Worker started with PID {:?}", pid);
        Ok(Self {
            child: Mutex::new(Some(child)),
            pid,
            state: Mutex::new(WorkerState::Running),
            config: config.clone(),
            escalations: AtomicU32::new(0),
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock()
    }

    /// Termination signals sent so far
    pub fn escalations(&self) -> u32 {
        self.escalations.load(Ordering::SeqCst)
    }

    /// Exit status if the worker has already exited on its own
    pub fn try_status(&self) -> Option<ExitStatus> {
        let mut guard = self.child.lock();
        let status = guard.as_mut()?.try_wait().ok().flatten();
        if let Some(status) = status {
            *self.state.lock() = WorkerState::Exited(status.code());
        }
        status
    }

    /// Give the worker up to `grace` to exit by itself
    pub async fn wait_for_exit(&self, grace: Duration) -> Option<ExitStatus> {
        let step = Duration::from_millis(20).min(grace);
        let deadline = tokio::time::Instant::now() + grace;
        loop {
            if let Some(status) = self.try_status() {
                return Some(status);
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(step).await;
        }
    }

    /// Stop the worker; a second call returns [`SupervisorError::AlreadyStopped`]
    #[instrument(skip(self), fields(pid = ?self.pid))]
    pub async fn shutdown(&self) -> Result<ShutdownOutcome, SupervisorError> {
        let Some(mut child) = self.child.lock().take() else {
            return Err(SupervisorError::AlreadyStopped);
        };
        *self.state.lock() = WorkerState::ShuttingDown;

        if let Some(status) = child.try_wait()? {
            return Ok(self.exited(status));
        }

        for step in 0..self.config.max_escalations {
            let escalation = if step == 0 {
                Escalation::Terminate
            } else {
                Escalation::Kill
            };
            self.signal(&mut child, escalation)?;
            self.escalations.fetch_add(1, Ordering::SeqCst);

            match tokio::time::timeout(self.config.terminate_grace, child.wait()).await {
                Ok(status) => return Ok(self.exited(status?)),
                Err(_) => warn!(
                    "Worker still running {:?} after {}",
                    self.config.terminate_grace, escalation
                ),
            }
        }

        let escalations = self.escalations();
        warn!(
            "Worker ignored {} signals, leaving it to a background reaper",
            escalations
        );
        let _ = child.start_kill();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => debug!("Reaped worker: {}", status),
                Err(e) => warn!("Failed to reap worker: {}", e),
            }
        });
        *self.state.lock() = WorkerState::Exited(None);
        Ok(ShutdownOutcome::HandedToReaper { escalations })
    }

    fn exited(&self, status: ExitStatus) -> ShutdownOutcome {
        info!("Worker exited: {}", status);
        *self.state.lock() = WorkerState::Exited(status.code());
        ShutdownOutcome::Exited {
            code: status.code(),
            escalations: self.escalations(),
        }
    }

    fn signal(&self, child: &mut Child, escalation: Escalation) -> Result<(), SupervisorError> {
        debug!("Sending {} to worker {:?}", escalation, self.pid);
        match escalation {
            #[cfg(unix)]
            Escalation::Terminate => {
                use nix::sys::signal::{Signal, kill};
                use nix::unistd::Pid;

                let Some(pid) = child.id() else {
                    return Ok(());
                };
                match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                    Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
                    Err(e) => Err(SupervisorError::Signal {
                        pid,
                        message: e.to_string(),
                    }),
                }
            }
            _ => match child.start_kill() {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
                Err(e) => Err(e.into()),
            },
        }
    }
}

impl Drop for WorkerSupervisor {
    fn drop(&mut self) {
        if let Some(child) = self.child.get_mut().as_mut() {
            debug!("Supervisor dropped with live worker, killing it");
            let _ = child.start_kill();
        }
    }
}
