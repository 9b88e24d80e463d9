//! Designer side of the node-instance channel
//!
//! A [`NodeInstanceProxy`] owns one worker connection. Commands are queued
//! to a single connection task which writes them in order, decodes inbound
//! frames and hands each to the [`HandlerRegistry`]. Lifecycle changes are
//! reported as [`ProxyEvent`]s.

mod connection;
mod events;
mod handlers;
mod liveness;
mod state;

pub use events::{ConnectionExit, ProxyEvent};
pub use handlers::{CommandHandler, ForwardHandler, HandlerRegistry};
pub use liveness::LivenessMonitor;
pub use state::ConnectionState;

use crate::capture::{CaptureSet, ControlStream, open_captured, read_captured};
use crate::config::PuppetConfig;
use crate::error::{PuppetError, PuppetResult};
use crate::protocol::Command;
use crate::server::PuppetMode;
use crate::supervisor::{SupervisorError, WorkerSupervisor};
use crate::transport;
use connection::{ConnectionContext, Outbound, run_connection, run_replay};
use state::SharedState;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Client handle for one worker
pub struct NodeInstanceProxy {
    outbound: UnboundedSender<Outbound>,
    state: SharedState,
    task: JoinHandle<ConnectionExit>,
    supervisor: Option<Arc<WorkerSupervisor>>,
    config: PuppetConfig,
    next_sync_id: AtomicI32,
}

impl NodeInstanceProxy {
    /// Run the protocol over an already connected byte stream
    pub async fn attach<S>(
        io: S,
        handlers: HandlerRegistry,
        config: &PuppetConfig,
    ) -> PuppetResult<(Self, UnboundedReceiver<ProxyEvent>)>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::start(io, handlers, config, None).await
    }

    /// Connect to a worker already listening at `address`
    pub async fn connect(
        address: &str,
        handlers: HandlerRegistry,
        config: &PuppetConfig,
    ) -> PuppetResult<(Self, UnboundedReceiver<ProxyEvent>)> {
        let stream = transport::connect(address).await?;
        Self::start(stream, handlers, config, None).await
    }

    /// Spawn a worker process and wait for it to connect back
    ///
    /// The worker receives the listening address and `mode` as its two
    /// positional arguments.
    #[instrument(skip(handlers, config))]
    pub async fn launch(
        mode: PuppetMode,
        handlers: HandlerRegistry,
        config: &PuppetConfig,
    ) -> PuppetResult<(Self, UnboundedReceiver<ProxyEvent>)> {
        let listener = transport::bind_loopback()
            .await
            .map_err(crate::supervisor::LaunchError::Listen)?;
        let address = listener.local_addr()?;
        let args = [address.to_string(), mode.as_str().to_string()];
        let supervisor = Arc::new(WorkerSupervisor::launch(&config.supervisor, &args).await?);

        let stream =
            match transport::accept_worker(&listener, config.supervisor.startup_timeout).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Worker never connected: {}", e);
                    if let Err(shutdown) = supervisor.shutdown().await {
                        debug!("Stopping worker after failed launch: {}", shutdown);
                    }
                    return Err(e.into());
                }
            };
        info!("Worker connected on {}", address);
        Self::start(stream, handlers, config, Some(supervisor)).await
    }

    /// Replay a captured response stream instead of talking to a worker
    ///
    /// Commands sent through the returned proxy are compared against the
    /// `control` capture, if given, and never delivered.
    pub async fn replay(
        responses: &Path,
        control: Option<&Path>,
        handlers: HandlerRegistry,
        config: &PuppetConfig,
    ) -> PuppetResult<(Self, UnboundedReceiver<ProxyEvent>)> {
        let frames = open_captured(responses).await?;
        let control = match control {
            Some(path) => Some(ControlStream::from_frames(read_captured(path).await?)),
            None => None,
        };
        info!("Replaying captured responses from {}", responses.display());

        let (outbound, rx) = mpsc::unbounded_channel();
        let (events, event_rx) = mpsc::unbounded_channel();
        let state = SharedState::new(ConnectionState::Connecting);
        let ctx = ConnectionContext {
            handlers,
            events,
            state: state.clone(),
            config: config.connection.clone(),
            capture: CaptureSet::default(),
            supervisor: None,
        };
        let task = tokio::spawn(run_replay(frames, control, rx, ctx));
        Ok((Self::new(outbound, state, task, None, config), event_rx))
    }

    async fn start<S>(
        io: S,
        handlers: HandlerRegistry,
        config: &PuppetConfig,
        supervisor: Option<Arc<WorkerSupervisor>>,
    ) -> PuppetResult<(Self, UnboundedReceiver<ProxyEvent>)>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let capture = CaptureSet::open(&config.capture).await?;
        let (outbound, rx) = mpsc::unbounded_channel();
        let (events, event_rx) = mpsc::unbounded_channel();
        let state = SharedState::new(ConnectionState::Connecting);
        let ctx = ConnectionContext {
            handlers,
            events,
            state: state.clone(),
            config: config.connection.clone(),
            capture,
            supervisor: supervisor.clone(),
        };
        let task = tokio::spawn(run_connection(io, rx, ctx));
        Ok((Self::new(outbound, state, task, supervisor, config), event_rx))
    }

    fn new(
        outbound: UnboundedSender<Outbound>,
        state: SharedState,
        task: JoinHandle<ConnectionExit>,
        supervisor: Option<Arc<WorkerSupervisor>>,
        config: &PuppetConfig,
    ) -> Self {
        Self {
            outbound,
            state,
            task,
            supervisor,
            config: config.clone(),
            next_sync_id: AtomicI32::new(1),
        }
    }

    /// Queue a command; frames leave in the order they are queued
    pub fn send_command(&self, command: impl Into<Command>) -> PuppetResult<()> {
        self.outbound
            .send(Outbound::Command(command.into()))
            .map_err(|_| PuppetError::ChannelClosed)
    }

    /// Round-trip a `Synchronize` and wait for the worker's echo
    #[instrument(skip(self))]
    pub async fn synchronize(&self, timeout: Duration) -> PuppetResult<()> {
        let id = self.next_sync_id.fetch_add(1, Ordering::Relaxed);
        let (reply, done) = oneshot::channel();
        self.outbound
            .send(Outbound::Synchronize { id, reply })
            .map_err(|_| PuppetError::ChannelClosed)?;
        match tokio::time::timeout(timeout, done).await {
            Ok(Ok(())) => {
                debug!("Synchronized with id {}", id);
                Ok(())
            }
            Ok(Err(_)) => Err(PuppetError::ChannelClosed),
            Err(_) => Err(PuppetError::HandshakeTimeout { waited: timeout }),
        }
    }

    /// [`Self::synchronize`] with the configured handshake timeout
    pub async fn handshake(&self) -> PuppetResult<()> {
        self.synchronize(self.config.connection.handshake_timeout)
            .await
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn supervisor(&self) -> Option<&WorkerSupervisor> {
        self.supervisor.as_deref()
    }

    /// Whether the connection task is still running
    pub fn is_connected(&self) -> bool {
        !self.task.is_finished()
    }

    /// Send `EndPuppet`, close the channel and stop the worker process
    ///
    /// A worker that does not exit within the terminate grace is signalled
    /// by the supervisor.
    #[instrument(skip(self))]
    pub async fn shutdown(self) -> PuppetResult<ConnectionExit> {
        let _ = self.outbound.send(Outbound::Command(Command::EndPuppet));
        let _ = self.outbound.send(Outbound::Shutdown);

        let exit = match self.task.await {
            Ok(exit) => exit,
            Err(e) => {
                warn!("Connection task failed: {}", e);
                ConnectionExit::Shutdown
            }
        };

        if let Some(supervisor) = self.supervisor {
            if supervisor
                .wait_for_exit(self.config.supervisor.terminate_grace)
                .await
                .is_none()
            {
                debug!("Worker still running after EndPuppet");
            }
            match supervisor.shutdown().await {
                Ok(outcome) => debug!("Worker stopped: {:?}", outcome),
                Err(SupervisorError::AlreadyStopped) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(exit)
    }
}
