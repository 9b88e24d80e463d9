//! The per-worker connection task
//!
//! The connection task owns the read half, the pending handshake waiters and
//! the liveness monitor. Writes happen on a separate task fed in enqueue
//! order, so a worker that stops reading cannot stall heartbeat checks or
//! inbound dispatch. Each frame is flushed before the next.

use super::events::{ConnectionExit, ProxyEvent};
use super::handlers::HandlerRegistry;
use super::liveness::LivenessMonitor;
use super::state::{ConnectionState, SharedState};
use crate::capture::{CaptureSet, ControlStream, Divergence, Recorder};
use crate::config::ConnectionConfig;
use crate::protocol::{Command, FrameCodec, FrameError, RawFrame, SynchronizeCommand};
use crate::supervisor::WorkerSupervisor;
use futures::{SinkExt, Stream, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior, interval, timeout};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, trace, warn};

/// Requests from the proxy handle to its connection task
pub(crate) enum Outbound {
    Command(Command),
    /// Send `Synchronize{id}` and complete `reply` when the echo arrives
    Synchronize {
        id: i32,
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

/// Everything the task needs besides the byte stream
pub(crate) struct ConnectionContext {
    pub handlers: HandlerRegistry,
    pub events: UnboundedSender<ProxyEvent>,
    pub state: SharedState,
    pub config: ConnectionConfig,
    pub capture: CaptureSet,
    pub supervisor: Option<Arc<WorkerSupervisor>>,
}

impl ConnectionContext {
    fn emit(&self, event: ProxyEvent) {
        let _ = self.events.send(event);
    }

    /// Hand a decoded command to its handler
    fn dispatch(&self, command: &Command) {
        trace!("Dispatching {}", command);
        if !self.handlers.dispatch(command) {
            debug!("No handler for {}", command.kind());
        }
    }

    /// Decode a frame; unknown kinds are reported and skipped
    fn decode(&self, raw: &RawFrame) -> Result<Option<Command>, FrameError> {
        let command = raw.decode()?;
        if command.is_none() {
            warn!("Dropping frame of unknown kind {}", raw.kind);
            self.emit(ProxyEvent::UnknownCommand { kind: raw.kind });
        }
        Ok(command)
    }

    async fn finish(self, exit: ConnectionExit) -> ConnectionExit {
        self.state.set(ConnectionState::ShuttingDown);
        let CaptureSet {
            commands,
            responses,
        } = self.capture;
        for recorder in [commands, responses] {
            if let Err(e) = recorder.close().await {
                warn!("Failed to close capture file: {}", e);
            }
        }
        self.state.set(ConnectionState::Disconnected);
        info!("Connection ended: {}", exit);
        let _ = self.events.send(ProxyEvent::Disconnected(exit.clone()));
        exit
    }
}

fn frame_exit(err: FrameError) -> ConnectionExit {
    if err.is_transport() {
        ConnectionExit::Transport(err.to_string())
    } else {
        ConnectionExit::Framing(err.to_string())
    }
}

/// Write queued commands until the queue closes or the socket fails
///
/// Frames are captured once they have been handed to the socket. A command
/// too large to frame is dropped and the connection carries on.
async fn write_commands<W: AsyncWrite + Unpin>(
    mut sink: FramedWrite<W, FrameCodec>,
    mut queue: UnboundedReceiver<Command>,
    mut capture: Recorder,
) -> Option<ConnectionExit> {
    let mut failed = None;
    while let Some(command) = queue.recv().await {
        let frame = RawFrame::from_command(&command);
        match sink.send(frame.clone()).await {
            Ok(()) => trace!("Sent {}", command),
            Err(e) if e.is_transport() => {
                failed = Some(frame_exit(e));
                break;
            }
            Err(e) => {
                error!("Dropping {}: {}", command.kind(), e);
                continue;
            }
        }
        if let Err(e) = capture.record(&frame).await {
            failed = Some(ConnectionExit::Capture(e.to_string()));
            break;
        }
    }
    debug!("Captured {} commands", capture.count());
    if let Err(e) = capture.close().await {
        warn!("Failed to close command capture: {}", e);
    }
    failed
}

/// Drive a live worker connection until shutdown, EOF, silence or error
pub(crate) async fn run_connection<S>(
    io: S,
    mut outbound: UnboundedReceiver<Outbound>,
    mut ctx: ConnectionContext,
) -> ConnectionExit
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, writer) = tokio::io::split(io);
    let mut frames = FramedRead::new(reader, FrameCodec);
    let CaptureSet {
        commands,
        mut responses,
    } = std::mem::take(&mut ctx.capture);
    let (queue, queued) = mpsc::unbounded_channel();
    let mut writer = tokio::spawn(write_commands(
        FramedWrite::new(writer, FrameCodec),
        queued,
        commands,
    ));
    let mut writer_done = false;
    let mut pending: HashMap<i32, oneshot::Sender<()>> = HashMap::new();
    let mut liveness = LivenessMonitor::new(ctx.config.liveness_timeout, Instant::now());
    let mut watchdog = interval(ctx.config.watchdog_tick);
    watchdog.set_missed_tick_behavior(MissedTickBehavior::Delay);

    ctx.state.set(ConnectionState::Ready);
    ctx.emit(ProxyEvent::Connected);

    let exit = loop {
        tokio::select! {
            biased;
            request = outbound.recv() => {
                let command = match request {
                    None | Some(Outbound::Shutdown) => break ConnectionExit::Shutdown,
                    Some(Outbound::Command(command)) => command,
                    Some(Outbound::Synchronize { id, reply }) => {
                        pending.insert(id, reply);
                        SynchronizeCommand::new(id).into()
                    }
                };
                // A closed queue means the writer has failed; its exit is
                // picked up below.
                let _ = queue.send(command);
            }
            written = &mut writer, if !writer_done => {
                writer_done = true;
                match written {
                    Ok(Some(exit)) => break exit,
                    Ok(None) => break ConnectionExit::Shutdown,
                    Err(e) => break ConnectionExit::Transport(format!("writer task failed: {}", e)),
                }
            }
            frame = frames.next() => {
                let raw = match frame {
                    None => {
                        ctx.emit(ProxyEvent::ChannelClosed);
                        break ConnectionExit::Closed;
                    }
                    Some(Err(e)) => break frame_exit(e),
                    Some(Ok(raw)) => raw,
                };
                if let Err(e) = responses.record(&raw).await {
                    break ConnectionExit::Capture(e.to_string());
                }
                let command = match ctx.decode(&raw) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        error!("Framing error from worker: {}", e);
                        break frame_exit(e);
                    }
                };
                match &command {
                    Command::PuppetAlive => liveness.record_heartbeat(Instant::now()),
                    Command::Synchronize(sync) => {
                        if let Some(reply) = pending.remove(&sync.sync_id()) {
                            let _ = reply.send(());
                            continue;
                        }
                    }
                    _ => {}
                }
                ctx.dispatch(&command);
            }
            _ = watchdog.tick() => {
                if let Some(silent_for) = liveness.check(Instant::now()) {
                    warn!("No heartbeat from worker for {:?}", silent_for);
                    ctx.emit(ProxyEvent::WorkerUnresponsive { silent_for });
                    if let Some(supervisor) = ctx.supervisor.clone() {
                        tokio::spawn(async move {
                            if let Err(e) = supervisor.shutdown().await {
                                debug!("Teardown of unresponsive worker: {}", e);
                            }
                        });
                    }
                    break ConnectionExit::Unresponsive;
                }
            }
        }
    };

    // Waiters still pending see their sender dropped and fail fast.
    drop(pending);
    drop(queue);
    if !writer_done {
        if exit == ConnectionExit::Shutdown {
            // Let the final commands reach a worker that is still reading.
            match timeout(ctx.config.handshake_timeout, &mut writer).await {
                Ok(Ok(Some(failed))) => debug!("Writer ended during shutdown: {}", failed),
                Ok(_) => {}
                Err(_) => {
                    warn!("Worker stopped reading; discarding unsent commands");
                    writer.abort();
                }
            }
        } else {
            writer.abort();
        }
    }
    debug!("Captured {} responses", responses.count());
    if let Err(e) = responses.close().await {
        warn!("Failed to close response capture: {}", e);
    }
    ctx.finish(exit).await
}

/// Replay a captured response stream in place of a live worker
///
/// Captured frames are dispatched in order. Outbound commands are never
/// delivered; they are compared against `control` when present, and only
/// the first divergence is reported.
pub(crate) async fn run_replay<R>(
    mut responses: R,
    mut control: Option<ControlStream>,
    mut outbound: UnboundedReceiver<Outbound>,
    ctx: ConnectionContext,
) -> ConnectionExit
where
    R: Stream<Item = Result<RawFrame, FrameError>> + Unpin,
{
    let mut diverged = false;
    let mut dispatched = 0usize;
    let mut exhausted = false;

    ctx.state.set(ConnectionState::Ready);
    ctx.emit(ProxyEvent::Connected);

    let report = |divergence: Divergence, diverged: &mut bool| {
        if !*diverged {
            warn!("Replay diverged: {}", divergence);
            *diverged = true;
            let _ = ctx.events.send(ProxyEvent::ReplayDivergence(divergence));
        }
    };

    let exit = loop {
        tokio::select! {
            biased;
            request = outbound.recv() => match request {
                None | Some(Outbound::Shutdown) => break ConnectionExit::Shutdown,
                Some(request) => {
                    let command = match request {
                        Outbound::Synchronize { id, reply } => {
                            let _ = reply.send(());
                            SynchronizeCommand::new(id).into()
                        }
                        Outbound::Command(command) => command,
                        Outbound::Shutdown => continue,
                    };
                    if let Some(control) = control.as_mut() {
                        if let Err(divergence) = control.check(&RawFrame::from_command(&command)) {
                            report(divergence, &mut diverged);
                        }
                    }
                }
            },
            frame = next_unless(&mut responses, exhausted) => match frame {
                None => {
                    exhausted = true;
                    info!("Replayed {} captured frames", dispatched);
                    let _ = ctx.events.send(ProxyEvent::ReplayFinished { frames: dispatched });
                }
                Some(Err(e)) => break frame_exit(e),
                Some(Ok(raw)) => match ctx.decode(&raw) {
                    Ok(Some(command)) => {
                        dispatched += 1;
                        ctx.dispatch(&command);
                    }
                    Ok(None) => {}
                    Err(e) => break frame_exit(e),
                },
            },
        }
    };

    if let Some(control) = control {
        if let Err(divergence) = control.finish() {
            report(divergence, &mut diverged);
        }
    }
    ctx.finish(exit).await
}

async fn next_unless<R>(stream: &mut R, exhausted: bool) -> Option<Result<RawFrame, FrameError>>
where
    R: Stream<Item = Result<RawFrame, FrameError>> + Unpin,
{
    if exhausted {
        std::future::pending().await
    } else {
        stream.next().await
    }
}
