//! Worker-side dispatch loop

use super::{NodeInstanceServer, ServerFlow};
use crate::capture::{CaptureSet, Recorder};
use crate::config::PuppetConfig;
use crate::error::PuppetResult;
use crate::protocol::{Command, FrameCodec, RawFrame};
use crate::spy::SceneBackend;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Why the worker loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerExit {
    /// The designer sent `EndPuppet`
    EndPuppet,
    /// The designer closed the connection
    Disconnected,
    /// Shutdown requested locally
    Cancelled,
}

/// Serve one designer connection until it ends
///
/// Reading and writing run concurrently so neither side's large frames can
/// wedge the other. Heartbeats go out every `heartbeat_interval`, starting
/// immediately. Responses and spy notifications are written in the order
/// they were queued; each frame is flushed before the next.
pub async fn run_server<S, B>(
    io: S,
    server: &mut NodeInstanceServer<B>,
    outbound: &mut UnboundedReceiver<Command>,
    config: &PuppetConfig,
    cancel: CancellationToken,
) -> PuppetResult<ServerExit>
where
    S: AsyncRead + AsyncWrite,
    B: SceneBackend,
{
    let (reader, writer) = tokio::io::split(io);
    let CaptureSet {
        commands,
        responses,
    } = CaptureSet::open(&config.capture).await?;
    // `stop` ends the writer once reading is over; `halt` ends the reader
    // when the writer gives up.
    let stop = CancellationToken::new();
    let halt = cancel.child_token();

    info!("Worker loop started in {}", server.mode());

    let (read, written) = tokio::join!(
        read_commands(
            FramedRead::new(reader, FrameCodec),
            server,
            commands,
            halt.clone(),
            stop.clone(),
        ),
        write_responses(
            FramedWrite::new(writer, FrameCodec),
            outbound,
            responses,
            config.connection.heartbeat_interval,
            stop,
            halt,
        ),
    );
    let broken = written?;
    let exit = match read? {
        ServerExit::Cancelled if broken && !cancel.is_cancelled() => ServerExit::Disconnected,
        exit => exit,
    };
    info!("Worker loop finished: {:?}", exit);
    Ok(exit)
}

async fn read_commands<R, B>(
    mut frames: FramedRead<R, FrameCodec>,
    server: &mut NodeInstanceServer<B>,
    mut capture: Recorder,
    halt: CancellationToken,
    stop: CancellationToken,
) -> PuppetResult<ServerExit>
where
    R: AsyncRead + Unpin,
    B: SceneBackend,
{
    let _stop_writer = stop.drop_guard();
    let served = serve_frames(&mut frames, server, &mut capture, &halt).await;
    debug!("Captured {} commands", capture.count());
    let closed = capture.close().await;
    let exit = served?;
    closed?;
    Ok(exit)
}

async fn serve_frames<R, B>(
    frames: &mut FramedRead<R, FrameCodec>,
    server: &mut NodeInstanceServer<B>,
    capture: &mut Recorder,
    halt: &CancellationToken,
) -> PuppetResult<ServerExit>
where
    R: AsyncRead + Unpin,
    B: SceneBackend,
{
    loop {
        let frame = tokio::select! {
            biased;
            _ = halt.cancelled() => return Ok(ServerExit::Cancelled),
            frame = frames.next() => frame,
        };
        let raw = match frame {
            None => return Ok(ServerExit::Disconnected),
            Some(result) => result?,
        };
        capture.record(&raw).await?;
        match raw.decode()? {
            Some(command) => {
                if server.handle(command)? == ServerFlow::Stop {
                    return Ok(ServerExit::EndPuppet);
                }
            }
            None => {
                warn!("Dropping frame of unknown kind {}", raw.kind);
                server.report_unknown(raw.kind);
            }
        }
    }
}

/// Returns whether the connection broke while writing
async fn write_responses<W: AsyncWrite + Unpin>(
    mut sink: FramedWrite<W, FrameCodec>,
    outbound: &mut UnboundedReceiver<Command>,
    mut capture: Recorder,
    heartbeat_every: Duration,
    stop: CancellationToken,
    halt: CancellationToken,
) -> PuppetResult<bool> {
    let _halt_reader = halt.drop_guard();
    let mut heartbeat = interval(heartbeat_every);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let written = loop {
        // Queued responses drain before `stop` is honoured.
        let command = tokio::select! {
            biased;
            Some(command) = outbound.recv() => command,
            _ = stop.cancelled() => break Ok(false),
            _ = heartbeat.tick() => Command::PuppetAlive,
        };
        let frame = RawFrame::from_command(&command);
        match sink.send(frame.clone()).await {
            Ok(()) => {}
            Err(e) if e.is_transport() => {
                debug!("Designer connection lost while writing: {}", e);
                break Ok(true);
            }
            Err(e) => {
                error!("Dropping {}: {}", command.kind(), e);
                continue;
            }
        }
        if let Err(e) = capture.record(&frame).await {
            break Err(e);
        }
    };
    debug!("Captured {} responses", capture.count());
    let closed = capture.close().await;
    let broken = written?;
    closed?;
    Ok(broken)
}
