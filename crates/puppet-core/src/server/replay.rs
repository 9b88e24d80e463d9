//! Replaying a captured command stream through a server

use super::{NodeInstanceServer, PuppetMode, ServerFlow};
use crate::capture::{ControlStream, Divergence, read_captured};
use crate::config::PuppetConfig;
use crate::error::PuppetResult;
use crate::protocol::RawFrame;
use crate::spy::SceneBackend;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of a replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    /// Command frames read from the capture
    pub commands: usize,
    /// Response frames produced by the server
    pub responses: Vec<RawFrame>,
    /// First mismatch against the control stream, if one was given
    pub divergence: Option<Divergence>,
}

impl ReplayReport {
    pub fn matches_control(&self) -> bool {
        self.divergence.is_none()
    }
}

/// Feed every captured command to a fresh server and collect its responses
///
/// With a control stream the responses are compared frame by frame, and the
/// first difference is reported. Replay stops at `EndPuppet`.
pub async fn replay_captured_commands<B: SceneBackend>(
    backend: Arc<B>,
    commands: &Path,
    control: Option<&Path>,
    config: &PuppetConfig,
) -> PuppetResult<ReplayReport> {
    let frames = read_captured(commands).await?;
    let mut control = match control {
        Some(path) => Some(ControlStream::from_frames(read_captured(path).await?)),
        None => None,
    };

    let (mut server, mut outbound) = NodeInstanceServer::new(backend, PuppetMode::Editor, config.spy);
    let mut responses = Vec::new();
    let mut divergence = None;
    let mut handled = 0;

    for raw in &frames {
        handled += 1;
        let flow = match raw.decode()? {
            Some(command) => server.handle(command)?,
            None => {
                server.report_unknown(raw.kind);
                ServerFlow::Continue
            }
        };

        while let Ok(command) = outbound.try_recv() {
            let response = RawFrame::from_command(&command);
            if let Some(control) = control.as_mut() {
                if divergence.is_none() {
                    divergence = control.check(&response).err();
                }
            }
            responses.push(response);
        }

        if flow == ServerFlow::Stop {
            break;
        }
    }

    if let Some(control) = control {
        if divergence.is_none() {
            divergence = control.finish().err();
        }
    }

    match &divergence {
        Some(divergence) => warn!("Replay diverged from control stream at {}", divergence),
        None => info!(
            "Replayed {} commands, {} responses",
            handled,
            responses.len()
        ),
    }

    server.clear();
    Ok(ReplayReport {
        commands: handled,
        responses,
        divergence,
    })
}
