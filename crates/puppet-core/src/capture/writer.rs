//! Append-only capture files

use crate::config::CaptureConfig;
use crate::error::{PuppetError, PuppetResult};
use crate::protocol::{FrameCodec, RawFrame};
use futures::SinkExt;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio_util::codec::FramedWrite;
use tracing::{debug, info};

/// Writes raw frames to a file exactly as they appeared on the wire
pub struct CaptureWriter {
    path: PathBuf,
    sink: FramedWrite<File, FrameCodec>,
    sequence: u64,
}

impl CaptureWriter {
    /// Create (or truncate) the capture file at `path`
    pub async fn create(path: impl AsRef<Path>) -> PuppetResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .await
            .map_err(|e| PuppetError::capture(&path, format!("cannot create: {}", e)))?;
        info!("Capturing frames to {}", path.display());
        Ok(Self {
            path,
            sink: FramedWrite::new(file, FrameCodec),
            sequence: 0,
        })
    }

    /// Append and flush one frame
    pub async fn append(&mut self, frame: &RawFrame) -> PuppetResult<()> {
        self.sink
            .send(frame.clone())
            .await
            .map_err(|e| PuppetError::capture(&self.path, e.to_string()))?;
        self.sequence += 1;
        debug!(
            "Captured frame {} (kind {}, {} bytes) to {}",
            self.sequence,
            frame.kind,
            frame.payload.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Number of frames written so far
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn close(mut self) -> PuppetResult<()> {
        SinkExt::<RawFrame>::close(&mut self.sink)
            .await
            .map_err(|e| PuppetError::capture(&self.path, e.to_string()))
    }
}

/// One optional capture file; recording into an absent file is a no-op
#[derive(Default)]
pub struct Recorder(Option<CaptureWriter>);

impl Recorder {
    pub async fn record(&mut self, frame: &RawFrame) -> PuppetResult<()> {
        match &mut self.0 {
            Some(writer) => writer.append(frame).await,
            None => Ok(()),
        }
    }

    /// Frames recorded so far
    pub fn count(&self) -> u64 {
        self.0.as_ref().map_or(0, CaptureWriter::sequence)
    }

    pub async fn close(self) -> PuppetResult<()> {
        match self.0 {
            Some(writer) => writer.close().await,
            None => Ok(()),
        }
    }
}

/// The pair of capture files for one session
///
/// The halves are independent so the reading and writing sides of a
/// connection can each own theirs.
#[derive(Default)]
pub struct CaptureSet {
    /// Designer -> worker frames
    pub commands: Recorder,
    /// Worker -> designer frames
    pub responses: Recorder,
}

impl CaptureSet {
    pub async fn open(config: &CaptureConfig) -> PuppetResult<Self> {
        let commands = match &config.command_file {
            Some(path) => Some(CaptureWriter::create(path).await?),
            None => None,
        };
        let responses = match &config.response_file {
            Some(path) => Some(CaptureWriter::create(path).await?),
            None => None,
        };
        Ok(Self {
            commands: Recorder(commands),
            responses: Recorder(responses),
        })
    }
}
