//! Reading capture files back

use crate::error::{PuppetError, PuppetResult};
use crate::protocol::{FrameCodec, RawFrame, decode_frame};
use bytes::BytesMut;
use std::path::Path;
use tokio::fs::File;
use tokio_util::codec::FramedRead;

/// Open a capture file as a frame stream
pub async fn open_captured(path: &Path) -> PuppetResult<FramedRead<File, FrameCodec>> {
    let file = File::open(path)
        .await
        .map_err(|e| PuppetError::capture(path, format!("cannot open: {}", e)))?;
    Ok(FramedRead::new(file, FrameCodec))
}

/// Read every frame of a capture file
///
/// A trailing partial frame means the capture was cut short and is an error.
pub async fn read_captured(path: &Path) -> PuppetResult<Vec<RawFrame>> {
    let content = tokio::fs::read(path)
        .await
        .map_err(|e| PuppetError::capture(path, format!("cannot read: {}", e)))?;
    let mut buf = BytesMut::from(&content[..]);
    let mut frames = Vec::new();
    while let Some(frame) =
        decode_frame(&mut buf).map_err(|e| PuppetError::capture(path, e.to_string()))?
    {
        frames.push(frame);
    }
    if !buf.is_empty() {
        return Err(PuppetError::capture(
            path,
            format!("{} bytes of truncated frame at end of file", buf.len()),
        ));
    }
    Ok(frames)
}
