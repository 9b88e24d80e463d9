//! Frame codec: `[length: u32][kind: u32][payload: length bytes]`
//!
//! The codec knows nothing about command semantics. It delimits frames,
//! leaves partial frames in the buffer until the rest arrives, and rejects
//! headers that cannot belong to a valid stream.

use super::command::Command;
use super::error::FrameError;
use super::kind::CommandKind;
use super::stream::WireWriter;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Bytes in the frame header (length + kind)
pub const FRAME_HEADER_LEN: usize = 8;

/// Largest payload accepted from the peer (256 MiB)
pub const MAX_FRAME_PAYLOAD: usize = 256 * 1024 * 1024;

/// A delimited frame whose payload has not been interpreted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub kind: u32,
    pub payload: Bytes,
}

impl RawFrame {
    pub fn from_command(command: &Command) -> Self {
        Self {
            kind: command.kind().as_u32(),
            payload: command.payload(),
        }
    }

    /// The known kind, or `None` for kinds added by newer peers
    pub fn known_kind(&self) -> Option<CommandKind> {
        CommandKind::from_u32(self.kind)
    }

    /// Decode the payload into a command.
    ///
    /// Returns `Ok(None)` for unknown kinds.
    pub fn decode(&self) -> Result<Option<Command>, FrameError> {
        let Some(kind) = self.known_kind() else {
            return Ok(None);
        };
        Command::decode(kind, self.payload.clone())
            .map(Some)
            .map_err(|source| FrameError::Payload {
                kind: kind.name(),
                source,
            })
    }

    /// Header plus payload as it appears on the wire
    pub fn to_wire(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(FRAME_HEADER_LEN + self.payload.len());
        out.put_u32(self.payload.len() as u32);
        out.put_u32(self.kind);
        out.put_slice(&self.payload);
        out.freeze()
    }
}

/// Encode a command as one complete frame.
pub fn encode_frame(command: &Command) -> Bytes {
    let mut payload = WireWriter::new();
    command.write_payload(&mut payload);
    let payload = payload.finish();
    let mut out = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
    out.put_u32(payload.len() as u32);
    out.put_u32(command.kind().as_u32());
    out.put_slice(&payload);
    out.freeze()
}

/// Try to split one frame off the front of `buf`.
///
/// `Ok(None)` means more bytes are needed; nothing is consumed in that case.
pub fn decode_frame(buf: &mut BytesMut) -> Result<Option<RawFrame>, FrameError> {
    if buf.len() < FRAME_HEADER_LEN {
        return Ok(None);
    }
    let length = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    let kind = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
    if length > MAX_FRAME_PAYLOAD {
        return Err(FrameError::Oversized {
            length,
            limit: MAX_FRAME_PAYLOAD,
        });
    }
    if kind == 0 {
        return Err(FrameError::ReservedKind);
    }
    if buf.len() < FRAME_HEADER_LEN + length {
        buf.reserve(FRAME_HEADER_LEN + length - buf.len());
        return Ok(None);
    }
    buf.advance(FRAME_HEADER_LEN);
    let payload = buf.split_to(length).freeze();
    Ok(Some(RawFrame { kind, payload }))
}

/// `tokio_util` codec used by both ends of the channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = RawFrame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src)
    }
}

impl Encoder<&Command> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode(RawFrame::from_command(item), dst)
    }
}

/// Frames the peer would reject are refused before anything is written.
impl Encoder<RawFrame> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: RawFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let length = item.payload.len();
        if length > MAX_FRAME_PAYLOAD {
            return Err(FrameError::Oversized {
                length,
                limit: MAX_FRAME_PAYLOAD,
            });
        }
        dst.reserve(FRAME_HEADER_LEN + length);
        dst.put_u32(length as u32);
        dst.put_u32(item.kind);
        dst.extend_from_slice(&item.payload);
        Ok(())
    }
}
