// ── Newline-delimited JSON framing ──
//
// One sample per line. The trailing newline makes frames self-delimiting
// without a length prefix, and keeps the wire inspectable with nc/tcpdump.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtoError;
use crate::sample::Sample;

/// Upper bound on a single encoded frame, delimiter included.
///
/// A well-formed sample is well under 200 bytes; anything approaching this
/// limit is a confused or hostile peer.
pub const MAX_FRAME_BYTES: usize = 8 * 1024;

/// Frames [`Sample`]s as newline-delimited JSON for [`tokio_util::codec::Framed`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SampleCodec;

impl Encoder<Sample> for SampleCodec {
    type Error = ProtoError;

    fn encode(&mut self, item: Sample, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item).map_err(|e| ProtoError::Frame {
            reason: e.to_string(),
        })?;

        if json.len() + 1 > MAX_FRAME_BYTES {
            return Err(ProtoError::FrameTooLong {
                len: json.len() + 1,
                max: MAX_FRAME_BYTES,
            });
        }

        dst.reserve(json.len() + 1);
        dst.put_slice(&json);
        dst.put_u8(b'\n');
        Ok(())
    }
}

impl Decoder for SampleCodec {
    type Item = Sample;
    type Error = ProtoError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(pos) = src.iter().position(|&b| b == b'\n') else {
            // No delimiter yet. Refuse to buffer without bound.
            if src.len() > MAX_FRAME_BYTES {
                return Err(ProtoError::FrameTooLong {
                    len: src.len(),
                    max: MAX_FRAME_BYTES,
                });
            }
            return Ok(None);
        };

        let line = src.split_to(pos + 1);
        serde_json::from_slice(&line[..pos]).map(Some).map_err(|e| ProtoError::Frame {
            reason: e.to_string(),
        })
    }
}
