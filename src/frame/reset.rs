use ntex_bytes::BufMut;

use crate::frame::{Frame, FrameError, Head, Kind, Reason, StreamId};

/// RST_STREAM frame, terminates one stream.
///
/// Stream id zero is accepted here, the connection rejects it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Reset {
    stream_id: StreamId,
    reason: Reason,
}

impl Reset {
    pub fn new(stream_id: StreamId, reason: Reason) -> Reset {
        Reset { stream_id, reason }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }

    pub fn load(head: Head, payload: &[u8]) -> Result<Reset, FrameError> {
        if payload.len() != 4 {
            log::trace!("RST_STREAM payload of {}B", payload.len());
            return Err(FrameError::InvalidPayloadLength);
        }

        Ok(Reset {
            stream_id: head.stream_id(),
            reason: unpack_octets_4!(payload, 0, u32).into(),
        })
    }

    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        log::trace!("encoding RST_STREAM; id={:?} reason={:?}", self.stream_id, self.reason);

        Head::new(Kind::Reset, 0, self.stream_id).encode(4, dst);
        dst.put_u32(self.reason.into());
    }
}

impl From<Reset> for Frame {
    fn from(src: Reset) -> Self {
        Frame::Reset(src)
    }
}
