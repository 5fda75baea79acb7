use ntex_bytes::BufMut;

use crate::frame::{Frame, FrameError, Head, Kind, StreamId};

const ACK: u8 = 0x1;
const PING_LEN: usize = 8;

/// PING frame, a request or the acknowledgement of one.
///
/// The opaque payload is echoed back unchanged by the peer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Ping {
    ack: bool,
    payload: [u8; PING_LEN],
}

impl Ping {
    pub fn new(payload: [u8; PING_LEN]) -> Ping {
        Ping {
            ack: false,
            payload,
        }
    }

    /// Acknowledgement for a received PING
    pub fn pong(payload: [u8; PING_LEN]) -> Ping {
        Ping { ack: true, payload }
    }

    pub fn is_ack(&self) -> bool {
        self.ack
    }

    pub fn payload(&self) -> &[u8; PING_LEN] {
        &self.payload
    }

    pub fn into_payload(self) -> [u8; PING_LEN] {
        self.payload
    }

    /// Connection level frame with exactly eight octets of payload
    pub fn load(head: Head, src: &[u8]) -> Result<Ping, FrameError> {
        debug_assert_eq!(head.kind(), Kind::Ping);

        if !head.stream_id().is_zero() {
            return Err(FrameError::InvalidStreamId);
        }
        let payload: [u8; PING_LEN] = src.try_into().map_err(|_| {
            log::trace!("PING payload of {}B", src.len());
            FrameError::BadFrameSize
        })?;

        Ok(Ping {
            ack: head.flag() & ACK == ACK,
            payload,
        })
    }

    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        log::trace!("encoding PING; ack={} payload={:?}", self.ack, self.payload);

        let flags = if self.ack { ACK } else { 0 };
        Head::new(Kind::Ping, flags, StreamId::zero()).encode(PING_LEN, dst);
        dst.put_slice(&self.payload);
    }
}

impl From<Ping> for Frame {
    fn from(src: Ping) -> Frame {
        Frame::Ping(src)
    }
}
