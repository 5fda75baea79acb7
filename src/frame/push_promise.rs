use std::fmt;

use ntex_bytes::{BufMut, Bytes};

use super::headers::{encode_block, END_HEADERS, PADDED};
use super::{Frame, FrameError, Head, Kind, StreamId};

/// PUSH_PROMISE frame
///
/// Announces a stream the peer intends to open, together with the
/// request header block the pushed response answers.
#[derive(Clone, PartialEq, Eq)]
pub struct PushPromise {
    /// The ID of the stream with which this frame is associated.
    stream_id: StreamId,

    /// The ID of the stream being reserved by this PushPromise.
    promised_id: StreamId,

    /// The header block fragment
    fragment: Bytes,

    /// The associated flags
    flags: u8,
}

impl PushPromise {
    pub fn new(stream_id: StreamId, promised_id: StreamId, fragment: Bytes) -> Self {
        PushPromise {
            stream_id,
            promised_id,
            fragment,
            flags: END_HEADERS,
        }
    }

    pub fn load(head: Head, mut src: Bytes) -> Result<Self, FrameError> {
        if head.stream_id().is_zero() {
            return Err(FrameError::InvalidStreamId);
        }

        // Read the padding length
        let pad = if head.is_flag_set(PADDED) {
            if src.is_empty() {
                return Err(FrameError::MalformedMessage);
            }
            let pad = src[0] as usize;
            let _ = src.split_to(1);
            pad
        } else {
            0
        };

        if src.len() < 4 {
            return Err(FrameError::MalformedMessage);
        }

        let (promised_id, _) = StreamId::parse(&src[..4]);
        let _ = src.split_to(4);

        if pad > src.len() {
            return Err(FrameError::TooMuchPadding);
        }
        src.truncate(src.len() - pad);

        Ok(PushPromise {
            promised_id,
            stream_id: head.stream_id(),
            fragment: src,
            flags: head.flag() & (END_HEADERS | PADDED),
        })
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn promised_id(&self) -> StreamId {
        self.promised_id
    }

    pub fn is_end_headers(&self) -> bool {
        self.flags & END_HEADERS == END_HEADERS
    }

    /// Clear `END_HEADERS`, the block continues in CONTINUATION frames.
    pub fn unset_end_headers(&mut self) {
        self.flags &= !END_HEADERS;
    }

    pub fn fragment(&self) -> &Bytes {
        &self.fragment
    }

    pub fn into_fragment(self) -> Bytes {
        self.fragment
    }

    pub fn encode<B: BufMut>(&self, dst: &mut B, max_size: usize) {
        log::trace!(
            "encoding PUSH_PROMISE; id={:?} promised={:?} len={}",
            self.stream_id,
            self.promised_id,
            self.fragment.len()
        );
        let head = Head::new(Kind::PushPromise, self.flags & END_HEADERS, self.stream_id);
        let promised = u32::from(self.promised_id).to_be_bytes();
        encode_block(head, &promised, &self.fragment, dst, max_size);
    }
}

impl From<PushPromise> for Frame {
    fn from(src: PushPromise) -> Self {
        Frame::PushPromise(src)
    }
}

impl fmt::Debug for PushPromise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushPromise")
            .field("stream_id", &self.stream_id)
            .field("promised_id", &self.promised_id)
            .field("end_headers", &self.is_end_headers())
            .field("fragment_len", &self.fragment.len())
            .finish()
    }
}
