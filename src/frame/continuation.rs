use std::fmt;

use ntex_bytes::{BufMut, Bytes};

use super::headers::END_HEADERS;
use super::{Frame, FrameError, Head, Kind, StreamId};

/// CONTINUATION frame, the tail of a header block
#[derive(Clone, PartialEq, Eq)]
pub struct Continuation {
    stream_id: StreamId,
    fragment: Bytes,
    end_headers: bool,
}

impl Continuation {
    pub fn new(stream_id: StreamId, fragment: Bytes, end_headers: bool) -> Self {
        Continuation {
            stream_id,
            fragment,
            end_headers,
        }
    }

    pub fn load(head: Head, src: Bytes) -> Result<Self, FrameError> {
        if head.stream_id().is_zero() {
            return Err(FrameError::InvalidStreamId);
        }

        Ok(Continuation {
            stream_id: head.stream_id(),
            end_headers: head.is_flag_set(END_HEADERS),
            fragment: src,
        })
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn is_end_headers(&self) -> bool {
        self.end_headers
    }

    pub fn fragment(&self) -> &Bytes {
        &self.fragment
    }

    pub fn into_fragment(self) -> Bytes {
        self.fragment
    }

    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        log::trace!(
            "encoding CONTINUATION; id={:?} len={} end_headers={}",
            self.stream_id,
            self.fragment.len(),
            self.end_headers
        );
        let flags = if self.end_headers { END_HEADERS } else { 0 };
        Head::new(Kind::Continuation, flags, self.stream_id).encode(self.fragment.len(), dst);
        dst.put_slice(&self.fragment);
    }
}

impl From<Continuation> for Frame {
    fn from(src: Continuation) -> Self {
        Frame::Continuation(src)
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("stream_id", &self.stream_id)
            .field("end_headers", &self.end_headers)
            .field("fragment_len", &self.fragment.len())
            .finish()
    }
}
