use ntex_bytes::{Bytes, BytesMut};

use crate::frame::{Continuation, ContinuationError, StreamId};

/// Header block that is still waiting for CONTINUATION frames.
#[derive(Debug)]
pub(crate) struct Partial {
    stream_id: StreamId,
    kind: BlockKind,
    buf: BytesMut,
    continuations: usize,
}

/// Frame that started the header block
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum BlockKind {
    Headers { eof: bool },
    PushPromise { promised_id: StreamId },
}

impl Partial {
    pub(crate) fn new(stream_id: StreamId, kind: BlockKind, fragment: &[u8]) -> Self {
        let mut buf = BytesMut::with_capacity(fragment.len());
        buf.extend_from_slice(fragment);
        Partial {
            stream_id,
            kind,
            buf,
            continuations: 0,
        }
    }

    pub(crate) fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    /// Append a CONTINUATION fragment.
    ///
    /// Returns true once the header block is complete.
    pub(crate) fn extend(
        &mut self,
        frm: &Continuation,
        max_continuations: usize,
    ) -> Result<bool, ContinuationError> {
        if frm.stream_id() != self.stream_id {
            proto_err!(conn: "CONTINUATION for {:?}, expected {:?}", frm.stream_id(), self.stream_id);
            return Err(ContinuationError::UnknownStreamId);
        }

        self.continuations += 1;
        if self.continuations > max_continuations {
            log::debug!(
                "too many CONTINUATION frames for {:?}; max={}",
                self.stream_id,
                max_continuations
            );
            return Err(ContinuationError::MaxContinuations);
        }

        self.buf.extend_from_slice(frm.fragment());
        Ok(frm.is_end_headers())
    }

    /// Complete header block
    pub(crate) fn into_block(self) -> (StreamId, BlockKind, Bytes) {
        (self.stream_id, self.kind, self.buf.freeze())
    }
}
