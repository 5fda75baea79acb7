use std::mem;

use ntex_bytes::Bytes;

use crate::error::OperationError;
use crate::frame::StreamId;
use crate::{hpack::Header, stream::StreamState};

/// Per-stream event
#[derive(Debug)]
pub struct Message {
    pub stream_id: StreamId,
    pub kind: MessageKind,
}

#[derive(Debug)]
pub enum MessageKind {
    /// Decoded header block, trailers included
    Headers { headers: Vec<Header>, eof: bool },
    /// DATA payload
    Data { data: Bytes, eof: bool },
    /// Stream moved to a new state
    State(StreamState),
    /// Upload waits for the peer to grant more window
    UploadBlocked,
    /// Stream is closed because of an error
    Failed(OperationError),
    Empty,
}

impl Message {
    pub(crate) fn new(stream_id: StreamId, kind: MessageKind) -> Self {
        Message { stream_id, kind }
    }

    pub(crate) fn headers(stream_id: StreamId, headers: Vec<Header>, eof: bool) -> Self {
        Message::new(stream_id, MessageKind::Headers { headers, eof })
    }

    pub(crate) fn data(stream_id: StreamId, data: Bytes, eof: bool) -> Self {
        Message::new(stream_id, MessageKind::Data { data, eof })
    }

    pub(crate) fn error(stream_id: StreamId, err: OperationError) -> Self {
        Message::new(stream_id, MessageKind::Failed(err))
    }

    pub fn id(&self) -> StreamId {
        self.stream_id
    }

    pub fn kind(&mut self) -> &mut MessageKind {
        &mut self.kind
    }
}

impl MessageKind {
    pub fn take(&mut self) -> MessageKind {
        mem::replace(self, MessageKind::Empty)
    }
}
