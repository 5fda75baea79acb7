use crate::frame::{self, ContinuationError, FrameError, GoAway, Reason, StreamId};
use crate::stream::StreamState;
use crate::{codec, hpack};

/// Errors that are fatal to the whole connection
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("Continuation error: {0}")]
    Continuation(#[from] ContinuationError),
    #[error("Hpack decoding error: {0}")]
    Decoder(#[from] hpack::DecoderError),
    #[error("Frame encoding error: {0}")]
    Encoder(#[from] codec::EncoderError),
    #[error("{0} frame on connection stream")]
    ZeroStreamId(&'static str),
    #[error("{0} frame on unknown stream {1}")]
    UnknownStream(&'static str, StreamId),
    #[error("RST_STREAM on idle stream {0}")]
    ResetOnIdleStream(StreamId),
    #[error("Stream id {0} is not valid for remote peer")]
    InvalidRemoteStreamId(StreamId),
    #[error("Connection flow control window exceeded")]
    FlowControlViolation,
    #[error("Window update value is zero")]
    ZeroWindowUpdate,
    #[error("Window update overflows connection window")]
    WindowOverflow,
    #[error("Unexpected SETTINGS ack")]
    UnexpectedSettingsAck,
    #[error("Invalid setting value {0:?}")]
    InvalidSetting(frame::Setting),
    #[error("Initial window size exceeds max window size")]
    InvalidInitialWindowSize,
    #[error("Unexpected PING ack")]
    UnexpectedPingAck,
    #[error("Unexpected PUSH_PROMISE frame")]
    UnexpectedPushPromise,
    #[error("PUSH_PROMISE for stream {0} in invalid state")]
    InvalidPushStream(StreamId),
    #[error("Invalid promised stream id {0}")]
    InvalidPromisedId(StreamId),
    #[error("Empty header list for non empty PUSH_PROMISE")]
    EmptyPushPromise,
    #[error("GOAWAY with invalid last stream id {0}")]
    InvalidGoAwayStreamId(StreamId),
}

impl ConnectionError {
    /// Error code reported to the peer
    pub fn reason(&self) -> Reason {
        match self {
            ConnectionError::Frame(err) => err.reason(),
            ConnectionError::Continuation(err) => err.reason(),
            ConnectionError::Decoder(_) => Reason::COMPRESSION_ERROR,
            ConnectionError::Encoder(_) => Reason::INTERNAL_ERROR,
            ConnectionError::UnknownStream(..) => Reason::ENHANCE_YOUR_CALM,
            ConnectionError::FlowControlViolation | ConnectionError::InvalidInitialWindowSize => {
                Reason::FLOW_CONTROL_ERROR
            }
            ConnectionError::EmptyPushPromise => Reason::FRAME_SIZE_ERROR,
            ConnectionError::ZeroStreamId(_)
            | ConnectionError::ResetOnIdleStream(_)
            | ConnectionError::InvalidRemoteStreamId(_)
            | ConnectionError::ZeroWindowUpdate
            | ConnectionError::WindowOverflow
            | ConnectionError::UnexpectedSettingsAck
            | ConnectionError::InvalidSetting(_)
            | ConnectionError::UnexpectedPingAck
            | ConnectionError::UnexpectedPushPromise
            | ConnectionError::InvalidPushStream(_)
            | ConnectionError::InvalidPromisedId(_)
            | ConnectionError::InvalidGoAwayStreamId(_) => Reason::PROTOCOL_ERROR,
        }
    }

    /// GOAWAY frame announcing this error, last stream id is not set
    pub fn to_goaway(&self) -> GoAway {
        GoAway::new(self.reason()).set_data(format!("{}", self))
    }
}

/// Errors that close a single stream
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("Stream flow control window exceeded")]
    FlowControlViolation,
    #[error("Window update value is zero")]
    ZeroWindowUpdate,
    #[error("Window update overflows stream window")]
    WindowOverflow,
    #[error("Initial window size change overflows stream window")]
    InitialWindowOverflow,
    #[error("Unexpected HEADERS frame")]
    UnexpectedHeadersFrame,
    #[error("DATA frame on closed stream")]
    StreamClosed,
    #[error("Unexpected DATA frame")]
    UnexpectedDataFrame,
    #[error("Header list exceeds max header list size")]
    HeaderListTooLarge,
    #[error("Stream is refused")]
    Refused,
    #[error("Promised request is malformed")]
    MalformedPushPromise,
    #[error("Internal error: {0}")]
    InternalError(&'static str),
}

impl StreamError {
    /// Error code sent with RST_STREAM
    pub fn reason(&self) -> Reason {
        match self {
            StreamError::FlowControlViolation => Reason::FLOW_CONTROL_ERROR,
            StreamError::UnexpectedHeadersFrame => Reason::CANCEL,
            StreamError::StreamClosed => Reason::STREAM_CLOSED,
            StreamError::Refused => Reason::REFUSED_STREAM,
            StreamError::InternalError(_) => Reason::INTERNAL_ERROR,
            StreamError::ZeroWindowUpdate
            | StreamError::WindowOverflow
            | StreamError::InitialWindowOverflow
            | StreamError::UnexpectedDataFrame
            | StreamError::HeaderListTooLarge
            | StreamError::MalformedPushPromise => Reason::PROTOCOL_ERROR,
        }
    }
}

/// Errors of local operations, also delivered to streams that fail
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("Stream ids are exhausted, new connection is required")]
    StreamIdsExhausted,
    #[error("Peer's max concurrent streams limit is reached")]
    MaxConcurrentStreamsReached,
    #[error("Connection is going away")]
    GoingAway,
    #[error("Stream is unknown")]
    UnknownStream,
    #[error("Operation is not allowed in {0:?} state")]
    UnexpectedState(StreamState),
    #[error("Upload is in progress")]
    UploadInProgress,
    #[error("Header list exceeds peer's max header list size")]
    HeaderListTooLarge,
    #[error("Header encoding error: {0}")]
    Encoder(#[from] hpack::EncoderError),
    #[error("Frame encoding error: {0}")]
    FrameEncoder(#[from] codec::EncoderError),
    #[error("{0}")]
    Stream(#[from] StreamError),
    #[error("Stream is reset by peer: {0}")]
    RemoteReset(Reason),
    #[error("GOAWAY received: {0}")]
    GoAway(Reason),
    #[error("{0}")]
    Connection(#[from] ConnectionError),
    #[error("Disconnected")]
    Disconnected,
    #[error("Connection is closed")]
    Closed,
}
