use std::fmt;

/// A helper macro that unpacks a sequence of 4 bytes found in the buffer with
/// the given identifier, starting at the given offset, into the given integer
/// type. Obviously, the integer type should be able to support at least 4
/// bytes.
///
/// # Examples
///
/// ```ignore
/// # // We ignore this doctest because the macro is not exported.
/// let buf: [u8; 4] = [0, 0, 0, 1];
/// assert_eq!(1u32, unpack_octets_4!(buf, 0, u32));
/// ```
macro_rules! unpack_octets_4 {
    ($buf:expr, $offset:expr, $tip:ty) => {
        (($buf[$offset + 0] as $tip) << 24)
            | (($buf[$offset + 1] as $tip) << 16)
            | (($buf[$offset + 2] as $tip) << 8)
            | (($buf[$offset + 3] as $tip) << 0)
    };
}


mod continuation;
mod data;
mod go_away;
mod head;
mod headers;
mod ping;
mod priority;
mod push_promise;
mod reason;
mod reset;
mod settings;
mod stream_id;
mod util;
mod window_update;

pub use self::continuation::Continuation;
pub use self::data::Data;
pub use self::go_away::GoAway;
pub use self::head::{Head, Kind};
pub use self::headers::Headers;
pub use self::ping::Ping;
pub use self::priority::{Priority, StreamDependency};
pub use self::push_promise::PushPromise;
pub use self::reason::Reason;
pub use self::reset::Reset;
pub use self::settings::{Setting, Settings};
pub use self::stream_id::{StreamId, StreamIdOverflow};
pub use self::window_update::WindowUpdate;

// Re-export some constants
pub use self::settings::{
    DEFAULT_INITIAL_WINDOW_SIZE, DEFAULT_MAX_FRAME_SIZE, DEFAULT_SETTINGS_HEADER_TABLE_SIZE,
    MAX_INITIAL_WINDOW_SIZE, MAX_MAX_FRAME_SIZE,
};

pub type FrameSize = u32;
pub type WindowSize = u32;

pub const HEADER_LEN: usize = 9;

#[derive(Clone)]
pub enum Frame {
    Data(Data),
    Headers(Headers),
    Priority(Priority),
    Reset(Reset),
    Settings(Settings),
    PushPromise(PushPromise),
    Ping(Ping),
    GoAway(GoAway),
    WindowUpdate(WindowUpdate),
    Continuation(Continuation),
    /// Frame of a type this endpoint does not understand, payload dropped
    Unknown { kind: u8, stream_id: StreamId },
}

impl Frame {
    /// Stream the frame is addressed to, zero for connection frames.
    pub fn stream_id(&self) -> StreamId {
        match self {
            Frame::Data(f) => f.stream_id(),
            Frame::Headers(f) => f.stream_id(),
            Frame::Priority(f) => f.stream_id(),
            Frame::Reset(f) => f.stream_id(),
            Frame::PushPromise(f) => f.stream_id(),
            Frame::WindowUpdate(f) => f.stream_id(),
            Frame::Continuation(f) => f.stream_id(),
            Frame::Unknown { stream_id, .. } => *stream_id,
            Frame::Settings(_) | Frame::Ping(_) | Frame::GoAway(_) => StreamId::zero(),
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::Frame::*;

        match *self {
            Data(ref frame) => fmt::Debug::fmt(frame, fmt),
            Headers(ref frame) => fmt::Debug::fmt(frame, fmt),
            Priority(ref frame) => fmt::Debug::fmt(frame, fmt),
            Reset(ref frame) => fmt::Debug::fmt(frame, fmt),
            Settings(ref frame) => fmt::Debug::fmt(frame, fmt),
            PushPromise(ref frame) => fmt::Debug::fmt(frame, fmt),
            Ping(ref frame) => fmt::Debug::fmt(frame, fmt),
            GoAway(ref frame) => fmt::Debug::fmt(frame, fmt),
            WindowUpdate(ref frame) => fmt::Debug::fmt(frame, fmt),
            Continuation(ref frame) => fmt::Debug::fmt(frame, fmt),
            Unknown { kind, stream_id } => fmt
                .debug_struct("Unknown")
                .field("kind", &kind)
                .field("stream_id", &stream_id)
                .finish(),
        }
    }
}

/// Errors that can occur during parsing an HTTP/2 frame.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// A length value other than 8 was set on a PING message.
    #[error("A length value other than 8 was set on a PING message")]
    BadFrameSize,

    /// Frame size exceeded
    #[error("Frame size exceeded")]
    MaxFrameSize,

    /// The padding length was larger than the frame-header-specified
    /// length of the payload.
    #[error("The padding length was larger than the frame-header-specified length of the payload")]
    TooMuchPadding,

    /// The payload length specified by the frame header was not the
    /// value necessary for the specific frame type.
    #[error(
        "The payload length specified by the frame header was not the value necessary for the specific frame type"
    )]
    InvalidPayloadLength,

    /// Received a payload with an ACK settings frame
    #[error("Received a payload with an ACK settings frame")]
    InvalidPayloadAckSettings,

    /// An invalid stream identifier was provided.
    ///
    /// This is returned if a SETTINGS or PING frame is received with a stream
    /// identifier other than zero, or a stream frame with a zero identifier.
    #[error("An invalid stream identifier was provided")]
    InvalidStreamId,

    /// A frame is too short to hold its mandatory fields.
    #[error("A request or response is malformed")]
    MalformedMessage,

    /// An invalid stream dependency ID was provided
    ///
    /// This is returned if a HEADERS or PRIORITY frame is received with an
    /// invalid stream identifier.
    #[error("An invalid stream dependency ID was provided")]
    InvalidDependencyId,

    /// An invalid preface
    #[error("An invalid preface")]
    InvalidPreface,
}

impl FrameError {
    /// Error code reported to the peer for this failure.
    pub fn reason(&self) -> Reason {
        match self {
            FrameError::BadFrameSize
            | FrameError::MaxFrameSize
            | FrameError::InvalidPayloadLength
            | FrameError::InvalidPayloadAckSettings => Reason::FRAME_SIZE_ERROR,
            _ => Reason::PROTOCOL_ERROR,
        }
    }
}

#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ContinuationError {
    /// Continuation frame is expected
    #[error("Continuation frame is expected")]
    Expected,

    /// Continuation frame is unexpected
    #[error("Continuation frame is unexpected")]
    Unexpected,

    /// Continuation frame's stream id is unexpected
    #[error("Continuation frame's stream id is unexpected")]
    UnknownStreamId,

    /// Max number of continuations
    #[error("Max number of continuations")]
    MaxContinuations,

    /// Max left over size
    #[error("Max left over size")]
    MaxLeftoverSize,
}

impl ContinuationError {
    pub fn reason(&self) -> Reason {
        match self {
            ContinuationError::MaxContinuations | ContinuationError::MaxLeftoverSize => {
                Reason::ENHANCE_YOUR_CALM
            }
            _ => Reason::PROTOCOL_ERROR,
        }
    }
}
