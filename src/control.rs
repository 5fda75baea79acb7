use crate::error::ConnectionError;
use crate::frame::{self, StreamId};
use crate::{hpack::Header, message::Message};

/// Connection level event
#[derive(Debug)]
pub enum Control {
    /// Peer opened a new stream
    NewStream(StreamId),
    /// Peer reserved a stream for a pushed response
    PushPromise {
        stream_id: StreamId,
        promised_id: StreamId,
        headers: Vec<Header>,
    },
    /// Peer's SETTINGS are applied
    Settings(frame::Settings),
    /// Peer acknowledged our SETTINGS
    SettingsAck,
    /// Answer for our PING
    Pong([u8; 8]),
    /// Remote GOAWAY is received
    GoAway(frame::GoAway),
    /// Protocol level error, GOAWAY is sent
    ConnectionError(ConnectionError),
    /// Connection is closed, no more frames are processed
    Closed,
}

/// Receives connection and stream events.
///
/// Callbacks run synchronously while a frame is dispatched, the
/// connection is not accessible from inside of them.
pub trait Observer {
    /// Connection level event
    fn control(&mut self, msg: Control) {
        let _ = msg;
    }

    /// Stream event
    fn message(&mut self, msg: Message) {
        let _ = msg;
    }
}

impl<T: Observer + ?Sized> Observer for Box<T> {
    fn control(&mut self, msg: Control) {
        (**self).control(msg)
    }

    fn message(&mut self, msg: Message) {
        (**self).message(msg)
    }
}
