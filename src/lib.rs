//! Sans-IO HTTP/2 session layer.
//!
//! [`Connection`] maps wire frames to logical request/response streams. It
//! drives the stream state machine, keeps per-stream and per-connection flow
//! control windows, assembles header blocks split across CONTINUATION
//! frames and negotiates SETTINGS with the peer.
//!
//! The connection does no I/O. Bytes read from the transport are passed to
//! [`Connection::feed`], encoded frames are taken with
//! [`Connection::take_output`] or written with [`Connection::flush`].
//! Stream and connection events are delivered synchronously to an
//! [`Observer`].
//!
//! # Handshake
//!
//! There are three ways to start a session:
//!
//! * [`Connection::client`], prior knowledge. The client preface and local
//!   SETTINGS are queued immediately.
//! * [`Connection::client_upgraded`], HTTP/1.1 upgrade. Stream 1 carries the
//!   upgrade request and starts half closed (local).
//! * [`Connection::server`], waits for the client preface before any frame
//!   is processed.
//!
//! # Flow control
//!
//! Inbound DATA is charged to the stream and to the connection window,
//! WINDOW_UPDATE frames are queued once half of a window is consumed.
//! Outbound DATA is pulled from a [`DataSource`] as long as both send
//! windows allow, the upload resumes when the peer grants more credit.

#![deny(rust_2018_idioms)]

macro_rules! proto_err {
    (conn: $($msg:tt)+) => {
        log::debug!("connection error PROTOCOL_ERROR -- {};", format_args!($($msg)+))
    };
    (stream: $($msg:tt)+) => {
        log::debug!("stream error PROTOCOL_ERROR -- {};", format_args!($($msg)+))
    };
}

mod config;
mod connection;
mod control;
mod default;
mod dispatcher;
mod error;
mod flow;
mod message;
mod partial;
mod request;
mod source;
mod stream;
mod window;

pub mod codec;
pub mod consts;
pub mod frame;
pub mod hpack;

pub use self::codec::Codec;
pub use self::config::Config;
pub use self::connection::{Connection, Role};
pub use self::control::{Control, Observer};
pub use self::default::DefaultObserver;
pub use self::error::{ConnectionError, OperationError, StreamError};
pub use self::message::{Message, MessageKind};
pub use self::request::PromiseKey;
pub use self::source::{DataSource, UploadBuffer};
pub use self::stream::{Stream, StreamState};
