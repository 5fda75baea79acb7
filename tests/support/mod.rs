#![allow(dead_code)]
use std::{cell::RefCell, rc::Rc};

use ntex_bytes::{Bytes, BytesMut};
use ntex_codec::{Decoder as _, Encoder as _};
use ntex_h2_session::frame::{self, Frame, StreamId};
use ntex_h2_session::hpack::{self, Header};
use ntex_h2_session::{Codec, Config, Connection, Control, Message, MessageKind, Observer};

pub mod frames;
mod utils;

pub use self::utils::*;

pub const PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

pub fn init_log() {
    let _ = env_logger::try_init();
}

/// Events collected from a connection
#[derive(Debug, Default)]
pub struct Events {
    pub controls: Vec<Control>,
    pub messages: Vec<Message>,
}

/// Observer that records every event, clones share the log
#[derive(Clone, Debug, Default)]
pub struct Recorder(Rc<RefCell<Events>>);

impl Recorder {
    pub fn take_controls(&self) -> Vec<Control> {
        std::mem::take(&mut self.0.borrow_mut().controls)
    }

    pub fn take_messages(&self) -> Vec<Message> {
        std::mem::take(&mut self.0.borrow_mut().messages)
    }

    pub fn clear(&self) {
        let mut events = self.0.borrow_mut();
        events.controls.clear();
        events.messages.clear();
    }

    /// Message kinds reported for one stream
    pub fn stream_events(&self, id: u32) -> Vec<MessageKind> {
        let mut events = self.0.borrow_mut();
        let (matched, rest): (Vec<Message>, Vec<Message>) =
            std::mem::take(&mut events.messages)
                .into_iter()
                .partition(|msg| msg.id() == id);
        events.messages = rest;
        matched.into_iter().map(|msg| msg.kind).collect()
    }
}

impl Observer for Recorder {
    fn control(&mut self, msg: Control) {
        log::trace!("control event: {:?}", msg);
        self.0.borrow_mut().controls.push(msg);
    }

    fn message(&mut self, msg: Message) {
        log::trace!("stream event: {:?}", msg);
        self.0.borrow_mut().messages.push(msg);
    }
}

/// Scripted remote endpoint.
///
/// Has its own frame codec and HPACK context, encodes frames for the
/// connection under test and decodes whatever it sends back.
pub struct Peer {
    codec: Codec,
    encoder: hpack::Encoder,
    decoder: hpack::Decoder,
    read_buf: BytesMut,
}

impl Default for Peer {
    fn default() -> Self {
        Peer::new()
    }
}

impl Peer {
    pub fn new() -> Self {
        Peer {
            codec: Codec::default(),
            encoder: hpack::Encoder::new(false),
            decoder: hpack::Decoder::new(),
            read_buf: BytesMut::new(),
        }
    }

    /// HPACK encoded header block
    pub fn block(&mut self, headers: &[Header]) -> Bytes {
        let mut buf = BytesMut::new();
        self.encoder.encode(headers, &mut buf).unwrap();
        buf.freeze()
    }

    /// HEADERS frame with an encoded block
    pub fn headers<T: Into<StreamId>>(
        &mut self,
        id: T,
        headers: &[Header],
        eof: bool,
    ) -> frame::Headers {
        let block = self.block(headers);
        frame::Headers::new(id.into(), block, eof)
    }

    pub fn encode<T: Into<Frame>>(&self, frm: T) -> BytesMut {
        let mut buf = BytesMut::new();
        self.codec.encode(frm.into(), &mut buf).unwrap();
        buf
    }

    /// Encode the frame and feed it to the connection
    pub fn send<O: Observer, T: Into<Frame>>(
        &self,
        con: &mut Connection<O>,
        frm: T,
    ) -> Result<(), ntex_h2_session::ConnectionError> {
        let buf = self.encode(frm);
        con.feed(&buf)
    }

    /// Decode every frame the connection has written so far
    pub fn recv<O: Observer>(&mut self, con: &mut Connection<O>) -> Vec<Frame> {
        self.read_buf.extend_from_slice(&con.take_output());
        if self.read_buf.starts_with(PREFACE) {
            let _ = self.read_buf.split_to(PREFACE.len());
        }

        let mut frames = Vec::new();
        while let Some(frm) = self.codec.decode(&mut self.read_buf).unwrap() {
            frames.push(frm);
        }
        frames
    }

    /// Decode the header block of a HEADERS frame sent by the connection
    pub fn decode_headers(&mut self, frm: &frame::Headers) -> Vec<Header> {
        self.decoder.decode(frm.fragment()).unwrap()
    }
}

/// Client connection after a complete SETTINGS exchange
pub fn client(config: Config) -> (Connection<Recorder>, Peer, Recorder) {
    init_log();
    let events = Recorder::default();
    let mut con = Connection::client(config, events.clone());
    let mut peer = Peer::new();

    let frames = peer.recv(&mut con);
    assert!(matches!(frames[0], Frame::Settings(_)), "{:?}", frames);

    peer.send(&mut con, frame::Settings::default()).unwrap();
    peer.send(&mut con, frame::Settings::ack()).unwrap();
    let frames = peer.recv(&mut con);
    assert_eq!(frames.len(), 1, "{:?}", frames);
    assert!(!con.is_waiting_ack());
    events.clear();

    (con, peer, events)
}

/// Server connection after the preface and a complete SETTINGS exchange
pub fn server(config: Config) -> (Connection<Recorder>, Peer, Recorder) {
    init_log();
    let events = Recorder::default();
    let mut con = Connection::server(config, events.clone());
    let mut peer = Peer::new();

    let frames = peer.recv(&mut con);
    assert!(matches!(frames[0], Frame::Settings(_)), "{:?}", frames);

    con.feed(PREFACE).unwrap();
    peer.send(&mut con, frame::Settings::default()).unwrap();
    peer.send(&mut con, frame::Settings::ack()).unwrap();
    let frames = peer.recv(&mut con);
    assert_eq!(frames.len(), 1, "{:?}", frames);
    assert!(!con.is_waiting_ack());
    events.clear();

    (con, peer, events)
}

#[macro_export]
macro_rules! get_frame {
    ($type: ident, $frm: expr) => {{
        use ntex_h2_session::frame::Frame;

        match $frm {
            Frame::$type(frame) => frame,
            frame => panic!("unexpected frame; actual={:?}", frame),
        }
    }};
}
