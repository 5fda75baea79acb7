use std::cell::RefCell;

use ntex_bytes::BytesMut;
use ntex_codec::{Decoder, Encoder};

mod error;

pub use self::error::EncoderError;

use crate::frame::{self, Frame, FrameError, Kind};

/// HTTP/2 frame codec.
///
/// Splits a byte stream into typed frames and serializes frames back.
/// Header blocks pass through undecoded, HPACK state lives in the
/// connection.
#[derive(Debug)]
pub struct Codec(RefCell<CodecInner>);

#[derive(Debug)]
struct CodecInner {
    // Max frame size we accept, advertised in our SETTINGS
    decoder_max_frame_size: frame::FrameSize,
    // Max frame size, this is specified by the peer
    encoder_max_frame_size: frame::FrameSize,
}

impl Default for Codec {
    #[inline]
    /// Returns a new `Codec` with the default max frame size
    fn default() -> Self {
        Codec(RefCell::new(CodecInner {
            decoder_max_frame_size: frame::DEFAULT_MAX_FRAME_SIZE,
            encoder_max_frame_size: frame::DEFAULT_MAX_FRAME_SIZE,
        }))
    }
}

impl Codec {
    /// Updates the max received frame size.
    ///
    /// The change takes effect the next time a frame is decoded. In other
    /// words, if a frame is currently in process of being decoded with a frame
    /// size greater than `val` but less than the max frame size in effect
    /// before calling this function, then the frame will be allowed.
    #[inline]
    pub fn set_recv_frame_size(&self, val: usize) {
        assert!(
            frame::DEFAULT_MAX_FRAME_SIZE as usize <= val
                && val <= frame::MAX_MAX_FRAME_SIZE as usize
        );
        self.0.borrow_mut().decoder_max_frame_size = val as frame::FrameSize;
    }

    /// Max received frame size.
    pub fn recv_frame_size(&self) -> usize {
        self.0.borrow().decoder_max_frame_size as usize
    }

    /// Set the peer's max frame size.
    pub fn set_send_frame_size(&self, val: usize) {
        assert!(val <= frame::MAX_MAX_FRAME_SIZE as usize);
        self.0.borrow_mut().encoder_max_frame_size = val as frame::FrameSize;
    }

    /// Peer's max frame size.
    pub fn send_frame_size(&self) -> usize {
        self.0.borrow().encoder_max_frame_size as usize
    }
}

impl Decoder for Codec {
    type Item = Frame;
    type Error = FrameError;

    /// Decodes a frame.
    ///
    /// Returns `Ok(None)` until a complete frame is buffered.
    fn decode(&self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        if src.len() < frame::HEADER_LEN {
            return Ok(None);
        }

        let len = ((src[0] as usize) << 16) | ((src[1] as usize) << 8) | (src[2] as usize);
        if len > self.0.borrow().decoder_max_frame_size as usize {
            proto_err!(conn: "frame size {} exceeds limit", len);
            return Err(FrameError::MaxFrameSize);
        }
        if src.len() < frame::HEADER_LEN + len {
            return Ok(None);
        }

        log::trace!("decoding frame from {}B", src.len());

        let mut bytes = src.split_to(frame::HEADER_LEN + len);
        let head = frame::Head::parse(&bytes);
        let raw_kind = bytes[3];
        let payload = bytes.split_off(frame::HEADER_LEN).freeze();

        let frame = match head.kind() {
            Kind::Data => frame::Data::load(head, payload)
                .map_err(|e| {
                    proto_err!(conn: "failed to load DATA frame; err={:?}", e);
                    e
                })?
                .into(),
            Kind::Headers => frame::Headers::load(head, payload)
                .map_err(|e| {
                    proto_err!(conn: "failed to load HEADERS frame; err={:?}", e);
                    e
                })?
                .into(),
            Kind::Priority => match frame::Priority::load(head, &payload) {
                Ok(frame) => frame.into(),
                Err(e) => {
                    proto_err!(conn: "failed to load PRIORITY frame; err={:?};", e);
                    return Err(e);
                }
            },
            Kind::Reset => frame::Reset::load(head, &payload)
                .map_err(|e| {
                    proto_err!(conn: "failed to load RESET frame; err={:?}", e);
                    e
                })?
                .into(),
            Kind::Settings => frame::Settings::load(head, &payload)
                .map_err(|e| {
                    proto_err!(conn: "failed to load SETTINGS frame; err={:?}", e);
                    e
                })?
                .into(),
            Kind::PushPromise => frame::PushPromise::load(head, payload)
                .map_err(|e| {
                    proto_err!(conn: "failed to load PUSH_PROMISE frame; err={:?}", e);
                    e
                })?
                .into(),
            Kind::Ping => frame::Ping::load(head, &payload)
                .map_err(|e| {
                    proto_err!(conn: "failed to load PING frame; err={:?}", e);
                    e
                })?
                .into(),
            Kind::GoAway => frame::GoAway::load(head, &payload)
                .map_err(|e| {
                    proto_err!(conn: "failed to load GO_AWAY frame; err={:?}", e);
                    e
                })?
                .into(),
            Kind::WindowUpdate => frame::WindowUpdate::load(head, &payload)
                .map_err(|e| {
                    proto_err!(conn: "failed to load WINDOW_UPDATE frame; err={:?}", e);
                    e
                })?
                .into(),
            Kind::Continuation => frame::Continuation::load(head, payload)
                .map_err(|e| {
                    proto_err!(conn: "failed to load CONTINUATION frame; err={:?}", e);
                    e
                })?
                .into(),
            Kind::Unknown => {
                log::trace!("skipping unknown frame type {:#x}", raw_kind);
                Frame::Unknown {
                    kind: raw_kind,
                    stream_id: head.stream_id(),
                }
            }
        };

        Ok(Some(frame))
    }
}

impl Encoder for Codec {
    type Item = Frame;
    type Error = EncoderError;

    fn encode(&self, item: Frame, buf: &mut BytesMut) -> Result<(), EncoderError> {
        let max_size = self.0.borrow().encoder_max_frame_size as usize;

        match item {
            Frame::Data(v) => {
                // Ensure that the payload is not greater than the max frame.
                if v.payload().len() > max_size {
                    return Err(EncoderError::MaxSizeExceeded);
                }
                v.encode(buf);
            }
            Frame::Headers(v) => v.encode(buf, max_size),
            Frame::PushPromise(v) => v.encode(buf, max_size),
            Frame::Continuation(v) => v.encode(buf),
            Frame::Priority(v) => v.encode(buf),
            Frame::Reset(v) => v.encode(buf),
            Frame::Settings(v) => v.encode(buf),
            Frame::Ping(v) => v.encode(buf),
            Frame::GoAway(v) => v.encode(buf),
            Frame::WindowUpdate(v) => v.encode(buf),
            Frame::Unknown { kind, .. } => {
                log::trace!("dropping unknown frame type {:#x} on encode", kind);
            }
        }

        Ok(())
    }
}
