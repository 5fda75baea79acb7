use std::{cmp, fmt};

use ntex_bytes::{BufMut, Bytes};

use super::priority::StreamDependency;
use super::{util, Frame, FrameError, Head, Kind, StreamId};

/// Header frame
///
/// Carries the raw HPACK block fragment. Decoding happens once the whole
/// header block, including any CONTINUATION frames, has been assembled.
#[derive(Clone, PartialEq, Eq)]
pub struct Headers {
    /// The ID of the stream with which this frame is associated.
    stream_id: StreamId,

    /// The stream dependency information, if any.
    stream_dep: Option<StreamDependency>,

    /// The header block fragment
    fragment: Bytes,

    /// The associated flags
    flags: HeadersFlag,
}

#[derive(Copy, Clone, Eq, PartialEq)]
pub struct HeadersFlag(u8);

pub(super) const END_STREAM: u8 = 0x1;
pub(super) const END_HEADERS: u8 = 0x4;
pub(super) const PADDED: u8 = 0x8;
const PRIORITY: u8 = 0x20;
const ALL: u8 = END_STREAM | END_HEADERS | PADDED | PRIORITY;

// ===== impl Headers =====

impl Headers {
    /// Create a new HEADERS frame carrying a complete header block
    pub fn new(stream_id: StreamId, fragment: Bytes, eof: bool) -> Self {
        let mut flags = HeadersFlag::default();
        if eof {
            flags.set_end_stream();
        }
        Headers {
            flags,
            stream_id,
            fragment,
            stream_dep: None,
        }
    }

    /// Loads the header frame, stripping padding and priority fields.
    ///
    /// HPACK decoding is done once the header block is complete.
    pub fn load(head: Head, mut src: Bytes) -> Result<Self, FrameError> {
        let flags = HeadersFlag::load(head.flag());

        if head.stream_id().is_zero() {
            return Err(FrameError::InvalidStreamId);
        }

        // Read the padding length
        let pad = if flags.is_padded() {
            if src.is_empty() {
                return Err(FrameError::MalformedMessage);
            }
            let pad = src[0] as usize;

            // Drop the padding
            let _ = src.split_to(1);
            pad
        } else {
            0
        };

        // Read the stream dependency
        let stream_dep = if flags.is_priority() {
            if src.len() < 5 {
                return Err(FrameError::MalformedMessage);
            }
            let stream_dep = StreamDependency::load(&src[..5])?;

            if stream_dep.dependency_id() == head.stream_id() {
                return Err(FrameError::InvalidDependencyId);
            }

            // Drop the next 5 bytes
            let _ = src.split_to(5);
            Some(stream_dep)
        } else {
            None
        };

        if pad > 0 {
            if pad > src.len() {
                return Err(FrameError::TooMuchPadding);
            }
            src.truncate(src.len() - pad);
        }

        Ok(Headers {
            flags,
            stream_dep,
            stream_id: head.stream_id(),
            fragment: src,
        })
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn is_end_headers(&self) -> bool {
        self.flags.is_end_headers()
    }

    pub fn set_end_headers(&mut self) {
        self.flags.set_end_headers();
    }

    /// Clear `END_HEADERS`, the block continues in CONTINUATION frames.
    pub fn unset_end_headers(&mut self) {
        self.flags.0 &= !END_HEADERS;
    }

    pub fn is_end_stream(&self) -> bool {
        self.flags.is_end_stream()
    }

    pub fn set_end_stream(&mut self) {
        self.flags.set_end_stream()
    }

    pub fn stream_dep(&self) -> Option<&StreamDependency> {
        self.stream_dep.as_ref()
    }

    pub fn set_stream_dep(&mut self, dep: StreamDependency) {
        self.flags.0 |= PRIORITY;
        self.stream_dep = Some(dep);
    }

    pub fn fragment(&self) -> &Bytes {
        &self.fragment
    }

    pub fn into_fragment(self) -> Bytes {
        self.fragment
    }

    /// Encode the frame, splitting the header block into CONTINUATION
    /// frames of at most `max_size` payload octets.
    pub fn encode<B: BufMut>(&self, dst: &mut B, max_size: usize) {
        log::trace!(
            "encoding HEADERS; id={:?} len={} flags={:?}",
            self.stream_id,
            self.fragment.len(),
            self.flags
        );
        // padding is never sent
        let flags = self.flags.0 & !PADDED;
        let head = Head::new(Kind::Headers, flags, self.stream_id);

        let mut prefix = [0u8; 5];
        let prefix = if let Some(ref dep) = self.stream_dep {
            dep.encode(&mut prefix[..]);
            &prefix[..]
        } else {
            &prefix[..0]
        };
        encode_block(head, prefix, &self.fragment, dst, max_size);
    }
}

/// Write a header block as one leading frame followed by as many
/// CONTINUATION frames as needed.
///
/// `END_HEADERS` from `head` moves to the last frame written.
pub(super) fn encode_block<B: BufMut>(
    head: Head,
    prefix: &[u8],
    fragment: &[u8],
    dst: &mut B,
    max_size: usize,
) {
    let end_headers = head.flag() & END_HEADERS;
    let first = cmp::min(fragment.len(), max_size.saturating_sub(prefix.len()));

    let flags = if first < fragment.len() {
        head.flag() & !END_HEADERS
    } else {
        head.flag()
    };
    Head::new(head.kind(), flags, head.stream_id()).encode(prefix.len() + first, dst);
    dst.put_slice(prefix);
    dst.put_slice(&fragment[..first]);

    let mut start = first;
    while start < fragment.len() {
        let end = cmp::min(start + max_size, fragment.len());
        let flag = if end == fragment.len() { end_headers } else { 0 };

        Head::new(Kind::Continuation, flag, head.stream_id()).encode(end - start, dst);
        dst.put_slice(&fragment[start..end]);
        start = end;
    }
}

impl From<Headers> for Frame {
    fn from(src: Headers) -> Self {
        Frame::Headers(src)
    }
}

impl fmt::Debug for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("Headers");
        builder
            .field("stream_id", &self.stream_id)
            .field("flags", &self.flags);

        if let Some(ref dep) = self.stream_dep {
            builder.field("stream_dep", dep);
        }

        // `fragment` bytes purposefully not included
        builder.field("fragment_len", &self.fragment.len()).finish()
    }
}

// ===== impl HeadersFlag =====

impl HeadersFlag {
    pub fn load(bits: u8) -> HeadersFlag {
        HeadersFlag(bits & ALL)
    }

    pub fn is_end_stream(&self) -> bool {
        self.0 & END_STREAM == END_STREAM
    }

    pub fn set_end_stream(&mut self) {
        self.0 |= END_STREAM;
    }

    pub fn is_end_headers(&self) -> bool {
        self.0 & END_HEADERS == END_HEADERS
    }

    pub fn set_end_headers(&mut self) {
        self.0 |= END_HEADERS;
    }

    pub fn is_padded(&self) -> bool {
        self.0 & PADDED == PADDED
    }

    pub fn is_priority(&self) -> bool {
        self.0 & PRIORITY == PRIORITY
    }
}

impl Default for HeadersFlag {
    /// Returns a `HeadersFlag` value with `END_HEADERS` set.
    fn default() -> Self {
        HeadersFlag(END_HEADERS)
    }
}

impl From<HeadersFlag> for u8 {
    fn from(src: HeadersFlag) -> u8 {
        src.0
    }
}

impl fmt::Debug for HeadersFlag {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        util::debug_flags(fmt, self.0)
            .flag_if(self.is_end_headers(), "END_HEADERS")
            .flag_if(self.is_end_stream(), "END_STREAM")
            .flag_if(self.is_padded(), "PADDED")
            .flag_if(self.is_priority(), "PRIORITY")
            .finish()
    }
}
