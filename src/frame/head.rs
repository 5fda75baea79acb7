use super::StreamId;

use ntex_bytes::BufMut;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Head {
    kind: Kind,
    flag: u8,
    stream_id: StreamId,
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Kind {
    Data = 0,
    Headers = 1,
    Priority = 2,
    Reset = 3,
    Settings = 4,
    PushPromise = 5,
    Ping = 6,
    GoAway = 7,
    WindowUpdate = 8,
    Continuation = 9,
    Unknown,
}

// ===== impl Head =====

impl Head {
    pub fn new(kind: Kind, flag: u8, stream_id: StreamId) -> Head {
        Head {
            kind,
            flag,
            stream_id,
        }
    }

    /// Parse an HTTP/2 frame header
    ///
    /// `header` must hold at least `HEADER_LEN` bytes.
    pub fn parse(header: &[u8]) -> Head {
        let (stream_id, _) = StreamId::parse(&header[5..]);

        Head {
            stream_id,
            kind: Kind::new(header[3]),
            flag: header[4],
        }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn flag(&self) -> u8 {
        self.flag
    }

    pub fn is_flag_set(&self, flag: u8) -> bool {
        self.flag & flag == flag
    }

    pub fn encode<T: BufMut>(&self, payload_len: usize, dst: &mut T) {
        dst.put_uint(payload_len as u64, 3);
        dst.put_u8(self.kind as u8);
        dst.put_u8(self.flag);
        dst.put_u32(self.stream_id.into());
    }
}

// ===== impl Kind =====

impl Kind {
    pub fn new(byte: u8) -> Kind {
        match byte {
            0 => Kind::Data,
            1 => Kind::Headers,
            2 => Kind::Priority,
            3 => Kind::Reset,
            4 => Kind::Settings,
            5 => Kind::PushPromise,
            6 => Kind::Ping,
            7 => Kind::GoAway,
            8 => Kind::WindowUpdate,
            9 => Kind::Continuation,
            _ => Kind::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reserved_bit_is_ignored() {
        let head = Head::parse(&[0, 0, 4, 8, 0, 0x80, 0, 0, 3]);
        assert_eq!(head.kind(), Kind::WindowUpdate);
        assert_eq!(head.stream_id(), 3);
    }

    #[test]
    fn unknown_kind() {
        let head = Head::parse(&[0, 0, 0, 0xfa, 0, 0, 0, 0, 1]);
        assert_eq!(head.kind(), Kind::Unknown);
    }

    #[test]
    fn encode_head() {
        let mut buf = ntex_bytes::BytesMut::new();
        Head::new(Kind::Headers, 0x4, 5.into()).encode(300, &mut buf);
        assert_eq!(&buf[..], &[0, 1, 44, 1, 4, 0, 0, 0, 5]);
    }
}
