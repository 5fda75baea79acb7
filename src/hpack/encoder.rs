use ntex_bytes::{BufMut, BytesMut};

use super::table::{self, Index};
use super::{huffman, Header};

/// Dynamic table size the peer's decoder starts with
const DEFAULT_TABLE_SIZE: usize = 4_096;

/// HPACK encoder.
///
/// Emits indexed representations for static table hits and literals
/// without indexing for everything else. Dynamic table size changes
/// requested by the peer are signalled at the start of the next block.
#[derive(Debug)]
pub struct Encoder {
    huffman: bool,
    table_size: usize,
    size_update: Option<SizeUpdate>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum SizeUpdate {
    One(usize),
    Two(usize, usize), // min, max
}

#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum EncoderError {
    /// Header name is empty
    #[error("Header name is empty")]
    EmptyName,

    /// Header names must be lowercase visible ASCII
    #[error("Header name contains invalid characters")]
    InvalidName,
}

impl Default for Encoder {
    fn default() -> Encoder {
        Encoder {
            huffman: true,
            table_size: DEFAULT_TABLE_SIZE,
            size_update: None,
        }
    }
}

impl Encoder {
    pub fn new(huffman: bool) -> Encoder {
        Encoder {
            huffman,
            ..Default::default()
        }
    }

    /// Enable or disable Huffman coding of string literals.
    pub fn set_huffman(&mut self, val: bool) {
        self.huffman = val;
    }

    /// Current dynamic table size as known by the peer.
    pub fn table_size(&self) -> usize {
        self.table_size
    }

    /// Apply the peer's SETTINGS_HEADER_TABLE_SIZE.
    ///
    /// No entries are ever inserted, the table only needs to stay within
    /// the new limit, so values above the default are clamped.
    pub fn update_max_size(&mut self, val: usize) {
        let val = val.min(DEFAULT_TABLE_SIZE);

        match self.size_update {
            Some(SizeUpdate::One(old)) => {
                if val > old {
                    if old > self.table_size {
                        self.size_update = Some(SizeUpdate::One(val));
                    } else {
                        self.size_update = Some(SizeUpdate::Two(old, val));
                    }
                } else {
                    self.size_update = Some(SizeUpdate::One(val));
                }
            }
            Some(SizeUpdate::Two(min, _)) => {
                if val < min {
                    self.size_update = Some(SizeUpdate::One(val));
                } else {
                    self.size_update = Some(SizeUpdate::Two(min, val));
                }
            }
            None => {
                if val != self.table_size {
                    self.size_update = Some(SizeUpdate::One(val));
                }
            }
        }
    }

    /// Encode a complete header block into `dst`.
    ///
    /// Nothing is written if any header is invalid.
    pub fn encode<'a, I>(&mut self, headers: I, dst: &mut BytesMut) -> Result<(), EncoderError>
    where
        I: IntoIterator<Item = &'a Header>,
        I::IntoIter: Clone,
    {
        let headers = headers.into_iter();
        for header in headers.clone() {
            validate_name(header.name())?;
        }

        match self.size_update.take() {
            Some(SizeUpdate::One(val)) => {
                self.table_size = val;
                encode_size_update(val, dst);
            }
            Some(SizeUpdate::Two(min, max)) => {
                self.table_size = max;
                encode_size_update(min, dst);
                encode_size_update(max, dst);
            }
            None => (),
        }

        for header in headers {
            match table::index(header.name(), header.value()) {
                Index::Indexed(idx) => encode_int(idx, 7, 0x80, dst),
                Index::Name(idx) => {
                    encode_int(idx, 4, 0, dst);
                    self.encode_str(header.value(), dst);
                }
                Index::NotIndexed => {
                    dst.put_u8(0);
                    self.encode_str(header.name(), dst);
                    self.encode_str(header.value(), dst);
                }
            }
        }

        Ok(())
    }

    fn encode_str(&self, val: &[u8], dst: &mut BytesMut) {
        if self.huffman && !val.is_empty() {
            let len = huffman::encoded_len(val);
            if len < val.len() {
                encode_int(len, 7, 0x80, dst);
                huffman::encode(val, dst);
                return;
            }
        }
        encode_int(val.len(), 7, 0, dst);
        dst.put_slice(val);
    }
}

fn validate_name(name: &[u8]) -> Result<(), EncoderError> {
    if name.is_empty() {
        return Err(EncoderError::EmptyName);
    }

    // a leading colon marks a pseudo header
    let body = if name[0] == b':' { &name[1..] } else { name };
    if body.is_empty()
        || body
            .iter()
            .any(|b| b.is_ascii_uppercase() || *b <= b' ' || *b >= 0x7f || *b == b':')
    {
        return Err(EncoderError::InvalidName);
    }
    Ok(())
}

fn encode_size_update(val: usize, dst: &mut BytesMut) {
    encode_int(val, 5, 0b0010_0000, dst);
}

/// Encode an integer with an N-bit prefix (RFC 7541 section 5.1)
fn encode_int(mut value: usize, prefix_bits: u8, first_byte: u8, dst: &mut BytesMut) {
    let max = (1usize << prefix_bits) - 1;

    if value < max {
        dst.put_u8(first_byte | value as u8);
        return;
    }

    dst.put_u8(first_byte | max as u8);
    value -= max;

    while value >= 128 {
        dst.put_u8(0b1000_0000 | value as u8);
        value >>= 7;
    }

    dst.put_u8(value as u8);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hpack::Decoder;

    fn encode(e: &mut Encoder, hdrs: &[Header]) -> BytesMut {
        let mut dst = BytesMut::new();
        e.encode(hdrs, &mut dst).unwrap();
        dst
    }

    #[test]
    fn test_encode_int() {
        let mut dst = BytesMut::new();
        encode_int(10, 5, 0, &mut dst);
        assert_eq!(&dst[..], &[10]);

        let mut dst = BytesMut::new();
        encode_int(1337, 5, 0, &mut dst);
        assert_eq!(&dst[..], &[31, 154, 10]);

        let mut dst = BytesMut::new();
        encode_int(127, 7, 0x80, &mut dst);
        assert_eq!(&dst[..], &[0xff, 0]);
    }

    #[test]
    fn test_static_hits() {
        let mut encoder = Encoder::default();
        let res = encode(
            &mut encoder,
            &[Header::new(":method", "GET"), Header::new(":path", "/")],
        );
        assert_eq!(&res[..], &[0x82, 0x84]);
    }

    #[test]
    fn test_name_hit_without_huffman() {
        let mut encoder = Encoder::new(false);
        let res = encode(&mut encoder, &[Header::new(":status", "201")]);
        assert_eq!(&res[..], &[0x08, 3, b'2', b'0', b'1']);
    }

    #[test]
    fn test_huffman_literal() {
        let mut encoder = Encoder::default();
        let res = encode(&mut encoder, &[Header::new("custom-key", "x")]);
        // new name, huffman coded name, raw value since coding it grows it
        assert_eq!(res[0], 0);
        assert_eq!(res[1], 0x80 | 8);
        assert_eq!(&res[2..10], &[0x25, 0xa8, 0x49, 0xe9, 0x5b, 0xa9, 0x7d, 0x7f]);
        assert_eq!(&res[10..], &[1, b'x']);
    }

    #[test]
    fn test_size_update_emitted_once() {
        let mut encoder = Encoder::default();
        encoder.update_max_size(0);
        let res = encode(&mut encoder, &[Header::new(":method", "GET")]);
        assert_eq!(&res[..], &[0x20, 0x82]);
        assert_eq!(encoder.table_size(), 0);

        let res = encode(&mut encoder, &[Header::new(":method", "GET")]);
        assert_eq!(&res[..], &[0x82]);
    }

    #[test]
    fn test_size_update_shrink_then_grow() {
        let mut encoder = Encoder::default();
        encoder.update_max_size(100);
        encoder.update_max_size(8192);
        let res = encode(&mut encoder, &[]);
        // 100 = 31 + 69, then 4096 = 31 + 4065
        assert_eq!(&res[..], &[0x3f, 69, 0x3f, 0xe1, 0x1f]);
        assert_eq!(encoder.table_size(), 4096);
    }

    #[test]
    fn test_larger_table_size_is_clamped() {
        let mut encoder = Encoder::default();
        encoder.update_max_size(65_536);
        let res = encode(&mut encoder, &[Header::new(":method", "GET")]);
        assert_eq!(&res[..], &[0x82]);
    }

    #[test]
    fn test_invalid_names_write_nothing() {
        let mut encoder = Encoder::default();
        let mut dst = BytesMut::new();
        assert_eq!(
            encoder.encode(&[Header::new("ok", "1"), Header::new("", "v")], &mut dst),
            Err(EncoderError::EmptyName)
        );
        assert_eq!(
            encoder.encode(&[Header::new("Upper", "v")], &mut dst),
            Err(EncoderError::InvalidName)
        );
        assert!(dst.is_empty());
    }

    #[test]
    fn test_roundtrip_preserves_order_and_duplicates() {
        let headers = vec![
            Header::new(":status", "200"),
            Header::new("set-cookie", "a=1"),
            Header::new("x-trace", "abcdefghijklmnopqrstuvwxyz0123456789"),
            Header::new("set-cookie", "b=2"),
            Header::new("empty", ""),
        ];

        for huffman in [true, false] {
            let mut encoder = Encoder::new(huffman);
            let mut decoder = Decoder::new();
            let block = encode(&mut encoder, &headers);
            assert_eq!(decoder.decode(&block).unwrap(), headers);
        }
    }
}
