//! HPACK header compression.
//!
//! Decoding is delegated to `fluke-hpack`, which keeps the connection wide
//! dynamic table. Encoding references the static table only and never adds
//! dynamic entries.
use std::fmt;

use ntex_bytes::Bytes;

mod decoder;
mod encoder;
pub(crate) mod huffman;
mod table;

pub use self::decoder::{Decoder, DecoderError};
pub use self::encoder::{Encoder, EncoderError};

/// Per-entry overhead used when computing header list sizes
pub const HEADER_ENTRY_OVERHEAD: usize = 32;

/// A single header field, name and value as raw octets.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Header {
    name: Bytes,
    value: Bytes,
}

impl Header {
    pub fn new<N, V>(name: N, value: V) -> Header
    where
        Bytes: From<N> + From<V>,
    {
        Header {
            name: Bytes::from(name),
            value: Bytes::from(value),
        }
    }

    pub fn name(&self) -> &Bytes {
        &self.name
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Returns true for `:method`, `:path` and the other pseudo headers.
    pub fn is_pseudo(&self) -> bool {
        self.name.first() == Some(&b':')
    }

    /// Size of the entry as defined in RFC 7541 section 4.1.
    pub fn size(&self) -> usize {
        self.name.len() + self.value.len() + HEADER_ENTRY_OVERHEAD
    }

    pub fn into_parts(self) -> (Bytes, Bytes) {
        (self.name, self.value)
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}",
            String::from_utf8_lossy(&self.name),
            String::from_utf8_lossy(&self.value)
        )
    }
}

/// Uncompressed size of a header list, as limited by
/// SETTINGS_MAX_HEADER_LIST_SIZE.
pub fn header_list_size(headers: &[Header]) -> usize {
    headers.iter().map(Header::size).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_size() {
        let headers = vec![Header::new(":method", "GET"), Header::new("a", "bc")];
        assert_eq!(header_list_size(&headers), 10 + 32 + 3 + 32);
        assert!(headers[0].is_pseudo());
        assert!(!headers[1].is_pseudo());
    }
}
