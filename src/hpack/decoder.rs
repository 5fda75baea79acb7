use std::fmt;

use ntex_bytes::Bytes;

use super::Header;

/// HPACK decoder for HTTP/2 header blocks.
///
/// One instance per connection, every completed header block must pass
/// through it in arrival order.
pub struct Decoder {
    inner: fluke_hpack::Decoder<'static>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecoderError {
    /// The block could not be decompressed, compression state is lost
    #[error("HPACK decoding failed: {0}")]
    Failed(String),
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder").finish()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Decoder {
            inner: fluke_hpack::Decoder::new(),
        }
    }

    /// Decode a complete header block.
    pub fn decode(&mut self, src: &[u8]) -> Result<Vec<Header>, DecoderError> {
        let fields = self.inner.decode(src).map_err(|e| {
            log::trace!("hpack decoding error; err={:?}", e);
            DecoderError::Failed(format!("{e:?}"))
        })?;

        Ok(fields
            .into_iter()
            .map(|(name, value)| Header::new(Bytes::from(name), Bytes::from(value)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_indexed() {
        let mut decoder = Decoder::new();

        // :method: GET, :scheme: http, :path: /
        let headers = decoder.decode(&[0x82, 0x86, 0x84]).unwrap();
        assert_eq!(
            headers,
            vec![
                Header::new(":method", "GET"),
                Header::new(":scheme", "http"),
                Header::new(":path", "/"),
            ]
        );
    }

    #[test]
    fn dynamic_table_survives_between_blocks() {
        let mut decoder = Decoder::new();

        // literal with incremental indexing, new name
        let first = [
            0x40, 0x06, b'c', b'u', b's', b't', b'o', b'm', 0x05, b'v', b'a', b'l', b'u', b'e',
        ];
        assert_eq!(
            decoder.decode(&first).unwrap(),
            vec![Header::new("custom", "value")]
        );

        // first dynamic entry is index 62
        assert_eq!(
            decoder.decode(&[0x80 | 62]).unwrap(),
            vec![Header::new("custom", "value")]
        );
    }

    #[test]
    fn invalid_index() {
        let mut decoder = Decoder::new();
        assert!(decoder.decode(&[0x80 | 70]).is_err());
    }

    #[test]
    fn empty_block() {
        let mut decoder = Decoder::new();
        assert!(decoder.decode(&[]).unwrap().is_empty());
    }
}
