use ntex_bytes::Bytes;

use crate::hpack::Header;

/// Identity of a pushed request.
///
/// Two promises with the same key announce the same resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PromiseKey {
    pub method: Bytes,
    pub scheme: Bytes,
    pub authority: Bytes,
    pub path: Bytes,
}

impl PromiseKey {
    /// Build the key from promised request headers.
    ///
    /// Returns `None` if `:method`, `:scheme`, `:path` or the authority
    /// (`:authority` or `host`) is missing.
    pub fn from_headers(headers: &[Header]) -> Option<PromiseKey> {
        let mut method = None;
        let mut scheme = None;
        let mut authority = None;
        let mut host = None;
        let mut path = None;

        for hdr in headers {
            let slot = match &hdr.name()[..] {
                b":method" => &mut method,
                b":scheme" => &mut scheme,
                b":authority" => &mut authority,
                b":path" => &mut path,
                b"host" => &mut host,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(hdr.value().clone());
            }
        }

        Some(PromiseKey {
            method: method?,
            scheme: scheme?,
            authority: authority.or(host)?,
            path: path.filter(|p| !p.is_empty())?,
        })
    }
}
