use crate::frame::WindowSize;

// Constants
pub const MAX_WINDOW_SIZE: WindowSize = (1 << 31) - 1;
pub const DEFAULT_CONNECTION_WINDOW_SIZE: WindowSize = 1024 * 1024;
pub const DEFAULT_SETTINGS_MAX_HEADER_LIST_SIZE: u32 = 48 * 1024;
pub const DEFAULT_MAX_CONTINUATIONS: usize = 5;
pub const DEFAULT_MAX_CONCURRENT_STREAMS: u32 = 256;

/// Peer's concurrency limit until its SETTINGS say otherwise
pub const DEFAULT_REMOTE_MAX_CONCURRENT_STREAMS: u32 = 100;

/// Largest SETTINGS_HEADER_TABLE_SIZE a peer may announce
pub const MAX_HEADER_TABLE_SIZE: u32 = 65_536;

pub(crate) const PREFACE: [u8; 24] = *b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";
