use crate::{consts, frame, frame::Settings, frame::WindowSize};

#[derive(Clone, Debug)]
/// Http2 connection configuration
pub struct Config {
    pub(crate) settings: Settings,
    /// Initial window size of streams, receive direction
    pub(crate) window_sz: WindowSize,
    /// Initial window size for new connections.
    pub(crate) connection_window_sz: WindowSize,
    /// Maximum number of remote initiated streams
    pub(crate) remote_max_concurrent_streams: u32,
    /// Limit number of continuation frames for headers
    pub(crate) max_header_continuations: usize,
    /// Compress header strings
    pub(crate) huffman: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

impl Config {
    /// Create configuration
    pub fn new() -> Self {
        let mut settings = Settings::default();
        settings.set_enable_push(false);
        settings.set_max_concurrent_streams(Some(consts::DEFAULT_MAX_CONCURRENT_STREAMS));
        settings.set_max_header_list_size(Some(consts::DEFAULT_SETTINGS_MAX_HEADER_LIST_SIZE));

        Config {
            settings,
            window_sz: frame::DEFAULT_INITIAL_WINDOW_SIZE,
            connection_window_sz: consts::DEFAULT_CONNECTION_WINDOW_SIZE,
            remote_max_concurrent_streams: consts::DEFAULT_MAX_CONCURRENT_STREAMS,
            max_header_continuations: consts::DEFAULT_MAX_CONTINUATIONS,
            huffman: true,
        }
    }

    /// Indicates the initial window size (in octets) for stream-level
    /// flow control for received data.
    ///
    /// A `WINDOW_UPDATE` restoring the window is scheduled once less than
    /// half of it is left.
    ///
    /// The default value is 65,535.
    ///
    /// # Panics
    ///
    /// This function panics if `size` is larger than 2^31-1.
    pub fn set_initial_window_size(mut self, size: u32) -> Self {
        assert!(size <= consts::MAX_WINDOW_SIZE);
        self.window_sz = size;
        self.settings.set_initial_window_size(Some(size));
        self
    }

    /// Indicates the initial window size (in octets) for connection-level flow control
    /// for received data.
    ///
    /// The connection window always starts at 65,535, larger values are
    /// announced with a `WINDOW_UPDATE` right after the local SETTINGS.
    ///
    /// The default value is 1Mb.
    ///
    /// # Panics
    ///
    /// This function panics if `size` is outside of `65,535..=2^31-1`.
    pub fn set_initial_connection_window_size(mut self, size: u32) -> Self {
        assert!(size >= frame::DEFAULT_INITIAL_WINDOW_SIZE && size <= consts::MAX_WINDOW_SIZE);
        self.connection_window_sz = size;
        self
    }

    /// Enables or disables server push.
    ///
    /// A client with push disabled resets every promised stream with
    /// `REFUSED_STREAM`.
    ///
    /// By default push is disabled.
    pub fn set_enable_push(mut self, enable: bool) -> Self {
        self.settings.set_enable_push(enable);
        self
    }

    /// Enables or disables Huffman coding of header strings.
    ///
    /// By default Huffman coding is enabled.
    pub fn set_huffman(mut self, enable: bool) -> Self {
        self.huffman = enable;
        self
    }

    /// Indicates the size (in octets) of the largest HTTP/2 frame payload that the
    /// connection is able to accept.
    ///
    /// The value **must** be between 16,384 and 16,777,215. The default value is 16,384.
    ///
    /// # Panics
    ///
    /// This function panics if `max` is not within the legal range specified
    /// above.
    pub fn set_max_frame_size(mut self, max: u32) -> Self {
        assert!(max >= frame::DEFAULT_MAX_FRAME_SIZE && max <= frame::MAX_MAX_FRAME_SIZE);
        self.settings.set_max_frame_size(Some(max));
        self
    }

    /// Sets the max size of received header frames.
    ///
    /// This advisory setting informs a peer of the maximum size of header list
    /// that the sender is prepared to accept, in octets. The value is based on
    /// the uncompressed size of header fields, including the length of the name
    /// and value in octets plus an overhead of 32 octets for each header field.
    ///
    /// Decoded header lists above the limit reset the stream.
    ///
    /// By default value is set to 48Kb.
    pub fn set_max_header_list_size(mut self, max: u32) -> Self {
        self.settings.set_max_header_list_size(Some(max));
        self
    }

    /// Sets the max number of continuation frames for HEADERS
    ///
    /// By default value is set to 5
    pub fn set_max_header_continuation_frames(mut self, max: usize) -> Self {
        self.max_header_continuations = max;
        self
    }

    /// Sets the maximum number of concurrent streams.
    ///
    /// The maximum concurrent streams setting only controls the maximum number
    /// of streams that can be initiated by the remote peer. In other words,
    /// when this setting is set to 100, this does not limit the number of
    /// concurrent streams that can be created by the caller.
    ///
    /// Note that streams in the reserved state, i.e., push promises that have
    /// been reserved but the stream has not started, do not count against this
    /// setting.
    ///
    /// Also note that if the remote *does* exceed the value set here, it is not
    /// a protocol level error. Instead, the stream is immediately reset
    /// with `REFUSED_STREAM`.
    ///
    /// By default value is set to 256.
    pub fn set_max_concurrent_streams(mut self, max: u32) -> Self {
        self.remote_max_concurrent_streams = max;
        self.settings.set_max_concurrent_streams(Some(max));
        self
    }

    pub(crate) fn is_push_enabled(&self) -> bool {
        self.settings.is_push_enabled().unwrap_or(false)
    }

    pub(crate) fn max_header_list_size(&self) -> usize {
        self.settings
            .max_header_list_size()
            .map(|v| v as usize)
            .unwrap_or(usize::MAX)
    }

    pub(crate) fn max_frame_size(&self) -> u32 {
        self.settings
            .max_frame_size()
            .unwrap_or(frame::DEFAULT_MAX_FRAME_SIZE)
    }

    /// Local SETTINGS frame sent during the handshake.
    pub fn settings(&self) -> Settings {
        self.settings.clone()
    }
}
