/// Errors raised while serializing a frame.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum EncoderError {
    /// DATA payload is larger than the peer's SETTINGS_MAX_FRAME_SIZE
    #[error("Frame payload exceeds peer's max frame size")]
    MaxSizeExceeded,
}
