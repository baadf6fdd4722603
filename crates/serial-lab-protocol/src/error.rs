use thiserror::Error;

/// Errors raised while turning a payload into a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The payload does not fit the configured maximum. Nothing was encoded.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

/// Reasons the decoder rejects a frame. All of them resynchronize the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("checksum mismatch (computed 0x{computed:02X}, received 0x{received:02X})")]
    ChecksumMismatch { computed: u8, received: u8 },

    #[error("expected end sentinel, got 0x{received:02X}")]
    UnexpectedEnd { received: u8 },

    #[error("declared length {length} exceeds limit {max}")]
    LengthExceedsLimit { length: u8, max: u8 },
}

/// Errors surfaced by the transmitter session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransmitError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// A send was requested while a session is still in flight or terminal.
    #[error("transmitter busy ({state}); reset it before sending again")]
    Busy { state: &'static str },

    /// Terminal failure: the frame was sent `attempts` times without an ACK.
    #[error("no acknowledgment after {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },
}
