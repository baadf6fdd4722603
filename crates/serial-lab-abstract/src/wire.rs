//! Conventional control byte values for the framed serial link.
//!
//! ```text
//! ┌───────┬────────┬──────────────────┬──────────┬─────┐
//! │ START │ LENGTH │ PAYLOAD (LENGTH) │ CHECKSUM │ END │
//! └───────┴────────┴──────────────────┴──────────┴─────┘
//! ```

/// Start of text, opens a frame.
pub const STX: u8 = 0x02;
/// End of text, closes a frame.
pub const ETX: u8 = 0x03;
/// Positive acknowledgment on the return path.
pub const ACK: u8 = 0x06;
/// Negative acknowledgment on the return path.
pub const NACK: u8 = 0x15;

/// Bytes a frame adds around its payload: start, length, checksum, end.
pub const FRAME_OVERHEAD: usize = 4;
