//! Framed, acknowledged byte transport over an abstract serial channel.
//!
//! A payload is wrapped as `START LENGTH PAYLOAD CHECKSUM END` by
//! [`frame::encode_frame`], recovered byte by byte by [`decoder::FrameDecoder`],
//! and carried reliably by a stop-and-wait [`transmitter::Transmitter`] talking
//! to a [`receiver::FrameReceiver`] under a [`clock::LogicalClock`].

pub mod channel;
pub mod checksum;
pub mod clock;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod receiver;
pub mod transmitter;

pub use channel::{ByteChannel, ByteSink, ByteSource, ChannelStats};
pub use checksum::{Checksum, frame_checksum};
pub use clock::{LogicalClock, Tick};
pub use decoder::{DecodeState, Decoded, FrameDecoder, decode};
pub use error::{DecodeError, FrameError, TransmitError};
pub use frame::{encode_frame, wire_size};
pub use receiver::{FrameReceiver, ReceiverStats};
pub use transmitter::{Transmitter, TxState, TxStatus};
