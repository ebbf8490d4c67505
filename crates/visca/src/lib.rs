//! VISCA camera control protocol.
//!
//! Packets are `header, payload..., 0xFF`. The header of a packet sent to a
//! camera is `0x80 | address` (`0x88` to broadcast); replies come back with
//! `0x80 | (address + 8) << 4`.

mod commands;
mod interface;
mod message;

pub use commands::*;
pub use interface::*;
pub use message::*;

use std::time::Duration;

/// Camera address used for broadcast packets.
pub const BROADCAST_ADDRESS: u8 = 8;

/// Addresses a single camera on a chain can have.
pub const CAMERA_ADDRESSES: std::ops::RangeInclusive<u8> = 1..=7;

/// Packet terminator.
pub const TERMINATOR: u8 = 0xFF;

/// Longest packet the protocol defines, including header and terminator.
pub const MAX_PACKET_LEN: usize = 16;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io error {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to open serial device {path}")]
    Open {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("failed to enumerate serial ports")]
    Enumerate(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    #[error("serial connection closed")]
    Closed,
    #[error("camera reported error: {0}")]
    Device(DeviceErrorKind),
    #[error("unexpected reply: {0}")]
    UnexpectedReply(Reply),
    #[error("malformed packet: {0}")]
    Malformed(&'static str),
}

impl Error {
    /// The camera answered, but with an error packet.
    pub fn is_device_error(&self) -> bool {
        matches!(self, Error::Device(_))
    }

    /// The camera answered with something we could not interpret.
    pub fn is_unexpected_reply(&self) -> bool {
        matches!(self, Error::UnexpectedReply(_) | Error::Malformed(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Identity of a camera as returned by the version inquiry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CameraIdentity {
    pub vendor: u16,
    pub model: u16,
    pub rom_version: u16,
    pub socket_num: u8,
}

impl std::fmt::Display for CameraIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "vendor: 0x{:04x}, model: 0x{:04x}, ROM version: 0x{:04x}, socket number: 0x{:02x}",
            self.vendor, self.model, self.rom_version, self.socket_num
        )
    }
}
