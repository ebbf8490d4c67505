use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::{Error, BROADCAST_ADDRESS, MAX_PACKET_LEN, TERMINATOR};

/// A packet addressed to one camera (or to all of them).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// 1..=7 for a single camera, [BROADCAST_ADDRESS] for everyone
    pub address: u8,
    pub payload: Bytes,
}

impl Packet {
    pub fn new(address: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            address,
            payload: payload.into(),
        }
    }

    pub fn broadcast(payload: impl Into<Bytes>) -> Self {
        Self::new(BROADCAST_ADDRESS, payload)
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.payload.len() + 2);
        buf.put_u8(0x80 | (self.address & 0x0F));
        buf.put(self.payload.clone());
        buf.put_u8(TERMINATOR);
        buf.freeze()
    }
}

impl std::fmt::Display for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_hex(f, &self.to_bytes())
    }
}

fn write_hex(f: &mut std::fmt::Formatter<'_>, bytes: &[u8]) -> std::fmt::Result {
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{b:02X}")?;
    }
    Ok(())
}

/// Error codes carried in a `y0 6z ee FF` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorKind {
    MessageLength,
    Syntax,
    BufferFull,
    Cancelled,
    NoSocket,
    NotExecutable,
    Other(u8),
}

impl From<u8> for DeviceErrorKind {
    fn from(code: u8) -> Self {
        use DeviceErrorKind::*;
        match code {
            0x01 => MessageLength,
            0x02 => Syntax,
            0x03 => BufferFull,
            0x04 => Cancelled,
            0x05 => NoSocket,
            0x41 => NotExecutable,
            other => Other(other),
        }
    }
}

impl std::fmt::Display for DeviceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use DeviceErrorKind::*;
        match self {
            MessageLength => write!(f, "message length error"),
            Syntax => write!(f, "syntax error"),
            BufferFull => write!(f, "command buffer full"),
            Cancelled => write!(f, "command cancelled"),
            NoSocket => write!(f, "no socket"),
            NotExecutable => write!(f, "command not executable"),
            Other(code) => write!(f, "error code 0x{code:02X}"),
        }
    }
}

/// A packet received from the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ack {
        socket: u8,
    },
    /// Command completion, or the answer to an inquiry (then `payload` holds
    /// the data bytes between `y0 5z` and the terminator).
    Completion {
        socket: u8,
        payload: Bytes,
    },
    Error {
        socket: u8,
        kind: DeviceErrorKind,
    },
    /// Answer to the broadcast address set, `88 30 0n FF`.
    AddressSet {
        next_address: u8,
    },
    /// Echo of an interface clear.
    InterfaceClear,
    /// Anything else, kept whole.
    Other(Bytes),
}

impl Reply {
    /// Interpret one complete packet, header and terminator included.
    pub fn parse(packet: Bytes) -> Self {
        let n = packet.len();
        if n < 3 || packet[n - 1] != TERMINATOR || packet[0] & 0x80 == 0 {
            return Reply::Other(packet);
        }
        let body = &packet[1..n - 1];
        match body {
            [0x30, next_address] if packet[0] == 0x88 => Reply::AddressSet {
                next_address: *next_address,
            },
            [0x01, 0x00, 0x01] => Reply::InterfaceClear,
            [kind, rest @ ..] => {
                let socket = kind & 0x0F;
                match (kind & 0xF0, rest) {
                    (0x40, []) => Reply::Ack { socket },
                    (0x50, data) => Reply::Completion {
                        socket,
                        payload: Bytes::copy_from_slice(data),
                    },
                    (0x60, [code]) => Reply::Error {
                        socket,
                        kind: DeviceErrorKind::from(*code),
                    },
                    _ => Reply::Other(packet),
                }
            }
            [] => Reply::Other(packet),
        }
    }
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::Ack { socket } => write!(f, "ACK (socket {socket})"),
            Reply::Completion { socket, payload } => {
                write!(f, "completion (socket {socket}) [")?;
                write_hex(f, payload)?;
                write!(f, "]")
            }
            Reply::Error { socket, kind } => write!(f, "error (socket {socket}): {kind}"),
            Reply::AddressSet { next_address } => write!(f, "address set, next {next_address}"),
            Reply::InterfaceClear => write!(f, "interface clear"),
            Reply::Other(raw) => {
                write!(f, "[")?;
                write_hex(f, raw)?;
                write!(f, "]")
            }
        }
    }
}

/// Frames VISCA packets on a byte stream.
#[derive(Default)]
pub struct Codec;

impl Decoder for Codec {
    type Item = Reply;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // A packet starts with a header byte, which always has the top bit set.
        let start = src
            .iter()
            .position(|b| b & 0x80 != 0 && *b != TERMINATOR)
            .unwrap_or(src.len());
        if start > 0 {
            tracing::warn!("discarding {start} bytes while looking for a packet header");
            src.advance(start);
        }

        match memchr::memchr(TERMINATOR, &src[..]) {
            Some(end) => {
                let packet = src.split_to(end + 1).freeze();
                tracing::trace!("received packet {:02X?}", &packet[..]);
                Ok(Some(Reply::parse(packet)))
            }
            None if src.len() >= MAX_PACKET_LEN => {
                // to not get stuck on a packet which will never end
                tracing::error!("no terminator within {MAX_PACKET_LEN} bytes, resyncing");
                src.advance(1);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

impl Encoder<Packet> for Codec {
    type Error = Error;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.put_slice(&item.to_bytes());
        Ok(())
    }
}
