use bytes::{BufMut, Bytes, BytesMut};

use crate::{CameraIdentity, Error, Result};

const COMMAND: u8 = 0x01;
const INQUIRY: u8 = 0x09;

const CATEGORY_INTERFACE: u8 = 0x00;
const CATEGORY_CAMERA: u8 = 0x04;
const CATEGORY_PAN_TILTER: u8 = 0x06;

/// Payload of the broadcast address set.
pub const ADDRESS_SET: &[u8] = &[0x30, 0x01];

/// Payload of the interface clear.
pub const IF_CLEAR: &[u8] = &[COMMAND, CATEGORY_INTERFACE, 0x01];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
    Stop,
}

impl Direction {
    fn pan_tilt_bytes(self) -> [u8; 2] {
        use Direction::*;
        match self {
            Up => [0x03, 0x01],
            Down => [0x03, 0x02],
            Left => [0x01, 0x03],
            Right => [0x02, 0x03],
            UpLeft => [0x01, 0x01],
            UpRight => [0x02, 0x01],
            DownLeft => [0x01, 0x02],
            DownRight => [0x02, 0x02],
            Stop => [0x03, 0x03],
        }
    }
}

/// Commands which the camera acknowledges and then completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Power(bool),
    ZoomStop,
    ZoomTele,
    ZoomWide,
    /// speed 0 (slow) to 7 (fast)
    ZoomTeleSpeed(u8),
    ZoomWideSpeed(u8),
    /// 0x0000 (wide end) to 0x4000 (tele end)
    ZoomDirect(u16),
    PanTiltDrive {
        pan_speed: u8,
        tilt_speed: u8,
        direction: Direction,
    },
    PanTiltAbsolute {
        pan_speed: u8,
        tilt_speed: u8,
        pan: i16,
        tilt: i16,
    },
    PanTiltRelative {
        pan_speed: u8,
        tilt_speed: u8,
        pan: i16,
        tilt: i16,
    },
    PanTiltHome,
    PanTiltReset,
    ShutterDirect(u8),
}

impl Command {
    pub fn payload(&self) -> Bytes {
        use Command::*;
        let mut buf = BytesMut::with_capacity(14);
        buf.put_u8(COMMAND);
        match *self {
            Power(on) => {
                buf.put_slice(&[CATEGORY_CAMERA, 0x00, if on { 0x02 } else { 0x03 }]);
            }
            ZoomStop => buf.put_slice(&[CATEGORY_CAMERA, 0x07, 0x00]),
            ZoomTele => buf.put_slice(&[CATEGORY_CAMERA, 0x07, 0x02]),
            ZoomWide => buf.put_slice(&[CATEGORY_CAMERA, 0x07, 0x03]),
            ZoomTeleSpeed(speed) => buf.put_slice(&[CATEGORY_CAMERA, 0x07, 0x20 | (speed & 0x07)]),
            ZoomWideSpeed(speed) => buf.put_slice(&[CATEGORY_CAMERA, 0x07, 0x30 | (speed & 0x07)]),
            ZoomDirect(value) => {
                buf.put_slice(&[CATEGORY_CAMERA, 0x47]);
                buf.put_slice(&to_nibbles(value));
            }
            PanTiltDrive {
                pan_speed,
                tilt_speed,
                direction,
            } => {
                buf.put_slice(&[CATEGORY_PAN_TILTER, 0x01, pan_speed, tilt_speed]);
                buf.put_slice(&direction.pan_tilt_bytes());
            }
            PanTiltAbsolute {
                pan_speed,
                tilt_speed,
                pan,
                tilt,
            } => {
                buf.put_slice(&[CATEGORY_PAN_TILTER, 0x02, pan_speed, tilt_speed]);
                buf.put_slice(&to_nibbles(pan as u16));
                buf.put_slice(&to_nibbles(tilt as u16));
            }
            PanTiltRelative {
                pan_speed,
                tilt_speed,
                pan,
                tilt,
            } => {
                buf.put_slice(&[CATEGORY_PAN_TILTER, 0x03, pan_speed, tilt_speed]);
                buf.put_slice(&to_nibbles(pan as u16));
                buf.put_slice(&to_nibbles(tilt as u16));
            }
            PanTiltHome => buf.put_slice(&[CATEGORY_PAN_TILTER, 0x04]),
            PanTiltReset => buf.put_slice(&[CATEGORY_PAN_TILTER, 0x05]),
            ShutterDirect(value) => {
                buf.put_slice(&[CATEGORY_CAMERA, 0x4A]);
                buf.put_slice(&to_nibbles(value as u16));
            }
        }
        buf.freeze()
    }
}

/// Inquiries answered directly with a completion carrying data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inquiry {
    Power,
    ZoomPosition,
    PanTiltPosition,
    Version,
}

impl Inquiry {
    pub fn payload(&self) -> Bytes {
        let body: &[u8] = match self {
            Inquiry::Power => &[INQUIRY, CATEGORY_CAMERA, 0x00],
            Inquiry::ZoomPosition => &[INQUIRY, CATEGORY_CAMERA, 0x47],
            Inquiry::PanTiltPosition => &[INQUIRY, CATEGORY_PAN_TILTER, 0x12],
            Inquiry::Version => &[INQUIRY, CATEGORY_INTERFACE, 0x02],
        };
        Bytes::copy_from_slice(body)
    }
}

/// Split a 16 bit value into four `0p` bytes, most significant first.
pub fn to_nibbles(value: u16) -> [u8; 4] {
    [
        ((value >> 12) & 0x0F) as u8,
        ((value >> 8) & 0x0F) as u8,
        ((value >> 4) & 0x0F) as u8,
        (value & 0x0F) as u8,
    ]
}

/// Inverse of [to_nibbles].
pub fn from_nibbles(data: &[u8]) -> Result<u16> {
    if data.len() != 4 {
        return Err(Error::Malformed("expected four nibbles"));
    }
    data.iter().try_fold(0u16, |acc, b| {
        if *b > 0x0F {
            Err(Error::Malformed("nibble out of range"))
        } else {
            Ok((acc << 4) | u16::from(*b))
        }
    })
}

pub fn decode_power(payload: &[u8]) -> Result<bool> {
    match payload {
        [0x02] => Ok(true),
        [0x03] => Ok(false),
        _ => Err(Error::Malformed("power status")),
    }
}

pub fn decode_zoom_position(payload: &[u8]) -> Result<u16> {
    from_nibbles(payload)
}

/// Returns `(pan, tilt)`.
pub fn decode_pan_tilt_position(payload: &[u8]) -> Result<(i16, i16)> {
    if payload.len() != 8 {
        return Err(Error::Malformed("pan/tilt position length"));
    }
    let pan = from_nibbles(&payload[..4])? as i16;
    let tilt = from_nibbles(&payload[4..])? as i16;
    Ok((pan, tilt))
}

pub fn decode_version(payload: &[u8]) -> Result<CameraIdentity> {
    match payload {
        [v0, v1, m0, m1, r0, r1, socket] => Ok(CameraIdentity {
            vendor: u16::from_be_bytes([*v0, *v1]),
            model: u16::from_be_bytes([*m0, *m1]),
            rom_version: u16::from_be_bytes([*r0, *r1]),
            socket_num: *socket,
        }),
        _ => Err(Error::Malformed("version inquiry length")),
    }
}
