use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tokio_util::codec::Framed;

use crate::{
    decode_pan_tilt_position, decode_power, decode_version, decode_zoom_position, CameraIdentity,
    Codec, Command, Error, Inquiry, Packet, Reply, Result, ADDRESS_SET, BROADCAST_ADDRESS,
    IF_CLEAR,
};

/// How long to wait for more bytes while draining the receive buffer.
const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Most stale bytes thrown away before sending a packet.
const RESYNC_CAP: usize = 3000;

/// List the names of serial ports on this machine.
pub fn available_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports().map_err(|e| Error::Enumerate(e.into()))?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

/// One VISCA bus, usually a serial port with a daisy chain of cameras.
pub struct Interface<S = SerialStream> {
    framed: Framed<S, Codec>,
    /// If set, every packet goes to all cameras on the chain.
    pub broadcast: bool,
    reply_timeout: Duration,
    /// A reply did not arrive in time and may still turn up.
    desynced: bool,
}

impl Interface<SerialStream> {
    pub fn open_serial(path: &str, baud_rate: u32, reply_timeout: Duration) -> Result<Self> {
        let device = tokio_serial::new(path, baud_rate)
            .open_native_async()
            .map_err(|e| Error::Open {
                path: path.to_string(),
                source: e.into(),
            })?;
        Ok(Self::new(device, reply_timeout))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Interface<S> {
    pub fn new(stream: S, reply_timeout: Duration) -> Self {
        Self {
            framed: Framed::new(stream, Codec),
            broadcast: false,
            reply_timeout,
            desynced: false,
        }
    }

    fn target(&self, address: u8) -> u8 {
        if self.broadcast {
            BROADCAST_ADDRESS
        } else {
            address
        }
    }

    /// Read from the stream into `pending` until nothing arrives within
    /// `wait` or `cap` bytes are collected. A zero `wait` only takes what is
    /// already there.
    async fn read_pending(
        &mut self,
        pending: &mut Vec<u8>,
        cap: usize,
        wait: Duration,
    ) -> Result<()> {
        let mut buf = [0u8; 64];
        while pending.len() < cap {
            let want = buf.len().min(cap - pending.len());
            match tokio::time::timeout(wait, self.framed.get_mut().read(&mut buf[..want])).await {
                // nothing more arrived
                Err(_elapsed) => break,
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => pending.extend_from_slice(&buf[..n]),
                Ok(Err(e)) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Throw away replies nobody asked for, so the next reply read belongs
    /// to the next packet sent. After a timeout, wait until the line has
    /// been quiet for a full reply timeout.
    async fn resync(&mut self) -> Result<()> {
        let mut stale = self.framed.read_buffer_mut().split().to_vec();
        let wait = if self.desynced {
            self.reply_timeout
        } else {
            Duration::ZERO
        };
        self.read_pending(&mut stale, RESYNC_CAP, wait).await?;
        self.desynced = false;
        if !stale.is_empty() {
            tracing::warn!("discarding {} stale bytes: {:02X?}", stale.len(), stale);
        }
        Ok(())
    }

    async fn send(&mut self, packet: Packet) -> Result<()> {
        self.resync().await?;
        tracing::trace!("sending {packet}");
        self.framed.send(packet).await
    }

    async fn receive(&mut self) -> Result<Reply> {
        match tokio::time::timeout(self.reply_timeout, self.framed.next()).await {
            Err(_elapsed) => {
                self.desynced = true;
                Err(Error::Timeout(self.reply_timeout))
            }
            Ok(None) => Err(Error::Closed),
            Ok(Some(reply)) => reply,
        }
    }

    /// Read replies until the command completes, skipping the ACK. Returns
    /// the completion payload.
    async fn wait_completion(&mut self) -> Result<Bytes> {
        loop {
            match self.receive().await? {
                Reply::Ack { .. } => continue,
                Reply::Completion { payload, .. } => return Ok(payload),
                Reply::Error { kind, .. } => return Err(Error::Device(kind)),
                other => return Err(Error::UnexpectedReply(other)),
            }
        }
    }

    /// Broadcast an address set so every camera on the chain numbers itself.
    ///
    /// Returns the number of cameras which answered.
    pub async fn set_address(&mut self) -> Result<u8> {
        self.send(Packet::broadcast(Bytes::from_static(ADDRESS_SET)))
            .await?;
        match self.receive().await? {
            Reply::AddressSet { next_address } => Ok(next_address.saturating_sub(1)),
            Reply::Error { kind, .. } => Err(Error::Device(kind)),
            other => Err(Error::UnexpectedReply(other)),
        }
    }

    /// Clear the command buffers of every camera on the chain.
    pub async fn clear(&mut self) -> Result<()> {
        self.send(Packet::broadcast(Bytes::from_static(IF_CLEAR)))
            .await?;
        loop {
            match self.receive().await? {
                Reply::InterfaceClear | Reply::Completion { .. } => return Ok(()),
                Reply::Ack { .. } => continue,
                Reply::Error { kind, .. } => return Err(Error::Device(kind)),
                other => return Err(Error::UnexpectedReply(other)),
            }
        }
    }

    pub async fn command(&mut self, address: u8, cmd: &Command) -> Result<()> {
        let packet = Packet::new(self.target(address), cmd.payload());
        self.send(packet).await?;
        self.wait_completion().await?;
        Ok(())
    }

    pub async fn inquiry(&mut self, address: u8, inq: Inquiry) -> Result<Bytes> {
        let packet = Packet::new(self.target(address), inq.payload());
        self.send(packet).await?;
        self.wait_completion().await
    }

    pub async fn camera_info(&mut self, address: u8) -> Result<CameraIdentity> {
        let payload = self.inquiry(address, Inquiry::Version).await?;
        decode_version(&payload)
    }

    pub async fn get_power(&mut self, address: u8) -> Result<bool> {
        let payload = self.inquiry(address, Inquiry::Power).await?;
        decode_power(&payload)
    }

    pub async fn get_zoom_value(&mut self, address: u8) -> Result<u16> {
        let payload = self.inquiry(address, Inquiry::ZoomPosition).await?;
        decode_zoom_position(&payload)
    }

    pub async fn get_pan_tilt_position(&mut self, address: u8) -> Result<(i16, i16)> {
        let payload = self.inquiry(address, Inquiry::PanTiltPosition).await?;
        decode_pan_tilt_position(&payload)
    }

    /// Take whatever is waiting in the receive path, at most `cap` bytes.
    ///
    /// A well-behaved camera has answered everything we asked, so this
    /// normally returns nothing.
    pub async fn unread_bytes(&mut self, cap: usize) -> Result<Vec<u8>> {
        let mut pending = self.framed.read_buffer_mut().split().to_vec();
        self.read_pending(&mut pending, cap, DRAIN_POLL).await?;
        pending.truncate(cap);
        Ok(pending)
    }

    /// Flush and shut down the write half. The port itself is released on drop.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.framed.get_mut().shutdown().await?;
        Ok(())
    }
}
