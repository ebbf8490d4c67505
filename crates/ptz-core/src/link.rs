use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

use visca::{CameraIdentity, Command, Interface};

use crate::table::Query;

/// Something which can open a [CameraLink] by device path.
pub trait Transport {
    type Link: CameraLink;

    fn open(&mut self, path: &str) -> visca::Result<Self::Link>;

    fn list_ports(&self) -> visca::Result<Vec<String>>;
}

/// An open connection to a chain of VISCA cameras.
#[async_trait]
pub trait CameraLink: Send {
    /// Send every following packet to all cameras.
    fn set_broadcast(&mut self, broadcast: bool);

    /// Number the cameras on the chain. Returns how many answered.
    async fn assign_address(&mut self) -> visca::Result<u8>;

    async fn clear(&mut self) -> visca::Result<()>;

    async fn camera_info(&mut self, address: u8) -> visca::Result<CameraIdentity>;

    async fn command(&mut self, address: u8, cmd: &Command) -> visca::Result<()>;

    /// Run an inquiry and return its values, as many as [Query::returns].
    async fn query(&mut self, address: u8, query: Query) -> visca::Result<Vec<i32>>;

    /// Whatever is waiting in the receive path, up to `cap` bytes.
    async fn unread_bytes(&mut self, cap: usize) -> visca::Result<Vec<u8>>;

    async fn close(&mut self) -> visca::Result<()>;
}

#[async_trait]
impl<S> CameraLink for Interface<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn set_broadcast(&mut self, broadcast: bool) {
        self.broadcast = broadcast;
    }

    async fn assign_address(&mut self) -> visca::Result<u8> {
        self.set_address().await
    }

    async fn clear(&mut self) -> visca::Result<()> {
        Interface::clear(self).await
    }

    async fn camera_info(&mut self, address: u8) -> visca::Result<CameraIdentity> {
        Interface::camera_info(self, address).await
    }

    async fn command(&mut self, address: u8, cmd: &Command) -> visca::Result<()> {
        Interface::command(self, address, cmd).await
    }

    async fn query(&mut self, address: u8, query: Query) -> visca::Result<Vec<i32>> {
        let values = match query {
            Query::Power => vec![i32::from(self.get_power(address).await?)],
            Query::ZoomValue => vec![i32::from(self.get_zoom_value(address).await?)],
            Query::PanTiltPosition => {
                let (pan, tilt) = self.get_pan_tilt_position(address).await?;
                vec![i32::from(pan), i32::from(tilt)]
            }
        };
        Ok(values)
    }

    async fn unread_bytes(&mut self, cap: usize) -> visca::Result<Vec<u8>> {
        Interface::unread_bytes(self, cap).await
    }

    async fn close(&mut self) -> visca::Result<()> {
        self.shutdown().await
    }
}

/// Serial ports, opened with a fixed line speed.
#[derive(Debug, Clone)]
pub struct SerialTransport {
    pub baud_rate: u32,
    pub reply_timeout: Duration,
}

impl Transport for SerialTransport {
    type Link = Interface;

    fn open(&mut self, path: &str) -> visca::Result<Interface> {
        Interface::open_serial(path, self.baud_rate, self.reply_timeout)
    }

    fn list_ports(&self) -> visca::Result<Vec<String>> {
        visca::available_ports()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn interface_answers_queries() -> eyre::Result<()> {
        let (host, mut camera) = tokio::io::duplex(64);
        let mut link = Interface::new(host, Duration::from_millis(200));
        let cam = tokio::spawn(async move {
            let mut buf = [0u8; 5];
            camera.read_exact(&mut buf).await?;
            assert_eq!(buf, [0x81, 0x09, 0x06, 0x12, 0xFF]);
            // pan -500 (0xFE0C), tilt 200 (0x00C8)
            camera
                .write_all(&[
                    0x90, 0x50, 0x0F, 0x0E, 0x00, 0x0C, 0x00, 0x00, 0x0C, 0x08, 0xFF,
                ])
                .await?;
            Ok::<_, std::io::Error>(camera)
        });
        let values = CameraLink::query(&mut link, 1, Query::PanTiltPosition).await?;
        assert_eq!(values, vec![-500, 200]);
        assert_eq!(values.len(), Query::PanTiltPosition.returns());
        let _camera = cam.await??;
        Ok(())
    }
}
