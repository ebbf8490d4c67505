use std::time::Duration;
use tokio::time::Instant;
use tracing as log;

use visca::CameraIdentity;

use crate::{
    config::ViscaConfig,
    link::{CameraLink, Transport},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Closed,
    Opening,
    Addressed,
    Cleared,
    Ready,
    Closing,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Closed => "closed",
            LifecycleState::Opening => "opening",
            LifecycleState::Addressed => "addressed",
            LifecycleState::Cleared => "cleared",
            LifecycleState::Ready => "ready",
            LifecycleState::Closing => "closing",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LifecycleError {
    #[error("connection already open")]
    AlreadyOpen,
    #[error("no open connection")]
    NotOpen,
    #[error("camera address {0} is not in 1..=7")]
    InvalidAddress(u8),
    #[error("failed to open {path}")]
    Open {
        path: String,
        #[source]
        source: visca::Error,
    },
    #[error("camera address assignment failed")]
    Address(#[source] visca::Error),
    #[error("interface clear failed")]
    Clear(#[source] visca::Error),
    #[error("camera info inquiry failed")]
    Info(#[source] visca::Error),
    #[error("failed to list serial ports")]
    Ports(#[source] visca::Error),
}

/// What we know about the connected camera.
///
/// The runtime fields stay `None` until first queried and keep their last
/// good value when a later query fails.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CameraInfo {
    pub identity: CameraIdentity,
    pub zoom: Option<i32>,
    pub power: Option<bool>,
    pub pan_tilt: Option<(i32, i32)>,
}

impl std::fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.identity)?;
        if let Some(power) = self.power {
            write!(f, ", power: {}", if power { "on" } else { "off" })?;
        }
        if let Some(zoom) = self.zoom {
            write!(f, ", zoom: {zoom}")?;
        }
        if let Some((pan, tilt)) = self.pan_tilt {
            write!(f, ", pan/tilt: {pan} {tilt}")?;
        }
        Ok(())
    }
}

/// An open, configured camera link and its state.
pub struct Connection<L> {
    link: L,
    pub broadcast: bool,
    /// Cameras which answered the address assignment.
    pub camera_count: u8,
    /// Address of the camera commands go to.
    pub address: u8,
    pub info: CameraInfo,
    settle_until: Option<Instant>,
}

impl<L: CameraLink> Connection<L> {
    fn new(link: L, address: u8) -> Self {
        Self {
            link,
            broadcast: false,
            camera_count: 0,
            address,
            info: CameraInfo::default(),
            settle_until: None,
        }
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Wait until the camera has had time to act on the previous command.
    pub async fn settle(&mut self) {
        if let Some(deadline) = self.settle_until.take() {
            log::trace!("waiting for camera to settle");
            tokio::time::sleep_until(deadline).await;
        }
    }

    /// Hold off the next device access for `dur` from now.
    pub fn settle_for(&mut self, dur: Duration) {
        self.settle_until = Some(Instant::now() + dur);
    }
}

/// Result of closing a connection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CloseReport {
    /// Bytes the camera sent which nobody read.
    pub drained: Vec<u8>,
}

impl std::fmt::Display for CloseReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "closed, {} bytes not processed", self.drained.len())
    }
}

/// Opens, configures and closes the one connection of an interpreter.
pub struct Lifecycle<T: Transport> {
    transport: T,
    config: ViscaConfig,
    state: LifecycleState,
    connection: Option<Connection<T::Link>>,
}

impl<T: Transport> Lifecycle<T> {
    pub fn new(transport: T, config: ViscaConfig) -> Self {
        Self {
            transport,
            config,
            state: LifecycleState::Closed,
            connection: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn list_ports(&self) -> Result<Vec<String>, LifecycleError> {
        self.transport.list_ports().map_err(LifecycleError::Ports)
    }

    pub fn config(&self) -> &ViscaConfig {
        &self.config
    }

    /// The connection, if it is ready for commands.
    pub fn ready_connection_mut(&mut self) -> Result<&mut Connection<T::Link>, LifecycleState> {
        match (self.state, self.connection.as_mut()) {
            (LifecycleState::Ready, Some(conn)) => Ok(conn),
            (state, _) => Err(state),
        }
    }

    fn transition(&mut self, next: LifecycleState) {
        log::debug!("connection {} -> {}", self.state, next);
        self.state = next;
    }

    /// Open `path` and bring the camera to [LifecycleState::Ready].
    ///
    /// Any failure along the way closes the link again and leaves the
    /// lifecycle closed.
    pub async fn open(&mut self, path: &str) -> Result<&CameraInfo, LifecycleError> {
        if self.state != LifecycleState::Closed {
            return Err(LifecycleError::AlreadyOpen);
        }
        let address = self.config.camera_address;
        if !visca::CAMERA_ADDRESSES.contains(&address) {
            log::error!("refusing to open {path}: camera address {address} out of range");
            return Err(LifecycleError::InvalidAddress(address));
        }
        let link = self.transport.open(path).map_err(|source| {
            log::error!("opening {path}: {source}");
            LifecycleError::Open {
                path: path.to_string(),
                source,
            }
        })?;
        log::info!("opened {path}");
        self.transition(LifecycleState::Opening);

        let mut conn = Connection::new(link, address);
        if let Err(e) = self.configure(&mut conn).await {
            match std::error::Error::source(&e) {
                Some(cause) => log::error!("{e}: {cause}"),
                None => log::error!("{e}"),
            }
            if let Err(close_err) = conn.link.close().await {
                log::warn!("while closing {path} after failure: {close_err}");
            }
            self.transition(LifecycleState::Closed);
            return Err(e);
        }

        log::info!("camera ready: {}", conn.info);
        self.transition(LifecycleState::Ready);
        Ok(&self.connection.insert(conn).info)
    }

    async fn configure(&mut self, conn: &mut Connection<T::Link>) -> Result<(), LifecycleError> {
        conn.broadcast = false;
        conn.link.set_broadcast(false);

        conn.camera_count = conn
            .link
            .assign_address()
            .await
            .map_err(LifecycleError::Address)?;
        log::info!("{} camera(s) on the chain", conn.camera_count);
        self.transition(LifecycleState::Addressed);

        conn.link.clear().await.map_err(LifecycleError::Clear)?;
        self.transition(LifecycleState::Cleared);

        conn.info.identity = conn
            .link
            .camera_info(conn.address)
            .await
            .map_err(LifecycleError::Info)?;
        Ok(())
    }

    /// Drain and close the connection.
    ///
    /// Unread bytes are only reported, never treated as failure.
    pub async fn close(&mut self) -> Result<CloseReport, LifecycleError> {
        let Some(mut conn) = self.connection.take() else {
            return Err(LifecycleError::NotOpen);
        };
        self.transition(LifecycleState::Closing);

        conn.settle().await;
        tokio::time::sleep(self.config.close_settle()).await;
        let drained = match conn.link.unread_bytes(self.config.drain_cap_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("could not read pending bytes: {e}");
                Vec::new()
            }
        };
        if !drained.is_empty() {
            log::warn!("{} bytes not processed", drained.len());
            for byte in drained.iter() {
                log::warn!("  0x{byte:02x}");
            }
        }
        if let Err(e) = conn.link.close().await {
            log::warn!("while closing: {e}");
        }

        self.transition(LifecycleState::Closed);
        Ok(CloseReport { drained })
    }
}
