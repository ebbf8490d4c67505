//! In-memory camera chain for tests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use visca::{CameraIdentity, Command, DeviceErrorKind};

use crate::{
    link::{CameraLink, Transport},
    table::Query,
};

/// Device operations in the order a connection performs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Open,
    AssignAddress,
    Clear,
    CameraInfo,
    Command,
    Query,
    UnreadBytes,
}

/// How a failing step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// The camera answers with an error packet.
    Device,
    /// The camera does not answer.
    Timeout,
    /// The camera answers with something undecodable.
    Malformed,
}

impl Failure {
    fn error(&self) -> visca::Error {
        match self {
            Failure::Device => visca::Error::Device(DeviceErrorKind::NotExecutable),
            Failure::Timeout => visca::Error::Timeout(Duration::from_millis(1000)),
            Failure::Malformed => visca::Error::Malformed("power status"),
        }
    }
}

/// Shared record of the operations performed on a fake link.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn push(&self, call: String) {
        self.0.lock().unwrap().push(call);
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

#[derive(Debug, Clone)]
pub struct FakeTransport {
    pub calls: CallLog,
    pub fail_at: Option<Step>,
    pub failure: Failure,
    /// Bytes waiting to be drained on close.
    pub pending: Vec<u8>,
    /// Values every query returns instead of plausible ones.
    pub query_values: Option<Vec<i32>>,
    pub ports: Vec<String>,
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self {
            calls: CallLog::default(),
            fail_at: None,
            failure: Failure::Timeout,
            pending: Vec::new(),
            query_values: None,
            ports: vec!["/dev/ttyUSB0".into(), "/dev/ttyS0".into()],
        }
    }
}

impl FakeTransport {
    pub const IDENTITY: CameraIdentity = CameraIdentity {
        vendor: 0x0020,
        model: 0x040E,
        rom_version: 0x0200,
        socket_num: 2,
    };

    pub fn failing_at(step: Step) -> Self {
        Self {
            fail_at: Some(step),
            ..Default::default()
        }
    }

    pub fn failing_with(step: Step, failure: Failure) -> Self {
        Self {
            fail_at: Some(step),
            failure,
            ..Default::default()
        }
    }
}

impl Transport for FakeTransport {
    type Link = FakeLink;

    fn open(&mut self, path: &str) -> visca::Result<FakeLink> {
        self.calls.push(format!("open {path}"));
        if self.fail_at == Some(Step::Open) {
            return Err(visca::Error::Open {
                path: path.to_string(),
                source: "no such device".into(),
            });
        }
        Ok(FakeLink {
            calls: self.calls.clone(),
            fail_at: self.fail_at,
            failure: self.failure,
            pending: self.pending.clone(),
            query_values: self.query_values.clone(),
            broadcast: false,
        })
    }

    fn list_ports(&self) -> visca::Result<Vec<String>> {
        Ok(self.ports.clone())
    }
}

pub struct FakeLink {
    calls: CallLog,
    fail_at: Option<Step>,
    failure: Failure,
    pending: Vec<u8>,
    query_values: Option<Vec<i32>>,
    broadcast: bool,
}

impl FakeLink {
    fn step(&self, step: Step, call: String) -> visca::Result<()> {
        self.calls.push(call);
        match self.fail_at {
            Some(failing) if failing == step => Err(self.failure.error()),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl CameraLink for FakeLink {
    fn set_broadcast(&mut self, broadcast: bool) {
        self.broadcast = broadcast;
    }

    async fn assign_address(&mut self) -> visca::Result<u8> {
        self.step(Step::AssignAddress, "assign_address".into())?;
        Ok(1)
    }

    async fn clear(&mut self) -> visca::Result<()> {
        self.step(Step::Clear, "clear".into())
    }

    async fn camera_info(&mut self, address: u8) -> visca::Result<CameraIdentity> {
        self.step(Step::CameraInfo, format!("camera_info {address}"))?;
        Ok(FakeTransport::IDENTITY)
    }

    async fn command(&mut self, address: u8, cmd: &Command) -> visca::Result<()> {
        self.step(Step::Command, format!("command {address} {cmd:?}"))
    }

    async fn query(&mut self, address: u8, query: Query) -> visca::Result<Vec<i32>> {
        self.step(Step::Query, format!("query {address} {query:?}"))?;
        if let Some(values) = &self.query_values {
            return Ok(values.clone());
        }
        Ok(match query {
            Query::Power => vec![1],
            Query::ZoomValue => vec![0x2000],
            Query::PanTiltPosition => vec![-500, 200],
        })
    }

    async fn unread_bytes(&mut self, cap: usize) -> visca::Result<Vec<u8>> {
        self.step(Step::UnreadBytes, format!("unread_bytes {cap}"))?;
        let n = cap.min(self.pending.len());
        Ok(self.pending.drain(..n).collect())
    }

    async fn close(&mut self) -> visca::Result<()> {
        self.calls.push("close".into());
        Ok(())
    }
}
