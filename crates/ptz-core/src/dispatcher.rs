use std::time::Duration;
use tracing as log;

use visca::CameraIdentity;

use crate::{
    config::ViscaConfig,
    lifecycle::{CameraInfo, Connection, Lifecycle, LifecycleState},
    link::{CameraLink, Transport},
    result_code::ResultCode,
    table::{CommandEntry, CommandTable, Operation, Query},
    tokenizer::Command,
    validate::{validate, IntegerPolicy},
};

/// A known command arrived while the connection was not ready.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("camera connection is {0}")]
pub struct NotReady(pub LifecycleState);

/// Runs command lines against a ready connection.
pub struct Dispatcher {
    table: CommandTable,
    policy: IntegerPolicy,
    zoom_settle: Duration,
}

fn identity_values(id: &CameraIdentity) -> Vec<i32> {
    vec![id.vendor.into(), id.model.into(), id.rom_version.into()]
}

/// Keep the values of a well-formed query result.
fn record(info: &mut CameraInfo, query: Query, values: &[i32]) {
    match (query, values) {
        (Query::Power, [on]) => info.power = Some(*on != 0),
        (Query::ZoomValue, [zoom]) => info.zoom = Some(*zoom),
        (Query::PanTiltPosition, [pan, tilt]) => info.pan_tilt = Some((*pan, *tilt)),
        _ => {}
    }
}

impl Dispatcher {
    pub fn new(config: &ViscaConfig) -> Self {
        Self {
            table: CommandTable::visca(),
            policy: config.integer_policy(),
            zoom_settle: config.zoom_settle(),
        }
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    /// Look up, validate and run one command.
    ///
    /// Unknown names are reported whatever the connection state. Known
    /// commands are only validated and run while the connection is ready.
    pub async fn dispatch<T: Transport>(
        &self,
        lifecycle: &mut Lifecycle<T>,
        cmd: &Command,
    ) -> Result<ResultCode, NotReady> {
        let Some(entry) = self.table.get(&cmd.name) else {
            log::warn!("unrecognized command {:?}", cmd.name);
            return Ok(ResultCode::UnrecognizedCommand);
        };
        let conn = lifecycle.ready_connection_mut().map_err(NotReady)?;

        let op = match validate(entry.args, &cmd.args, self.policy)
            .and_then(|values| entry.operation(&values))
        {
            Ok(op) => op,
            Err(position) => {
                log::warn!("{}: invalid argument {position} in {:?}", cmd.name, cmd.args);
                return Ok(ResultCode::InvalidArgument(position));
            }
        };
        log::debug!("{}: {op:?}", cmd.name);
        Ok(self.invoke(conn, entry, op).await)
    }

    async fn invoke<L: CameraLink>(
        &self,
        conn: &mut Connection<L>,
        entry: &CommandEntry,
        op: Operation,
    ) -> ResultCode {
        let address = conn.address;
        if op != Operation::CachedInfo {
            conn.settle().await;
        }
        let result = match op {
            Operation::Command(cmd) => conn.link_mut().command(address, &cmd).await.map(|()| Vec::new()),
            Operation::Query(query) => conn.link_mut().query(address, query).await,
            Operation::RefreshInfo => conn.link_mut().camera_info(address).await.map(|id| {
                conn.info.identity = id;
                identity_values(&id)
            }),
            Operation::CachedInfo => {
                log::debug!("socket number: {}", conn.info.identity.socket_num);
                Ok(identity_values(&conn.info.identity))
            }
        };

        let values = match result {
            Ok(values) => values,
            Err(e) if e.is_unexpected_reply() => {
                log::error!("{}: {e}", entry.name);
                return ResultCode::UnknownDeviceResponse;
            }
            Err(e) => {
                log::error!("{}: {e}", entry.name);
                return ResultCode::DeviceError;
            }
        };

        let code = ResultCode::from_values(entry.returns, &values);
        if code.is_success() {
            if let Operation::Query(query) = op {
                record(&mut conn.info, query, &values);
            }
            if entry.settles {
                conn.settle_for(self.zoom_settle);
            }
        }
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Failure, FakeTransport, Step};
    use crate::tokenizer::tokenize;
    use crate::validate::ArgKind;
    use tokio::time::Instant;

    async fn ready(transport: FakeTransport) -> eyre::Result<Lifecycle<FakeTransport>> {
        let mut lc = Lifecycle::new(transport, ViscaConfig::default());
        lc.open("/dev/ttyUSB0").await?;
        Ok(lc)
    }

    async fn run(
        lc: &mut Lifecycle<FakeTransport>,
        line: &str,
    ) -> Result<ResultCode, NotReady> {
        Dispatcher::new(lc.config()).dispatch(lc, &tokenize(line)).await
    }

    fn info(lc: &mut Lifecycle<FakeTransport>) -> CameraInfo {
        lc.ready_connection_mut()
            .map(|conn| conn.info.clone())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn unknown_command_in_every_state() -> eyre::Result<()> {
        let transport = FakeTransport::default();
        let calls = transport.calls.clone();
        let mut lc = Lifecycle::new(transport, ViscaConfig::default());
        assert_eq!(run(&mut lc, "frobnicate 1").await, Ok(ResultCode::UnrecognizedCommand));
        assert_eq!(run(&mut lc, "").await, Ok(ResultCode::UnrecognizedCommand));

        lc.open("/dev/ttyUSB0").await?;
        calls.take();
        assert_eq!(run(&mut lc, "Set_Power 1").await, Ok(ResultCode::UnrecognizedCommand));
        assert!(calls.take().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn closed_connection_does_no_io() {
        let transport = FakeTransport::default();
        let calls = transport.calls.clone();
        let mut lc = Lifecycle::new(transport, ViscaConfig::default());
        assert_eq!(
            run(&mut lc, "set_pantilt_left 10 5").await,
            Err(NotReady(LifecycleState::Closed))
        );
        // not even validated
        assert_eq!(
            run(&mut lc, "set_pantilt_left 0 0").await,
            Err(NotReady(LifecycleState::Closed))
        );
        assert!(calls.take().is_empty());
    }

    #[tokio::test]
    async fn invalid_arguments_do_no_io() -> eyre::Result<()> {
        let transport = FakeTransport::default();
        let calls = transport.calls.clone();
        let mut lc = ready(transport).await?;
        calls.take();

        assert_eq!(run(&mut lc, "set_pantilt_left 0 5").await, Ok(ResultCode::InvalidArgument(1)));
        assert_eq!(run(&mut lc, "set_pantilt_left 10 25").await, Ok(ResultCode::InvalidArgument(2)));
        assert_eq!(run(&mut lc, "set_pantilt_left 10").await, Ok(ResultCode::InvalidArgument(2)));
        assert_eq!(
            run(&mut lc, "set_pantilt_absolute_position 1 1 0 301").await,
            Ok(ResultCode::InvalidArgument(4))
        );
        assert_eq!(run(&mut lc, "set_power maybe").await, Ok(ResultCode::InvalidArgument(1)));
        assert_eq!(run(&mut lc, "set_zoom_value abc").await, Ok(ResultCode::InvalidArgument(1)));
        assert!(calls.take().is_empty());

        assert_eq!(run(&mut lc, "set_pantilt_left 10 5").await, Ok(ResultCode::Success0));
        assert_eq!(calls.take().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn lenient_integers_count_as_zero() -> eyre::Result<()> {
        let config = ViscaConfig {
            lenient_integers: true,
            zoom_settle_usec: 0,
            ..Default::default()
        };
        let mut lc = Lifecycle::new(FakeTransport::default(), config);
        lc.open("/dev/ttyUSB0").await?;
        assert_eq!(run(&mut lc, "set_zoom_value abc").await, Ok(ResultCode::Success0));
        // 0 is below the pan speed range
        assert_eq!(run(&mut lc, "set_pantilt_up abc 1").await, Ok(ResultCode::InvalidArgument(1)));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn every_command_returns_declared_count() -> eyre::Result<()> {
        let mut lc = ready(FakeTransport::default()).await?;
        let dispatcher = Dispatcher::new(lc.config());
        for entry in dispatcher.table().entries() {
            let args = entry
                .args
                .iter()
                .map(|kind| match kind {
                    ArgKind::Int { min, max } => ((min + max) / 2).to_string(),
                    ArgKind::Bool => "1".to_string(),
                    ArgKind::Path => "/dev/null".to_string(),
                })
                .collect();
            let cmd = Command {
                name: entry.name.to_string(),
                args,
            };
            let code = dispatcher.dispatch(&mut lc, &cmd).await?;
            assert!(code.is_success(), "{}: {code:?}", entry.name);
            assert_eq!(usize::from(code.code()), entry.returns, "{}", entry.name);
            assert_eq!(code.values().len(), entry.returns, "{}", entry.name);
        }
        Ok(())
    }

    #[tokio::test]
    async fn queries_update_camera_info() -> eyre::Result<()> {
        let mut lc = ready(FakeTransport::default()).await?;
        assert_eq!(info(&mut lc).pan_tilt, None);

        assert_eq!(run(&mut lc, "get_pantilt_position").await, Ok(ResultCode::Success2(-500, 200)));
        assert_eq!(run(&mut lc, "get_power").await, Ok(ResultCode::Success1(1)));
        assert_eq!(run(&mut lc, "get_zoom_value").await, Ok(ResultCode::Success1(0x2000)));
        let info = info(&mut lc);
        assert_eq!(info.pan_tilt, Some((-500, 200)));
        assert_eq!(info.power, Some(true));
        assert_eq!(info.zoom, Some(0x2000));
        Ok(())
    }

    #[tokio::test]
    async fn device_failures() -> eyre::Result<()> {
        let mut lc = ready(FakeTransport::failing_with(Step::Command, Failure::Device)).await?;
        assert_eq!(run(&mut lc, "set_pantilt_home").await, Ok(ResultCode::DeviceError));

        let mut lc = ready(FakeTransport::failing_with(Step::Command, Failure::Timeout)).await?;
        assert_eq!(run(&mut lc, "set_power 0").await, Ok(ResultCode::DeviceError));

        let mut lc = ready(FakeTransport::failing_with(Step::Query, Failure::Malformed)).await?;
        assert_eq!(run(&mut lc, "get_power").await, Ok(ResultCode::UnknownDeviceResponse));
        assert_eq!(info(&mut lc).power, None);
        Ok(())
    }

    #[tokio::test]
    async fn wrong_value_count_is_unknown_response() -> eyre::Result<()> {
        let transport = FakeTransport {
            query_values: Some(vec![1, 2, 3]),
            ..Default::default()
        };
        let mut lc = ready(transport).await?;
        assert_eq!(
            run(&mut lc, "get_pantilt_position").await,
            Ok(ResultCode::UnknownDeviceResponse)
        );
        assert_eq!(info(&mut lc).pan_tilt, None);
        Ok(())
    }

    #[tokio::test]
    async fn cached_info_does_no_io() -> eyre::Result<()> {
        let transport = FakeTransport::default();
        let calls = transport.calls.clone();
        let mut lc = ready(transport).await?;
        calls.take();

        let id = FakeTransport::IDENTITY;
        let expected = ResultCode::Success3(id.vendor.into(), id.model.into(), id.rom_version.into());
        assert_eq!(run(&mut lc, "info").await, Ok(expected));
        assert!(calls.take().is_empty());

        assert_eq!(run(&mut lc, "get_camera_info").await, Ok(expected));
        assert_eq!(calls.take(), vec!["camera_info 1"]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn zoom_settles_before_next_command() -> eyre::Result<()> {
        let mut lc = ready(FakeTransport::default()).await?;

        let start = Instant::now();
        assert_eq!(run(&mut lc, "set_zoom_value 8000").await, Ok(ResultCode::Success0));
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(run(&mut lc, "get_power").await, Ok(ResultCode::Success1(1)));
        assert!(start.elapsed() >= Duration::from_micros(500_000));

        // pan/tilt commands do not settle
        let start = Instant::now();
        run(&mut lc, "set_pantilt_stop 1 1").await?;
        run(&mut lc, "get_power").await?;
        assert_eq!(start.elapsed(), Duration::ZERO);
        Ok(())
    }
}
