use tracing as log;

use crate::{
    config::ViscaConfig,
    dispatcher::{Dispatcher, NotReady},
    lifecycle::{CameraInfo, CloseReport, Lifecycle, LifecycleError, LifecycleState},
    link::Transport,
    result_code::ResultCode,
    tokenizer::tokenize,
    validate::{validate, ArgKind, IntegerPolicy, Value},
};

/// What one command line produced.
#[derive(Debug)]
pub enum Outcome {
    Code(ResultCode),
    Opened(CameraInfo),
    Closed(CloseReport),
    Devices(Vec<String>),
    State(LifecycleState),
    NotReady(NotReady),
    Failed(LifecycleError),
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Code(code) => write!(f, "{code}"),
            Outcome::Opened(info) => write!(f, "opened: {info}"),
            Outcome::Closed(report) => write!(f, "{report}"),
            Outcome::Devices(ports) => {
                write!(f, "devices:")?;
                for port in ports {
                    write!(f, " {port}")?;
                }
                Ok(())
            }
            Outcome::State(state) => write!(f, "state: {state}"),
            Outcome::NotReady(e) => write!(f, "not ready: {e}"),
            Outcome::Failed(e) => {
                write!(f, "error: {e}")?;
                if let Some(cause) = std::error::Error::source(e) {
                    write!(f, ": {cause}")?;
                }
                Ok(())
            }
        }
    }
}

/// One camera connection and the commands which drive it.
pub struct Interpreter<T: Transport> {
    dispatcher: Dispatcher,
    lifecycle: Lifecycle<T>,
}

impl<T: Transport> Interpreter<T> {
    pub fn new(transport: T, config: ViscaConfig) -> Self {
        Self {
            dispatcher: Dispatcher::new(&config),
            lifecycle: Lifecycle::new(transport, config),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Run one command line to completion.
    ///
    /// `open`, `close`, `devices` and `state` act on the connection itself;
    /// every other name goes to the command table.
    pub async fn execute(&mut self, line: &str) -> Outcome {
        let cmd = tokenize(line);
        log::trace!("executing {cmd:?}");
        match cmd.name.as_str() {
            "open" => {
                let path = match validate(&[ArgKind::Path], &cmd.args, IntegerPolicy::Strict)
                    .as_deref()
                {
                    Ok([Value::Path(path)]) => path.clone(),
                    _ => return Outcome::Code(ResultCode::InvalidArgument(1)),
                };
                match self.lifecycle.open(&path).await {
                    Ok(info) => Outcome::Opened(info.clone()),
                    Err(e) => Outcome::Failed(e),
                }
            }
            "close" => match self.lifecycle.close().await {
                Ok(report) => Outcome::Closed(report),
                Err(e) => Outcome::Failed(e),
            },
            "devices" => match self.lifecycle.list_ports() {
                Ok(ports) => Outcome::Devices(ports),
                Err(e) => Outcome::Failed(e),
            },
            "state" => Outcome::State(self.lifecycle.state()),
            _ => match self.dispatcher.dispatch(&mut self.lifecycle, &cmd).await {
                Ok(code) => Outcome::Code(code),
                Err(e) => {
                    log::warn!("{}: {e}", cmd.name);
                    Outcome::NotReady(e)
                }
            },
        }
    }
}
