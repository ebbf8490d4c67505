//! Text command interpreter for VISCA pan/tilt/zoom cameras.
//!
//! A command line is tokenized, looked up in the [CommandTable], checked
//! against the connection [Lifecycle], validated and finally run on the
//! camera. Every line produces exactly one [Outcome].

mod config;
mod dispatcher;
mod interpreter;
mod lifecycle;
mod link;
mod result_code;
mod table;
mod tokenizer;
mod validate;

#[cfg(test)]
mod testing;

pub use config::ViscaConfig;
pub use dispatcher::{Dispatcher, NotReady};
pub use interpreter::{Interpreter, Outcome};
pub use lifecycle::{CameraInfo, CloseReport, Connection, Lifecycle, LifecycleError, LifecycleState};
pub use link::{CameraLink, SerialTransport, Transport};
pub use result_code::ResultCode;
pub use table::{CommandEntry, CommandTable, Operation, Query};
pub use tokenizer::{tokenize, Command, MAX_ARGS};
pub use validate::{parse_bool, parse_int, validate, ArgKind, IntegerPolicy, Value};
