use std::collections::BTreeMap;

use visca::{Command as Visca, Direction};

use crate::validate::{ArgKind, Value};

const PAN_SPEED: ArgKind = ArgKind::Int { min: 1, max: 24 };
const TILT_SPEED: ArgKind = ArgKind::Int { min: 1, max: 20 };
const ZOOM_SPEED: ArgKind = ArgKind::Int { min: 0, max: 7 };
const ZOOM_VALUE: ArgKind = ArgKind::Int { min: 0, max: 0x4000 };
const PAN_POSITION: ArgKind = ArgKind::Int { min: -880, max: 880 };
const TILT_POSITION: ArgKind = ArgKind::Int { min: -300, max: 300 };
const SHUTTER: ArgKind = ArgKind::Int { min: 0, max: 21 };

const NO_ARGS: &[ArgKind] = &[];
const SPEEDS: &[ArgKind] = &[PAN_SPEED, TILT_SPEED];
const POSITION: &[ArgKind] = &[PAN_SPEED, TILT_SPEED, PAN_POSITION, TILT_POSITION];

/// A camera inquiry and the values it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    /// 1 if on
    Power,
    ZoomValue,
    /// pan, tilt
    PanTiltPosition,
}

impl Query {
    pub fn returns(&self) -> usize {
        match self {
            Query::Power | Query::ZoomValue => 1,
            Query::PanTiltPosition => 2,
        }
    }
}

/// What a validated command asks of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Command(Visca),
    Query(Query),
    /// Ask the camera for its identity again.
    RefreshInfo,
    /// Report the identity read while opening, without device I/O.
    CachedInfo,
}

#[derive(Debug, Clone, Copy)]
enum Builder {
    Fixed(Operation),
    Power,
    ZoomTeleSpeed,
    ZoomWideSpeed,
    ZoomValue,
    Drive(Direction),
    Absolute,
    Relative,
    Shutter,
}

/// Position `i` (0-based) as an integer of type `T`, or the 1-based position
/// as error.
fn int<T: TryFrom<i32>>(values: &[Value], i: usize) -> Result<T, u8> {
    match values.get(i) {
        Some(Value::Int(v)) => T::try_from(*v).map_err(|_| i as u8 + 1),
        _ => Err(i as u8 + 1),
    }
}

impl Builder {
    fn build(&self, values: &[Value]) -> Result<Operation, u8> {
        use Builder::*;
        let cmd = match *self {
            Fixed(op) => return Ok(op),
            Power => match values.first() {
                Some(Value::Bool(on)) => Visca::Power(*on),
                _ => return Err(1),
            },
            ZoomTeleSpeed => Visca::ZoomTeleSpeed(int(values, 0)?),
            ZoomWideSpeed => Visca::ZoomWideSpeed(int(values, 0)?),
            ZoomValue => Visca::ZoomDirect(int(values, 0)?),
            Drive(direction) => Visca::PanTiltDrive {
                pan_speed: int(values, 0)?,
                tilt_speed: int(values, 1)?,
                direction,
            },
            Absolute => Visca::PanTiltAbsolute {
                pan_speed: int(values, 0)?,
                tilt_speed: int(values, 1)?,
                pan: int(values, 2)?,
                tilt: int(values, 3)?,
            },
            Relative => Visca::PanTiltRelative {
                pan_speed: int(values, 0)?,
                tilt_speed: int(values, 1)?,
                pan: int(values, 2)?,
                tilt: int(values, 3)?,
            },
            Shutter => Visca::ShutterDirect(int(values, 0)?),
        };
        Ok(Operation::Command(cmd))
    }
}

/// One row of the [CommandTable].
#[derive(Debug, Clone)]
pub struct CommandEntry {
    pub name: &'static str,
    pub args: &'static [ArgKind],
    /// Number of values a successful call reports.
    pub returns: usize,
    /// Whether the camera needs settling time before the next command.
    pub settles: bool,
    builder: Builder,
}

impl CommandEntry {
    /// Turn validated values into the operation to run.
    pub fn operation(&self, values: &[Value]) -> Result<Operation, u8> {
        self.builder.build(values)
    }
}

/// Every command the dispatcher knows, by exact name.
pub struct CommandTable {
    entries: BTreeMap<&'static str, CommandEntry>,
}

impl CommandTable {
    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.entries.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = &CommandEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn add(
        &mut self,
        name: &'static str,
        args: &'static [ArgKind],
        returns: usize,
        builder: Builder,
    ) -> &mut CommandEntry {
        debug_assert!(
            !self.entries.contains_key(name),
            "command {name} registered twice"
        );
        self.entries.entry(name).or_insert(CommandEntry {
            name,
            args,
            returns,
            settles: false,
            builder,
        })
    }

    fn command(&mut self, name: &'static str, args: &'static [ArgKind], builder: Builder) {
        self.add(name, args, 0, builder);
    }

    fn zoom(&mut self, name: &'static str, args: &'static [ArgKind], builder: Builder) {
        self.add(name, args, 0, builder).settles = true;
    }

    fn query(&mut self, name: &'static str, query: Query) {
        self.add(
            name,
            NO_ARGS,
            query.returns(),
            Builder::Fixed(Operation::Query(query)),
        );
    }

    /// The VISCA command set.
    pub fn visca() -> Self {
        use Builder::*;
        let mut table = Self {
            entries: BTreeMap::new(),
        };

        table.command("set_power", &[ArgKind::Bool], Power);
        table.query("get_power", Query::Power);

        table.zoom("set_zoom_tele", NO_ARGS, Fixed(Operation::Command(Visca::ZoomTele)));
        table.zoom("set_zoom_wide", NO_ARGS, Fixed(Operation::Command(Visca::ZoomWide)));
        table.zoom("set_zoom_stop", NO_ARGS, Fixed(Operation::Command(Visca::ZoomStop)));
        table.zoom("set_zoom_tele_speed", &[ZOOM_SPEED], ZoomTeleSpeed);
        table.zoom("set_zoom_wide_speed", &[ZOOM_SPEED], ZoomWideSpeed);
        table.zoom("set_zoom_value", &[ZOOM_VALUE], ZoomValue);
        table.query("get_zoom_value", Query::ZoomValue);

        for (name, direction) in [
            ("set_pantilt_up", Direction::Up),
            ("set_pantilt_down", Direction::Down),
            ("set_pantilt_left", Direction::Left),
            ("set_pantilt_right", Direction::Right),
            ("set_pantilt_upleft", Direction::UpLeft),
            ("set_pantilt_upright", Direction::UpRight),
            ("set_pantilt_downleft", Direction::DownLeft),
            ("set_pantilt_downright", Direction::DownRight),
            ("set_pantilt_stop", Direction::Stop),
        ] {
            table.command(name, SPEEDS, Drive(direction));
        }
        table.command("set_pantilt_absolute_position", POSITION, Absolute);
        table.command("set_pantilt_relative_position", POSITION, Relative);
        table.command(
            "set_pantilt_home",
            NO_ARGS,
            Fixed(Operation::Command(Visca::PanTiltHome)),
        );
        table.command(
            "set_pantilt_reset",
            NO_ARGS,
            Fixed(Operation::Command(Visca::PanTiltReset)),
        );
        table.query("get_pantilt_position", Query::PanTiltPosition);

        table.command("set_shutter_value", &[SHUTTER], Shutter);

        // vendor, model, ROM version
        table.add("get_camera_info", NO_ARGS, 3, Fixed(Operation::RefreshInfo));
        table.add("info", NO_ARGS, 3, Fixed(Operation::CachedInfo));

        table
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::visca()
    }
}
