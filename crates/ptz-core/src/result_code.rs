/// Outcome of one dispatched command.
///
/// Exactly one is produced per command line. The numeric form (see
/// [ResultCode::code]) is what the host reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Success0,
    Success1(i32),
    Success2(i32, i32),
    Success3(i32, i32, i32),
    UnrecognizedCommand,
    /// 1-based position of the offending argument, 1..=5
    InvalidArgument(u8),
    DeviceError,
    UnknownDeviceResponse,
}

impl ResultCode {
    /// Success with `values`, provided there are exactly `expected` of them.
    pub fn from_values(expected: usize, values: &[i32]) -> Self {
        match (expected, values) {
            (0, []) => ResultCode::Success0,
            (1, [a]) => ResultCode::Success1(*a),
            (2, [a, b]) => ResultCode::Success2(*a, *b),
            (3, [a, b, c]) => ResultCode::Success3(*a, *b, *c),
            _ => {
                tracing::warn!(
                    "device returned {} values where {expected} were expected",
                    values.len()
                );
                ResultCode::UnknownDeviceResponse
            }
        }
    }

    pub fn code(&self) -> u8 {
        use ResultCode::*;
        match self {
            Success0 => 0,
            Success1(..) => 1,
            Success2(..) => 2,
            Success3(..) => 3,
            UnrecognizedCommand => 10,
            InvalidArgument(position) => 10u8.saturating_add(*position),
            DeviceError => 40,
            UnknownDeviceResponse => 41,
        }
    }

    pub fn values(&self) -> Vec<i32> {
        use ResultCode::*;
        match *self {
            Success1(a) => vec![a],
            Success2(a, b) => vec![a, b],
            Success3(a, b, c) => vec![a, b, c],
            _ => Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code() <= 3
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())?;
        for value in self.values() {
            write!(f, " {value}")?;
        }
        Ok(())
    }
}
