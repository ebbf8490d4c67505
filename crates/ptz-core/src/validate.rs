/// What a command expects at one argument position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Decimal integer within `min..=max`.
    Int { min: i32, max: i32 },
    /// `true`/`1` or `false`/`0`.
    Bool,
    /// Any token, e.g. a device path.
    Path,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    Bool(bool),
    Path(String),
}

/// How to treat integer tokens which do not parse.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum IntegerPolicy {
    /// Unparsable tokens are invalid arguments.
    #[default]
    Strict,
    /// Unparsable tokens count as zero and are then range checked.
    Lenient,
}

pub fn parse_int(token: &str, policy: IntegerPolicy) -> Option<i32> {
    match (token.parse::<i32>(), policy) {
        (Ok(value), _) => Some(value),
        (Err(_), IntegerPolicy::Strict) => None,
        (Err(_), IntegerPolicy::Lenient) => {
            tracing::warn!("treating non-numeric argument {token:?} as 0");
            Some(0)
        }
    }
}

/// `None` means "not specified", never a third truth value.
pub fn parse_bool(token: &str) -> Option<bool> {
    match token {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn check(kind: ArgKind, token: Option<&str>, policy: IntegerPolicy) -> Option<Value> {
    let token = token?;
    match kind {
        ArgKind::Int { min, max } => {
            let value = parse_int(token, policy)?;
            (min..=max).contains(&value).then_some(Value::Int(value))
        }
        ArgKind::Bool => parse_bool(token).map(Value::Bool),
        ArgKind::Path => (!token.is_empty()).then(|| Value::Path(token.to_string())),
    }
}

/// Check `args` against `rule` position by position.
///
/// On failure returns the 1-based position of the first bad (or missing)
/// argument. Arguments beyond the rule are not looked at.
pub fn validate(rule: &[ArgKind], args: &[String], policy: IntegerPolicy) -> Result<Vec<Value>, u8> {
    rule.iter()
        .enumerate()
        .map(|(i, kind)| {
            check(*kind, args.get(i).map(String::as_str), policy).ok_or(i as u8 + 1)
        })
        .collect()
}
