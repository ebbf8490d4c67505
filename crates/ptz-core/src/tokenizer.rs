/// No command takes more arguments than this.
pub const MAX_ARGS: usize = 5;

/// One command line, split into its name and arguments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn arg(&self, position: usize) -> Option<&str> {
        self.args.get(position).map(String::as_str)
    }
}

/// Split a command line on runs of whitespace.
///
/// Tokens after the fifth argument are dropped. An empty line gives a
/// command with an empty name.
pub fn tokenize(line: &str) -> Command {
    let mut tokens = line.split_whitespace();
    let name = tokens.next().unwrap_or_default().to_string();
    let args: Vec<String> = tokens.by_ref().take(MAX_ARGS).map(str::to_string).collect();
    let ignored = tokens.count();
    if ignored > 0 {
        tracing::debug!("{name}: ignoring {ignored} tokens after argument {MAX_ARGS}");
    }
    Command { name, args }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_arguments() {
        let cmd = tokenize("set_pantilt_left 10 5");
        assert_eq!(cmd.name, "set_pantilt_left");
        assert_eq!(cmd.args, vec!["10", "5"]);
        assert_eq!(cmd.arg(1), Some("5"));
        assert_eq!(cmd.arg(2), None);
    }

    #[test]
    fn whitespace_runs_are_one_delimiter() {
        let cmd = tokenize("  set_zoom_value \t 16384   ");
        assert_eq!(cmd.name, "set_zoom_value");
        assert_eq!(cmd.args, vec!["16384"]);
    }

    #[test]
    fn at_most_five_arguments() {
        let cmd = tokenize("x 1 2 3 4 5 6 7");
        assert_eq!(cmd.args, vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn empty_line() {
        assert_eq!(tokenize(""), Command::default());
        assert_eq!(tokenize("   ").name, "");
    }
}
