//! Argument and interactive-input parsing for the `onboard` binary.

use onboard::store::Status;

pub const USAGE: &str = "\
usage: onboard <command>

commands:
  serve                run the status server
  provision [STATUS]   create or reset the tracked record (default 0)
  view                 follow the status as a viewer
  drive                interactive driver session
";

pub const DRIVER_HELP: &str = "\
driver commands:
  unlock <code>   unlock the driver panel
  <0-3>           publish a status
  labels          list status codes
  back            leave driver mode (twice to exit)
  quit            exit
";

/// Top-level command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Serve,
    Provision(Status),
    View,
    Drive,
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match args.as_slice() {
            ["serve"] => Ok(Command::Serve),
            ["view"] => Ok(Command::View),
            ["drive"] => Ok(Command::Drive),
            ["provision"] => Ok(Command::Provision(parse_status("0")?)),
            ["provision", code] => Ok(Command::Provision(parse_status(code)?)),
            [] => Err("missing command".to_string()),
            [other, ..] => Err(format!("unknown command or arguments: `{other}`")),
        }
    }
}

/// One line typed during a `drive` session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverInput {
    Unlock(String),
    Select(Status),
    Labels,
    Back,
    Quit,
    Help,
    Invalid(String),
}

impl DriverInput {
    pub fn parse(line: &str) -> Self {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["unlock", code] => DriverInput::Unlock(code.to_string()),
            ["unlock"] => DriverInput::Invalid("usage: unlock <code>".to_string()),
            ["labels"] => DriverInput::Labels,
            ["back"] => DriverInput::Back,
            ["quit" | "exit"] => DriverInput::Quit,
            [] | ["help"] => DriverInput::Help,
            [word] => match parse_status(word) {
                Ok(status) => DriverInput::Select(status),
                Err(e) => DriverInput::Invalid(e),
            },
            _ => DriverInput::Invalid(format!("unrecognised input: `{line}`")),
        }
    }
}

fn parse_status(word: &str) -> Result<Status, String> {
    let code: i64 = word
        .parse()
        .map_err(|_| format!("`{word}` is not a status code"))?;
    Status::from_code(code).ok_or_else(|| format!("unknown status code {code}"))
}
