//! Parsing of interactive command lines.

use remuco_core::{Activation, Control, Request, Tag};
use thiserror::Error;

pub const HELP: &str = "\
playback   play | next | prev | seek <+-secs> | fullscreen
mixer      vol <0-100> | repeat on|off | shuffle on|off
items      rate <n> | tag <item-id> [tag, tag..] | item <item-id>
lists      playlist | queue | mlib [a/b/..] | files [a/b/..]
           clear-pl | clear-qu
server     show playlist|queue|mlib|files | shutdown
client     status | help | quit";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Control(Control),
    Activate(Activation),
    Request(Request),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command `{0}`, try `help`")]
    Unknown(String),

    #[error("`{command}` needs {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },

    #[error("invalid {what} `{value}`")]
    InvalidArgument { what: &'static str, value: String },
}

impl std::str::FromStr for UserCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        parse(line)
    }
}

pub fn parse(line: &str) -> Result<UserCommand, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(CommandError::Empty);
    };
    let arg = words.next();

    let cmd = match head.to_ascii_lowercase().as_str() {
        "play" | "pause" | "p" => UserCommand::Control(Control::PlayPause),
        "next" | "n" => UserCommand::Control(Control::Next),
        "prev" => UserCommand::Control(Control::Prev),
        "fullscreen" => UserCommand::Control(Control::Fullscreen),
        "clear-pl" => UserCommand::Control(Control::ClearPlaylist),
        "clear-qu" => UserCommand::Control(Control::ClearQueue),
        "shutdown" => UserCommand::Control(Control::Shutdown),
        "seek" => UserCommand::Control(Control::Seek(int("seek", "seconds", arg)?)),
        "vol" | "volume" => {
            let level = int("vol", "a level", arg)?;
            if !(0..=100).contains(&level) {
                return Err(invalid("volume", level.to_string()));
            }
            UserCommand::Control(Control::Volume(level))
        }
        "rate" => UserCommand::Control(Control::Rate(int("rate", "a rating", arg)?)),
        "repeat" => UserCommand::Control(Control::Repeat(switch("repeat", arg)?)),
        "shuffle" => UserCommand::Control(Control::Shuffle(switch("shuffle", arg)?)),
        "tag" => {
            let item = arg.ok_or(CommandError::MissingArgument {
                command: "tag",
                what: "an item id",
            })?;
            let rest = words.collect::<Vec<_>>().join(" ");
            let tags = rest
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
            UserCommand::Control(Control::Tag(Tag::new(item, tags)))
        }
        "item" => {
            let id = arg.ok_or(CommandError::MissingArgument {
                command: "item",
                what: "an item id",
            })?;
            UserCommand::Request(Request::Item(id.to_string()))
        }
        "playlist" | "pl" => UserCommand::Request(Request::Playlist),
        "queue" | "qu" => UserCommand::Request(Request::Queue),
        "mlib" => UserCommand::Request(Request::MediaLib(path(arg))),
        "files" => UserCommand::Request(Request::Files(path(arg))),
        "show" => UserCommand::Activate(match arg.map(str::to_ascii_lowercase).as_deref() {
            Some("playlist") => Activation::Playlist,
            Some("queue") => Activation::Queue,
            Some("mlib") => Activation::MediaLib,
            Some("files") => Activation::Files,
            Some(other) => return Err(invalid("view", other.to_string())),
            None => {
                return Err(CommandError::MissingArgument {
                    command: "show",
                    what: "a view",
                });
            }
        }),
        "status" | "s" => UserCommand::Status,
        "help" | "?" => UserCommand::Help,
        "quit" | "exit" | "q" => UserCommand::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(cmd)
}

fn invalid(what: &'static str, value: String) -> CommandError {
    CommandError::InvalidArgument { what, value }
}

fn int(command: &'static str, what: &'static str, arg: Option<&str>) -> Result<i32, CommandError> {
    let arg = arg.ok_or(CommandError::MissingArgument { command, what })?;
    arg.trim_start_matches('+')
        .parse()
        .map_err(|_| invalid(what, arg.to_string()))
}

fn switch(command: &'static str, arg: Option<&str>) -> Result<bool, CommandError> {
    match arg.map(str::to_ascii_lowercase).as_deref() {
        Some("on" | "true" | "1") => Ok(true),
        Some("off" | "false" | "0") => Ok(false),
        Some(other) => Err(invalid("switch", other.to_string())),
        None => Err(CommandError::MissingArgument {
            command,
            what: "on or off",
        }),
    }
}

/// `a/b/c` → `["a", "b", "c"]`; no argument is the root.
fn path(arg: Option<&str>) -> Vec<String> {
    arg.map(|p| {
        p.split('/')
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}
