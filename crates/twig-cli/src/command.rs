use std::path::PathBuf;

pub const HELP: &str = "\
Type a message and press enter to send it.

  /edit N TEXT   rewrite user message N and ask again (keeps the original as a branch)
  /regen N       ask for a new answer to the turn at message N
  /prev N        show the previous branch at message N
  /next N        show the next branch at message N
  /attach PATH   stage a file or image for the next message
  /detach        drop all staged attachments
  /clear         start over
  /help          show this help
  /quit          exit

Messages are numbered as shown. Start a line with // to send a literal leading slash.
Ctrl-C stops a reply that is still being generated.";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    /// `index` is zero-based; the user types one-based positions.
    Edit { index: usize, text: String },
    Regen { index: usize },
    Prev { index: usize },
    Next { index: usize },
    Attach(PathBuf),
    Detach,
    Clear,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command /{0} (try /help)")]
    UnknownCommand(String),

    #[error("/{command} needs {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },

    #[error("not a message number: {0}")]
    InvalidPosition(String),
}

/// Parse a line. Blank lines parse to `None`.
pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }
    if let Some(literal) = line.strip_prefix("//") {
        return Ok(Some(Command::Send(format!("/{literal}"))));
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Send(line.to_string())));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "edit" | "e" => {
            let (position, text) = match args.split_once(char::is_whitespace) {
                Some((position, text)) => (position, text.trim()),
                None => (args, ""),
            };
            let index = position_arg("edit", position)?;
            if text.is_empty() {
                return Err(ParseError::MissingArgument {
                    command: "edit",
                    what: "the new message text",
                });
            }
            Command::Edit {
                index,
                text: text.to_string(),
            }
        }
        "regen" | "r" => Command::Regen {
            index: position_arg("regen", args)?,
        },
        "prev" | "p" => Command::Prev {
            index: position_arg("prev", args)?,
        },
        "next" | "n" => Command::Next {
            index: position_arg("next", args)?,
        },
        "attach" | "a" => {
            if args.is_empty() {
                return Err(ParseError::MissingArgument {
                    command: "attach",
                    what: "a file path",
                });
            }
            Command::Attach(PathBuf::from(args))
        }
        "detach" => Command::Detach,
        "clear" => Command::Clear,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}

fn position_arg(command: &'static str, arg: &str) -> Result<usize, ParseError> {
    if arg.is_empty() {
        return Err(ParseError::MissingArgument {
            command,
            what: "a message number",
        });
    }
    match arg.parse::<usize>() {
        Ok(position) if position >= 1 => Ok(position - 1),
        _ => Err(ParseError::InvalidPosition(arg.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(line: &str) -> Command {
        parse(line).unwrap().unwrap()
    }

    #[test]
    fn plain_text_is_sent() {
        assert_eq!(ok("Oi, tudo bem?"), Command::Send("Oi, tudo bem?".into()));
        assert_eq!(ok("  indented\n"), Command::Send("  indented".into()));
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("   \n").unwrap(), None);
    }

    #[test]
    fn double_slash_escapes() {
        assert_eq!(ok("//etc/hosts"), Command::Send("/etc/hosts".into()));
    }

    #[test]
    fn positions_are_one_based() {
        assert_eq!(ok("/regen 2"), Command::Regen { index: 1 });
        assert_eq!(ok("/prev 1"), Command::Prev { index: 0 });
        assert_eq!(ok("/n 3"), Command::Next { index: 2 });
        assert_eq!(
            parse("/regen 0"),
            Err(ParseError::InvalidPosition("0".into()))
        );
        assert_eq!(
            parse("/next two"),
            Err(ParseError::InvalidPosition("two".into()))
        );
    }

    #[test]
    fn edit_takes_position_and_text() {
        assert_eq!(
            ok("/edit 1 Oi de novo"),
            Command::Edit {
                index: 0,
                text: "Oi de novo".into()
            }
        );
        assert!(matches!(
            parse("/edit 1"),
            Err(ParseError::MissingArgument { command: "edit", .. })
        ));
        assert!(matches!(
            parse("/edit"),
            Err(ParseError::MissingArgument { command: "edit", .. })
        ));
    }

    #[test]
    fn attach_keeps_spaces_in_path() {
        assert_eq!(
            ok("/attach ./My Photos/cat.png"),
            Command::Attach(PathBuf::from("./My Photos/cat.png"))
        );
        assert!(parse("/attach").is_err());
    }

    #[test]
    fn bare_commands() {
        assert_eq!(ok("/clear"), Command::Clear);
        assert_eq!(ok("/detach"), Command::Detach);
        assert_eq!(ok("/?"), Command::Help);
        assert_eq!(ok("/q"), Command::Quit);
        assert_eq!(
            parse("/frobnicate"),
            Err(ParseError::UnknownCommand("frobnicate".into()))
        );
    }
}
