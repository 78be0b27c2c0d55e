use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};

use parley_types::models::UserId;

pub const HELP: &str = "\
commands:
  /users                       list online users
  /open <user id>              open a conversation
  /close                       close the conversation
  /photo <path>                send a file as a photo
  /profile <name> [avatar url] update your profile
  /quit                        exit
anything else is sent as a message";

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Users,
    Open(UserId),
    Close,
    Photo(Option<PathBuf>),
    Profile {
        name: String,
        avatar_url: Option<String>,
    },
    Help,
    Quit,
    Say(String),
}

pub fn parse(line: &str) -> Result<Command> {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Ok(Command::Say(line.to_string()));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    match name {
        "users" => Ok(Command::Users),
        "open" => {
            let id = args
                .parse()
                .map_err(|_| anyhow!("usage: /open <user id>"))?;
            Ok(Command::Open(id))
        }
        "close" => Ok(Command::Close),
        "photo" => {
            let path = (!args.is_empty()).then(|| PathBuf::from(args));
            Ok(Command::Photo(path))
        }
        "profile" => {
            let mut parts = args.split_whitespace();
            let name = parts.next().unwrap_or_default().to_string();
            let avatar_url = parts.next().map(str::to_string);
            Ok(Command::Profile { name, avatar_url })
        }
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => bail!("unknown command /{other}, try /help"),
    }
}
