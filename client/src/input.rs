//! Command line input: what the user types and how it becomes a request

use crate::game::Session;
use shared::{MatchId, PlayerId, ProtocolError, Request};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("unknown command {0:?}, type `help` for a list")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("word ids are numbers, got {0:?}")]
    WordId(String),

    #[error(transparent)]
    Identifier(#[from] ProtocolError),

    #[error("not started yet, use `start <name>` first")]
    NotStarted,

    #[error("not in a match")]
    NoMatch,
}

/// One user command, before the session fills in who and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start(PlayerId),
    Lobby,
    New {
        match_id: MatchId,
        puzzle: String,
        description: String,
    },
    Play(MatchId),
    Try { word: u32, guess: String },
    Challenge { word: u32, guess: String },
    Watch,
    WatchLobby,
    Exit,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  start <name>                         register with the server
  lobby                                list puzzles and open matches
  new <match> <puzzle> <description>   open a match and wait for an opponent
  play <match>                         join an open match
  try <word> <guess>                   guess a word
  challenge <word> <guess>             dispute your opponent's guess
  watch                                wait for the board to change
  watch lobby                          wait for the lobby to change
  exit                                 leave the match, or log out
  quit                                 close the client";

/// Parses one line typed by the user; blank lines give None
pub fn parse_command(line: &str) -> Result<Option<Command>, InputError> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (name.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("start", [player]) => Command::Start(player.parse()?),
        ("start", _) => return Err(InputError::Usage("start <name>")),
        ("lobby", []) => Command::Lobby,
        ("new", [match_id, puzzle, description @ ..]) => Command::New {
            match_id: match_id.parse()?,
            puzzle: puzzle.to_string(),
            description: description.join(" "),
        },
        ("new", _) => return Err(InputError::Usage("new <match> <puzzle> <description>")),
        ("play", [match_id]) => Command::Play(match_id.parse()?),
        ("play", _) => return Err(InputError::Usage("play <match>")),
        ("try", [word, guess]) => Command::Try {
            word: word_id(word)?,
            guess: guess.to_string(),
        },
        ("try", _) => return Err(InputError::Usage("try <word> <guess>")),
        ("challenge", [word, guess]) => Command::Challenge {
            word: word_id(word)?,
            guess: guess.to_string(),
        },
        ("challenge", _) => return Err(InputError::Usage("challenge <word> <guess>")),
        ("watch", []) => Command::Watch,
        ("watch", ["lobby"]) => Command::WatchLobby,
        ("exit", []) => Command::Exit,
        ("help" | "?", _) => Command::Help,
        ("quit" | "q", _) => Command::Quit,
        _ => return Err(InputError::Unknown(line.trim().to_string())),
    };

    Ok(Some(command))
}

fn word_id(s: &str) -> Result<u32, InputError> {
    s.parse().map_err(|_| InputError::WordId(s.to_string()))
}

impl Command {
    /// The request to send, or None for commands handled locally
    pub fn to_request(&self, session: &Session) -> Result<Option<Request>, InputError> {
        let player = || session.player().cloned().ok_or(InputError::NotStarted);
        let match_id = || session.match_id().cloned().ok_or(InputError::NoMatch);

        let request = match self {
            Command::Start(player) => Request::Start {
                player: player.clone(),
            },
            Command::Lobby => Request::Lobby,
            Command::New {
                match_id,
                puzzle,
                description,
            } => Request::New {
                player: player()?,
                match_id: match_id.clone(),
                puzzle: puzzle.clone(),
                description: description.clone(),
            },
            Command::Play(match_id) => Request::Play {
                player: player()?,
                match_id: match_id.clone(),
            },
            Command::Try { word, guess } => Request::Try {
                player: player()?,
                match_id: match_id()?,
                word: *word,
                guess: guess.clone(),
            },
            Command::Challenge { word, guess } => Request::Challenge {
                player: player()?,
                match_id: match_id()?,
                word: *word,
                guess: guess.clone(),
            },
            Command::Watch => Request::Watch {
                player: player()?,
                match_id: match_id()?,
            },
            Command::WatchLobby => Request::WatchLobby,
            Command::Exit => Request::Exit { player: player()? },
            Command::Help | Command::Quit => return Ok(None),
        };

        Ok(Some(request))
    }
}
