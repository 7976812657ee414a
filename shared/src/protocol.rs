//! Line-based request/response protocol
//!
//! A request is a single line of whitespace-separated tokens; double quotes
//! group a token containing spaces (`\"` and `\\` escape inside quotes).
//!
//! A response is a frame: one header line of tokens whose last token is the
//! number of body lines that follow, then exactly that many body lines.

use crate::snapshot::{BoardSnapshot, FinalScore, LobbyListing};
use crate::{ChallengeOutcome, MatchId, PlayerId, TryOutcome};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty request")]
    Empty,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("{command} expects {expected} argument(s), got {got}")]
    Arity {
        command: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("invalid identifier {0:?}: use letters and digits only")]
    InvalidIdentifier(String),

    #[error("invalid guess {0:?}: use letters only")]
    InvalidGuess(String),

    #[error("invalid number {0:?}")]
    InvalidNumber(String),

    #[error("unterminated quoted string")]
    UnterminatedQuote,

    #[error("malformed message: {0}")]
    Malformed(String),
}

/// Splits a request line into tokens, honouring double-quoted strings
pub fn tokenize(line: &str) -> Result<Vec<String>, ProtocolError> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let mut token = String::new();
        if c == '"' {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '"' => {
                        closed = true;
                        break;
                    }
                    '\\' => match chars.next() {
                        Some(escaped) => token.push(escaped),
                        None => return Err(ProtocolError::UnterminatedQuote),
                    },
                    other => token.push(other),
                }
            }
            if !closed {
                return Err(ProtocolError::UnterminatedQuote);
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                token.push(c);
                chars.next();
            }
        }
        tokens.push(token);
    }

    Ok(tokens)
}

fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Requests a client can make
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum Request {
    Start {
        player: PlayerId,
    },
    Lobby,
    New {
        player: PlayerId,
        match_id: MatchId,
        puzzle: String,
        description: String,
    },
    Play {
        player: PlayerId,
        match_id: MatchId,
    },
    Wait {
        player: PlayerId,
        match_id: MatchId,
    },
    Try {
        player: PlayerId,
        match_id: MatchId,
        word: u32,
        guess: String,
    },
    Challenge {
        player: PlayerId,
        match_id: MatchId,
        word: u32,
        guess: String,
    },
    Watch {
        player: PlayerId,
        match_id: MatchId,
    },
    WatchLobby,
    Exit {
        player: PlayerId,
    },
}

impl Request {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let tokens = tokenize(line)?;
        let (command, args) = tokens.split_first().ok_or(ProtocolError::Empty)?;

        let arity = |command: &'static str, expected: usize| {
            if args.len() == expected {
                Ok(())
            } else {
                Err(ProtocolError::Arity {
                    command,
                    expected,
                    got: args.len(),
                })
            }
        };

        let request = match command.to_ascii_uppercase().as_str() {
            "START" => {
                arity("START", 1)?;
                Request::Start {
                    player: args[0].parse()?,
                }
            }
            "LOBBY" => {
                arity("LOBBY", 0)?;
                Request::Lobby
            }
            "NEW" => {
                arity("NEW", 4)?;
                Request::New {
                    player: args[0].parse()?,
                    match_id: args[1].parse()?,
                    puzzle: args[2].clone(),
                    description: args[3].clone(),
                }
            }
            "PLAY" => {
                arity("PLAY", 2)?;
                Request::Play {
                    player: args[0].parse()?,
                    match_id: args[1].parse()?,
                }
            }
            "WAIT" => {
                arity("WAIT", 2)?;
                Request::Wait {
                    player: args[0].parse()?,
                    match_id: args[1].parse()?,
                }
            }
            "TRY" => {
                arity("TRY", 4)?;
                Request::Try {
                    player: args[0].parse()?,
                    match_id: args[1].parse()?,
                    word: parse_word_id(&args[2])?,
                    guess: parse_guess(&args[3])?,
                }
            }
            "CHALLENGE" => {
                arity("CHALLENGE", 4)?;
                Request::Challenge {
                    player: args[0].parse()?,
                    match_id: args[1].parse()?,
                    word: parse_word_id(&args[2])?,
                    guess: parse_guess(&args[3])?,
                }
            }
            "WATCH" => {
                arity("WATCH", 2)?;
                Request::Watch {
                    player: args[0].parse()?,
                    match_id: args[1].parse()?,
                }
            }
            "WATCH_LOBBY" => {
                arity("WATCH_LOBBY", 0)?;
                Request::WatchLobby
            }
            "EXIT" => {
                arity("EXIT", 1)?;
                Request::Exit {
                    player: args[0].parse()?,
                }
            }
            _ => return Err(ProtocolError::UnknownCommand(command.clone())),
        };

        Ok(request)
    }

    /// True for requests the server may hold open until something changes
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            Request::Wait { .. } | Request::Watch { .. } | Request::WatchLobby
        )
    }
}

fn parse_guess(s: &str) -> Result<String, ProtocolError> {
    if crate::is_valid_guess(s) {
        Ok(s.to_string())
    } else {
        Err(ProtocolError::InvalidGuess(s.to_string()))
    }
}

fn parse_word_id(s: &str) -> Result<u32, ProtocolError> {
    s.parse()
        .map_err(|_| ProtocolError::InvalidNumber(s.to_string()))
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Start { player } => write!(f, "START {player}"),
            Request::Lobby => f.write_str("LOBBY"),
            Request::New {
                player,
                match_id,
                puzzle,
                description,
            } => write!(
                f,
                "NEW {player} {match_id} {} {}",
                quote(puzzle),
                quote(description)
            ),
            Request::Play { player, match_id } => write!(f, "PLAY {player} {match_id}"),
            Request::Wait { player, match_id } => write!(f, "WAIT {player} {match_id}"),
            Request::Try {
                player,
                match_id,
                word,
                guess,
            } => write!(f, "TRY {player} {match_id} {word} {}", quote(guess)),
            Request::Challenge {
                player,
                match_id,
                word,
                guess,
            } => write!(f, "CHALLENGE {player} {match_id} {word} {}", quote(guess)),
            Request::Watch { player, match_id } => write!(f, "WATCH {player} {match_id}"),
            Request::WatchLobby => f.write_str("WATCH_LOBBY"),
            Request::Exit { player } => write!(f, "EXIT {player}"),
        }
    }
}

/// Raw response: header tokens plus body lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub head: Vec<String>,
    pub body: Vec<String>,
}

impl Frame {
    pub fn new(head: &[&str], body: Vec<String>) -> Self {
        Frame {
            head: head.iter().map(|s| s.to_string()).collect(),
            body,
        }
    }

    /// Encodes the frame, newline-terminated
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for token in &self.head {
            out.push_str(token);
            out.push(' ');
        }
        out.push_str(&self.body.len().to_string());
        out.push('\n');
        for line in &self.body {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Splits a header line into its tokens and the body line count
    pub fn parse_header(line: &str) -> Result<(Vec<String>, usize), ProtocolError> {
        let mut head: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        let count = head.pop().ok_or(ProtocolError::Empty)?;
        let count: usize = count
            .parse()
            .map_err(|_| ProtocolError::InvalidNumber(count.clone()))?;
        if head.is_empty() {
            return Err(ProtocolError::Malformed("header has no kind".into()));
        }
        Ok((head, count))
    }

    /// Decodes one complete frame from text
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let mut lines = text.lines();
        let header = lines.next().ok_or(ProtocolError::Empty)?;
        let (head, count) = Self::parse_header(header)?;
        let body: Vec<String> = lines.take(count).map(str::to_string).collect();
        if body.len() != count {
            return Err(ProtocolError::Malformed(format!(
                "expected {count} body lines, got {}",
                body.len()
            )));
        }
        Ok(Frame { head, body })
    }
}

/// Either a live board or the final score of a match that just ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", content = "data", rename_all = "snake_case")]
pub enum View {
    Board(BoardSnapshot),
    Score(FinalScore),
}

impl View {
    fn kind(&self) -> &'static str {
        match self {
            View::Board(_) => "BOARD",
            View::Score(_) => "SCORE",
        }
    }

    fn to_lines(&self) -> Vec<String> {
        match self {
            View::Board(board) => board.to_lines(),
            View::Score(score) => score.to_lines(),
        }
    }

    fn from_parts(kind: &str, body: &[String]) -> Result<Self, ProtocolError> {
        match kind {
            "BOARD" => Ok(View::Board(BoardSnapshot::from_lines(body)?)),
            "SCORE" => Ok(View::Score(FinalScore::from_lines(body)?)),
            other => Err(ProtocolError::Malformed(format!("unknown view {other:?}"))),
        }
    }
}

/// Responses the server sends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "response", rename_all = "snake_case")]
pub enum Response {
    Lobby(LobbyListing),
    Waiting { match_id: MatchId },
    Board(BoardSnapshot),
    Guess { outcome: TryOutcome, view: View },
    Challenge { outcome: ChallengeOutcome, view: View },
    Score(FinalScore),
    Bye,
    /// Validation failure; the request may be repeated with other input
    TryAgain { reason: String },
    /// Request against a match or seat that is no longer valid
    Rejected { reason: String },
}

impl Response {
    pub fn to_frame(&self) -> Frame {
        match self {
            Response::Lobby(listing) => Frame::new(&["LOBBY"], listing.to_lines()),
            Response::Waiting { match_id } => Frame::new(&["WAITING", match_id.as_str()], vec![]),
            Response::Board(board) => Frame::new(&["BOARD"], board.to_lines()),
            Response::Guess { outcome, view } => {
                Frame::new(&["GUESS", outcome.as_str(), view.kind()], view.to_lines())
            }
            Response::Challenge { outcome, view } => {
                Frame::new(&["CHALLENGE", outcome.as_str(), view.kind()], view.to_lines())
            }
            Response::Score(score) => Frame::new(&["SCORE"], score.to_lines()),
            Response::Bye => Frame::new(&["BYE"], vec![]),
            Response::TryAgain { reason } => Frame::new(&["TRY_AGAIN"], vec![reason.clone()]),
            Response::Rejected { reason } => Frame::new(&["REJECTED"], vec![reason.clone()]),
        }
    }

    pub fn from_frame(frame: &Frame) -> Result<Self, ProtocolError> {
        let head: Vec<&str> = frame.head.iter().map(String::as_str).collect();
        let body = frame.body.as_slice();
        let single_line = || body.first().cloned().unwrap_or_default();

        let response = match head.as_slice() {
            ["LOBBY"] => Response::Lobby(LobbyListing::from_lines(body)?),
            ["WAITING", id] => Response::Waiting {
                match_id: MatchId::new(*id)?,
            },
            ["BOARD"] => Response::Board(BoardSnapshot::from_lines(body)?),
            ["GUESS", outcome, kind] => Response::Guess {
                outcome: outcome.parse()?,
                view: View::from_parts(kind, body)?,
            },
            ["CHALLENGE", outcome, kind] => Response::Challenge {
                outcome: outcome.parse()?,
                view: View::from_parts(kind, body)?,
            },
            ["SCORE"] => Response::Score(FinalScore::from_lines(body)?),
            ["BYE"] => Response::Bye,
            ["TRY_AGAIN"] => Response::TryAgain {
                reason: single_line(),
            },
            ["REJECTED"] => Response::Rejected {
                reason: single_line(),
            },
            _ => {
                return Err(ProtocolError::Malformed(format!(
                    "unknown response header {:?}",
                    frame.head
                )))
            }
        };

        Ok(response)
    }

    pub fn encode(&self) -> String {
        self.to_frame().encode()
    }
}
