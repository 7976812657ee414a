//! Text forms of the board, the lobby and the final score
//!
//! The board snapshot layout is:
//!
//! ```text
//! 3x4
//! #?a#
//! ?ca?
//! #?##
//! 2
//! 1 0 ACROSS 1 true false alice
//! feline companion
//! 0 2 DOWN 2 false false -
//! a hint
//! ```
//!
//! Dimensions, one grid line per row (`#` absent, `?` empty, otherwise the
//! letter), the word count, then per word a geometry/ownership line followed by
//! its hint.

use crate::{MatchId, Orientation, Outcome, PlayerId, ProtocolError};
use serde::{Deserialize, Serialize};

pub const ABSENT: char = '#';
pub const EMPTY: char = '?';
const NO_OWNER: &str = "-";

/// Public view of one word on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordSummary {
    pub row: usize,
    pub col: usize,
    pub orientation: Orientation,
    pub id: u32,
    pub owner: Option<PlayerId>,
    pub confirmed: bool,
    pub hint: String,
}

impl WordSummary {
    pub fn is_owned(&self) -> bool {
        self.owner.is_some()
    }

    fn header_line(&self) -> String {
        format!(
            "{} {} {} {} {} {} {}",
            self.row,
            self.col,
            self.orientation,
            self.id,
            self.is_owned(),
            self.confirmed,
            self.owner.as_ref().map_or(NO_OWNER, |p| p.as_str())
        )
    }

    fn parse(header: &str, hint: &str) -> Result<Self, ProtocolError> {
        let fields: Vec<&str> = header.split_whitespace().collect();
        if fields.len() != 7 {
            return Err(ProtocolError::Malformed(format!("bad word line {header:?}")));
        }

        let owned = parse_bool(fields[4])?;
        let owner = match (owned, fields[6]) {
            (false, NO_OWNER) => None,
            (true, id) => Some(PlayerId::new(id)?),
            (false, id) => {
                return Err(ProtocolError::Malformed(format!(
                    "unowned word lists owner {id:?}"
                )))
            }
        };

        Ok(WordSummary {
            row: parse_number(fields[0])?,
            col: parse_number(fields[1])?,
            orientation: fields[2].parse()?,
            id: parse_number(fields[3])?,
            owner,
            confirmed: parse_bool(fields[5])?,
            hint: hint.to_string(),
        })
    }
}

/// Everything a player needs to draw the current board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub rows: usize,
    pub cols: usize,
    pub grid: Vec<String>,
    pub words: Vec<WordSummary>,
}

impl BoardSnapshot {
    /// Character shown at a position, or None outside the board
    pub fn cell(&self, row: usize, col: usize) -> Option<char> {
        self.grid.get(row).and_then(|line| line.chars().nth(col))
    }

    pub fn word(&self, id: u32) -> Option<&WordSummary> {
        self.words.iter().find(|w| w.id == id)
    }

    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(2 + self.rows + self.words.len() * 2);
        lines.push(format!("{}x{}", self.rows, self.cols));
        lines.extend(self.grid.iter().cloned());
        lines.push(self.words.len().to_string());
        for word in &self.words {
            lines.push(word.header_line());
            lines.push(word.hint.clone());
        }
        lines
    }

    pub fn from_lines(lines: &[String]) -> Result<Self, ProtocolError> {
        let mut iter = lines.iter();
        let mut next = |what: &str| {
            iter.next()
                .ok_or_else(|| ProtocolError::Malformed(format!("snapshot ends before {what}")))
        };

        let dims = next("dimensions")?;
        let (rows, cols) = dims
            .split_once('x')
            .ok_or_else(|| ProtocolError::Malformed(format!("bad dimensions {dims:?}")))?;
        let rows: usize = parse_number(rows)?;
        let cols: usize = parse_number(cols)?;

        let mut grid = Vec::with_capacity(rows);
        for _ in 0..rows {
            let line = next("grid row")?;
            if line.chars().count() != cols {
                return Err(ProtocolError::Malformed(format!(
                    "grid row {line:?} is not {cols} wide"
                )));
            }
            grid.push(line.clone());
        }

        let count: usize = parse_number(next("word count")?)?;
        let mut words = Vec::with_capacity(count);
        for _ in 0..count {
            let header = next("word line")?;
            let hint = next("hint")?;
            words.push(WordSummary::parse(header, hint)?);
        }

        if iter.next().is_some() {
            return Err(ProtocolError::Malformed("trailing lines after snapshot".into()));
        }

        Ok(BoardSnapshot {
            rows,
            cols,
            grid,
            words,
        })
    }
}

/// A waiting match as shown in the lobby
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenMatch {
    pub id: MatchId,
    pub description: String,
}

/// Puzzles that can be started and matches waiting for a second player
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyListing {
    pub puzzles: Vec<String>,
    pub matches: Vec<OpenMatch>,
}

impl LobbyListing {
    pub fn to_lines(&self) -> Vec<String> {
        self.puzzles
            .iter()
            .map(|p| format!("puzzle {p}"))
            .chain(
                self.matches
                    .iter()
                    .map(|m| format!("match {} {}", m.id, m.description)),
            )
            .collect()
    }

    pub fn from_lines(lines: &[String]) -> Result<Self, ProtocolError> {
        let mut listing = LobbyListing::default();
        for line in lines {
            match line.split_once(' ') {
                Some(("puzzle", id)) => listing.puzzles.push(id.to_string()),
                Some(("match", rest)) => {
                    let (id, description) = rest.split_once(' ').unwrap_or((rest, ""));
                    listing.matches.push(OpenMatch {
                        id: MatchId::new(id)?,
                        description: description.to_string(),
                    });
                }
                _ => {
                    return Err(ProtocolError::Malformed(format!("bad lobby line {line:?}")));
                }
            }
        }
        Ok(listing)
    }
}

/// Points held by one player when a match ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerScore {
    pub player: PlayerId,
    pub score: i32,
    pub challenge_points: i32,
}

impl PlayerScore {
    pub fn total(&self) -> i32 {
        self.score + self.challenge_points
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalScore {
    pub players: Vec<PlayerScore>,
    pub outcome: Outcome,
}

impl FinalScore {
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .players
            .iter()
            .map(|p| {
                format!(
                    "player {} {} {} {}",
                    p.player,
                    p.score,
                    p.challenge_points,
                    p.total()
                )
            })
            .collect();
        lines.push(self.outcome.to_string());
        lines
    }

    pub fn from_lines(lines: &[String]) -> Result<Self, ProtocolError> {
        let (last, players) = lines
            .split_last()
            .ok_or_else(|| ProtocolError::Malformed("empty score".into()))?;

        let players = players
            .iter()
            .map(|line| {
                let fields: Vec<&str> = line.split_whitespace().collect();
                match fields.as_slice() {
                    ["player", id, score, challenge, _total] => Ok(PlayerScore {
                        player: PlayerId::new(*id)?,
                        score: parse_number(score)?,
                        challenge_points: parse_number(challenge)?,
                    }),
                    _ => Err(ProtocolError::Malformed(format!("bad score line {line:?}"))),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let outcome = match last.split_once(' ') {
            Some(("winner", id)) => Outcome::Winner(PlayerId::new(id)?),
            None if last == "tie" => Outcome::Tie,
            _ => return Err(ProtocolError::Malformed(format!("bad outcome {last:?}"))),
        };

        Ok(FinalScore { players, outcome })
    }
}

fn parse_number<T: std::str::FromStr>(s: &str) -> Result<T, ProtocolError> {
    s.parse()
        .map_err(|_| ProtocolError::InvalidNumber(s.to_string()))
}

fn parse_bool(s: &str) -> Result<bool, ProtocolError> {
    match s {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ProtocolError::Malformed(format!("expected true/false, got {other:?}"))),
    }
}
