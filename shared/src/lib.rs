//! Types shared between the crossword server and its clients.
//!
//! Everything that crosses the wire lives here: player and match identifiers,
//! word orientation, the typed outcomes of guesses and challenges, the board
//! snapshot text format and the request/response framing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod protocol;
pub mod snapshot;

pub use protocol::{Frame, ProtocolError, Request, Response, View};
pub use snapshot::{BoardSnapshot, FinalScore, LobbyListing, OpenMatch, PlayerScore, WordSummary};

pub const DEFAULT_PORT: u16 = 4949;

/// Player and match identifiers are non-empty runs of ASCII letters and digits.
pub fn is_valid_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Guesses are non-empty runs of ASCII letters, matched case-insensitively.
pub fn is_valid_guess(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic())
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Result<Self, ProtocolError> {
                let id = id.into();
                if is_valid_identifier(&id) {
                    Ok(Self(id))
                } else {
                    Err(ProtocolError::InvalidIdentifier(id))
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ProtocolError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ProtocolError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }
    };
}

identifier!(
    /// Identity of a connected player. Immutable once constructed.
    PlayerId
);

identifier!(
    /// Name a player gives a match when creating it.
    MatchId
);

/// Direction a word runs on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Across,
    Down,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Across => f.write_str("ACROSS"),
            Orientation::Down => f.write_str("DOWN"),
        }
    }
}

impl FromStr for Orientation {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("across") {
            Ok(Orientation::Across)
        } else if s.eq_ignore_ascii_case("down") {
            Ok(Orientation::Down)
        } else {
            Err(ProtocolError::Malformed(format!("unknown orientation {s:?}")))
        }
    }
}

/// Result of a `TRY` request against an active match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TryOutcome {
    Success,
    WrongId,
    IncorrectLength,
    /// The word is confirmed or currently held by the opponent
    Occupied,
    InconsistentCurrent,
}

impl TryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TryOutcome::Success => "success",
            TryOutcome::WrongId => "wrong_id",
            TryOutcome::IncorrectLength => "incorrect_length",
            TryOutcome::Occupied => "occupied",
            TryOutcome::InconsistentCurrent => "inconsistent_current",
        }
    }
}

impl fmt::Display for TryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TryOutcome {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(TryOutcome::Success),
            "wrong_id" => Ok(TryOutcome::WrongId),
            "incorrect_length" => Ok(TryOutcome::IncorrectLength),
            "occupied" => Ok(TryOutcome::Occupied),
            "inconsistent_current" => Ok(TryOutcome::InconsistentCurrent),
            other => Err(ProtocolError::Malformed(format!("unknown try outcome {other:?}"))),
        }
    }
}

/// Result of a `CHALLENGE` request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeOutcome {
    Correct,
    Incorrect,
    Invalid,
}

impl ChallengeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeOutcome::Correct => "CORRECT",
            ChallengeOutcome::Incorrect => "INCORRECT",
            ChallengeOutcome::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for ChallengeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChallengeOutcome {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CORRECT" => Ok(ChallengeOutcome::Correct),
            "INCORRECT" => Ok(ChallengeOutcome::Incorrect),
            "INVALID" => Ok(ChallengeOutcome::Invalid),
            other => Err(ProtocolError::Malformed(format!(
                "unknown challenge outcome {other:?}"
            ))),
        }
    }
}

/// How a finished match ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Winner(PlayerId),
    Tie,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Winner(player) => write!(f, "winner {player}"),
            Outcome::Tie => f.write_str("tie"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("alice"));
        assert!(is_valid_identifier("Bob42"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("with space"));
        assert!(!is_valid_identifier("dash-ed"));
        assert!(!is_valid_identifier("ünïcode"));
    }

    #[test]
    fn test_guess_validation() {
        assert!(is_valid_guess("cat"));
        assert!(is_valid_guess("CaT"));
        assert!(!is_valid_guess(""));
        assert!(!is_valid_guess("c4t"));
        assert!(!is_valid_guess("#?a"));
        assert!(!is_valid_guess("c t"));
    }

    #[test]
    fn test_player_id_equality_is_by_value() {
        let a = PlayerId::new("alice").unwrap();
        let b: PlayerId = "alice".parse().unwrap();
        assert_eq!(a, b);

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_player_id_rejects_malformed() {
        match PlayerId::new("no way") {
            Err(ProtocolError::InvalidIdentifier(id)) => assert_eq!(id, "no way"),
            other => panic!("Expected invalid identifier, got {:?}", other),
        }
    }

    #[test]
    fn test_identifier_deserialization_validates() {
        let ok: Result<MatchId, _> = serde_json::from_str("\"game1\"");
        assert!(ok.is_ok());

        let bad: Result<MatchId, _> = serde_json::from_str("\"game 1\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_orientation_parsing() {
        assert_eq!("ACROSS".parse::<Orientation>().unwrap(), Orientation::Across);
        assert_eq!("down".parse::<Orientation>().unwrap(), Orientation::Down);
        assert!("diagonal".parse::<Orientation>().is_err());
        assert_eq!(Orientation::Down.to_string(), "DOWN");
    }

    #[test]
    fn test_outcome_tokens() {
        for outcome in [
            TryOutcome::Success,
            TryOutcome::WrongId,
            TryOutcome::IncorrectLength,
            TryOutcome::Occupied,
            TryOutcome::InconsistentCurrent,
        ] {
            assert_eq!(outcome.as_str().parse::<TryOutcome>().unwrap(), outcome);
        }

        assert_eq!(ChallengeOutcome::Correct.to_string(), "CORRECT");
        assert_eq!(
            "INVALID".parse::<ChallengeOutcome>().unwrap(),
            ChallengeOutcome::Invalid
        );
        assert!("correct".parse::<ChallengeOutcome>().is_err());
    }

    #[test]
    fn test_outcome_display() {
        let winner = Outcome::Winner(PlayerId::new("alice").unwrap());
        assert_eq!(winner.to_string(), "winner alice");
        assert_eq!(Outcome::Tie.to_string(), "tie");
    }
}
