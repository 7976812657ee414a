//! A single crossword match between two players
//!
//! A match starts `Waiting` with its creator seated, becomes `Active` when the
//! second seat fills and ends `Finished` once every word is confirmed or one
//! player forfeits. Scoring:
//!
//! - taking a word with a guess earns one point (once per word held)
//! - losing a held word to a challenge, or having it cleared, takes that point back
//! - a correct challenge earns two challenge points, a failed one costs one
//!
//! The winner is the player with the higher score plus challenge points.

use crate::board::Board;
use log::{debug, info};
use shared::{
    BoardSnapshot, ChallengeOutcome, FinalScore, MatchId, Outcome, PlayerId, PlayerScore,
    TryOutcome, View,
};
use thiserror::Error;

pub const GUESS_POINTS: i32 = 1;
pub const CHALLENGE_REWARD: i32 = 2;
pub const CHALLENGE_PENALTY: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchState {
    Waiting,
    Active,
    Finished(Outcome),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("match already has two players")]
    Full,

    #[error("{0} is already playing in this match")]
    AlreadySeated(PlayerId),

    #[error("{0} is not playing in this match")]
    NotSeated(PlayerId),

    #[error("match is not in play")]
    NotActive,

    #[error("guess {0:?} must be letters only")]
    InvalidGuess(String),
}

#[derive(Debug, Clone)]
struct Seat {
    player: PlayerId,
    score: i32,
    challenge_points: i32,
}

impl Seat {
    fn new(player: PlayerId) -> Self {
        Seat {
            player,
            score: 0,
            challenge_points: 0,
        }
    }

    fn total(&self) -> i32 {
        self.score + self.challenge_points
    }
}

#[derive(Debug)]
pub struct Match {
    id: MatchId,
    name: String,
    description: String,
    board: Board,
    seats: Vec<Seat>,
    state: MatchState,
}

impl Match {
    /// Creates a waiting match with `creator` in the first seat
    pub fn new(
        id: MatchId,
        name: impl Into<String>,
        description: impl Into<String>,
        board: Board,
        creator: PlayerId,
    ) -> Self {
        Match {
            id,
            name: name.into(),
            description: description.into(),
            board,
            seats: vec![Seat::new(creator)],
            state: MatchState::Waiting,
        }
    }

    pub fn id(&self) -> &MatchId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn players(&self) -> Vec<PlayerId> {
        self.seats.iter().map(|s| s.player.clone()).collect()
    }

    pub fn score(&self, player: &PlayerId) -> Option<i32> {
        self.seat(player).map(|i| self.seats[i].score)
    }

    pub fn challenge_points(&self, player: &PlayerId) -> Option<i32> {
        self.seat(player).map(|i| self.seats[i].challenge_points)
    }

    pub fn confirmed_count(&self) -> usize {
        self.board.words().iter().filter(|w| w.is_confirmed()).count()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, MatchState::Finished(_))
    }

    pub fn add_player(&mut self, player: PlayerId) -> Result<(), MatchError> {
        if self.seat(&player).is_some() {
            return Err(MatchError::AlreadySeated(player));
        }
        if self.seats.len() >= 2 || self.state != MatchState::Waiting {
            return Err(MatchError::Full);
        }

        info!("{} joined match {}", player, self.id);
        self.seats.push(Seat::new(player));
        self.state = MatchState::Active;
        Ok(())
    }

    /// Places a guess for a word on behalf of `player`
    pub fn try_guess(
        &mut self,
        player: &PlayerId,
        word_id: u32,
        guess: &str,
    ) -> Result<TryOutcome, MatchError> {
        let seat = self.require_turn(player)?;

        let Some(index) = self.board.word_index(word_id) else {
            return Ok(TryOutcome::WrongId);
        };
        let letters = normalize(guess)?;
        let word = self.board.word(index);
        if letters.len() != word.len() {
            return Ok(TryOutcome::IncorrectLength);
        }
        if word.is_confirmed() || word.owner().is_some_and(|owner| owner != player) {
            return Ok(TryOutcome::Occupied);
        }

        let mut own_clashes = Vec::new();
        for (position, other) in self.board.crossings(index) {
            let crossing = self.board.word(other);
            let (row, col) = word.position(position);
            let clashes = self
                .board
                .letter_at(row, col)
                .is_some_and(|existing| existing != letters[position]);

            if crossing.is_confirmed() || crossing.owner().is_some_and(|o| o != player) {
                if clashes {
                    return Ok(TryOutcome::InconsistentCurrent);
                }
            } else if crossing.is_owned_by(player) && clashes {
                own_clashes.push(other);
            }
        }

        if word.is_owned_by(player) {
            self.board.clear(index, player);
        } else {
            self.board.word_mut(index).set_owner(Some(player.clone()));
            self.seats[seat].score += GUESS_POINTS;
        }
        for other in own_clashes {
            self.release(other);
        }
        self.board.fill(index, player, &letters);

        debug!("{} guessed word {} in match {}", player, word_id, self.id);
        self.settle();
        Ok(TryOutcome::Success)
    }

    /// Disputes the opponent's current guess for a word
    pub fn challenge(
        &mut self,
        player: &PlayerId,
        word_id: u32,
        guess: &str,
    ) -> Result<ChallengeOutcome, MatchError> {
        let seat = self.require_turn(player)?;

        let Some(index) = self.board.word_index(word_id) else {
            return Ok(ChallengeOutcome::Invalid);
        };
        let word = self.board.word(index);
        let opponent = match word.owner() {
            Some(owner) if owner != player && !word.is_confirmed() => owner.clone(),
            _ => return Ok(ChallengeOutcome::Invalid),
        };
        let letters = normalize(guess)?;
        if letters.len() != word.len() {
            return Ok(ChallengeOutcome::Invalid);
        }

        let opponent_right = self.board.is_correct(index);
        let challenger_right = letters.as_slice() == word.solution();

        let outcome = if opponent_right {
            self.seats[seat].challenge_points -= CHALLENGE_PENALTY;
            self.board.word_mut(index).confirm();
            ChallengeOutcome::Incorrect
        } else if challenger_right {
            let solution = word.solution().to_vec();
            self.release(index);
            self.board.word_mut(index).set_owner(Some(player.clone()));

            let displaced: Vec<usize> = self
                .board
                .crossings(index)
                .into_iter()
                .filter(|&(position, other)| {
                    let crossing = self.board.word(other);
                    let (row, col) = self.board.word(index).position(position);
                    crossing.owner().is_some()
                        && !crossing.is_confirmed()
                        && self
                            .board
                            .letter_at(row, col)
                            .is_some_and(|existing| existing != solution[position])
                })
                .map(|(_, other)| other)
                .collect();
            for other in displaced {
                self.release(other);
            }

            self.board.fill(index, player, &solution);
            self.board.word_mut(index).confirm();
            self.seats[seat].challenge_points += CHALLENGE_REWARD;
            ChallengeOutcome::Correct
        } else {
            self.seats[seat].challenge_points -= CHALLENGE_PENALTY;
            self.release(index);
            ChallengeOutcome::Incorrect
        };

        info!(
            "{} challenged {} on word {} in match {}: {}",
            player, opponent, word_id, self.id, outcome
        );
        self.settle();
        Ok(outcome)
    }

    /// Ends an active match early; the other player wins
    pub fn forfeit(&mut self, leaver: &PlayerId) -> Result<Outcome, MatchError> {
        if self.seat(leaver).is_none() {
            return Err(MatchError::NotSeated(leaver.clone()));
        }
        if self.state != MatchState::Active {
            return Err(MatchError::NotActive);
        }

        let outcome = self
            .seats
            .iter()
            .find(|s| &s.player != leaver)
            .map_or(Outcome::Tie, |s| Outcome::Winner(s.player.clone()));
        info!("{} left match {}, {}", leaver, self.id, outcome);
        self.state = MatchState::Finished(outcome.clone());
        Ok(outcome)
    }

    /// True when no word is left unconfirmed
    pub fn all_confirmed(&self) -> bool {
        self.board.words().iter().all(|w| w.is_confirmed())
    }

    /// Higher total wins; equal totals are a tie
    pub fn calculate_winner(&self) -> Outcome {
        match self.seats.as_slice() {
            [only] => Outcome::Winner(only.player.clone()),
            [first, second] => match first.total().cmp(&second.total()) {
                std::cmp::Ordering::Greater => Outcome::Winner(first.player.clone()),
                std::cmp::Ordering::Less => Outcome::Winner(second.player.clone()),
                std::cmp::Ordering::Equal => Outcome::Tie,
            },
            _ => Outcome::Tie,
        }
    }

    pub fn final_score(&self) -> FinalScore {
        let outcome = match &self.state {
            MatchState::Finished(outcome) => outcome.clone(),
            _ => self.calculate_winner(),
        };
        FinalScore {
            players: self
                .seats
                .iter()
                .map(|s| PlayerScore {
                    player: s.player.clone(),
                    score: s.score,
                    challenge_points: s.challenge_points,
                })
                .collect(),
            outcome,
        }
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.board.snapshot()
    }

    /// The board while the match runs, the final score once it has ended
    pub fn view(&self) -> View {
        if self.is_finished() {
            View::Score(self.final_score())
        } else {
            View::Board(self.snapshot())
        }
    }

    fn seat(&self, player: &PlayerId) -> Option<usize> {
        self.seats.iter().position(|s| &s.player == player)
    }

    fn require_turn(&self, player: &PlayerId) -> Result<usize, MatchError> {
        if self.state != MatchState::Active {
            return Err(MatchError::NotActive);
        }
        self.seat(player)
            .ok_or_else(|| MatchError::NotSeated(player.clone()))
    }

    /// Clears a held, unconfirmed word and takes its point back from the holder
    fn release(&mut self, index: usize) {
        let Some(owner) = self.board.word(index).owner().cloned() else {
            return;
        };
        self.board.clear(index, &owner);
        self.board.word_mut(index).set_owner(None);
        if let Some(seat) = self.seat(&owner) {
            self.seats[seat].score -= GUESS_POINTS;
        }
    }

    /// Confirms everything once the whole grid reads correctly, and finishes
    /// the match when no unconfirmed word remains
    fn settle(&mut self) {
        let count = self.board.words().len();
        if (0..count).all(|i| self.board.is_correct(i)) {
            for i in 0..count {
                self.board.word_mut(i).confirm();
            }
        }

        if self.all_confirmed() {
            let outcome = self.calculate_winner();
            info!("Match {} finished, {}", self.id, outcome);
            self.state = MatchState::Finished(outcome);
        }
    }
}

/// Lower-cases a guess; anything but ASCII letters would corrupt the grid
fn normalize(guess: &str) -> Result<Vec<char>, MatchError> {
    if !shared::is_valid_guess(guess) {
        return Err(MatchError::InvalidGuess(guess.to_string()));
    }
    Ok(guess.chars().map(|c| c.to_ascii_lowercase()).collect())
}
