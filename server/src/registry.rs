//! Players, the puzzle catalogue and every live match
//!
//! All registry state sits behind one lock; each match carries its own lock
//! and [`Signal`]. Locks are always taken registry first, then match. A
//! mutation of a match looks the match up under the registry lock, lets go of
//! it and only then locks the match, so a long wait on one match never blocks
//! the lobby.
//!
//! A match that finishes by play is evicted after its lock has been released.
//! Eviction compares the stored handle by pointer, so a match id reused in the
//! meantime is left alone.

use crate::board::Board;
use crate::game::{Match, MatchError};
use crate::puzzle::Puzzle;
use crate::signal::Signal;
use crate::validator;
use log::{debug, info, warn};
use shared::{BoardSnapshot, FinalScore, LobbyListing, MatchId, OpenMatch, PlayerId, View};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("player id {0} is already in use")]
    PlayerInUse(PlayerId),

    #[error("unknown player {0}, send START first")]
    UnknownPlayer(PlayerId),

    #[error("{player} is already in match {match_id}")]
    AlreadySeated { player: PlayerId, match_id: MatchId },

    #[error("{player} is not playing in match {match_id}")]
    NotSeated { player: PlayerId, match_id: MatchId },

    #[error("match id {0} is already in use")]
    MatchInUse(MatchId),

    #[error("no puzzle named {0}")]
    UnknownPuzzle(String),

    #[error("no match {0} is waiting for a player")]
    NoSuchWaitingMatch(MatchId),

    #[error("no match {0}")]
    NoSuchMatch(MatchId),

    #[error("match {match_id} is over")]
    MatchEnded { match_id: MatchId, score: FinalScore },

    #[error(transparent)]
    Match(#[from] MatchError),
}

impl RegistryError {
    /// Errors the client can fix by repeating the request with other input
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RegistryError::PlayerInUse(_)
                | RegistryError::UnknownPlayer(_)
                | RegistryError::AlreadySeated { .. }
                | RegistryError::MatchInUse(_)
                | RegistryError::UnknownPuzzle(_)
                | RegistryError::NoSuchWaitingMatch(_)
                | RegistryError::Match(MatchError::Full)
                | RegistryError::Match(MatchError::AlreadySeated(_))
                | RegistryError::Match(MatchError::InvalidGuess(_))
        )
    }
}

/// Why a match is being removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The player left; in an active match the other player wins
    Exit(PlayerId),
    Completed,
}

/// Where a player ends up after `exit`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Left a match that was still waiting for an opponent
    Lobby(LobbyListing),
    /// Left (forfeited) a match in play
    Score(FinalScore),
    /// Was not in any match and is now logged out
    Bye,
}

/// A live match together with what waiters block on
#[derive(Debug)]
struct MatchHandle {
    id: MatchId,
    description: String,
    game: Mutex<Match>,
    changed: Signal,
    closed: AtomicBool,
}

impl MatchHandle {
    fn new(game: Match) -> Self {
        MatchHandle {
            id: game.id().clone(),
            description: game.description().to_string(),
            game: Mutex::new(game),
            changed: Signal::new(),
            closed: AtomicBool::new(false),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    players: HashSet<PlayerId>,
    seats: HashMap<PlayerId, MatchId>,
    puzzles: BTreeMap<String, Arc<Puzzle>>,
    waiting: BTreeMap<MatchId, Arc<MatchHandle>>,
    active: BTreeMap<MatchId, Arc<MatchHandle>>,
    history: HashMap<MatchId, FinalScore>,
}

impl RegistryState {
    fn listing(&self) -> LobbyListing {
        LobbyListing {
            puzzles: self.puzzles.keys().cloned().collect(),
            matches: self
                .waiting
                .values()
                .map(|handle| OpenMatch {
                    id: handle.id.clone(),
                    description: handle.description.clone(),
                })
                .collect(),
        }
    }

    fn live(&self, match_id: &MatchId) -> Option<Arc<MatchHandle>> {
        self.active
            .get(match_id)
            .or_else(|| self.waiting.get(match_id))
            .cloned()
    }

    fn is_live(&self, match_id: &MatchId) -> bool {
        self.active.contains_key(match_id) || self.waiting.contains_key(match_id)
    }

    /// A connected player who is not seated anywhere
    fn require_idle(&self, player: &PlayerId) -> Result<(), RegistryError> {
        if !self.players.contains(player) {
            return Err(RegistryError::UnknownPlayer(player.clone()));
        }
        if let Some(match_id) = self.seats.get(player) {
            return Err(RegistryError::AlreadySeated {
                player: player.clone(),
                match_id: match_id.clone(),
            });
        }
        Ok(())
    }

    fn ended(&self, match_id: &MatchId) -> RegistryError {
        match self.history.get(match_id) {
            Some(score) => RegistryError::MatchEnded {
                match_id: match_id.clone(),
                score: score.clone(),
            },
            None => RegistryError::NoSuchMatch(match_id.clone()),
        }
    }

    fn unseat(&mut self, player: &PlayerId, match_id: &MatchId) {
        if self.seats.get(player) == Some(match_id) {
            self.seats.remove(player);
        }
    }
}

/// Shared state of the whole server
#[derive(Debug)]
pub struct Registry {
    state: Mutex<RegistryState>,
    changed: Signal,
}

impl Registry {
    /// Builds a registry offering every consistent puzzle in `puzzles`
    pub fn new(puzzles: impl IntoIterator<Item = Puzzle>) -> Self {
        let mut state = RegistryState::default();
        for puzzle in puzzles {
            admit(&mut state.puzzles, puzzle);
        }
        info!("Registry offering {} puzzle(s)", state.puzzles.len());

        Registry {
            state: Mutex::new(state),
            changed: Signal::new(),
        }
    }

    /// Adds a puzzle to the catalogue; false if it failed validation
    pub async fn add_puzzle(&self, puzzle: Puzzle) -> bool {
        let added = {
            let mut state = self.state.lock().await;
            admit(&mut state.puzzles, puzzle)
        };
        if added {
            self.changed.notify_all();
        }
        added
    }

    pub async fn puzzle_ids(&self) -> Vec<String> {
        self.state.lock().await.puzzles.keys().cloned().collect()
    }

    pub async fn player_count(&self) -> usize {
        self.state.lock().await.players.len()
    }

    pub async fn register_player(&self, player: &PlayerId) -> Result<LobbyListing, RegistryError> {
        let mut state = self.state.lock().await;
        if !state.players.insert(player.clone()) {
            return Err(RegistryError::PlayerInUse(player.clone()));
        }
        info!("Player {} connected", player);
        Ok(state.listing())
    }

    pub async fn lobby(&self) -> LobbyListing {
        self.state.lock().await.listing()
    }

    /// Creates a match from a puzzle and seats its creator
    pub async fn register_waiting_match(
        &self,
        match_id: &MatchId,
        puzzle_id: &str,
        description: &str,
        creator: &PlayerId,
    ) -> Result<(), RegistryError> {
        {
            let mut state = self.state.lock().await;
            state.require_idle(creator)?;
            if state.is_live(match_id) {
                return Err(RegistryError::MatchInUse(match_id.clone()));
            }
            let puzzle = state
                .puzzles
                .get(puzzle_id)
                .cloned()
                .ok_or_else(|| RegistryError::UnknownPuzzle(puzzle_id.to_string()))?;

            let game = Match::new(
                match_id.clone(),
                puzzle.name.clone(),
                description,
                Board::new(&puzzle.placements),
                creator.clone(),
            );
            state
                .waiting
                .insert(match_id.clone(), Arc::new(MatchHandle::new(game)));
            state.seats.insert(creator.clone(), match_id.clone());
        }

        info!("{} created match {} on puzzle {}", creator, match_id, puzzle_id);
        self.changed.notify_all();
        Ok(())
    }

    /// Seats `joiner` in a waiting match and starts it
    pub async fn promote_to_active(
        &self,
        match_id: &MatchId,
        joiner: &PlayerId,
    ) -> Result<BoardSnapshot, RegistryError> {
        let (handle, snapshot) = {
            let mut state = self.state.lock().await;
            state.require_idle(joiner)?;
            let handle = state
                .waiting
                .remove(match_id)
                .ok_or_else(|| RegistryError::NoSuchWaitingMatch(match_id.clone()))?;

            let mut game = handle.game.lock().await;
            if let Err(e) = game.add_player(joiner.clone()) {
                drop(game);
                state.waiting.insert(match_id.clone(), handle);
                return Err(e.into());
            }
            let snapshot = game.snapshot();
            drop(game);

            state.active.insert(match_id.clone(), Arc::clone(&handle));
            state.seats.insert(joiner.clone(), match_id.clone());
            (handle, snapshot)
        };

        handle.changed.notify_all();
        self.changed.notify_all();
        Ok(snapshot)
    }

    /// Blocks the creator of a match until a second player has joined
    pub async fn await_opponent(
        &self,
        player: &PlayerId,
        match_id: &MatchId,
    ) -> Result<BoardSnapshot, RegistryError> {
        let handle = {
            let state = self.state.lock().await;
            let handle = state
                .live(match_id)
                .ok_or_else(|| RegistryError::NoSuchWaitingMatch(match_id.clone()))?;
            if state.seats.get(player) != Some(match_id) {
                return Err(RegistryError::NotSeated {
                    player: player.clone(),
                    match_id: match_id.clone(),
                });
            }
            handle
        };

        debug!("{} waiting for an opponent in {}", player, match_id);
        self.changed
            .wait_until(&self.state, |state| {
                let same = |bucket: &BTreeMap<MatchId, Arc<MatchHandle>>| {
                    bucket.get(match_id).is_some_and(|h| Arc::ptr_eq(h, &handle))
                };
                if same(&state.active) {
                    Some(Ok(()))
                } else if same(&state.waiting) {
                    None
                } else {
                    Some(Err(RegistryError::NoSuchWaitingMatch(match_id.clone())))
                }
            })
            .await?;

        let game = handle.game.lock().await;
        Ok(game.snapshot())
    }

    pub async fn try_guess(
        &self,
        player: &PlayerId,
        match_id: &MatchId,
        word: u32,
        guess: &str,
    ) -> Result<(shared::TryOutcome, View), RegistryError> {
        self.play(match_id, |game| game.try_guess(player, word, guess))
            .await
    }

    pub async fn challenge(
        &self,
        player: &PlayerId,
        match_id: &MatchId,
        word: u32,
        guess: &str,
    ) -> Result<(shared::ChallengeOutcome, View), RegistryError> {
        self.play(match_id, |game| game.challenge(player, word, guess))
            .await
    }

    /// Blocks until the board of a match changes or the match ends
    ///
    /// A match that is already over answers at once with its final score.
    pub async fn watch_board(&self, match_id: &MatchId) -> Result<View, RegistryError> {
        let handle = {
            let state = self.state.lock().await;
            match state.live(match_id) {
                Some(handle) => handle,
                None => {
                    return match state.ended(match_id) {
                        RegistryError::MatchEnded { score, .. } => Ok(View::Score(score)),
                        other => Err(other),
                    }
                }
            }
        };

        let mut seen: Option<BoardSnapshot> = None;
        handle
            .changed
            .wait_until(&handle.game, |game| {
                if game.is_finished() {
                    return Some(Ok(View::Score(game.final_score())));
                }
                if handle.is_closed() {
                    return Some(Err(RegistryError::NoSuchMatch(match_id.clone())));
                }
                let current = game.snapshot();
                if seen.is_none() {
                    seen = Some(current);
                    return None;
                }
                (seen.as_ref() != Some(&current)).then(|| Ok(View::Board(current)))
            })
            .await
    }

    /// Blocks until the lobby listing differs from what it was on entry
    pub async fn watch_lobby(&self) -> LobbyListing {
        let mut seen: Option<LobbyListing> = None;
        self.changed
            .wait_until(&self.state, |state| {
                let current = state.listing();
                if seen.is_none() {
                    seen = Some(current);
                    return None;
                }
                (seen.as_ref() != Some(&current)).then_some(current)
            })
            .await
    }

    /// Takes a player out of their match, or logs them out if they have none
    pub async fn exit(&self, player: &PlayerId) -> Result<ExitOutcome, RegistryError> {
        let mut state = self.state.lock().await;
        let Some(match_id) = state.seats.get(player).cloned() else {
            state.players.remove(player);
            info!("Player {} logged out", player);
            return Ok(ExitOutcome::Bye);
        };
        let Some(handle) = state.live(&match_id) else {
            state.seats.remove(player);
            return Ok(ExitOutcome::Bye);
        };

        let score = terminate_locked(&mut state, &handle, Termination::Exit(player.clone())).await?;
        let listing = state.listing();
        drop(state);

        handle.changed.notify_all();
        self.changed.notify_all();
        Ok(match score {
            Some(score) => ExitOutcome::Score(score),
            None => ExitOutcome::Lobby(listing),
        })
    }

    /// Removes a live match, recording its final score if it had started
    pub async fn terminate_match(
        &self,
        match_id: &MatchId,
        reason: Termination,
    ) -> Result<Option<FinalScore>, RegistryError> {
        let mut state = self.state.lock().await;
        let handle = state
            .live(match_id)
            .ok_or_else(|| RegistryError::NoSuchMatch(match_id.clone()))?;
        let score = terminate_locked(&mut state, &handle, reason).await?;
        drop(state);

        handle.changed.notify_all();
        self.changed.notify_all();
        Ok(score)
    }

    /// Forgets a player whose connection has gone, forfeiting any match
    pub async fn disconnect(&self, player: &PlayerId) {
        let mut state = self.state.lock().await;
        let handle = state
            .seats
            .get(player)
            .cloned()
            .and_then(|match_id| state.live(&match_id));

        if let Some(handle) = &handle {
            if let Err(e) =
                terminate_locked(&mut state, handle, Termination::Exit(player.clone())).await
            {
                warn!("Could not release match {} for {}: {}", handle.id, player, e);
            }
        }
        state.seats.remove(player);
        state.players.remove(player);
        drop(state);

        info!("Player {} disconnected", player);
        if let Some(handle) = handle {
            handle.changed.notify_all();
        }
        self.changed.notify_all();
    }

    pub async fn final_score(&self, match_id: &MatchId) -> Option<FinalScore> {
        self.state.lock().await.history.get(match_id).cloned()
    }

    /// Runs one move against an active match
    async fn play<R>(
        &self,
        match_id: &MatchId,
        action: impl FnOnce(&mut Match) -> Result<R, MatchError>,
    ) -> Result<(R, View), RegistryError> {
        let handle = {
            let state = self.state.lock().await;
            match state.active.get(match_id) {
                Some(handle) => Arc::clone(handle),
                None if state.waiting.contains_key(match_id) => {
                    return Err(MatchError::NotActive.into())
                }
                None => return Err(state.ended(match_id)),
            }
        };

        let (outcome, view, finished) = {
            let mut game = handle.game.lock().await;
            if game.is_finished() {
                return Err(RegistryError::MatchEnded {
                    match_id: match_id.clone(),
                    score: game.final_score(),
                });
            }
            let outcome = action(&mut *game)?;
            (outcome, game.view(), game.is_finished())
        };

        handle.changed.notify_all();
        if finished {
            self.retire(&handle).await;
        }
        Ok((outcome, view))
    }

    /// Evicts a match that finished by play, if it is still the stored one
    async fn retire(&self, handle: &Arc<MatchHandle>) {
        let mut state = self.state.lock().await;
        let current = state
            .active
            .get(&handle.id)
            .is_some_and(|stored| Arc::ptr_eq(stored, handle));
        if !current {
            return;
        }
        if let Err(e) = terminate_locked(&mut state, handle, Termination::Completed).await {
            warn!("Could not retire match {}: {}", handle.id, e);
        }
        drop(state);
        self.changed.notify_all();
    }
}

fn admit(puzzles: &mut BTreeMap<String, Arc<Puzzle>>, puzzle: Puzzle) -> bool {
    if let Err(e) = validator::check(&puzzle.placements) {
        warn!("Skipping inconsistent puzzle {}: {}", puzzle.id, e);
        return false;
    }
    if puzzles.contains_key(&puzzle.id) {
        warn!("Replacing puzzle {}", puzzle.id);
    }
    debug!("Offering puzzle {} ({} words)", puzzle.id, puzzle.placements.len());
    puzzles.insert(puzzle.id.clone(), Arc::new(puzzle));
    true
}

/// Removes `handle` from its bucket with the registry lock held
///
/// Returns the final score for a match that had started, None for one that
/// was still waiting.
async fn terminate_locked(
    state: &mut RegistryState,
    handle: &Arc<MatchHandle>,
    reason: Termination,
) -> Result<Option<FinalScore>, RegistryError> {
    let match_id = handle.id.clone();
    let mut game = handle.game.lock().await;

    if let Termination::Exit(player) = &reason {
        if !game.players().contains(player) {
            return Err(RegistryError::NotSeated {
                player: player.clone(),
                match_id,
            });
        }
    }

    if state.waiting.remove(&match_id).is_some() {
        for player in game.players() {
            state.unseat(&player, &match_id);
        }
        handle.close();
        info!("Waiting match {} closed", match_id);
        return Ok(None);
    }

    state.active.remove(&match_id);
    if let Termination::Exit(leaver) = &reason {
        if !game.is_finished() {
            game.forfeit(leaver)?;
        }
    }
    let score = game.final_score();
    for player in game.players() {
        state.unseat(&player, &match_id);
    }
    state.history.insert(match_id.clone(), score.clone());
    handle.close();

    info!("Match {} ended: {}", match_id, score.outcome);
    Ok(Some(score))
}
