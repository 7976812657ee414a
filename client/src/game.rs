//! Client-side view of the session: who we are, which match we are in, and
//! the last board the server showed us

use log::debug;
use shared::{BoardSnapshot, MatchId, PlayerId, Request, Response, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not registered with the server
    Offline,
    /// Registered, not in a match
    Lobby,
    /// Created a match, no opponent yet
    Waiting,
    Playing,
}

#[derive(Debug, Clone)]
pub struct Session {
    player: Option<PlayerId>,
    match_id: Option<MatchId>,
    phase: Phase,
    board: Option<BoardSnapshot>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            player: None,
            match_id: None,
            phase: Phase::Offline,
            board: None,
        }
    }

    pub fn player(&self) -> Option<&PlayerId> {
        self.player.as_ref()
    }

    pub fn match_id(&self) -> Option<&MatchId> {
        self.match_id.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn board(&self) -> Option<&BoardSnapshot> {
        self.board.as_ref()
    }

    /// Updates the session from a request and the server's answer to it
    pub fn apply(&mut self, request: &Request, response: &Response) {
        match (request, response) {
            (Request::Start { player }, Response::Lobby(_)) => {
                self.player = Some(player.clone());
                self.phase = Phase::Lobby;
            }
            (Request::New { match_id, .. }, Response::Waiting { .. }) => {
                self.match_id = Some(match_id.clone());
                self.phase = Phase::Waiting;
            }
            (Request::Play { match_id, .. }, Response::Board(board)) => {
                self.match_id = Some(match_id.clone());
                self.enter_play(board);
            }
            (Request::Wait { .. } | Request::Watch { .. }, Response::Board(board)) => {
                self.enter_play(board);
            }
            (Request::Exit { .. }, Response::Bye) => {
                *self = Session::new();
            }
            (Request::Exit { .. }, Response::Lobby(_)) | (_, Response::Score(_)) => {
                self.leave_match();
            }
            (Request::Wait { .. }, Response::TryAgain { .. } | Response::Rejected { .. }) => {
                self.leave_match();
            }
            (_, Response::Guess { view, .. } | Response::Challenge { view, .. }) => match view {
                View::Board(board) => self.board = Some(board.clone()),
                View::Score(_) => self.leave_match(),
            },
            _ => {}
        }
        debug!("Session phase now {:?}", self.phase);
    }

    /// A request the client should send on its own after `response`
    ///
    /// Creating a match is always followed by waiting for the opponent.
    pub fn follow_up(&self, response: &Response) -> Option<Request> {
        match (response, &self.player) {
            (Response::Waiting { match_id }, Some(player)) => Some(Request::Wait {
                player: player.clone(),
                match_id: match_id.clone(),
            }),
            _ => None,
        }
    }

    fn enter_play(&mut self, board: &BoardSnapshot) {
        self.phase = Phase::Playing;
        self.board = Some(board.clone());
    }

    fn leave_match(&mut self) {
        self.match_id = None;
        self.board = None;
        if self.player.is_some() {
            self.phase = Phase::Lobby;
        }
    }
}
