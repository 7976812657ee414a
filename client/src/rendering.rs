//! Plain-text (or JSON) rendering of server responses

use shared::{BoardSnapshot, FinalScore, LobbyListing, Orientation, Response, View, WordSummary};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

pub struct Renderer {
    format: OutputFormat,
}

impl Renderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn render(&self, response: &Response) -> String {
        match self.format {
            OutputFormat::Text => render_response(response),
            OutputFormat::Json => serde_json::to_string_pretty(response)
                .unwrap_or_else(|e| format!("could not encode response: {e}")),
        }
    }
}

pub fn render_response(response: &Response) -> String {
    match response {
        Response::Lobby(listing) => render_lobby(listing),
        Response::Waiting { match_id } => {
            format!("Match {match_id} created, waiting for an opponent...")
        }
        Response::Board(board) => render_board(board),
        Response::Guess { outcome, view } => {
            format!("Guess: {outcome}\n{}", render_view(view))
        }
        Response::Challenge { outcome, view } => {
            format!("Challenge: {outcome}\n{}", render_view(view))
        }
        Response::Score(score) => render_score(score),
        Response::Bye => "Bye!".to_string(),
        Response::TryAgain { reason } => format!("Try again: {reason}"),
        Response::Rejected { reason } => format!("Rejected: {reason}"),
    }
}

fn render_view(view: &View) -> String {
    match view {
        View::Board(board) => render_board(board),
        View::Score(score) => render_score(score),
    }
}

/// Grid with column and row numbers, followed by the clues
pub fn render_board(board: &BoardSnapshot) -> String {
    let mut out = String::new();

    out.push_str("    ");
    for col in 0..board.cols {
        let _ = write!(out, "{}", col % 10);
    }
    out.push('\n');
    for (row, line) in board.grid.iter().enumerate() {
        let _ = writeln!(out, "{row:>3} {line}");
    }

    for orientation in [Orientation::Across, Orientation::Down] {
        let words: Vec<&WordSummary> = board
            .words
            .iter()
            .filter(|w| w.orientation == orientation)
            .collect();
        if words.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{orientation}");
        for word in words {
            let _ = writeln!(out, "{}", render_clue(word));
        }
    }

    out.trim_end().to_string()
}

fn render_clue(word: &WordSummary) -> String {
    let status = match (&word.owner, word.confirmed) {
        (Some(owner), true) => format!(" [{owner}, confirmed]"),
        (Some(owner), false) => format!(" [{owner}]"),
        (None, true) => " [confirmed]".to_string(),
        (None, false) => String::new(),
    };
    format!(
        "  {:>2}. ({}, {}) {}{}",
        word.id, word.row, word.col, word.hint, status
    )
}

pub fn render_lobby(listing: &LobbyListing) -> String {
    let mut out = String::from("Puzzles:");
    if listing.puzzles.is_empty() {
        out.push_str(" (none)");
    }
    for puzzle in &listing.puzzles {
        let _ = write!(out, "\n  {puzzle}");
    }

    out.push_str("\nOpen matches:");
    if listing.matches.is_empty() {
        out.push_str(" (none)");
    }
    for open in &listing.matches {
        let _ = write!(out, "\n  {} - {}", open.id, open.description);
    }
    out
}

pub fn render_score(score: &FinalScore) -> String {
    let mut out = String::from("Final score:");
    for player in &score.players {
        let _ = write!(
            out,
            "\n  {}: {} points, {} challenge points, total {}",
            player.player,
            player.score,
            player.challenge_points,
            player.total()
        );
    }
    let _ = write!(out, "\nResult: {}", score.outcome);
    out
}
