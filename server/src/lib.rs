//! # Crossword Server Library
//!
//! This library holds the authoritative side of a two-player crossword game.
//! Players connect over TCP, start matches on validated puzzles, take words
//! with guesses and dispute each other's guesses with challenges. The server
//! owns every board, score and match state; clients only see snapshots.
//!
//! ## Core Responsibilities
//!
//! ### Puzzle Catalogue
//! Puzzle files are parsed at startup and checked for consistency. A puzzle
//! whose words overlap along a line or disagree where they cross is never
//! offered to players.
//!
//! ### Match Lifecycle
//! A match waits for a second player, is played until every word is
//! confirmed, and ends with a final score. A player leaving an active match
//! forfeits it. Finished matches are removed from play but their final score
//! is remembered.
//!
//! ### Blocking Waits
//! Three requests may block: the creator waiting for an opponent, a player
//! watching a board, and a player watching the lobby. None of them poll; they
//! sleep on a [`signal::Signal`] and re-check their condition when woken.
//!
//! ## Module Organization
//!
//! ### Board Module (`board`)
//! Cells, the words laid over them and the ownership gate every letter is
//! written through.
//!
//! ### Validator Module (`validator`)
//! Pairwise consistency checks over the placements of a puzzle.
//!
//! ### Game Module (`game`)
//! The per-match state machine and its scoring rules.
//!
//! ### Registry Module (`registry`)
//! Connected players, the puzzle catalogue and every waiting or active match,
//! plus the history of finished ones.
//!
//! ### Network Module (`network`)
//! The TCP accept loop, bounded by a semaphore, and the per-connection
//! request loop.
//!
//! ## Locking
//!
//! There are two lock levels: one for the registry and one per match. They are
//! always taken in that order, and a match lock is never held while waiting
//! for the registry.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use server::registry::Registry;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let puzzles = server::puzzle::load_dir(Path::new("puzzles"))?;
//!     let registry = Arc::new(Registry::new(puzzles));
//!
//!     // Serve at most 64 connections at once
//!     let server = Server::bind("127.0.0.1:4949", registry, 64).await?;
//!     server.run().await;
//!
//!     Ok(())
//! }
//! ```

pub mod board;
pub mod game;
pub mod network;
pub mod puzzle;
pub mod registry;
pub mod signal;
pub mod validator;
