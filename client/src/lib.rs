//! # Crossword Client Library
//!
//! A terminal client for the crossword server. It reads commands typed by the
//! user, turns them into protocol requests, and prints what comes back as
//! plain text or JSON.
//!
//! ## Module Organization
//!
//! ### Input Module (`input`)
//! Parses typed commands such as `try 3 apple` and fills in the player and
//! match ids the session already knows.
//!
//! ### Game Module (`game`)
//! Tracks the session: the registered player, the current match, its phase
//! (lobby, waiting, playing) and the last board received.
//!
//! ### Network Module (`network`)
//! Writes request lines and reads back complete response frames over TCP.
//!
//! ### Rendering Module (`rendering`)
//! Formats boards with a numbered clue list, lobby listings and final scores.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::Session;
//! use client::input::parse_command;
//! use client::network::Connection;
//! use client::rendering::{OutputFormat, Renderer};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let mut connection = Connection::connect("127.0.0.1:4949").await?;
//! let mut session = Session::new();
//! let renderer = Renderer::new(OutputFormat::Text);
//!
//! if let Some(command) = parse_command("start alice")? {
//!     if let Some(request) = command.to_request(&session)? {
//!         let response = connection.request(&request).await?;
//!         session.apply(&request, &response);
//!         println!("{}", renderer.render(&response));
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
