//! Integration tests for the crossword server and client
//!
//! These tests run a real server on a loopback port and talk to it with the
//! client's connection type, exercising the full request/response path.

use client::network::{ClientError, Connection};
use server::network::Server;
use server::puzzle;
use server::registry::Registry;
use shared::{ChallengeOutcome, MatchId, Outcome, PlayerId, Request, Response, TryOutcome, View};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

const TIMEOUT: Duration = Duration::from_secs(2);

fn player(id: &str) -> PlayerId {
    PlayerId::new(id).unwrap()
}

fn match_id(id: &str) -> MatchId {
    MatchId::new(id).unwrap()
}

fn bundled_registry() -> Arc<Registry> {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("puzzles");
    let puzzles = puzzle::load_dir(&dir).expect("bundled puzzles should load");
    Arc::new(Registry::new(puzzles))
}

async fn spawn_server(max_clients: usize) -> SocketAddr {
    let server = Server::bind("127.0.0.1:0", bundled_registry(), max_clients)
        .await
        .expect("Failed to bind server");
    let addr = server.local_addr().unwrap();
    tokio::spawn(async move { server.run().await });
    addr
}

async fn connect(addr: SocketAddr) -> Connection {
    Connection::connect(addr).await.expect("Failed to connect")
}

async fn send(connection: &mut Connection, line: &str) -> Response {
    let request = Request::parse(line).unwrap();
    timeout(TIMEOUT, connection.request(&request))
        .await
        .expect("server did not answer in time")
        .expect("request failed")
}

/// Two connected players, `alice` waiting in `m1` on the easy puzzle and
/// `bob` having just joined
async fn started_match(addr: SocketAddr) -> (Connection, Connection) {
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;
    send(&mut alice, "START alice").await;
    send(&mut bob, "START bob").await;

    assert_eq!(
        send(&mut alice, r#"NEW alice m1 easy "first game""#).await,
        Response::Waiting {
            match_id: match_id("m1")
        }
    );
    alice
        .send(&Request::Wait {
            player: player("alice"),
            match_id: match_id("m1"),
        })
        .await
        .unwrap();

    let joined = send(&mut bob, "PLAY bob m1").await;
    assert!(matches!(joined, Response::Board(_)));
    let released = timeout(TIMEOUT, alice.receive()).await.unwrap().unwrap();
    assert_eq!(released, joined);

    (alice, bob)
}

/// SESSION AND LOBBY TESTS
mod lobby_tests {
    use super::*;

    #[tokio::test]
    async fn start_lists_bundled_puzzles() {
        let addr = spawn_server(8).await;
        let mut alice = connect(addr).await;

        let Response::Lobby(listing) = send(&mut alice, "START alice").await else {
            panic!("expected lobby listing");
        };
        assert_eq!(listing.puzzles, vec!["easy".to_string(), "warmup".to_string()]);
        assert!(listing.matches.is_empty());
    }

    #[tokio::test]
    async fn duplicate_player_must_try_again() {
        let addr = spawn_server(8).await;
        let mut first = connect(addr).await;
        let mut second = connect(addr).await;

        send(&mut first, "START alice").await;
        assert!(matches!(
            send(&mut second, "START alice").await,
            Response::TryAgain { .. }
        ));
    }

    #[tokio::test]
    async fn malformed_requests_keep_the_connection() {
        let addr = spawn_server(8).await;
        let mut alice = connect(addr).await;

        assert!(matches!(
            send(&mut alice, "DANCE alice").await,
            Response::TryAgain { .. }
        ));
        assert!(matches!(
            send(&mut alice, "START bad-name!").await,
            Response::TryAgain { .. }
        ));
        assert!(matches!(
            send(&mut alice, r##"TRY alice m1 1 "#? ""##).await,
            Response::TryAgain { .. }
        ));
        assert!(matches!(
            send(&mut alice, "START alice").await,
            Response::Lobby(_)
        ));
    }

    #[tokio::test]
    async fn watch_lobby_sees_new_match() {
        let addr = spawn_server(8).await;
        let mut alice = connect(addr).await;
        let mut carol = connect(addr).await;
        send(&mut alice, "START alice").await;

        carol.send(&Request::WatchLobby).await.unwrap();
        sleep(Duration::from_millis(50)).await;
        send(&mut alice, r#"NEW alice m1 warmup "anyone?""#).await;

        let Response::Lobby(listing) = timeout(TIMEOUT, carol.receive()).await.unwrap().unwrap()
        else {
            panic!("expected lobby listing");
        };
        assert_eq!(listing.matches.len(), 1);
        assert_eq!(listing.matches[0].description, "anyone?");
    }

    #[tokio::test]
    async fn server_full_is_refused() {
        let addr = spawn_server(1).await;
        let mut first = connect(addr).await;
        send(&mut first, "START alice").await;

        let mut second = connect(addr).await;
        let refused = timeout(TIMEOUT, second.receive()).await.unwrap().unwrap();
        assert!(matches!(refused, Response::Rejected { ref reason } if reason == "server full"));
        assert!(matches!(
            second.receive().await,
            Err(ClientError::Closed) | Err(ClientError::Io(_))
        ));
    }
}

/// MATCH LIFECYCLE TESTS
mod match_tests {
    use super::*;

    #[tokio::test]
    async fn full_game_ends_in_tie() {
        let addr = spawn_server(8).await;
        let (mut alice, mut bob) = started_match(addr).await;

        // words: 1 cat, 2 ate, 3 egg, 4 go
        let moves = [
            send(&mut alice, "TRY alice m1 1 cat").await,
            send(&mut bob, "TRY bob m1 2 ate").await,
            send(&mut alice, "TRY alice m1 3 egg").await,
        ];
        for response in moves {
            assert!(matches!(
                response,
                Response::Guess {
                    outcome: TryOutcome::Success,
                    view: View::Board(_)
                }
            ));
        }

        let last = send(&mut bob, "TRY bob m1 4 go").await;
        let Response::Guess {
            outcome: TryOutcome::Success,
            view: View::Score(score),
        } = last
        else {
            panic!("expected final score");
        };
        assert_eq!(score.outcome, Outcome::Tie);
        assert!(score.players.iter().all(|p| p.total() == 2));

        // the match is gone but its score is remembered
        assert!(matches!(
            send(&mut alice, "WATCH alice m1").await,
            Response::Score(_)
        ));
        assert!(matches!(
            send(&mut alice, "EXIT alice").await,
            Response::Bye
        ));
    }

    #[tokio::test]
    async fn challenge_over_the_wire() {
        let addr = spawn_server(8).await;
        let (mut alice, mut bob) = started_match(addr).await;

        send(&mut alice, "TRY alice m1 1 cot").await;
        let response = send(&mut bob, "CHALLENGE bob m1 1 cat").await;
        let Response::Challenge {
            outcome: ChallengeOutcome::Correct,
            view: View::Board(board),
        } = response
        else {
            panic!("expected correct challenge");
        };
        assert_eq!(board.grid[1], "cat##");
        let word = board.word(1).unwrap();
        assert_eq!(word.owner, Some(player("bob")));
        assert!(word.confirmed);
    }

    #[tokio::test]
    async fn watcher_sees_opponent_move() {
        let addr = spawn_server(8).await;
        let (mut alice, mut bob) = started_match(addr).await;

        bob.send(&Request::Watch {
            player: player("bob"),
            match_id: match_id("m1"),
        })
        .await
        .unwrap();
        sleep(Duration::from_millis(50)).await;
        send(&mut alice, "TRY alice m1 1 cat").await;

        let Response::Board(board) = timeout(TIMEOUT, bob.receive()).await.unwrap().unwrap() else {
            panic!("expected board");
        };
        assert_eq!(board.grid[1], "cat##");
    }

    #[tokio::test]
    async fn exit_forfeits_to_opponent() {
        let addr = spawn_server(8).await;
        let (mut alice, mut bob) = started_match(addr).await;

        let Response::Score(score) = send(&mut bob, "EXIT bob").await else {
            panic!("expected score");
        };
        assert_eq!(score.outcome, Outcome::Winner(player("alice")));
        assert!(matches!(
            send(&mut alice, "TRY alice m1 1 cat").await,
            Response::Score(_)
        ));
    }

    #[tokio::test]
    async fn disconnect_while_waiting_closes_match() {
        let addr = spawn_server(8).await;
        let mut alice = connect(addr).await;
        let mut carol = connect(addr).await;
        send(&mut alice, "START alice").await;
        send(&mut carol, "START carol").await;
        send(&mut alice, "NEW alice m1 easy game").await;
        alice
            .send(&Request::Wait {
                player: player("alice"),
                match_id: match_id("m1"),
            })
            .await
            .unwrap();
        drop(alice);

        let mut open = true;
        for _ in 0..50 {
            let Response::Lobby(listing) = send(&mut carol, "LOBBY").await else {
                panic!("expected lobby listing");
            };
            open = !listing.matches.is_empty();
            if !open {
                break;
            }
            sleep(Duration::from_millis(20)).await;
        }
        assert!(!open, "waiting match survived its creator's disconnect");

        // nobody can join it any more
        assert!(matches!(
            send(&mut carol, "PLAY carol m1").await,
            Response::TryAgain { .. }
        ));
    }
}

/// CONCURRENCY TESTS
mod concurrency_tests {
    use super::*;
    use server::puzzle::{Placement, Puzzle};
    use shared::Orientation::{Across, Down};

    async fn racing_registry() -> Arc<Registry> {
        let registry = Arc::new(Registry::new(vec![Puzzle {
            id: "tiny".into(),
            name: "Tiny".into(),
            description: "two words".into(),
            placements: vec![
                Placement::new("cat", "feline companion", Across, 1, 0),
                Placement::new("daa", "crossing word", Down, 0, 1),
            ],
        }]));
        registry.register_player(&player("alice")).await.unwrap();
        registry.register_player(&player("bob")).await.unwrap();
        registry
            .register_waiting_match(&match_id("m1"), "tiny", "", &player("alice"))
            .await
            .unwrap();
        registry
            .promote_to_active(&match_id("m1"), &player("bob"))
            .await
            .unwrap();
        registry
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn only_one_player_takes_a_word() {
        for _ in 0..20 {
            let registry = racing_registry().await;

            let tasks: Vec<_> = ["alice", "bob"]
                .into_iter()
                .map(|id| {
                    let registry = Arc::clone(&registry);
                    tokio::spawn(async move {
                        registry
                            .try_guess(&player(id), &match_id("m1"), 1, "cot")
                            .await
                            .unwrap()
                            .0
                    })
                })
                .collect();

            let mut outcomes = Vec::new();
            for task in tasks {
                outcomes.push(task.await.unwrap());
            }
            outcomes.sort_by_key(|o| o.as_str());
            assert_eq!(outcomes, vec![TryOutcome::Occupied, TryOutcome::Success]);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn many_watchers_all_wake() {
        let registry = racing_registry().await;

        let watchers: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.watch_board(&match_id("m1")).await })
            })
            .collect();
        sleep(Duration::from_millis(50)).await;

        registry
            .try_guess(&player("alice"), &match_id("m1"), 1, "cat")
            .await
            .unwrap();

        for watcher in watchers {
            let view = timeout(TIMEOUT, watcher).await.unwrap().unwrap().unwrap();
            assert!(matches!(view, View::Board(ref b) if b.grid[1] == "cat"));
        }
    }
}
