//! Performance benchmarks for the hot paths of the crossword server

use server::board::Board;
use server::game::Match;
use server::puzzle::Placement;
use server::validator::validate;
use shared::Orientation::{Across, Down};
use shared::{BoardSnapshot, MatchId, PlayerId, Request, Response, TryOutcome};
use std::time::Instant;

/// Distinct lowercase words: "aaaaa", "aaaab", ...
fn word(mut n: usize) -> String {
    let mut letters = vec![b'a'; 5];
    for slot in letters.iter_mut().rev() {
        *slot = b'a' + (n % 26) as u8;
        n /= 26;
    }
    String::from_utf8(letters).unwrap()
}

/// One across word per row, so every pair is consistent and must be checked
fn stacked_rows(count: usize) -> Vec<Placement> {
    (0..count)
        .map(|row| Placement::new(&word(row), "hint", Across, row, 0))
        .collect()
}

/// A `size` x `size` lattice: across words on even rows, down words on odd
/// columns, every one of them crossing half of the others
fn lattice(size: usize) -> Vec<Placement> {
    let mut placements = Vec::new();
    for row in (0..size).step_by(2) {
        let across: String = (0..size)
            .map(|col| if col % 2 == 0 { (b'a' + (row % 26) as u8) as char } else { 'z' })
            .collect();
        placements.push(Placement::new(&format!("{across}{row}"), "", Across, row, 0));
    }
    for col in (1..size).step_by(2) {
        let down: String = (0..size)
            .map(|row| if row % 2 == 0 { 'z' } else { 'y' })
            .collect();
        placements.push(Placement::new(&format!("{down}{col}"), "", Down, 0, col));
    }
    placements
}

/// Benchmarks pairwise validation of a large puzzle
#[test]
fn benchmark_validator() {
    let placements = stacked_rows(200);
    let iterations = 50;
    let start = Instant::now();

    for _ in 0..iterations {
        assert!(validate(&placements));
    }

    let duration = start.elapsed();
    println!(
        "Validator: {} iterations over {} words in {:?} ({:.2} μs/iter)",
        iterations,
        placements.len(),
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // ~20k pairs per pass
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks validation when many words cross
#[test]
fn benchmark_validator_crossings() {
    let placements = lattice(41);
    let iterations = 200;
    let start = Instant::now();

    for _ in 0..iterations {
        assert!(validate(&placements));
    }

    let duration = start.elapsed();
    println!(
        "Validator with crossings: {} iterations in {:?}",
        iterations, duration
    );
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks rendering and re-parsing board snapshots
#[test]
fn benchmark_snapshot_encoding() {
    let board = Board::new(&stacked_rows(60));
    let iterations = 2_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let lines = board.snapshot().to_lines();
        let parsed = BoardSnapshot::from_lines(&lines).unwrap();
        assert_eq!(parsed.rows, 60);
    }

    let duration = start.elapsed();
    println!(
        "Snapshot encode/decode: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 5000);
}

/// Benchmarks request parsing
#[test]
fn benchmark_request_parsing() {
    let lines = [
        "START alice",
        r#"NEW alice m1 easy "a game with a long description""#,
        "TRY alice m1 12 crossword",
        "CHALLENGE bob m1 3 puzzle",
        "WATCH bob m1",
    ];
    let iterations = 20_000;
    let start = Instant::now();

    for i in 0..iterations {
        Request::parse(lines[i % lines.len()]).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Request parsing: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 1000);
}

/// Benchmarks a stream of guesses against one match
#[test]
fn benchmark_guess_processing() {
    let placements = stacked_rows(100);
    let alice = PlayerId::new("alice").unwrap();
    let bob = PlayerId::new("bob").unwrap();
    let mut game = Match::new(
        MatchId::new("bench").unwrap(),
        "Bench",
        "",
        Board::new(&placements),
        alice.clone(),
    );
    game.add_player(bob).unwrap();

    let iterations = 10_000;
    let start = Instant::now();

    for i in 0..iterations {
        // alternate a wrong and a right guess so nothing finishes early
        let id = (i % 99) as u32 + 1;
        let guess = if i % 2 == 0 { "zzzzz".to_string() } else { word(id as usize - 1) };
        let outcome = game.try_guess(&alice, id, &guess).unwrap();
        assert_eq!(outcome, TryOutcome::Success);
    }

    let duration = start.elapsed();
    println!(
        "Guess processing: {} guesses in {:?} ({:.2} μs/guess)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(!game.is_finished());
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks response framing for large boards
#[test]
fn benchmark_response_framing() {
    let board = Board::new(&stacked_rows(100));
    let response = Response::Board(board.snapshot());
    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let text = response.encode();
        let frame = shared::Frame::decode(&text).unwrap();
        assert_eq!(Response::from_frame(&frame).unwrap(), response);
    }

    let duration = start.elapsed();
    println!("Response framing: {} iterations in {:?}", iterations, duration);
    assert!(duration.as_millis() < 5000);
}
