//! Consistency checks run once per puzzle before it is offered to players
//!
//! Every unordered pair of placements is examined once. Two words conflict
//! when they spell the same text, when they run in the same direction along
//! the same line with overlapping spans, or when they cross at a cell and
//! disagree on its letter. Words that never share a cell are unconstrained.
//! Every word must also lie inside the `MAX_DIMENSION` square.

use crate::puzzle::{Placement, MAX_DIMENSION};
use shared::Orientation;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Inconsistency {
    #[error("word {word:?} at ({row}, {col}) leaves the {max}x{max} grid", max = MAX_DIMENSION)]
    OutOfBounds { word: String, row: usize, col: usize },

    #[error("word {word:?} appears more than once")]
    DuplicateWord { word: String },

    #[error("{first:?} and {second:?} overlap along the same line")]
    Overlap { first: String, second: String },

    #[error("{first:?} and {second:?} disagree at ({row}, {col})")]
    Mismatch {
        first: String,
        second: String,
        row: usize,
        col: usize,
    },
}

/// True when the placements can be laid on one board without conflict
pub fn validate(placements: &[Placement]) -> bool {
    check(placements).is_ok()
}

/// Like [`validate`] but names the first conflicting pair
pub fn check(placements: &[Placement]) -> Result<(), Inconsistency> {
    if let Some(p) = placements.iter().find(|p| !p.fits()) {
        return Err(Inconsistency::OutOfBounds {
            word: p.word.clone(),
            row: p.row,
            col: p.col,
        });
    }
    for (i, a) in placements.iter().enumerate() {
        for b in &placements[i + 1..] {
            check_pair(a, b)?;
        }
    }
    Ok(())
}

fn check_pair(a: &Placement, b: &Placement) -> Result<(), Inconsistency> {
    if a.word == b.word {
        return Err(Inconsistency::DuplicateWord {
            word: a.word.clone(),
        });
    }

    match (a.orientation, b.orientation) {
        (Orientation::Across, Orientation::Across) => {
            let same_line = a.row == b.row;
            if same_line && ranges_overlap(a.col, a.col_upper_bound(), b.col, b.col_upper_bound()) {
                return Err(overlap(a, b));
            }
        }
        (Orientation::Down, Orientation::Down) => {
            let same_line = a.col == b.col;
            if same_line && ranges_overlap(a.row, a.row_upper_bound(), b.row, b.row_upper_bound()) {
                return Err(overlap(a, b));
            }
        }
        (Orientation::Across, Orientation::Down) => check_crossing(a, b)?,
        (Orientation::Down, Orientation::Across) => check_crossing(b, a)?,
    }

    Ok(())
}

/// Closed-interval overlap of `[low_a, high_a]` and `[low_b, high_b]`
fn ranges_overlap(low_a: usize, high_a: usize, low_b: usize, high_b: usize) -> bool {
    low_a <= high_b && low_b <= high_a
}

fn overlap(a: &Placement, b: &Placement) -> Inconsistency {
    Inconsistency::Overlap {
        first: a.word.clone(),
        second: b.word.clone(),
    }
}

/// An across word and a down word can share at most the cell on the across
/// word's row and the down word's column
fn check_crossing(across: &Placement, down: &Placement) -> Result<(), Inconsistency> {
    let (row, col) = (across.row, down.col);
    match (across.char_at(row, col), down.char_at(row, col)) {
        (Some(x), Some(y)) if x != y => Err(Inconsistency::Mismatch {
            first: across.word.clone(),
            second: down.word.clone(),
            row,
            col,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Orientation::{Across, Down};

    fn p(word: &str, orientation: Orientation, row: usize, col: usize) -> Placement {
        Placement::new(word, "", orientation, row, col)
    }

    #[test]
    fn test_same_row_overlap_rejected() {
        let placements = vec![p("cat", Across, 1, 2), p("splat", Across, 1, 1)];
        assert!(!validate(&placements));
        assert!(matches!(
            check(&placements),
            Err(Inconsistency::Overlap { .. })
        ));
    }

    #[test]
    fn test_word_outside_grid_rejected() {
        let placements = vec![p("cat", Across, 1, 0), p("dog", Across, 0, usize::MAX)];
        assert!(!validate(&placements));
        assert!(matches!(
            check(&placements),
            Err(Inconsistency::OutOfBounds { ref word, .. }) if word == "dog"
        ));
        assert!(validate(&[p("dog", Down, MAX_DIMENSION - 3, 0)]));
        assert!(!validate(&[p("dog", Down, MAX_DIMENSION - 2, 0)]));
    }

    #[test]
    fn test_matching_crossing_accepted() {
        let placements = vec![p("cat", Across, 1, 0), p("daa", Down, 0, 1)];
        assert!(validate(&placements));
    }

    #[test]
    fn test_mismatched_crossing_rejected() {
        let placements = vec![p("cat", Across, 1, 0), p("dog", Down, 0, 1)];
        assert_eq!(
            check(&placements),
            Err(Inconsistency::Mismatch {
                first: "cat".into(),
                second: "dog".into(),
                row: 1,
                col: 1,
            })
        );
    }

    #[test]
    fn test_crossing_order_does_not_matter() {
        let placements = vec![p("dog", Down, 0, 1), p("cat", Across, 1, 0)];
        assert!(!validate(&placements));
    }

    #[test]
    fn test_duplicate_words_rejected() {
        let placements = vec![p("cat", Across, 0, 0), p("cat", Down, 5, 5)];
        assert_eq!(
            check(&placements),
            Err(Inconsistency::DuplicateWord { word: "cat".into() })
        );
    }

    #[test]
    fn test_adjacent_words_on_same_row_accepted() {
        // [0, 2] and [3, 5] touch but do not share a cell
        let placements = vec![p("cat", Across, 0, 0), p("dog", Across, 0, 3)];
        assert!(validate(&placements));
    }

    #[test]
    fn test_touching_endpoints_rejected() {
        // [0, 2] and [2, 4] share column 2
        let placements = vec![p("cat", Across, 0, 0), p("tag", Across, 0, 2)];
        assert!(!validate(&placements));
    }

    #[test]
    fn test_same_direction_different_lines_accepted() {
        let placements = vec![p("cat", Down, 0, 0), p("dog", Down, 0, 1)];
        assert!(validate(&placements));
    }

    #[test]
    fn test_down_words_overlap_rejected() {
        let placements = vec![p("cat", Down, 0, 4), p("dog", Down, 2, 4)];
        assert!(!validate(&placements));
    }

    #[test]
    fn test_non_intersecting_cross_accepted() {
        // the candidate cell (5, 1) lies outside the down word
        let placements = vec![p("cat", Across, 5, 0), p("dog", Down, 0, 1)];
        assert!(validate(&placements));
    }

    #[test]
    fn test_empty_and_single_placement_accepted() {
        assert!(validate(&[]));
        assert!(validate(&[p("cat", Across, 0, 0)]));
    }

    #[test]
    fn test_one_bad_pair_among_many() {
        let placements = vec![
            p("star", Across, 1, 0),
            p("tea", Down, 0, 1),
            p("sat", Across, 4, 0),
            p("rob", Down, 1, 3),
            p("bat", Across, 3, 1),
        ];
        // "tea" has 'e' at (1, 1), "star" has 't' there
        assert!(!validate(&placements));
    }
}
