//! Puzzle definitions and the `.puzzle` file format
//!
//! ```text
//! // comments and blank lines are ignored
//! >> "Easy" "An easy puzzle to get started"
//! (cat, "feline companion", ACROSS, 1, 0)
//! (ate, "had dinner", DOWN, 0, 2)
//! ```
//!
//! The header names the puzzle and describes it; every following entry is
//! `(word, "hint", ACROSS|DOWN, row, col)`. The puzzle id is the file stem.

use log::{debug, info};
use shared::Orientation;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PUZZLE_EXTENSION: &str = "puzzle";

/// Largest number of rows or columns a board may span
pub const MAX_DIMENSION: usize = 256;

#[derive(Debug, Error)]
pub enum PuzzleError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{puzzle}:{line}: {message}")]
    Syntax {
        puzzle: String,
        line: usize,
        message: String,
    },

    #[error("{puzzle}: missing `>> \"name\" \"description\"` header")]
    MissingHeader { puzzle: String },

    #[error("{puzzle}: puzzle has no words")]
    NoWords { puzzle: String },
}

/// A word's position, direction and solution as written in a puzzle file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub word: String,
    pub hint: String,
    pub orientation: Orientation,
    pub row: usize,
    pub col: usize,
}

impl Placement {
    pub fn new(
        word: &str,
        hint: &str,
        orientation: Orientation,
        row: usize,
        col: usize,
    ) -> Self {
        Placement {
            word: word.to_string(),
            hint: hint.to_string(),
            orientation,
            row,
            col,
        }
    }

    pub fn len(&self) -> usize {
        self.word.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.word.is_empty()
    }

    /// Last row the word occupies
    pub fn row_upper_bound(&self) -> usize {
        match self.orientation {
            Orientation::Across => self.row,
            Orientation::Down => self.row.saturating_add(self.len().saturating_sub(1)),
        }
    }

    /// Last column the word occupies
    pub fn col_upper_bound(&self) -> usize {
        match self.orientation {
            Orientation::Across => self.col.saturating_add(self.len().saturating_sub(1)),
            Orientation::Down => self.col,
        }
    }

    /// True when the whole word lies inside a `MAX_DIMENSION` square grid
    pub fn fits(&self) -> bool {
        self.row_upper_bound() < MAX_DIMENSION && self.col_upper_bound() < MAX_DIMENSION
    }

    pub fn covers(&self, row: usize, col: usize) -> bool {
        (self.row..=self.row_upper_bound()).contains(&row)
            && (self.col..=self.col_upper_bound()).contains(&col)
    }

    /// Solution letter at a board position, if the word covers it
    pub fn char_at(&self, row: usize, col: usize) -> Option<char> {
        if !self.covers(row, col) {
            return None;
        }
        let offset = (row - self.row) + (col - self.col);
        self.word.chars().nth(offset)
    }
}

/// A parsed puzzle file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Puzzle {
    pub id: String,
    pub name: String,
    pub description: String,
    pub placements: Vec<Placement>,
}

/// Parses the text of one puzzle file
pub fn parse(id: &str, text: &str) -> Result<Puzzle, PuzzleError> {
    let mut header: Option<(String, String)> = None;
    let mut placements = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        let mut cursor = Cursor::new(id, index + 1, line);
        if header.is_none() {
            if !line.starts_with(">>") {
                return Err(PuzzleError::MissingHeader {
                    puzzle: id.to_string(),
                });
            }
            cursor.expect_str(">>")?;
            let name = cursor.quoted()?;
            let description = cursor.quoted()?;
            cursor.finish()?;
            header = Some((name, description));
            continue;
        }

        cursor.expect('(')?;
        let word = cursor.word()?;
        cursor.expect(',')?;
        let hint = cursor.quoted()?;
        cursor.expect(',')?;
        let orientation = cursor.orientation()?;
        cursor.expect(',')?;
        let row = cursor.number()?;
        cursor.expect(',')?;
        let col = cursor.number()?;
        cursor.expect(')')?;
        cursor.finish()?;

        let (along, start) = match orientation {
            Orientation::Across => (row, col),
            Orientation::Down => (col, row),
        };
        let end = start.checked_add(word.len() - 1);
        if along >= MAX_DIMENSION || end.map_or(true, |end| end >= MAX_DIMENSION) {
            return Err(cursor.error(format!(
                "{word:?} at ({row}, {col}) leaves the {MAX_DIMENSION}x{MAX_DIMENSION} grid"
            )));
        }

        placements.push(Placement {
            word,
            hint,
            orientation,
            row,
            col,
        });
    }

    let (name, description) = header.ok_or_else(|| PuzzleError::MissingHeader {
        puzzle: id.to_string(),
    })?;

    if placements.is_empty() {
        return Err(PuzzleError::NoWords {
            puzzle: id.to_string(),
        });
    }

    Ok(Puzzle {
        id: id.to_string(),
        name,
        description,
        placements,
    })
}

/// Parses every `.puzzle` file in a directory, in file name order
///
/// Any unreadable or unparseable file fails the whole load; a server should
/// not start with a half-read catalogue.
pub fn load_dir(dir: &Path) -> Result<Vec<Puzzle>, PuzzleError> {
    let io_error = |source: std::io::Error| PuzzleError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_error)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == PUZZLE_EXTENSION))
        .collect();
    paths.sort();

    let mut puzzles = Vec::with_capacity(paths.len());
    for path in paths {
        let id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let text = fs::read_to_string(&path).map_err(|source| PuzzleError::Io {
            path: path.clone(),
            source,
        })?;
        let puzzle = parse(&id, &text)?;
        debug!(
            "Parsed puzzle {} ({} words) from {}",
            puzzle.id,
            puzzle.placements.len(),
            path.display()
        );
        puzzles.push(puzzle);
    }

    info!("Loaded {} puzzle file(s) from {}", puzzles.len(), dir.display());
    Ok(puzzles)
}

/// Hand-rolled scanner over a single puzzle line
struct Cursor<'a> {
    puzzle: &'a str,
    line: usize,
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(puzzle: &'a str, line: usize, text: &'a str) -> Self {
        Cursor {
            puzzle,
            line,
            rest: text,
        }
    }

    fn error(&self, message: impl Into<String>) -> PuzzleError {
        PuzzleError::Syntax {
            puzzle: self.puzzle.to_string(),
            line: self.line,
            message: message.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn expect(&mut self, c: char) -> Result<(), PuzzleError> {
        self.skip_whitespace();
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                Ok(())
            }
            None => Err(self.error(format!("expected '{c}' at {:?}", self.rest))),
        }
    }

    fn expect_str(&mut self, s: &str) -> Result<(), PuzzleError> {
        self.skip_whitespace();
        match self.rest.strip_prefix(s) {
            Some(rest) => {
                self.rest = rest;
                Ok(())
            }
            None => Err(self.error(format!("expected {s:?}"))),
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        self.skip_whitespace();
        let text = self.rest;
        let end = text
            .char_indices()
            .find(|&(_, c)| !pred(c))
            .map_or(text.len(), |(i, _)| i);
        let (taken, rest) = text.split_at(end);
        self.rest = rest;
        taken
    }

    fn word(&mut self) -> Result<String, PuzzleError> {
        let word = self.take_while(|c| c.is_ascii_alphabetic());
        if word.is_empty() {
            return Err(self.error("expected a word of letters"));
        }
        Ok(word.to_ascii_lowercase())
    }

    fn number(&mut self) -> Result<usize, PuzzleError> {
        let digits = self.take_while(|c| c.is_ascii_digit());
        digits
            .parse()
            .map_err(|_| self.error(format!("expected a number, found {digits:?}")))
    }

    fn orientation(&mut self) -> Result<Orientation, PuzzleError> {
        let token = self.take_while(|c| c.is_ascii_alphabetic());
        match token {
            "ACROSS" => Ok(Orientation::Across),
            "DOWN" => Ok(Orientation::Down),
            other => Err(self.error(format!("expected ACROSS or DOWN, found {other:?}"))),
        }
    }

    fn quoted(&mut self) -> Result<String, PuzzleError> {
        self.expect('"')?;
        let mut out = String::new();
        let text = self.rest;
        let mut chars = text.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.rest = &text[i + 1..];
                    return Ok(out);
                }
                '\\' => match chars.next() {
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                },
                other => out.push(other),
            }
        }
        Err(self.error("unterminated string"))
    }

    fn finish(&mut self) -> Result<(), PuzzleError> {
        self.skip_whitespace();
        if self.rest.is_empty() {
            Ok(())
        } else {
            Err(self.error(format!("unexpected trailing text {:?}", self.rest)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EASY: &str = r#"
// a tiny puzzle
>> "Easy" "An easy puzzle to get started"

(cat, "feline companion", ACROSS, 1, 0)
(ate, "\"had\" dinner", DOWN, 0, 2)
"#;

    #[test]
    fn test_placement_bounds_across() {
        let p = Placement::new("splat", "", Orientation::Across, 1, 1);
        assert_eq!(p.len(), 5);
        assert_eq!(p.row_upper_bound(), 1);
        assert_eq!(p.col_upper_bound(), 5);
    }

    #[test]
    fn test_placement_bounds_down() {
        let p = Placement::new("daa", "", Orientation::Down, 0, 1);
        assert_eq!(p.row_upper_bound(), 2);
        assert_eq!(p.col_upper_bound(), 1);
    }

    #[test]
    fn test_placement_char_at() {
        let p = Placement::new("daa", "", Orientation::Down, 0, 1);
        assert_eq!(p.char_at(0, 1), Some('d'));
        assert_eq!(p.char_at(2, 1), Some('a'));
        assert_eq!(p.char_at(3, 1), None);
        assert_eq!(p.char_at(1, 0), None);
    }

    #[test]
    fn test_parse_easy_puzzle() {
        let puzzle = parse("easy", EASY).unwrap();
        assert_eq!(puzzle.id, "easy");
        assert_eq!(puzzle.name, "Easy");
        assert_eq!(puzzle.description, "An easy puzzle to get started");
        assert_eq!(puzzle.placements.len(), 2);
        assert_eq!(
            puzzle.placements[0],
            Placement::new("cat", "feline companion", Orientation::Across, 1, 0)
        );
        assert_eq!(puzzle.placements[1].hint, "\"had\" dinner");
        assert_eq!(puzzle.placements[1].orientation, Orientation::Down);
    }

    #[test]
    fn test_parse_lowercases_words() {
        let text = ">> \"n\" \"d\"\n(CaT, \"h\", ACROSS, 0, 0)";
        let puzzle = parse("p", text).unwrap();
        assert_eq!(puzzle.placements[0].word, "cat");
    }

    #[test]
    fn test_parse_missing_header() {
        let err = parse("p", "(cat, \"h\", ACROSS, 0, 0)").unwrap_err();
        assert!(matches!(err, PuzzleError::MissingHeader { .. }));
    }

    #[test]
    fn test_parse_no_words() {
        let err = parse("p", ">> \"n\" \"d\"\n// nothing\n").unwrap_err();
        assert!(matches!(err, PuzzleError::NoWords { .. }));
    }

    #[test]
    fn test_parse_reports_line_number() {
        let text = ">> \"n\" \"d\"\n(cat, \"h\", ACROSS, 0, 0)\n(dog, \"h\", SIDEWAYS, 1, 1)\n";
        match parse("p", text).unwrap_err() {
            PuzzleError::Syntax { line, message, .. } => {
                assert_eq!(line, 3);
                assert!(message.contains("ACROSS or DOWN"));
            }
            other => panic!("Expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_trailing_text() {
        let text = ">> \"n\" \"d\"\n(cat, \"h\", ACROSS, 0, 0) extra\n";
        assert!(matches!(
            parse("p", text),
            Err(PuzzleError::Syntax { line: 2, .. })
        ));
    }

    #[test]
    fn test_parse_rejects_unterminated_hint() {
        let text = ">> \"n\" \"d\"\n(cat, \"oops, ACROSS, 0, 0)\n";
        assert!(parse("p", text).is_err());
    }

    #[test]
    fn test_parse_rejects_words_outside_grid() {
        for entry in [
            r#"(cat, "h", ACROSS, 3000000000, 3000000000)"#,
            r#"(cat, "h", ACROSS, 0, 18446744073709551615)"#,
            r#"(cat, "h", DOWN, 254, 0)"#,
            r#"(cat, "h", ACROSS, 256, 0)"#,
        ] {
            let text = format!(">> \"Big\" \"too big\"\n{entry}\n");
            match parse("big", &text) {
                Err(PuzzleError::Syntax { line, message, .. }) => {
                    assert_eq!(line, 2);
                    assert!(message.contains("leaves the"), "{message}");
                }
                other => panic!("Expected syntax error for {entry}, got {:?}", other),
            }
        }

        let text = ">> \"Edge\" \"fits\"\n(cat, \"h\", DOWN, 253, 255)\n";
        let edge = parse("edge", text).unwrap();
        assert!(edge.placements[0].fits());
    }

    #[test]
    fn test_huge_placement_bounds_do_not_overflow() {
        let placement = Placement::new("cat", "", Orientation::Across, 0, usize::MAX);
        assert_eq!(placement.col_upper_bound(), usize::MAX);
        assert!(!placement.fits());
    }

    #[test]
    fn test_load_dir_reads_bundled_puzzles() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../puzzles");
        let puzzles = load_dir(&dir).unwrap();
        let ids: Vec<&str> = puzzles.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["easy", "warmup"]);
        assert!(puzzles.iter().all(|p| crate::validator::validate(&p.placements)));
    }

    #[test]
    fn test_load_dir_missing_directory() {
        let err = load_dir(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, PuzzleError::Io { .. }));
    }
}
