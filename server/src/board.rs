//! Crossword grid: cells, the words laid over them, and the ownership gate
//! through which every letter is written
//!
//! A [`Board`] owns its [`WordEntry`] list and its [`Cell`] grid. Cells refer
//! back to the words covering them by index into the word list, so a cell is
//! covered by at most one across word and at most one down word.

use crate::puzzle::Placement;
use shared::snapshot::{ABSENT, EMPTY};
use shared::{BoardSnapshot, Orientation, PlayerId, WordSummary};

/// One word of the puzzle together with its play state
#[derive(Debug, Clone)]
pub struct WordEntry {
    id: u32,
    start_row: usize,
    start_col: usize,
    orientation: Orientation,
    solution: Vec<char>,
    hint: String,
    owner: Option<PlayerId>,
    confirmed: bool,
}

impl WordEntry {
    pub fn new(id: u32, placement: &Placement) -> Self {
        WordEntry {
            id,
            start_row: placement.row,
            start_col: placement.col,
            orientation: placement.orientation,
            solution: placement.word.chars().collect(),
            hint: placement.hint.clone(),
            owner: None,
            confirmed: false,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn start_row(&self) -> usize {
        self.start_row
    }

    pub fn start_col(&self) -> usize {
        self.start_col
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn len(&self) -> usize {
        self.solution.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solution.is_empty()
    }

    pub fn solution(&self) -> &[char] {
        &self.solution
    }

    pub fn hint(&self) -> &str {
        &self.hint
    }

    pub fn owner(&self) -> Option<&PlayerId> {
        self.owner.as_ref()
    }

    pub fn is_owned_by(&self, player: &PlayerId) -> bool {
        self.owner.as_ref() == Some(player)
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn row_upper_bound(&self) -> usize {
        match self.orientation {
            Orientation::Across => self.start_row,
            Orientation::Down => self.start_row + self.len().saturating_sub(1),
        }
    }

    pub fn col_upper_bound(&self) -> usize {
        match self.orientation {
            Orientation::Across => self.start_col + self.len().saturating_sub(1),
            Orientation::Down => self.start_col,
        }
    }

    /// Board position of the `index`-th letter
    pub fn position(&self, index: usize) -> (usize, usize) {
        match self.orientation {
            Orientation::Across => (self.start_row, self.start_col + index),
            Orientation::Down => (self.start_row + index, self.start_col),
        }
    }

    pub fn positions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.len()).map(|i| self.position(i))
    }

    pub(crate) fn set_owner(&mut self, owner: Option<PlayerId>) {
        self.owner = owner;
    }

    pub(crate) fn confirm(&mut self) {
        self.confirmed = true;
    }

    fn summary(&self) -> WordSummary {
        WordSummary {
            row: self.start_row,
            col: self.start_col,
            orientation: self.orientation,
            id: self.id,
            owner: self.owner.clone(),
            confirmed: self.confirmed,
            hint: self.hint.clone(),
        }
    }
}

/// One square of the grid
#[derive(Debug, Clone)]
pub struct Cell {
    row: usize,
    col: usize,
    present: bool,
    value: Option<char>,
    across: Option<usize>,
    down: Option<usize>,
}

impl Cell {
    fn absent(row: usize, col: usize) -> Self {
        Cell {
            row,
            col,
            present: false,
            value: None,
            across: None,
            down: None,
        }
    }

    pub fn position(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    /// Current letter; always None for absent cells
    pub fn value(&self) -> Option<char> {
        if self.present {
            self.value
        } else {
            None
        }
    }

    /// Indices of the words covering this cell
    pub fn words(&self) -> impl Iterator<Item = usize> {
        self.across.into_iter().chain(self.down)
    }

    pub fn is_covered_by(&self, word: usize) -> bool {
        self.across == Some(word) || self.down == Some(word)
    }

    /// The word running the other way through this cell, if any
    pub fn crossing(&self, word: usize) -> Option<usize> {
        self.words().find(|&w| w != word)
    }

    fn attach(&mut self, word: usize, orientation: Orientation) {
        self.present = true;
        match orientation {
            Orientation::Across => self.across = Some(word),
            Orientation::Down => self.down = Some(word),
        }
    }

    /// Writes (or with None, clears) the letter on behalf of `player`
    ///
    /// Only succeeds when `word` covers this cell, is owned by `player` and is
    /// not confirmed. A refused change leaves the cell untouched.
    pub fn change_value(
        &mut self,
        value: Option<char>,
        word: usize,
        words: &[WordEntry],
        player: &PlayerId,
    ) -> bool {
        if !self.is_covered_by(word) {
            return false;
        }
        let Some(entry) = words.get(word) else {
            return false;
        };
        if !entry.is_owned_by(player) || entry.is_confirmed() {
            return false;
        }
        self.value = value;
        true
    }

    pub fn render(&self) -> char {
        match (self.present, self.value) {
            (false, _) => ABSENT,
            (true, None) => EMPTY,
            (true, Some(c)) => c,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
    words: Vec<WordEntry>,
}

impl Board {
    /// Lays validated placements out on a grid just large enough to hold them
    ///
    /// Words get ids 1, 2, 3... in placement order.
    pub fn new(placements: &[Placement]) -> Self {
        let words: Vec<WordEntry> = placements
            .iter()
            .enumerate()
            .map(|(i, p)| WordEntry::new(i as u32 + 1, p))
            .collect();

        let rows = words.iter().map(|w| w.row_upper_bound() + 1).max().unwrap_or(0);
        let cols = words.iter().map(|w| w.col_upper_bound() + 1).max().unwrap_or(0);

        let mut cells: Vec<Cell> = (0..rows * cols)
            .map(|i| Cell::absent(i / cols, i % cols))
            .collect();

        for (index, word) in words.iter().enumerate() {
            for (row, col) in word.positions() {
                cells[row * cols + col].attach(index, word.orientation());
            }
        }

        Board {
            rows,
            cols,
            cells,
            words,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    pub fn words(&self) -> &[WordEntry] {
        &self.words
    }

    pub fn word(&self, index: usize) -> &WordEntry {
        &self.words[index]
    }

    pub(crate) fn word_mut(&mut self, index: usize) -> &mut WordEntry {
        &mut self.words[index]
    }

    /// Index into [`Board::words`] of the word with the given public id
    pub fn word_index(&self, id: u32) -> Option<usize> {
        self.words.iter().position(|w| w.id == id)
    }

    pub fn letter_at(&self, row: usize, col: usize) -> Option<char> {
        self.cell(row, col).and_then(Cell::value)
    }

    /// Letters currently shown along a word
    pub fn current(&self, index: usize) -> Vec<Option<char>> {
        self.words[index]
            .positions()
            .map(|(row, col)| self.letter_at(row, col))
            .collect()
    }

    /// True when every letter of the word is filled in and matches its solution
    pub fn is_correct(&self, index: usize) -> bool {
        let word = &self.words[index];
        word.positions()
            .zip(word.solution())
            .all(|((row, col), &expected)| self.letter_at(row, col) == Some(expected))
    }

    /// `(letter index, crossing word index)` for every cell of a word that
    /// another word also covers
    pub fn crossings(&self, index: usize) -> Vec<(usize, usize)> {
        self.words[index]
            .positions()
            .enumerate()
            .filter_map(|(i, (row, col))| {
                self.cell(row, col)
                    .and_then(|cell| cell.crossing(index))
                    .map(|other| (i, other))
            })
            .collect()
    }

    /// Writes `letters` along a word through the ownership gate
    ///
    /// Returns false if any cell refused the change.
    pub fn fill(&mut self, index: usize, player: &PlayerId, letters: &[char]) -> bool {
        let positions: Vec<(usize, usize)> = self.words[index].positions().collect();
        let mut all_written = positions.len() == letters.len();
        for ((row, col), &letter) in positions.into_iter().zip(letters) {
            let cell = &mut self.cells[row * self.cols + col];
            all_written &= cell.change_value(Some(letter), index, &self.words, player);
        }
        all_written
    }

    /// Clears a word's letters through the ownership gate
    ///
    /// Cells that a crossing word still holds (owned or confirmed) keep their
    /// letter. Returns the number of cells cleared.
    pub fn clear(&mut self, index: usize, player: &PlayerId) -> usize {
        let positions: Vec<(usize, usize)> = self.words[index].positions().collect();
        let mut cleared = 0;
        for (row, col) in positions {
            let cell = &mut self.cells[row * self.cols + col];
            let held_elsewhere = cell.crossing(index).is_some_and(|other| {
                let other = &self.words[other];
                other.is_confirmed() || other.owner().is_some()
            });
            if !held_elsewhere && cell.change_value(None, index, &self.words, player) {
                cleared += 1;
            }
        }
        cleared
    }

    /// One string per row: `#` absent, `?` empty, otherwise the letter
    pub fn render_grid(&self) -> Vec<String> {
        self.cells
            .chunks(self.cols.max(1))
            .take(self.rows)
            .map(|row| row.iter().map(Cell::render).collect())
            .collect()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            rows: self.rows,
            cols: self.cols,
            grid: self.render_grid(),
            words: self.words.iter().map(WordEntry::summary).collect(),
        }
    }
}
