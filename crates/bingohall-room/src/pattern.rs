//! Winning patterns and the check that a card completes one.

use bingohall_protocol::{CardCell, WinningPattern};

/// A named set of card indices that wins when all are marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern {
    pub name: &'static str,
    pub cells: &'static [usize],
}

impl Pattern {
    const fn new(name: &'static str, cells: &'static [usize]) -> Self {
        Self { name, cells }
    }

    /// The wire form sent with `game_ended`.
    pub fn to_wire(&self) -> WinningPattern {
        WinningPattern {
            name: self.name.to_owned(),
            indices: self.cells.to_vec(),
        }
    }
}

/// Every winning pattern, in the order they are tried.
pub static PATTERNS: [Pattern; 13] = [
    Pattern::new("four_corners", &[0, 4, 20, 24]),
    Pattern::new("row_1", &[0, 1, 2, 3, 4]),
    Pattern::new("row_2", &[5, 6, 7, 8, 9]),
    Pattern::new("row_3", &[10, 11, 12, 13, 14]),
    Pattern::new("row_4", &[15, 16, 17, 18, 19]),
    Pattern::new("row_5", &[20, 21, 22, 23, 24]),
    Pattern::new("column_1", &[0, 5, 10, 15, 20]),
    Pattern::new("column_2", &[1, 6, 11, 16, 21]),
    Pattern::new("column_3", &[2, 7, 12, 17, 22]),
    Pattern::new("column_4", &[3, 8, 13, 18, 23]),
    Pattern::new("column_5", &[4, 9, 14, 19, 24]),
    Pattern::new("diagonal", &[0, 6, 12, 18, 24]),
    Pattern::new("anti_diagonal", &[4, 8, 12, 16, 20]),
];

/// Returns the first pattern in [`PATTERNS`] whose cells are all marked.
///
/// A cell is marked when it is the free centre or its number is in
/// `called`. Cards shorter than 25 cells never win.
pub fn check(card: &[CardCell], called: &[u8]) -> Option<&'static Pattern> {
    if card.len() != 25 {
        return None;
    }
    let marked = |index: usize| match card[index] {
        CardCell::Free => true,
        CardCell::Number(n) => called.contains(&n),
    };
    PATTERNS
        .iter()
        .find(|pattern| pattern.cells.iter().all(|&i| marked(i)))
}

/// `(won, matched_indices)`; the indices are empty when nothing matched.
pub fn is_winning(card: &[CardCell], called: &[u8]) -> (bool, Vec<usize>) {
    match check(card, called) {
        Some(pattern) => (true, pattern.cells.to_vec()),
        None => (false, Vec::new()),
    }
}
