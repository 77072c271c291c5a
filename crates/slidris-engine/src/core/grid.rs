use super::{
    TOTAL_HEIGHT, WIDTH,
    piece::{Piece, PieceId},
};

/// Cell occupancy map of the board, including the preview row.
///
/// Each cell records the id of the piece covering it. The grid answers
/// placement queries; only [`Board`](super::Board) writes to it, and only to
/// mirror changes it has made to its pieces.
///
/// # Example
///
/// ```
/// use slidris_engine::Board;
///
/// let mut board = Board::empty();
/// let id = board.add_piece(0, 9, 4).unwrap();
/// let grid = board.grid();
///
/// assert_eq!(grid.block_at(3, 9), Some(id));
/// assert!(!grid.can_place(2, 9, 3));
/// assert!(grid.can_place(4, 9, 4));
/// assert!(!grid.can_place(5, 9, 4)); // runs past the right edge
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    cells: [[Option<PieceId>; WIDTH]; TOTAL_HEIGHT],
}

impl Default for Grid {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Grid {
    pub const EMPTY: Self = Self {
        cells: [[None; WIDTH]; TOTAL_HEIGHT],
    };

    /// Returns the piece covering `(col, row)`, or `None` for empty or
    /// out-of-bounds cells.
    #[must_use]
    pub fn block_at(&self, col: usize, row: usize) -> Option<PieceId> {
        self.cells.get(row)?.get(col).copied().flatten()
    }

    /// Checks that a span of `width` cells starting at `(col, row)` lies on
    /// the board (preview row included).
    #[must_use]
    pub fn is_in_bounds(col: usize, row: usize, width: usize) -> bool {
        width > 0
            && row < TOTAL_HEIGHT
            && col.checked_add(width).is_some_and(|end| end <= WIDTH)
    }

    /// Checks that the span is on the board and entirely empty.
    #[must_use]
    pub fn can_place(&self, col: usize, row: usize, width: usize) -> bool {
        Self::is_in_bounds(col, row, width)
            && self.cells[row][col..col + width].iter().all(Option::is_none)
    }

    /// Like [`Self::can_place`], but cells already owned by `owner` count as
    /// free.
    #[must_use]
    pub fn can_place_as(&self, owner: PieceId, col: usize, row: usize, width: usize) -> bool {
        Self::is_in_bounds(col, row, width)
            && self.cells[row][col..col + width]
                .iter()
                .all(|cell| cell.is_none_or(|id| id == owner))
    }

    /// Checks whether every column of `row` is covered.
    #[must_use]
    pub fn is_row_full(&self, row: usize) -> bool {
        self.cells
            .get(row)
            .is_some_and(|cells| cells.iter().all(Option::is_some))
    }

    /// Number of covered cells in `row`.
    #[must_use]
    pub fn filled_count(&self, row: usize) -> usize {
        self.cells
            .get(row)
            .map_or(0, |cells| cells.iter().filter(|c| c.is_some()).count())
    }

    /// Iterates over all rows from top to bottom, preview row last.
    pub fn rows(&self) -> impl Iterator<Item = &[Option<PieceId>; WIDTH]> {
        self.cells.iter()
    }

    pub(crate) fn fill(&mut self, piece: &Piece) {
        for col in piece.columns() {
            self.cells[piece.y()][col] = Some(piece.id());
        }
    }

    pub(crate) fn erase(&mut self, piece: &Piece) {
        for col in piece.columns() {
            debug_assert_eq!(self.cells[piece.y()][col], Some(piece.id()));
            self.cells[piece.y()][col] = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::PREVIEW_ROW;

    use super::*;

    fn grid_with(pieces: &[Piece]) -> Grid {
        let mut grid = Grid::EMPTY;
        for piece in pieces {
            grid.fill(piece);
        }
        grid
    }

    #[test]
    fn test_empty_grid() {
        let grid = Grid::EMPTY;
        for row in 0..TOTAL_HEIGHT {
            for col in 0..WIDTH {
                assert_eq!(grid.block_at(col, row), None);
            }
            assert!(!grid.is_row_full(row));
        }
    }

    #[test]
    fn test_block_at_out_of_bounds_is_none() {
        let grid = grid_with(&[Piece::new(PieceId::new(0), 0, 0, 4)]);
        assert_eq!(grid.block_at(WIDTH, 0), None);
        assert_eq!(grid.block_at(0, TOTAL_HEIGHT), None);
    }

    #[test]
    fn test_can_place_bounds() {
        let grid = Grid::EMPTY;
        assert!(grid.can_place(0, 0, 1));
        assert!(grid.can_place(WIDTH - 4, 0, 4));
        assert!(!grid.can_place(WIDTH - 3, 0, 4));
        assert!(grid.can_place(0, PREVIEW_ROW, 4));
        assert!(!grid.can_place(0, PREVIEW_ROW + 1, 1));
        assert!(!grid.can_place(0, 0, 0));
        assert!(!grid.can_place(usize::MAX, 0, 2));
        assert!(!grid.can_place(1, 0, usize::MAX));
        assert!(!grid.can_place_as(PieceId::new(0), usize::MAX, 0, 2));
    }

    #[test]
    fn test_can_place_collision() {
        let grid = grid_with(&[Piece::new(PieceId::new(0), 2, 5, 3)]);
        assert!(!grid.can_place(0, 5, 3));
        assert!(!grid.can_place(4, 5, 1));
        assert!(grid.can_place(5, 5, 3));
        assert!(grid.can_place(0, 5, 2));
        assert!(grid.can_place(2, 4, 3));
    }

    #[test]
    fn test_can_place_as_ignores_owner() {
        let owner = PieceId::new(0);
        let other = PieceId::new(1);
        let grid = grid_with(&[
            Piece::new(owner, 2, 5, 3),
            Piece::new(other, 6, 5, 2),
        ]);
        assert!(grid.can_place_as(owner, 3, 5, 3));
        assert!(!grid.can_place_as(owner, 4, 5, 3));
        assert!(!grid.can_place_as(other, 3, 5, 3));
    }

    #[test]
    fn test_fill_and_erase() {
        let piece = Piece::new(PieceId::new(3), 1, 2, 2);
        let mut grid = grid_with(&[piece]);
        assert_eq!(grid.filled_count(2), 2);
        grid.erase(&piece);
        assert_eq!(grid, Grid::EMPTY);
    }

    #[test]
    fn test_row_full() {
        let grid = grid_with(&[
            Piece::new(PieceId::new(0), 0, 7, 4),
            Piece::new(PieceId::new(1), 4, 7, 4),
            Piece::new(PieceId::new(2), 0, 8, 4),
        ]);
        assert!(grid.is_row_full(7));
        assert!(!grid.is_row_full(8));
        assert_eq!(grid.filled_count(8), 4);
    }
}
