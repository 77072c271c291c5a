use std::{cmp::Reverse, fmt};

use arrayvec::ArrayVec;
use rand::Rng;

use crate::{GameOverError, PlacementError};

use super::{
    FLOOR_ROW, MAX_GENERATED_WIDTH, PLAYABLE_HEIGHT, PREVIEW_ROW, WIDTH,
    grid::Grid,
    piece::{Piece, PieceId},
};

/// Number of placement attempts when a board is generated: `8..=12`.
const INITIAL_PIECE_ATTEMPTS: std::ops::RangeInclusive<usize> = 8..=12;
/// Rows the initial pieces are scattered over before settling.
const INITIAL_ROWS: std::ops::RangeInclusive<usize> = 5..=FLOOR_ROW;
/// Number of pieces requested for each new preview row: `2..=4`.
const PREVIEW_PIECES: std::ops::RangeInclusive<usize> = 2..=4;
/// Column attempts per preview piece before it is skipped.
const PREVIEW_PLACEMENT_ATTEMPTS: usize = 20;

/// Vertical movement of one piece during gravity settling.
///
/// Observers use this to animate pieces between their old and new rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceFall {
    pub id: PieceId,
    pub from_row: usize,
    pub to_row: usize,
}

/// Result of clearing a batch of rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineClear {
    /// Pieces removed from the cleared rows.
    pub removed: Vec<Piece>,
    /// Falls caused by the settle that follows the removal.
    pub falls: Vec<PieceFall>,
}

/// The puzzle board: an arena of pieces plus the occupancy grid.
///
/// Pieces are stored by [`PieceId`] in creation order. The board keeps the
/// [`Grid`] in sync with every mutation, so cell lookups are constant time.
///
/// # Example
///
/// ```
/// use slidris_engine::Board;
///
/// let mut board = Board::from_spans([(0, 2, 4), (4, 9, 4), (0, 9, 4)]).unwrap();
/// board.settle();
///
/// // the floating piece fell onto the full floor row
/// assert!(board.block_at(0, 8).is_some());
/// assert_eq!(board.complete_lines().as_slice(), &[9]);
///
/// board.clear_lines(&[9]);
/// assert_eq!(board.len(), 1);
/// assert!(board.block_at(0, 9).is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Board {
    arena: Vec<Option<Piece>>,
    live: Vec<PieceId>,
    grid: Grid,
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

impl Board {
    /// Creates a board without any pieces.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            arena: vec![],
            live: vec![],
            grid: Grid::EMPTY,
        }
    }

    /// Generates a fresh starting board.
    ///
    /// Scatters 8 to 12 random pieces over the lower half, skipping any that
    /// collide, settles them, and fills the preview row.
    pub fn generate<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut board = Self::empty();
        let attempts = rng.random_range(INITIAL_PIECE_ATTEMPTS);
        for _ in 0..attempts {
            let width = rng.random_range(1..=MAX_GENERATED_WIDTH);
            let x = rng.random_range(0..=WIDTH - width);
            let y = rng.random_range(INITIAL_ROWS);
            if board.grid.can_place(x, y, width) {
                board.insert(x, y, width);
            }
        }
        board.settle();
        board.generate_preview(rng);
        board
    }

    /// Builds a board from `(x, y, width)` spans without settling them.
    pub fn from_spans<I>(spans: I) -> Result<Self, PlacementError>
    where
        I: IntoIterator<Item = (usize, usize, usize)>,
    {
        let mut board = Self::empty();
        for (x, y, width) in spans {
            board.add_piece(x, y, width)?;
        }
        Ok(board)
    }

    /// Adds a piece at the given position after validating it.
    pub fn add_piece(
        &mut self,
        x: usize,
        y: usize,
        width: usize,
    ) -> Result<PieceId, PlacementError> {
        if !(1..=WIDTH).contains(&width) {
            return Err(PlacementError::InvalidWidth);
        }
        if !Grid::is_in_bounds(x, y, width) {
            return Err(PlacementError::OutOfBounds);
        }
        if !self.grid.can_place(x, y, width) {
            return Err(PlacementError::Collision);
        }
        Ok(self.insert(x, y, width))
    }

    fn insert(&mut self, x: usize, y: usize, width: usize) -> PieceId {
        let index = u32::try_from(self.arena.len()).expect("piece ids fit in u32");
        let id = PieceId::new(index);
        let piece = Piece::new(id, x, y, width);
        self.grid.fill(&piece);
        self.arena.push(Some(piece));
        self.live.push(id);
        id
    }

    /// Removes a piece from the board, returning it if it was present.
    pub fn remove_piece(&mut self, id: PieceId) -> Option<Piece> {
        let piece = self.arena.get_mut(id.index())?.take()?;
        self.grid.erase(&piece);
        self.live.retain(|live| *live != id);
        Some(piece)
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.arena.get(id.index())?.as_ref()
    }

    /// Number of live pieces, preview row included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Iterates over live pieces in creation order.
    pub fn pieces(&self) -> impl Iterator<Item = &Piece> + '_ {
        self.live.iter().filter_map(|id| self.piece(*id))
    }

    /// Pieces in rows `0..PLAYABLE_HEIGHT`.
    pub fn playable_pieces(&self) -> impl Iterator<Item = &Piece> + '_ {
        self.pieces().filter(|p| p.is_playable())
    }

    /// Pieces waiting in the preview row.
    pub fn preview_pieces(&self) -> impl Iterator<Item = &Piece> + '_ {
        self.pieces().filter(|p| p.is_preview())
    }

    /// Returns the piece covering `(col, row)`.
    #[must_use]
    pub fn block_at(&self, col: usize, row: usize) -> Option<&Piece> {
        self.piece(self.grid.block_at(col, row)?)
    }

    #[must_use]
    pub fn can_place(&self, col: usize, row: usize, width: usize) -> bool {
        self.grid.can_place(col, row, width)
    }

    /// Checks whether the piece may slide to `new_col` within its row.
    ///
    /// The shifted span must stay on the board and every cell it covers must
    /// be empty or already owned by the piece itself.
    #[must_use]
    pub fn can_move(&self, id: PieceId, new_col: usize) -> bool {
        self.piece(id)
            .is_some_and(|p| self.grid.can_place_as(id, new_col, p.y(), p.width()))
    }

    /// Slides a piece to `new_col`.
    ///
    /// The caller is expected to have checked [`Self::can_move`].
    pub fn move_piece(&mut self, id: PieceId, new_col: usize) {
        debug_assert!(self.can_move(id, new_col));
        self.relocate(id, |piece| piece.set_x(new_col));
    }

    fn relocate<F>(&mut self, id: PieceId, f: F)
    where
        F: FnOnce(&mut Piece),
    {
        let Some(Some(piece)) = self.arena.get_mut(id.index()) else {
            return;
        };
        self.grid.erase(piece);
        f(piece);
        self.grid.fill(piece);
    }

    /// Drops a single piece as far as the rows below allow, never past
    /// [`FLOOR_ROW`]. Returns `true` if the piece moved.
    pub fn drop_piece(&mut self, id: PieceId) -> bool {
        let Some(piece) = self.piece(id).copied() else {
            return false;
        };
        let mut target = piece.y();
        while target < FLOOR_ROW
            && self
                .grid
                .can_place_as(id, piece.x(), target + 1, piece.width())
        {
            target += 1;
        }
        if target == piece.y() {
            return false;
        }
        self.relocate(id, |piece| piece.set_y(target));
        true
    }

    /// Runs gravity to a fixed point.
    ///
    /// Each pass visits playable pieces bottom-first and drops them; passes
    /// repeat until nothing moves. Returns one entry per piece that ended up
    /// lower than it started.
    pub fn settle(&mut self) -> Vec<PieceFall> {
        let mut falls: Vec<PieceFall> = vec![];
        loop {
            let mut order: Vec<(PieceId, usize)> =
                self.playable_pieces().map(|p| (p.id(), p.y())).collect();
            order.sort_by_key(|(_, y)| Reverse(*y));

            let mut moved = false;
            for (id, from_row) in order {
                if !self.drop_piece(id) {
                    continue;
                }
                moved = true;
                let to_row = self.piece(id).map_or(from_row, Piece::y);
                match falls.iter_mut().find(|fall| fall.id == id) {
                    Some(fall) => fall.to_row = to_row,
                    None => falls.push(PieceFall {
                        id,
                        from_row,
                        to_row,
                    }),
                }
            }
            if !moved {
                return falls;
            }
        }
    }

    /// Checks the resting invariant: every playable piece is on the floor or
    /// has something directly below its span.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.playable_pieces().all(|p| {
            p.y() == FLOOR_ROW || !self.grid.can_place_as(p.id(), p.x(), p.y() + 1, p.width())
        })
    }

    /// Playable rows whose every column is covered, in ascending order.
    #[must_use]
    pub fn complete_lines(&self) -> ArrayVec<usize, PLAYABLE_HEIGHT> {
        (0..PLAYABLE_HEIGHT)
            .filter(|row| self.grid.is_row_full(*row))
            .collect()
    }

    /// Removes every piece on the given rows as one batch, then settles.
    ///
    /// Row order and duplicates do not matter. Rows outside the playable area
    /// are ignored.
    pub fn clear_lines(&mut self, rows: &[usize]) -> LineClear {
        let doomed: Vec<PieceId> = self
            .playable_pieces()
            .filter(|p| rows.contains(&p.y()))
            .map(Piece::id)
            .collect();
        if doomed.is_empty() {
            return LineClear::default();
        }
        let removed = doomed
            .into_iter()
            .filter_map(|id| self.remove_piece(id))
            .collect();
        let falls = self.settle();
        LineClear { removed, falls }
    }

    /// Checks whether a raise would push a piece off the top.
    #[must_use]
    pub fn is_topped_out(&self) -> bool {
        self.grid.filled_count(0) > 0
    }

    /// Shifts every playable piece up one row, promotes the preview row to
    /// the floor, and generates a new preview row.
    ///
    /// Fails without touching the board when a piece already sits on row 0.
    pub fn raise<R>(&mut self, rng: &mut R) -> Result<(), GameOverError>
    where
        R: Rng + ?Sized,
    {
        if self.is_topped_out() {
            return Err(GameOverError);
        }
        for id in &self.live {
            if let Some(Some(piece)) = self.arena.get(id.index()) {
                self.grid.erase(piece);
            }
        }
        for id in &self.live {
            if let Some(Some(piece)) = self.arena.get_mut(id.index()) {
                let y = if piece.is_preview() {
                    FLOOR_ROW
                } else {
                    piece.y() - 1
                };
                piece.set_y(y);
                self.grid.fill(piece);
            }
        }
        self.generate_preview(rng);
        Ok(())
    }

    /// Replaces the preview row with freshly generated pieces.
    pub fn regenerate_preview<R>(&mut self, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let stale: Vec<PieceId> = self.preview_pieces().map(Piece::id).collect();
        for id in stale {
            self.remove_piece(id);
        }
        self.generate_preview(rng);
    }

    fn generate_preview<R>(&mut self, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let count = rng.random_range(PREVIEW_PIECES);
        for _ in 0..count {
            let width = rng.random_range(1..=MAX_GENERATED_WIDTH);
            for _ in 0..PREVIEW_PLACEMENT_ATTEMPTS {
                let x = rng.random_range(0..=WIDTH - width);
                if self.grid.can_place(x, PREVIEW_ROW, width) {
                    self.insert(x, PREVIEW_ROW, width);
                    break;
                }
            }
        }
    }
}

/// Draws the board as text, one line per row, with the preview row below a
/// separator. Each covered cell shows its piece's width.
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, cells) in self.grid.rows().enumerate() {
            if row == PREVIEW_ROW {
                writeln!(f, "+{}+", "-".repeat(WIDTH))?;
            }
            write!(f, "|")?;
            for cell in cells {
                match cell.and_then(|id| self.piece(id)) {
                    Some(piece) => write!(f, "{}", piece.width())?,
                    None => write!(f, ".")?,
                }
            }
            writeln!(f, "|")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn rng(seed: u8) -> Pcg32 {
        Pcg32::from_seed([seed; 16])
    }

    fn spans(board: &Board) -> Vec<(usize, usize, usize)> {
        let mut spans: Vec<_> = board
            .pieces()
            .map(|p| (p.x(), p.y(), p.width()))
            .collect();
        spans.sort_unstable();
        spans
    }

    #[test]
    fn test_add_piece_validation() {
        let mut board = Board::empty();
        assert_eq!(board.add_piece(0, 0, 0), Err(PlacementError::InvalidWidth));
        assert_eq!(board.add_piece(0, 0, 9), Err(PlacementError::InvalidWidth));
        assert_eq!(board.add_piece(6, 0, 3), Err(PlacementError::OutOfBounds));
        assert_eq!(
            board.add_piece(0, PREVIEW_ROW + 1, 1),
            Err(PlacementError::OutOfBounds)
        );
        let id = board.add_piece(2, 3, 2).unwrap();
        assert_eq!(board.add_piece(3, 3, 1), Err(PlacementError::Collision));
        assert_eq!(board.block_at(3, 3).map(Piece::id), Some(id));
    }

    #[test]
    fn test_ids_are_stable_after_removal() {
        let mut board = Board::from_spans([(0, 9, 1), (1, 9, 1), (2, 9, 1)]).unwrap();
        let ids: Vec<_> = board.pieces().map(Piece::id).collect();
        board.remove_piece(ids[1]).unwrap();
        assert!(board.piece(ids[1]).is_none());
        assert_eq!(board.piece(ids[2]).map(Piece::x), Some(2));
        assert!(board.remove_piece(ids[1]).is_none());
        let new_id = board.add_piece(1, 9, 1).unwrap();
        assert_ne!(new_id, ids[1]);
    }

    #[test]
    fn test_can_move_and_move() {
        let mut board = Board::from_spans([(0, 9, 3), (5, 9, 2)]).unwrap();
        let a = board.block_at(0, 9).unwrap().id();
        assert!(board.can_move(a, 1));
        assert!(board.can_move(a, 2));
        assert!(!board.can_move(a, 3));
        assert!(!board.can_move(a, 6));
        board.move_piece(a, 2);
        assert_eq!(board.block_at(4, 9).map(Piece::id), Some(a));
        assert!(board.block_at(0, 9).is_none());
    }

    #[test]
    fn test_drop_stops_at_floor_not_preview() {
        let mut board = Board::from_spans([(0, 0, 2), (0, PREVIEW_ROW, 4)]).unwrap();
        let top = board.block_at(0, 0).unwrap().id();
        assert!(board.drop_piece(top));
        assert_eq!(board.piece(top).map(Piece::y), Some(FLOOR_ROW));
        let preview = board.block_at(0, PREVIEW_ROW).unwrap().id();
        assert!(!board.drop_piece(preview));
    }

    #[test]
    fn test_settle_stacks_pieces() {
        let mut board = Board::from_spans([(0, 1, 2), (1, 3, 3), (0, 9, 1)]).unwrap();
        let falls = board.settle();
        assert!(board.is_settled());
        assert_eq!(spans(&board), vec![(0, 8, 2), (0, 9, 1), (1, 9, 3)]);
        assert_eq!(falls.len(), 2);
        let upper = falls.iter().find(|f| f.from_row == 1).unwrap();
        assert_eq!(upper.to_row, 8);
    }

    #[test]
    fn test_settle_cascades_to_fixed_point() {
        // the lower piece only frees the upper one once it has fallen itself
        let mut board = Board::from_spans([(2, 2, 2), (0, 4, 4), (0, 8, 4)]).unwrap();
        board.settle();
        assert_eq!(spans(&board), vec![(0, 8, 4), (0, 9, 4), (2, 7, 2)]);
        assert!(board.is_settled());
    }

    #[test]
    fn test_complete_lines_ignores_preview_row() {
        let board = Board::from_spans([
            (0, 9, 4),
            (4, 9, 4),
            (0, 7, 4),
            (4, 7, 4),
            (0, PREVIEW_ROW, 4),
            (4, PREVIEW_ROW, 4),
        ])
        .unwrap();
        assert_eq!(board.complete_lines().as_slice(), &[7, 9]);
    }

    #[test]
    fn test_full_row_piece_is_cleared_and_stack_drops() {
        let mut board = Board::from_spans([(0, 9, WIDTH), (0, 8, 2), (3, 7, 1)]).unwrap();
        assert_eq!(board.complete_lines().as_slice(), &[9]);
        let clear = board.clear_lines(&[9]);
        assert_eq!(clear.removed.len(), 1);
        assert_eq!(clear.removed[0].width(), WIDTH);
        assert_eq!(spans(&board), vec![(0, 9, 2), (3, 9, 1)]);
    }

    #[test]
    fn test_clear_top_row_piece() {
        let mut board = Board::from_spans([(0, 0, WIDTH), (0, 9, 1)]).unwrap();
        assert_eq!(board.complete_lines().as_slice(), &[0]);
        board.clear_lines(&[0]);
        assert_eq!(spans(&board), vec![(0, 9, 1)]);
    }

    #[test]
    fn test_clear_removes_only_pieces_on_rows() {
        let mut board = Board::from_spans([
            (0, 9, 4),
            (4, 9, 4),
            (0, 8, 3),
            (5, PREVIEW_ROW, 3),
        ])
        .unwrap();
        let clear = board.clear_lines(&[9]);
        assert_eq!(clear.removed.len(), 2);
        assert_eq!(spans(&board), vec![(0, 9, 3), (5, PREVIEW_ROW, 3)]);
    }

    #[test]
    fn test_clear_batch_is_order_independent() {
        let layout = [
            (0, 9, 4),
            (4, 9, 4),
            (0, 8, 4),
            (4, 8, 4),
            (1, 7, 2),
            (6, 6, 1),
        ];
        let mut forward = Board::from_spans(layout).unwrap();
        let mut backward = Board::from_spans(layout).unwrap();
        forward.settle();
        backward.settle();
        forward.clear_lines(&[8, 9]);
        backward.clear_lines(&[9, 8, 9]);
        assert_eq!(spans(&forward), spans(&backward));
        assert_eq!(spans(&forward), vec![(1, 9, 2), (6, 9, 1)]);
    }

    #[test]
    fn test_raise_shifts_and_promotes_preview() {
        let mut board = Board::from_spans([(0, 9, 2), (3, 8, 1), (4, PREVIEW_ROW, 4)]).unwrap();
        board.raise(&mut rng(1)).unwrap();
        let playable: Vec<_> = {
            let mut v: Vec<_> = board
                .playable_pieces()
                .map(|p| (p.x(), p.y(), p.width()))
                .collect();
            v.sort_unstable();
            v
        };
        assert_eq!(playable, vec![(0, 8, 2), (3, 7, 1), (4, 9, 4)]);
        let preview = board.preview_pieces().count();
        assert!((1..=4).contains(&preview));
        assert!(board.preview_pieces().all(|p| p.y() == PREVIEW_ROW));
    }

    #[test]
    fn test_raise_rejected_when_top_row_occupied() {
        let mut board = Board::from_spans([(3, 0, 1), (3, 9, 1), (0, PREVIEW_ROW, 2)]).unwrap();
        let before = spans(&board);
        assert_eq!(board.raise(&mut rng(2)), Err(GameOverError));
        assert_eq!(spans(&board), before);
    }

    #[test]
    fn test_raise_allowed_when_only_lower_rows_occupied() {
        let mut board = Board::from_spans([(3, 1, 1)]).unwrap();
        assert!(board.raise(&mut rng(3)).is_ok());
        assert!(board.block_at(3, 0).is_some());
    }

    #[test]
    fn test_regenerate_preview_replaces_row() {
        let mut board = Board::from_spans([(0, PREVIEW_ROW, 4), (0, 9, 1)]).unwrap();
        let old = board.block_at(0, PREVIEW_ROW).unwrap().id();
        board.regenerate_preview(&mut rng(4));
        assert!(board.piece(old).is_none());
        let count = board.preview_pieces().count();
        assert!((1..=4).contains(&count));
        assert_eq!(board.playable_pieces().count(), 1);
    }

    #[test]
    fn test_generate_is_settled_and_deterministic() {
        for seed in 0..32 {
            let board = Board::generate(&mut rng(seed));
            assert!(board.is_settled());
            assert!(board.playable_pieces().count() <= 12);
            assert!(board.preview_pieces().count() <= 4);
            assert!(
                board
                    .pieces()
                    .all(|p| (1..=MAX_GENERATED_WIDTH).contains(&p.width()))
            );
            let again = Board::generate(&mut rng(seed));
            assert_eq!(spans(&board), spans(&again));
        }
    }

    #[test]
    fn test_display() {
        let board = Board::from_spans([(0, 9, 3), (6, PREVIEW_ROW, 2)]).unwrap();
        let text = board.to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), PLAYABLE_HEIGHT + 2);
        assert_eq!(lines[0], "|........|");
        assert_eq!(lines[9], "|333.....|");
        assert_eq!(lines[10], "+--------+");
        assert_eq!(lines[11], "|......22|");
    }

    fn arb_board() -> impl Strategy<Value = Board> {
        prop::collection::vec((0..WIDTH, 0..=PREVIEW_ROW, 1..=MAX_GENERATED_WIDTH), 0..30).prop_map(
            |spans| {
                let mut board = Board::empty();
                for (x, y, width) in spans {
                    // collisions and overhangs are skipped like in generation
                    let _ = board.add_piece(x, y, width);
                }
                board
            },
        )
    }

    proptest! {
        #[test]
        fn prop_settle_reaches_resting_state(mut board in arb_board()) {
            board.settle();
            prop_assert!(board.is_settled());
        }

        #[test]
        fn prop_settle_is_idempotent(mut board in arb_board()) {
            board.settle();
            let once = spans(&board);
            let falls = board.settle();
            prop_assert!(falls.is_empty());
            prop_assert_eq!(spans(&board), once);
        }

        #[test]
        fn prop_settle_keeps_preview_row(mut board in arb_board()) {
            let preview: Vec<_> = board.preview_pieces().map(|p| (p.id(), p.x())).collect();
            board.settle();
            let after: Vec<_> = board.preview_pieces().map(|p| (p.id(), p.x())).collect();
            prop_assert_eq!(preview, after);
        }

        #[test]
        fn prop_raise_rejected_iff_top_row_occupied(board in arb_board(), seed in any::<u8>()) {
            let mut raised = board.clone();
            let topped = board.playable_pieces().any(|p| p.y() == 0);
            let result = raised.raise(&mut rng(seed));
            prop_assert_eq!(result.is_err(), topped);
            if topped {
                prop_assert_eq!(spans(&raised), spans(&board));
            }
        }
    }
}
