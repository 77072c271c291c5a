use std::fmt;

use serde::{Deserialize, Serialize};

use super::{MAX_GENERATED_WIDTH, PLAYABLE_HEIGHT, PREVIEW_ROW};

/// Stable identity of a piece within one board.
///
/// Ids are handed out in creation order and never reused, so a removed
/// piece's id simply stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PieceId(u32);

impl PieceId {
    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A horizontal block occupying `width` consecutive cells of one row.
///
/// # Example
///
/// ```
/// use slidris_engine::Board;
///
/// let mut board = Board::empty();
/// let id = board.add_piece(2, 9, 3).unwrap();
/// let piece = board.piece(id).unwrap();
///
/// assert!(piece.occupies(4, 9));
/// assert!(!piece.occupies(5, 9));
/// assert_eq!(piece.columns(), 2..5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    id: PieceId,
    x: u8,
    y: u8,
    width: u8,
}

impl Piece {
    pub(crate) fn new(id: PieceId, x: usize, y: usize, width: usize) -> Self {
        Self {
            id,
            x: narrow(x),
            y: narrow(y),
            width: narrow(width),
        }
    }

    #[must_use]
    pub fn id(&self) -> PieceId {
        self.id
    }

    /// Leftmost column.
    #[must_use]
    pub fn x(&self) -> usize {
        usize::from(self.x)
    }

    #[must_use]
    pub fn y(&self) -> usize {
        usize::from(self.y)
    }

    #[must_use]
    pub fn width(&self) -> usize {
        usize::from(self.width)
    }

    /// Columns covered by this piece, as a half-open range.
    #[must_use]
    pub fn columns(&self) -> std::ops::Range<usize> {
        self.x()..self.x() + self.width()
    }

    #[must_use]
    pub fn occupies(&self, col: usize, row: usize) -> bool {
        self.y() == row && self.columns().contains(&col)
    }

    #[must_use]
    pub fn is_playable(&self) -> bool {
        self.y() < PLAYABLE_HEIGHT
    }

    #[must_use]
    pub fn is_preview(&self) -> bool {
        self.y() == PREVIEW_ROW
    }

    /// Feature value used by the agent codec: `width / 4`.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn weight(&self) -> f32 {
        self.width() as f32 / MAX_GENERATED_WIDTH as f32
    }

    pub(crate) fn set_x(&mut self, x: usize) {
        self.x = narrow(x);
    }

    pub(crate) fn set_y(&mut self, y: usize) {
        self.y = narrow(y);
    }
}

fn narrow(value: usize) -> u8 {
    u8::try_from(value).expect("board coordinates fit in u8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupies_only_its_span() {
        let piece = Piece::new(PieceId::new(0), 3, 4, 2);
        assert!(!piece.occupies(2, 4));
        assert!(piece.occupies(3, 4));
        assert!(piece.occupies(4, 4));
        assert!(!piece.occupies(5, 4));
        assert!(!piece.occupies(3, 5));
    }

    #[test]
    fn test_weight_scales_with_width() {
        for (width, expected) in [(1, 0.25), (2, 0.5), (3, 0.75), (4, 1.0)] {
            let piece = Piece::new(PieceId::new(0), 0, 0, width);
            assert!((piece.weight() - expected).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_playable_and_preview_rows() {
        let top = Piece::new(PieceId::new(0), 0, 0, 1);
        let floor = Piece::new(PieceId::new(1), 0, PLAYABLE_HEIGHT - 1, 1);
        let preview = Piece::new(PieceId::new(2), 0, PREVIEW_ROW, 1);
        assert!(top.is_playable() && !top.is_preview());
        assert!(floor.is_playable());
        assert!(!preview.is_playable() && preview.is_preview());
    }

    #[test]
    fn test_id_display() {
        assert_eq!(PieceId::new(12).to_string(), "#12");
    }
}
