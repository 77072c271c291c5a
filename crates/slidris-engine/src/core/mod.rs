//! Grid geometry, pieces and the board.
//!
//! Row 0 is the top of the board. Rows `0..PLAYABLE_HEIGHT` are visible and
//! take part in gravity and line clearing; [`PREVIEW_ROW`] sits below the
//! floor and holds the pieces that enter play on the next raise.

pub use self::{board::*, grid::*, piece::*};

pub(crate) mod board;
pub(crate) mod grid;
pub(crate) mod piece;

/// Number of columns.
pub const WIDTH: usize = 8;
/// Number of visible rows.
pub const PLAYABLE_HEIGHT: usize = 10;
/// Index of the hidden staging row.
pub const PREVIEW_ROW: usize = PLAYABLE_HEIGHT;
/// Lowest playable row; gravity never moves a piece past it.
pub const FLOOR_ROW: usize = PLAYABLE_HEIGHT - 1;
/// Rows including the preview row.
pub const TOTAL_HEIGHT: usize = PLAYABLE_HEIGHT + 1;
/// Widest piece produced by board generation.
pub const MAX_GENERATED_WIDTH: usize = 4;
