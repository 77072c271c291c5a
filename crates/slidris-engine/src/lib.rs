//! Board and turn simulation for the sliding block puzzle.
//!
//! The puzzle is played on an 8-column grid with 10 playable rows and one
//! hidden preview row underneath. Each turn the player picks a horizontal
//! piece, slides it left or right, and confirms. Gravity then settles the
//! board, full rows are cleared for points, and the whole stack is raised by
//! one row while the preview row becomes visible. A raise with a piece
//! already on the top row ends the game.
//!
//! - [`core`] - grid occupancy, pieces and the board mechanics
//! - [`engine`] - turn resolution, statistics and game sessions

pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum PlacementError {
    #[display("piece span is out of the board bounds")]
    OutOfBounds,
    #[display("piece width must be between 1 and the board width")]
    InvalidWidth,
    #[display("piece span overlaps an existing piece")]
    Collision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("stack reached the top row, raise rejected")]
pub struct GameOverError;
