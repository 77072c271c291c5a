//! Turn rules and game state on top of the board.
//!
//! - [`TurnResolver`] - select, slide and confirm, with the resolution
//!   pipeline (settle, clear, raise, settle, clear)
//! - [`GameSession`] - one isolated game with its own board and random source
//! - [`GameStats`] - score and line-clear statistics
//! - [`BoardSeed`] - seed for deterministic boards
//!
//! # Turn flow
//!
//! 1. Select a playable piece
//! 2. Slide it left or right (interactive turns must move it)
//! 3. Confirm: gravity settles, full rows clear and score, the stack rises
//!    by one row, and any rows completed by the rise clear and score too
//! 4. A rise with a piece on the top row ends the game

pub use self::{board_seed::*, game_session::*, game_stats::*, turn_resolver::*};

mod board_seed;
mod game_session;
mod game_stats;
mod turn_resolver;
