//! Translation between boards and agent vectors.
//!
//! # Features
//!
//! One value per cell, row-major over all rows including the preview row:
//! `0` for an empty cell, `width / 4` for a covered one. A width-1 piece
//! reads 0.25 and a width-4 piece reads 1.0.
//!
//! # Outputs
//!
//! Three contiguous segments, each decoded by arg-max:
//!
//! ```text
//! [ source column × WIDTH | source row × (PREVIEW_ROW + 1) | target column × WIDTH ]
//! ```
//!
//! The source row segment covers the preview row too; a decoded preview row
//! never selects anything and the runner falls back to a random piece.
//!
//! # Fitness
//!
//! ```text
//! fitness = max(0, (score + 1) × (successful_moves < 5 ? 0.1 : 1))
//! ```

use slidris_engine::{Board, PREVIEW_ROW, TOTAL_HEIGHT, WIDTH};

/// Length of the feature vector.
pub const FEATURE_LEN: usize = TOTAL_HEIGHT * WIDTH;
/// Number of source-row logits.
pub const SOURCE_ROWS: usize = PREVIEW_ROW + 1;
/// Length of the output vector.
pub const OUTPUT_LEN: usize = WIDTH + SOURCE_ROWS + WIDTH;

/// Runs with fewer successful moves than this are scaled down.
pub const MIN_SUCCESSFUL_MOVES: usize = 5;
/// Scale applied to runs that ended too early.
pub const EARLY_END_FACTOR: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("agent output has {actual} values, expected {expected}")]
pub struct ActionDecodeError {
    pub expected: usize,
    pub actual: usize,
}

/// Encodes the board, preview row included, as agent input.
#[must_use]
pub fn encode_features(board: &Board) -> [f32; FEATURE_LEN] {
    let mut features = [0.0; FEATURE_LEN];
    for (row, cells) in board.grid().rows().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            if let Some(piece) = cell.and_then(|id| board.piece(id)) {
                features[row * WIDTH + col] = piece.weight();
            }
        }
    }
    features
}

/// A decoded agent decision.
///
/// # Example
///
/// ```
/// use slidris_agent::action_codec::{AgentAction, OUTPUT_LEN, SOURCE_ROWS};
/// use slidris_engine::WIDTH;
///
/// let mut output = vec![0.0; OUTPUT_LEN];
/// output[3] = 1.0; // source column 3
/// output[WIDTH + 9] = 1.0; // source row 9
/// output[WIDTH + SOURCE_ROWS + 5] = 1.0; // target column 5
///
/// let action = AgentAction::decode(&output).unwrap();
/// assert_eq!((action.source_col, action.source_row, action.target_col), (3, 9, 5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentAction {
    pub source_col: usize,
    pub source_row: usize,
    pub target_col: usize,
}

impl AgentAction {
    pub fn decode(output: &[f32]) -> Result<Self, ActionDecodeError> {
        if output.len() != OUTPUT_LEN {
            return Err(ActionDecodeError {
                expected: OUTPUT_LEN,
                actual: output.len(),
            });
        }
        let (cols, rest) = output.split_at(WIDTH);
        let (rows, targets) = rest.split_at(SOURCE_ROWS);
        Ok(Self {
            source_col: argmax(cols).unwrap_or(0),
            source_row: argmax(rows).unwrap_or(0),
            target_col: argmax(targets).unwrap_or(0),
        })
    }
}

/// Index of the largest value. The lowest index wins ties and NaN never
/// wins; `None` when no value is a number.
#[must_use]
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, v) in values.iter().copied().enumerate() {
        if v.is_nan() {
            continue;
        }
        if best.is_none_or(|(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

/// Scalar fitness of a finished run.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn fitness(score: u64, successful_moves: usize) -> f32 {
    let mut fitness = score as f32 + 1.0;
    if successful_moves < MIN_SUCCESSFUL_MOVES {
        fitness *= EARLY_END_FACTOR;
    }
    fitness.max(0.0)
}
