use arrayvec::ArrayVec;
use rand::Rng;

use crate::{Board, GameOverError, PLAYABLE_HEIGHT, Piece, PieceFall, PieceId, WIDTH};

use super::GameStats;

/// Phase of the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum TurnState {
    Idle,
    Selected {
        piece: PieceId,
        original_column: usize,
    },
    Resolving,
    GameOver,
}

/// Who is driving the turns.
///
/// Interactive turns must move the selected piece before they can be
/// confirmed. Agent turns may drop a piece in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, derive_more::IsVariant)]
pub enum TurnMode {
    #[default]
    Interactive,
    Agent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    /// Column one step away from `col`, if it is on the board.
    #[must_use]
    pub fn shift(self, col: usize) -> Option<usize> {
        match self {
            Self::Left => col.checked_sub(1),
            Self::Right => col.checked_add(1).filter(|c| *c < WIDTH),
        }
    }
}

/// Reason a turn operation was refused. The resolver and board are left as
/// they were, except where noted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum TurnRejection {
    #[display("the game is over")]
    GameOver,
    #[display("the session is paused")]
    Paused,
    #[display("a turn is being resolved")]
    Busy,
    #[display("no piece there")]
    NoPiece,
    #[display("preview pieces cannot be selected")]
    NotPlayable,
    #[display("no piece is selected")]
    NothingSelected,
    #[display("the piece is already in that column")]
    SameColumn,
    #[display("the piece cannot move there")]
    Blocked,
    /// Interactive confirm of an unmoved piece; the selection is discarded.
    #[display("the selected piece has not moved")]
    NotMoved,
}

/// Step of a turn resolution, reported to a [`TurnObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    Confirmed {
        piece: PieceId,
    },
    Settled {
        falls: Vec<PieceFall>,
    },
    LinesCleared {
        rows: ArrayVec<usize, PLAYABLE_HEIGHT>,
        removed: Vec<Piece>,
        falls: Vec<PieceFall>,
        points: u64,
    },
    Raised,
    GameOver,
}

/// Side-channel for renderers and animations.
///
/// Called with the board as it stands right after each step. The resolver
/// never waits on the observer or reads anything back from it.
pub trait TurnObserver {
    fn on_turn_event(&mut self, board: &Board, event: &TurnEvent);
}

impl TurnObserver for () {
    fn on_turn_event(&mut self, _board: &Board, _event: &TurnEvent) {}
}

/// Summary of one confirmed turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnResolution {
    pub piece: PieceId,
    pub lines_before_raise: usize,
    pub lines_after_raise: usize,
    pub score_delta: u64,
    pub game_over: bool,
}

/// Per-turn state machine: select, slide, confirm.
///
/// The resolver owns only the selection; the board, statistics and random
/// source are passed into each call so that several front ends can share
/// the same rules.
///
/// # Example
///
/// ```
/// use rand::SeedableRng as _;
/// use slidris_engine::{Board, Direction, GameStats, TurnMode, TurnResolver};
///
/// let mut board = Board::from_spans([(0, 9, 3), (4, 9, 4), (2, 8, 1)]).unwrap();
/// let mut stats = GameStats::new();
/// let mut rng = rand_pcg::Pcg32::from_seed([7; 16]);
/// let mut resolver = TurnResolver::new(TurnMode::Interactive);
///
/// resolver.select_at(&board, 2, 8).unwrap();
/// resolver.move_selected(&mut board, Direction::Right).unwrap();
/// let resolution = resolver.confirm(&mut board, &mut stats, &mut rng, &mut ()).unwrap();
///
/// // the piece fell into the gap and completed the floor row
/// assert_eq!(resolution.score_delta, 100);
/// assert!(resolver.state().is_idle());
/// ```
#[derive(Debug, Clone)]
pub struct TurnResolver {
    mode: TurnMode,
    state: TurnState,
}

impl TurnResolver {
    #[must_use]
    pub const fn new(mode: TurnMode) -> Self {
        Self {
            mode,
            state: TurnState::Idle,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> TurnMode {
        self.mode
    }

    #[must_use]
    pub const fn state(&self) -> TurnState {
        self.state
    }

    #[must_use]
    pub const fn selected_piece(&self) -> Option<PieceId> {
        match self.state {
            TurnState::Selected { piece, .. } => Some(piece),
            _ => None,
        }
    }

    fn ensure_open(&self) -> Result<(), TurnRejection> {
        match self.state {
            TurnState::Idle | TurnState::Selected { .. } => Ok(()),
            TurnState::Resolving => Err(TurnRejection::Busy),
            TurnState::GameOver => Err(TurnRejection::GameOver),
        }
    }

    /// Selects a playable piece, replacing any previous selection.
    pub fn select(&mut self, board: &Board, id: PieceId) -> Result<(), TurnRejection> {
        self.ensure_open()?;
        let piece = board.piece(id).ok_or(TurnRejection::NoPiece)?;
        if !piece.is_playable() {
            return Err(TurnRejection::NotPlayable);
        }
        self.state = TurnState::Selected {
            piece: id,
            original_column: piece.x(),
        };
        Ok(())
    }

    /// Selects the piece covering `(col, row)`.
    pub fn select_at(
        &mut self,
        board: &Board,
        col: usize,
        row: usize,
    ) -> Result<PieceId, TurnRejection> {
        self.ensure_open()?;
        let id = board
            .grid()
            .block_at(col, row)
            .ok_or(TurnRejection::NoPiece)?;
        self.select(board, id)?;
        Ok(id)
    }

    /// Discards the current selection, if any.
    pub fn cancel(&mut self) {
        if self.state.is_selected() {
            self.state = TurnState::Idle;
        }
    }

    fn selection(&self, board: &Board) -> Result<(PieceId, usize), TurnRejection> {
        match self.state {
            TurnState::Selected { piece, .. } => board
                .piece(piece)
                .map(|p| (piece, p.x()))
                .ok_or(TurnRejection::NoPiece),
            TurnState::Idle => Err(TurnRejection::NothingSelected),
            TurnState::Resolving => Err(TurnRejection::Busy),
            TurnState::GameOver => Err(TurnRejection::GameOver),
        }
    }

    /// Slides the selected piece one column. Returns the new column.
    pub fn move_selected(
        &self,
        board: &mut Board,
        direction: Direction,
    ) -> Result<usize, TurnRejection> {
        let (_, col) = self.selection(board)?;
        let target = direction.shift(col).ok_or(TurnRejection::Blocked)?;
        self.slide_selected_to(board, target)
    }

    /// Moves the selected piece straight to `col` if the span there is free.
    pub fn slide_selected_to(&self, board: &mut Board, col: usize) -> Result<usize, TurnRejection> {
        let (id, current) = self.selection(board)?;
        if col == current {
            return Err(TurnRejection::SameColumn);
        }
        if !board.can_move(id, col) {
            return Err(TurnRejection::Blocked);
        }
        board.move_piece(id, col);
        Ok(col)
    }

    /// Ends the turn and runs the resolution pipeline.
    ///
    /// Settle, clear and score, raise; then, unless the raise ended the
    /// game, settle, clear and score once more.
    pub fn confirm<R, O>(
        &mut self,
        board: &mut Board,
        stats: &mut GameStats,
        rng: &mut R,
        observer: &mut O,
    ) -> Result<TurnResolution, TurnRejection>
    where
        R: Rng + ?Sized,
        O: TurnObserver + ?Sized,
    {
        let (piece, current) = self.selection(board)?;
        if let TurnState::Selected {
            original_column, ..
        } = self.state
            && self.mode.is_interactive()
            && current == original_column
        {
            self.state = TurnState::Idle;
            return Err(TurnRejection::NotMoved);
        }

        self.state = TurnState::Resolving;
        observer.on_turn_event(board, &TurnEvent::Confirmed { piece });

        let (lines_before_raise, first_points) = settle_and_clear(board, stats, observer);
        let mut resolution = TurnResolution {
            piece,
            lines_before_raise,
            lines_after_raise: 0,
            score_delta: first_points,
            game_over: false,
        };

        match board.raise(rng) {
            Err(GameOverError) => {
                observer.on_turn_event(board, &TurnEvent::GameOver);
                resolution.game_over = true;
                self.state = TurnState::GameOver;
            }
            Ok(()) => {
                observer.on_turn_event(board, &TurnEvent::Raised);
                let (lines, points) = settle_and_clear(board, stats, observer);
                resolution.lines_after_raise = lines;
                resolution.score_delta += points;
                self.state = TurnState::Idle;
            }
        }
        stats.complete_turn();
        Ok(resolution)
    }
}

fn settle_and_clear<O>(board: &mut Board, stats: &mut GameStats, observer: &mut O) -> (usize, u64)
where
    O: TurnObserver + ?Sized,
{
    let falls = board.settle();
    if !falls.is_empty() {
        observer.on_turn_event(board, &TurnEvent::Settled { falls });
    }
    let rows = board.complete_lines();
    if rows.is_empty() {
        return (0, 0);
    }
    let clear = board.clear_lines(&rows);
    let lines = rows.len();
    let points = stats.record_clear(lines);
    observer.on_turn_event(
        board,
        &TurnEvent::LinesCleared {
            rows,
            removed: clear.removed,
            falls: clear.falls,
            points,
        },
    );
    (lines, points)
}
