use rand::{Rng as _, seq::IndexedRandom as _};
use rand_pcg::Pcg32;

use crate::{Board, Piece, PieceId};

use super::{
    BoardSeed, GameStats,
    turn_resolver::{
        Direction, TurnMode, TurnObserver, TurnRejection, TurnResolution, TurnResolver, TurnState,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, derive_more::IsVariant)]
pub enum SessionState {
    Playing,
    Paused,
    GameOver,
}

/// One isolated game: board, statistics, selection and random source.
///
/// Sessions never share state, so any number of them can run side by side
/// on different threads.
///
/// # Example
///
/// ```
/// use slidris_engine::{BoardSeed, GameSession, TurnMode};
///
/// let mut session = GameSession::with_seed(TurnMode::Agent, BoardSeed::from_u64(1));
/// let piece = session.random_playable_piece().unwrap();
/// session.select(piece).unwrap();
/// session.confirm().unwrap();
///
/// assert_eq!(session.stats().turns(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct GameSession {
    seed: BoardSeed,
    board: Board,
    stats: GameStats,
    resolver: TurnResolver,
    rng: Pcg32,
    session_state: SessionState,
}

impl GameSession {
    /// Starts a session on a randomly seeded board.
    #[must_use]
    pub fn new(mode: TurnMode) -> Self {
        Self::with_seed(mode, rand::rng().random())
    }

    /// Starts a session on the board generated from `seed`.
    #[must_use]
    pub fn with_seed(mode: TurnMode, seed: BoardSeed) -> Self {
        let mut rng = seed.rng();
        let board = Board::generate(&mut rng);
        Self::from_parts(mode, seed, board, rng)
    }

    /// Starts a session on a prepared board; `seed` drives later preview rows
    /// and random choices.
    #[must_use]
    pub fn with_board(mode: TurnMode, seed: BoardSeed, board: Board) -> Self {
        Self::from_parts(mode, seed, board, seed.rng())
    }

    fn from_parts(mode: TurnMode, seed: BoardSeed, board: Board, rng: Pcg32) -> Self {
        Self {
            seed,
            board,
            stats: GameStats::new(),
            resolver: TurnResolver::new(mode),
            rng,
            session_state: SessionState::Playing,
        }
    }

    #[must_use]
    pub fn seed(&self) -> BoardSeed {
        self.seed
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    #[must_use]
    pub fn session_state(&self) -> &SessionState {
        &self.session_state
    }

    #[must_use]
    pub fn turn_state(&self) -> TurnState {
        self.resolver.state()
    }

    #[must_use]
    pub fn mode(&self) -> TurnMode {
        self.resolver.mode()
    }

    #[must_use]
    pub fn selected_piece(&self) -> Option<&Piece> {
        self.board.piece(self.resolver.selected_piece()?)
    }

    pub fn toggle_pause(&mut self) {
        self.session_state = match self.session_state {
            SessionState::Playing => SessionState::Paused,
            SessionState::Paused => SessionState::Playing,
            SessionState::GameOver => SessionState::GameOver,
        };
    }

    fn ensure_playing(&self) -> Result<(), TurnRejection> {
        match self.session_state {
            SessionState::Playing => Ok(()),
            SessionState::Paused => Err(TurnRejection::Paused),
            SessionState::GameOver => Err(TurnRejection::GameOver),
        }
    }

    pub fn select(&mut self, id: PieceId) -> Result<(), TurnRejection> {
        self.ensure_playing()?;
        self.resolver.select(&self.board, id)
    }

    pub fn select_at(&mut self, col: usize, row: usize) -> Result<PieceId, TurnRejection> {
        self.ensure_playing()?;
        self.resolver.select_at(&self.board, col, row)
    }

    pub fn move_selected(&mut self, direction: Direction) -> Result<usize, TurnRejection> {
        self.ensure_playing()?;
        self.resolver.move_selected(&mut self.board, direction)
    }

    pub fn slide_selected_to(&mut self, col: usize) -> Result<usize, TurnRejection> {
        self.ensure_playing()?;
        self.resolver.slide_selected_to(&mut self.board, col)
    }

    pub fn cancel(&mut self) {
        self.resolver.cancel();
    }

    pub fn confirm(&mut self) -> Result<TurnResolution, TurnRejection> {
        self.confirm_with(&mut ())
    }

    /// Confirms the turn, reporting each resolution step to `observer`.
    pub fn confirm_with<O>(&mut self, observer: &mut O) -> Result<TurnResolution, TurnRejection>
    where
        O: TurnObserver + ?Sized,
    {
        self.ensure_playing()?;
        let resolution =
            self.resolver
                .confirm(&mut self.board, &mut self.stats, &mut self.rng, observer)?;
        if resolution.game_over {
            self.session_state = SessionState::GameOver;
        }
        Ok(resolution)
    }

    /// Picks a playable piece uniformly at random from the session's own
    /// random source.
    pub fn random_playable_piece(&mut self) -> Option<PieceId> {
        let ids: Vec<PieceId> = self.board.playable_pieces().map(Piece::id).collect();
        ids.choose(&mut self.rng).copied()
    }
}
