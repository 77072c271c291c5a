//! Headless (or observed) playthroughs under agent control.
//!
//! Each loop iteration encodes the board, asks the agent for an output,
//! decodes it and resolves one agent turn:
//!
//! 1. Select the piece at the decoded cell. Preview-row cells and empty
//!    cells fall back to a uniformly random playable piece.
//! 2. Slide it to the decoded target column. If that is the current column
//!    or the span there is blocked, try one column left, then one right.
//! 3. If nothing moved, cancel the selection and count a failure.
//!    Otherwise confirm the turn and reset the failure counter.
//!
//! The run ends on game over, after `move_limit` iterations, or after
//! `failure_limit` consecutive failures. Hitting a limit is a normal ending
//! and still yields a fitness.

use slidris_engine::{
    Board, BoardSeed, Direction, GameSession, PLAYABLE_HEIGHT, PieceId, TurnEvent, TurnMode,
    TurnObserver,
};

use crate::{
    Agent,
    action_codec::{self, AgentAction},
};

pub const DEFAULT_MOVE_LIMIT: usize = 500;
pub const DEFAULT_FAILURE_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum EndReason {
    GameOver,
    MoveLimit,
    FailureLimit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionOutcome {
    pub score: u64,
    pub successful_moves: usize,
    pub attempts: usize,
    pub cleared_lines: usize,
    pub end_reason: EndReason,
    pub fitness: f32,
}

/// Side-channel for watching a run, e.g. to render a replay.
///
/// All methods default to doing nothing.
pub trait SessionObserver {
    /// Called before each attempted turn with the decoded action.
    fn on_action(&mut self, board: &Board, action: &AgentAction) {
        let _ = (board, action);
    }

    /// Called for every step of a confirmed turn.
    fn on_turn_event(&mut self, board: &Board, event: &TurnEvent) {
        let _ = (board, event);
    }

    /// Called when an attempt fails; `consecutive` includes this one.
    fn on_failure(&mut self, board: &Board, consecutive: usize) {
        let _ = (board, consecutive);
    }
}

impl SessionObserver for () {}

struct ForwardTurnEvents<'a, O: ?Sized>(&'a mut O);

impl<O> TurnObserver for ForwardTurnEvents<'_, O>
where
    O: SessionObserver + ?Sized,
{
    fn on_turn_event(&mut self, board: &Board, event: &TurnEvent) {
        self.0.on_turn_event(board, event);
    }
}

/// Plays agent-controlled games to completion.
///
/// # Example
///
/// ```
/// use slidris_agent::{ConstantAgent, session_runner::SessionRunner};
/// use slidris_engine::BoardSeed;
///
/// let runner = SessionRunner::default();
/// let outcome = runner.run(&ConstantAgent::zeros(), BoardSeed::from_u64(7));
///
/// assert!(outcome.attempts <= runner.move_limit());
/// assert!(outcome.fitness > 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRunner {
    move_limit: usize,
    failure_limit: usize,
}

impl Default for SessionRunner {
    fn default() -> Self {
        Self::new(DEFAULT_MOVE_LIMIT, DEFAULT_FAILURE_LIMIT)
    }
}

impl SessionRunner {
    #[must_use]
    pub const fn new(move_limit: usize, failure_limit: usize) -> Self {
        Self {
            move_limit,
            failure_limit,
        }
    }

    #[must_use]
    pub const fn move_limit(&self) -> usize {
        self.move_limit
    }

    #[must_use]
    pub const fn failure_limit(&self) -> usize {
        self.failure_limit
    }

    /// Plays one game on the board generated from `seed`.
    pub fn run<A>(&self, agent: &A, seed: BoardSeed) -> SessionOutcome
    where
        A: Agent + ?Sized,
    {
        self.run_observed(agent, seed, &mut ())
    }

    pub fn run_observed<A, O>(&self, agent: &A, seed: BoardSeed, observer: &mut O) -> SessionOutcome
    where
        A: Agent + ?Sized,
        O: SessionObserver + ?Sized,
    {
        let session = GameSession::with_seed(TurnMode::Agent, seed);
        self.run_session(agent, session, observer)
    }

    /// Plays an already prepared session to completion.
    pub fn run_session<A, O>(
        &self,
        agent: &A,
        mut session: GameSession,
        observer: &mut O,
    ) -> SessionOutcome
    where
        A: Agent + ?Sized,
        O: SessionObserver + ?Sized,
    {
        let mut attempts = 0;
        let mut failures = 0;
        let mut successful_moves = 0;

        let end_reason = loop {
            if session.session_state().is_game_over() {
                break EndReason::GameOver;
            }
            if failures >= self.failure_limit {
                break EndReason::FailureLimit;
            }
            if attempts >= self.move_limit {
                break EndReason::MoveLimit;
            }
            attempts += 1;

            let features = action_codec::encode_features(session.board());
            let output = agent.activate(&features);
            let succeeded = match AgentAction::decode(&output) {
                Ok(action) => {
                    observer.on_action(session.board(), &action);
                    play_turn(&mut session, &action, observer)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "agent produced an undecodable output");
                    false
                }
            };

            if succeeded {
                failures = 0;
                successful_moves += 1;
            } else {
                failures += 1;
                observer.on_failure(session.board(), failures);
            }
        };

        let score = session.stats().score();
        let fitness = action_codec::fitness(score, successful_moves);
        tracing::debug!(
            seed = %session.seed(),
            ?end_reason,
            score,
            successful_moves,
            attempts,
            fitness,
            "session finished"
        );
        SessionOutcome {
            score,
            successful_moves,
            attempts,
            cleared_lines: session.stats().total_cleared_lines(),
            end_reason,
            fitness,
        }
    }
}

fn select_piece(session: &mut GameSession, action: &AgentAction) -> Option<PieceId> {
    if action.source_row < PLAYABLE_HEIGHT
        && let Ok(id) = session.select_at(action.source_col, action.source_row)
    {
        return Some(id);
    }
    let id = session.random_playable_piece()?;
    session.select(id).ok()?;
    Some(id)
}

/// Resolves one agent turn. Returns `true` if a move was made and confirmed.
fn play_turn<O>(session: &mut GameSession, action: &AgentAction, observer: &mut O) -> bool
where
    O: SessionObserver + ?Sized,
{
    if select_piece(session, action).is_none() {
        return false;
    }
    let moved = session.slide_selected_to(action.target_col).is_ok()
        || [Direction::Left, Direction::Right]
            .into_iter()
            .any(|direction| session.move_selected(direction).is_ok());
    if !moved {
        session.cancel();
        return false;
    }
    session
        .confirm_with(&mut ForwardTurnEvents(observer))
        .is_ok()
}
