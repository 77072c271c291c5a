use std::{thread, time::Duration};

use slidris_agent::{action_codec::AgentAction, session_runner::SessionObserver};
use slidris_engine::{Board, TurnEvent, TurnObserver};

/// Prints turn steps and boards to stdout.
#[derive(Debug, Default, Clone)]
pub(crate) struct TextRenderer {
    /// Pause after every printed board
    delay: Option<Duration>,
    /// Print every step rather than just the board after each turn
    verbose: bool,
}

impl TextRenderer {
    pub(crate) fn new(delay: Option<Duration>, verbose: bool) -> Self {
        Self { delay, verbose }
    }

    pub(crate) fn print_board(&self, board: &Board) {
        println!("{board}");
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
    }
}

impl TurnObserver for TextRenderer {
    fn on_turn_event(&mut self, board: &Board, event: &TurnEvent) {
        match event {
            TurnEvent::Confirmed { piece } => {
                if self.verbose {
                    println!("piece {piece} placed");
                }
            }
            TurnEvent::Settled { falls } => {
                if self.verbose && !falls.is_empty() {
                    println!("{} piece(s) fell", falls.len());
                    self.print_board(board);
                }
            }
            TurnEvent::LinesCleared {
                rows,
                removed,
                points,
                ..
            } => {
                println!(
                    "cleared row(s) {rows:?}: {} piece(s) removed, +{points}",
                    removed.len()
                );
                if self.verbose {
                    self.print_board(board);
                }
            }
            TurnEvent::Raised => self.print_board(board),
            TurnEvent::GameOver => {
                println!("game over");
                self.print_board(board);
            }
        }
    }
}

impl SessionObserver for TextRenderer {
    fn on_action(&mut self, _board: &Board, action: &AgentAction) {
        if self.verbose {
            println!(
                "agent: ({}, {}) -> column {}",
                action.source_col, action.source_row, action.target_col
            );
        }
    }

    fn on_turn_event(&mut self, board: &Board, event: &TurnEvent) {
        TurnObserver::on_turn_event(self, board, event);
    }

    fn on_failure(&mut self, _board: &Board, consecutive: usize) {
        if self.verbose {
            println!("agent move failed ({consecutive} in a row)");
        }
    }
}
