use std::io::{self, BufRead as _, Write as _};

use anyhow::{Context as _, bail};
use slidris_engine::{BoardSeed, Direction, GameSession, TurnMode};

use crate::command::render::TextRenderer;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct PlayArg {
    /// Board seed (32 hex digits); random when omitted
    #[arg(long)]
    seed: Option<BoardSeed>,
    /// Print every resolution step
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayCommand {
    Select { col: usize, row: usize },
    Move(Direction),
    SlideTo(usize),
    Confirm,
    Cancel,
    Pause,
    Board,
    Help,
    Quit,
}

const HELP: &str = "\
commands:
  s <col> <row>   select the piece covering a cell (row 0 is the top)
  l / r           move the selected piece one column left / right
  t <col>         slide the selected piece towards a column
  c               confirm the move
  x               cancel the selection
  p               pause / resume
  b               show the board
  h               show this help
  q               quit";

impl PlayCommand {
    fn parse(line: &str) -> anyhow::Result<Self> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            bail!("empty command");
        };
        let mut number = |what: &str| -> anyhow::Result<usize> {
            words
                .next()
                .with_context(|| format!("missing {what}"))?
                .parse()
                .with_context(|| format!("invalid {what}"))
        };
        let command = match name {
            "s" | "select" => Self::Select {
                col: number("column")?,
                row: number("row")?,
            },
            "l" | "left" => Self::Move(Direction::Left),
            "r" | "right" => Self::Move(Direction::Right),
            "t" | "to" => Self::SlideTo(number("column")?),
            "c" | "confirm" => Self::Confirm,
            "x" | "cancel" => Self::Cancel,
            "p" | "pause" => Self::Pause,
            "b" | "board" => Self::Board,
            "h" | "help" | "?" => Self::Help,
            "q" | "quit" | "exit" => Self::Quit,
            _ => bail!("unknown command `{name}`"),
        };
        Ok(command)
    }
}

pub(crate) fn run(arg: &PlayArg) -> anyhow::Result<()> {
    let PlayArg { seed, verbose } = arg;
    let seed = seed.unwrap_or_else(rand::random);
    let mut session = GameSession::with_seed(TurnMode::Interactive, seed);
    let mut renderer = TextRenderer::new(None, *verbose);

    println!("seed: {seed}");
    println!("{HELP}");
    renderer.print_board(session.board());

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read from stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let command = match PlayCommand::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{e:#}");
                continue;
            }
        };

        let result = match command {
            PlayCommand::Select { col, row } => session.select_at(col, row).map(|id| {
                println!("selected piece {id}");
            }),
            PlayCommand::Move(direction) => session.move_selected(direction).map(|col| {
                println!("piece now at column {col}");
            }),
            PlayCommand::SlideTo(col) => session.slide_selected_to(col).map(|col| {
                println!("piece now at column {col}");
            }),
            PlayCommand::Confirm => session.confirm_with(&mut renderer).map(|resolution| {
                if resolution.score_delta > 0 {
                    println!("+{}", resolution.score_delta);
                }
            }),
            PlayCommand::Cancel => {
                session.cancel();
                Ok(())
            }
            PlayCommand::Pause => {
                session.toggle_pause();
                println!("{:?}", session.session_state());
                Ok(())
            }
            PlayCommand::Board => {
                renderer.print_board(session.board());
                Ok(())
            }
            PlayCommand::Help => {
                println!("{HELP}");
                Ok(())
            }
            PlayCommand::Quit => break,
        };
        if let Err(rejection) = result {
            println!("rejected: {rejection}");
        }

        let stats = session.stats();
        println!(
            "score {}  turns {}  lines {}",
            stats.score(),
            stats.turns(),
            stats.total_cleared_lines()
        );
        if session.session_state().is_game_over() {
            break;
        }
    }

    let stats = session.stats();
    println!(
        "final score {} after {} turns ({} lines, {} combos)",
        stats.score(),
        stats.turns(),
        stats.total_cleared_lines(),
        stats.combos()
    );
    Ok(())
}
