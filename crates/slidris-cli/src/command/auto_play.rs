use std::{path::PathBuf, time::Duration};

use slidris_agent::session_runner::{DEFAULT_FAILURE_LIMIT, DEFAULT_MOVE_LIMIT, SessionRunner};
use slidris_engine::BoardSeed;
use tracing::info;

use crate::{command::render::TextRenderer, util};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct AutoPlayArg {
    /// Path to the model file (JSON format)
    model_path: PathBuf,
    /// Board seed (32 hex digits); random when omitted
    #[arg(long)]
    seed: Option<BoardSeed>,
    /// Milliseconds to wait after each printed board
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,
    /// Print every agent action and resolution step
    #[arg(long)]
    verbose: bool,
    /// Maximum attempted turns
    #[arg(long, default_value_t = DEFAULT_MOVE_LIMIT)]
    move_limit: usize,
    /// Consecutive failed turns that end the game
    #[arg(long, default_value_t = DEFAULT_FAILURE_LIMIT)]
    failure_limit: usize,
}

pub(crate) fn run(arg: &AutoPlayArg) -> anyhow::Result<()> {
    let AutoPlayArg {
        model_path,
        seed,
        delay_ms,
        verbose,
        move_limit,
        failure_limit,
    } = arg;

    let model = util::read_genome_model(model_path)?;
    info!(
        name = %model.name,
        generation = model.generation,
        fitness = model.fitness,
        "model loaded"
    );

    let seed = seed.unwrap_or_else(rand::random);
    println!("seed: {seed}");
    let delay = (*delay_ms > 0).then(|| Duration::from_millis(*delay_ms));
    let mut renderer = TextRenderer::new(delay, *verbose);

    let runner = SessionRunner::new(*move_limit, *failure_limit);
    let outcome = runner.run_observed(&model.network, seed, &mut renderer);

    println!("end: {:?}", outcome.end_reason);
    println!("score: {}", outcome.score);
    println!("cleared lines: {}", outcome.cleared_lines);
    println!(
        "moves: {} of {} attempts",
        outcome.successful_moves, outcome.attempts
    );
    println!("fitness: {:.3}", outcome.fitness);
    Ok(())
}
