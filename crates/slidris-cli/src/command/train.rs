use std::{
    io::{self, BufRead as _},
    path::PathBuf,
    thread,
    time::Duration,
};

use anyhow::Context as _;
use chrono::Utc;
use slidris_agent::session_runner::SessionObserver;
use slidris_training::{
    config::TrainingConfig,
    genetic::NeuroEvolution,
    model::GenomeModel,
    orchestrator::{GenerationRecord, Trainer, TrainingControl, TrainingObserver},
};
use tracing::{info, warn};

use crate::{
    command::render::TextRenderer,
    util::{self, Output},
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Training config file (JSON); missing fields use defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Stop after this many generations
    #[arg(long)]
    generations: Option<usize>,
    /// Number of genomes per generation
    #[arg(long)]
    population: Option<usize>,
    /// Units in the hidden layer
    #[arg(long)]
    hidden: Option<usize>,
    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,
    /// Evaluate genomes one after another
    #[arg(long)]
    no_parallel: bool,
    /// Print the best game of every generation
    #[arg(long)]
    show_best: bool,
    /// Model file whose network replaces the first population member
    #[arg(long)]
    import: Option<PathBuf>,
    /// Name stored in the saved model
    #[arg(long)]
    name: Option<String>,
    /// Output file path for the best model
    #[arg(long)]
    output: Option<PathBuf>,
    /// Output file path for the per-generation fitness record
    #[arg(long)]
    record: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct Progress {
    replay: Option<TextRenderer>,
}

impl TrainingObserver for Progress {
    fn on_generation(&mut self, record: &GenerationRecord) {
        eprintln!(
            "Generation #{}: best {:.3}, avg {:.3}",
            record.generation, record.best_fitness, record.avg_fitness
        );
    }

    fn best_replay_observer(&mut self) -> Option<&mut dyn SessionObserver> {
        self.replay
            .as_mut()
            .map(|replay| replay as &mut dyn SessionObserver)
    }
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let config = build_config(arg)?;
    config.validate().context("Invalid training config")?;
    info!(?config, "starting training");

    let mut optimizer = NeuroEvolution::new(&config, config.rng(0))?;
    if let Some(path) = &arg.import {
        let model = util::read_genome_model(path)?;
        optimizer
            .import(model.network)
            .with_context(|| format!("Failed to import model: {}", path.display()))?;
        info!(name = %model.name, "imported model into the population");
    }

    let control = TrainingControl::new();
    spawn_control_reader(control.clone());
    eprintln!("type `pause`, `resume` or `stop` and press enter to control training");

    let mut progress = Progress {
        replay: arg
            .show_best
            .then(|| TextRenderer::new(Some(Duration::from_millis(20)), false)),
    };
    let mut trainer = Trainer::new(&config, config.rng(1), control)?;
    let summary = trainer.run(&mut optimizer, &mut progress)?;

    eprintln!(
        "Training finished after {} generation(s); best score {}",
        summary.record.generations.len(),
        summary.best_ever_score
    );

    if let Some(path) = &arg.record {
        Output::save_json(&summary.record, Some(path.as_path()))?;
        eprintln!("Record saved to {}", path.display());
    }

    let Some(best) = summary.best else {
        warn!("no generation was evaluated; nothing to save");
        return Ok(());
    };
    let name = arg
        .name
        .clone()
        .unwrap_or_else(|| format!("slidris-{}", Utc::now().format("%Y%m%d-%H%M%S")));
    let model = GenomeModel::new(name, best.generation, best.fitness, best.genome);
    Output::save_json(&model, arg.output.as_deref())?;

    eprintln!();
    eprintln!("Model saved successfully");
    if let Some(path) = &arg.output {
        eprintln!("  Path: {}", path.display());
    }
    eprintln!("  Name: {}", model.name);
    eprintln!("  Trained at: {}", model.trained_at);
    eprintln!("  Generation: {}", model.generation);
    eprintln!("  Fitness: {:.3}", model.fitness);
    eprintln!("  Hidden units: {}", model.network.hidden());

    Ok(())
}

/// Config file first, then command line flags on top.
fn build_config(arg: &TrainArg) -> anyhow::Result<TrainingConfig> {
    let mut config: TrainingConfig = match &arg.config {
        Some(path) => util::read_json_file("training config", path)?,
        None => TrainingConfig::default(),
    };
    if let Some(generations) = arg.generations {
        config.max_generations = Some(generations);
    }
    if let Some(population) = arg.population {
        config.population_size = population;
        config.elite_count = config.elite_count.min(population);
    }
    if let Some(hidden) = arg.hidden {
        config.hidden_size = hidden;
    }
    if let Some(seed) = arg.seed {
        config.seed = Some(seed);
    }
    if arg.no_parallel {
        config.parallel = false;
    }
    Ok(config)
}

/// Reads control commands from stdin for the rest of the process.
fn spawn_control_reader(control: TrainingControl) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match line.trim() {
                "pause" | "p" => {
                    control.pause();
                    info!("pause requested; waiting for the current generation");
                }
                "resume" | "r" => {
                    control.resume();
                    info!("training resumed");
                }
                "stop" | "q" => {
                    control.stop();
                    info!("stop requested; finishing the current generation");
                    break;
                }
                "" => {}
                other => warn!(command = other, "unknown training command"),
            }
        }
    });
}
