// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Four commands are supported:
//   1. `generate` — writes a synthetic student CSV
//   2. `train`    — fits preprocessing and trains the classifier
//   3. `predict`  — risk level + recommendation for JSON input
//   4. `explain`  — per-feature attention importance
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::Path;

use commands::{Commands, GenerateArgs, PredictArgs, TrainArgs};

/// clap reads the fields and generates argument parsing code
/// automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "dropout-risk",
    version = "0.1.0",
    about = "Train an attention-gated tabular classifier for student dropout risk, then predict and explain."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Generate(args) => run_generate(args),
            Commands::Train(args)    => run_train(args),
            Commands::Predict(args)  => run_predict(args),
            Commands::Explain(args)  => run_explain(args),
        }
    }
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    use crate::data::{loader::write_table, synthetic::SyntheticGenerator};

    let table = SyntheticGenerator::new(args.samples, args.seed).generate()?;
    write_table(&table, Path::new(&args.output))?;
    println!("Wrote {} students to {}", table.len(), args.output);
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on: {}", args.data);

    let report = TrainUseCase::new(args.into()).execute()?;

    println!("\nTraining complete.");
    println!(
        "  Best epoch      : {} (val loss {:.4}){}",
        report.best_epoch,
        report.best_val_loss,
        if report.stopped_early { ", stopped early" } else { "" }
    );
    println!(
        "  Test accuracy   : {:.1}% (majority baseline {:.1}%)",
        report.evaluation.accuracy * 100.0,
        report.majority_baseline * 100.0
    );
    println!(
        "  Precision/Recall: {:.3} / {:.3} (F1 {:.3})",
        report.evaluation.precision, report.evaluation.recall, report.evaluation.f1
    );
    println!("  Artifacts       : {}", report.artifacts_dir.display());
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let request = read_input(&args.input)?;
    let use_case = PredictUseCase::load(&args.artifacts_dir)?;
    println!("{}", use_case.predict_json(&request)?);
    Ok(())
}

fn run_explain(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let request = read_input(&args.input)?;
    let use_case = PredictUseCase::load(&args.artifacts_dir)?;
    println!("{}", use_case.explain_json(&request)?);
    Ok(())
}

/// `-` reads stdin, anything else is a file path.
fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Cannot read request from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(input).with_context(|| format!("Cannot read request file '{input}'"))
}
