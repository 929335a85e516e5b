// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the four subcommands and all their configurable flags:
//   generate, train, predict, explain
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a rule-labelled synthetic student table as CSV
    Generate(GenerateArgs),

    /// Fit preprocessing and train the classifier on a student CSV
    Train(TrainArgs),

    /// Predict dropout risk for one student (JSON object) or many (JSON array)
    Predict(PredictArgs),

    /// Show which features the model attended to for one student
    Explain(PredictArgs),
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Where to write the CSV
    #[arg(long, default_value = "data/students.csv")]
    pub output: String,

    #[arg(long, default_value_t = 1000)]
    pub samples: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// CSV file with one row per student and a `dropout_risk` column
    #[arg(long, env = "DROPOUT_DATA_PATH", default_value = "data/students.csv")]
    pub data: String,

    /// Directory for the preprocessing artifact, checkpoint and metrics
    #[arg(long, env = "DROPOUT_ARTIFACTS_DIR", default_value = "artifacts")]
    pub artifacts_dir: String,

    /// Fraction of rows held out for validation and the final evaluation
    #[arg(long, default_value_t = 0.2)]
    pub test_fraction: f64,

    /// Seeds the split, weight init and batch shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Upper bound on training epochs
    #[arg(long, default_value_t = 50)]
    pub epochs: usize,

    /// Epochs without validation improvement before stopping
    #[arg(long, default_value_t = 10)]
    pub patience: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Weight of the mask sparsity term in the loss
    #[arg(long, default_value_t = 1e-3)]
    pub lambda_sparse: f64,

    /// Number of sequential decision steps
    #[arg(long, default_value_t = 3)]
    pub n_steps: usize,

    /// Width of each step's decision output
    #[arg(long, default_value_t = 8)]
    pub n_d: usize,

    /// Width of each step's attention output
    #[arg(long, default_value_t = 8)]
    pub n_a: usize,

    #[arg(long, default_value_t = 2)]
    pub n_shared: usize,

    #[arg(long, default_value_t = 2)]
    pub n_independent: usize,

    /// Rows per ghost batch-norm chunk
    #[arg(long, default_value_t = 128)]
    pub virtual_batch_size: usize,

    /// Running-statistics momentum of the batch norms
    #[arg(long, default_value_t = 0.01)]
    pub momentum: f64,

    /// Prior relaxation: how much a feature may be reused across steps
    #[arg(long, default_value_t = 1.5)]
    pub gamma: f64,

    /// Continue from the checkpoint in --artifacts-dir
    #[arg(long)]
    pub resume: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_path:          a.data,
            artifacts_dir:      a.artifacts_dir,
            test_fraction:      a.test_fraction,
            seed:               a.seed,
            batch_size:         a.batch_size,
            epochs:             a.epochs,
            patience:           a.patience,
            lr:                 a.lr,
            lambda_sparse:      a.lambda_sparse,
            resume:             a.resume,
            n_steps:            a.n_steps,
            n_d:                a.n_d,
            n_a:                a.n_a,
            n_shared:           a.n_shared,
            n_independent:      a.n_independent,
            virtual_batch_size: a.virtual_batch_size,
            momentum:           a.momentum,
            gamma:              a.gamma,
            ..TrainConfig::default()
        }
    }
}

/// Shared by `predict` and `explain`
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// JSON file with the request, or `-` to read stdin
    #[arg(long, default_value = "-")]
    pub input: String,

    /// Directory written by `train`
    #[arg(long, env = "DROPOUT_ARTIFACTS_DIR", default_value = "artifacts")]
    pub artifacts_dir: String,
}
