// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `classifier` — fine-tune a BERT sequence classifier
//   2. `embedding`  — fine-tune a sentence encoder + linear probe
//   3. `predict`    — classify text with a saved model directory
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{ClassifierArgs, Commands, EmbeddingArgs, PredictArgs};

#[derive(Parser, Debug)]
#[command(
    name = "newsgroups-finetune",
    version,
    about = "Fine-tune BERT classifiers and sentence encoders on 20 Newsgroups."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    /// This keeps the CLI layer thin — it only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Classifier(args) => run_classifier(args),
            Commands::Embedding(args)  => run_embedding(args),
            Commands::Predict(args)    => run_predict(args),
        }
    }
}

fn run_classifier(args: ClassifierArgs) -> Result<()> {
    use crate::application::classifier_use_case::ClassifierUseCase;

    tracing::info!("Fine-tuning '{}' as a sequence classifier", args.model);
    let report = ClassifierUseCase::new(args.into()).execute()?;
    tracing::info!("Test accuracy {:.4}", report.accuracy);
    Ok(())
}

fn run_embedding(args: EmbeddingArgs) -> Result<()> {
    use crate::application::embedding_use_case::EmbeddingUseCase;

    tracing::info!("Fine-tuning '{}' as a sentence encoder", args.model);
    let outcome = EmbeddingUseCase::new(args.into()).execute()?;
    tracing::info!("Probe test accuracy {:.4}", outcome.report.accuracy);
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let use_case = PredictUseCase::open(&args.model_dir)?;
    for (text, category) in use_case.predict(&args.texts)? {
        println!("{text} → {category}");
    }
    Ok(())
}
