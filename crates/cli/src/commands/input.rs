use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use homequote_core::domain::booking::BookingDraft;
use homequote_core::domain::catalog::{CatalogSnapshot, FrequencyDependencies};
use homequote_core::pricing::dependencies::resolve_dependencies;
use homequote_core::pricing::eligibility::Audience;
use homequote_core::pricing::{
    BookingEvaluation, BookingEvaluationInput, BookingRuntime, DeterministicBookingRuntime,
};
use serde::de::DeserializeOwned;

use crate::commands::CommandResult;

/// Exit code for unreadable or malformed input files.
pub const INPUT_EXIT_CODE: u8 = 3;

#[derive(Debug, Clone, Args)]
pub struct EvaluateArgs {
    #[arg(long, help = "Catalog snapshot JSON file")]
    pub snapshot: PathBuf,
    #[arg(long, help = "Booking draft JSON file")]
    pub draft: PathBuf,
    #[arg(
        long,
        help = "Frequency dependencies JSON file (defaults to the bundle embedded in the snapshot)"
    )]
    pub dependencies: Option<PathBuf>,
    #[arg(long, default_value = "customer", help = "Booking surface: customer|admin")]
    pub audience: Audience,
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read {what} file `{}`", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("could not parse {what} file `{}`", path.display()))
}

/// Loads the input files and runs the deterministic evaluation pipeline.
pub fn evaluate(args: &EvaluateArgs) -> Result<BookingEvaluation> {
    let catalog: CatalogSnapshot = read_json(&args.snapshot, "snapshot")?;
    let draft = read_json::<BookingDraft>(&args.draft, "draft")?.clamp_quantities(&catalog);
    let dependencies: Option<FrequencyDependencies> = match &args.dependencies {
        Some(path) => Some(read_json(path, "dependencies")?),
        None => resolve_dependencies(&catalog, draft.frequency.as_deref()),
    };

    Ok(DeterministicBookingRuntime::default().evaluate(BookingEvaluationInput {
        catalog: &catalog,
        draft: &draft,
        dependencies: dependencies.as_ref(),
        audience: args.audience,
    }))
}

pub fn input_failure(command: &str, error: &anyhow::Error) -> CommandResult {
    CommandResult::failure(command, "input", format!("{error:#}"), INPUT_EXIT_CODE)
}
