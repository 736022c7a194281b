use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use vidgen::services::aggregate;

#[derive(Parser, Debug)]
#[command(author, version, about = "Merge per-item catalog JSON files into aggregate documents")]
struct Args {
    /// Directory of per-model JSON files
    #[arg(long, default_value = "content/models")]
    models: PathBuf,

    /// Directory of user-contributed prompt files
    #[arg(long, default_value = "content/custom-prompts")]
    custom_prompts: PathBuf,

    /// Directory of curated per-model prompt files
    #[arg(long, default_value = "content/model-prompts")]
    model_prompts: PathBuf,

    /// Output data directory
    #[arg(short = 'o', long, default_value = "public/data")]
    output: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .compact()
        .init();

    let args = Args::parse();

    if let Err(e) = build(&args) {
        tracing::error!(error = %e, "Catalog build failed");
        std::process::exit(1);
    }
}

fn build(args: &Args) -> Result<(), aggregate::AggregateError> {
    let models = aggregate::build_models(&args.models, &args.output)?;

    let mut prompts = 0;
    for (source, output) in [
        (&args.custom_prompts, args.output.join("custom-prompts.json")),
        (&args.model_prompts, args.output.join("model-prompts/prompts.json")),
    ] {
        if !source.is_dir() {
            tracing::warn!(source = %source.display(), "Prompt source directory missing, skipping");
            continue;
        }
        prompts += aggregate::build_prompts(source, &output)?;
    }

    println!("Built {models} models and {prompts} prompts into {}", args.output.display());
    Ok(())
}
