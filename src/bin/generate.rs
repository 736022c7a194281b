use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use vidgen::{
    config::AppConfig,
    models::generation::JobSnapshot,
    services::{
        catalog::Catalog,
        collector::ParameterForm,
        credentials::{mask_key, CredentialProvider, FileCredentialStore, MemoryCredentials},
        fal::{FalClient, GenerationError},
        generator::Generator,
        image_ref,
    },
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate videos with fal.ai models from the catalog")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a prompt and wait for the video
    Run {
        /// Model slug from the catalog
        #[arg(short = 'm', long)]
        model: String,

        /// Prompt text
        #[arg(short = 'p', long)]
        prompt: String,

        /// Model parameter as NAME=VALUE (repeatable)
        #[arg(long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Reference image: URL or local file
        #[arg(short = 'i', long)]
        image: Option<String>,
    },

    /// List catalog models
    Models,

    /// Show a model's parameters
    Describe {
        /// Model slug from the catalog
        model: String,
    },

    /// Manage the stored fal.ai API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Subcommand, Debug)]
enum KeyAction {
    /// Store a key
    Set { key: String },
    /// Remove the stored key
    Clear,
    /// Show the masked key and when it was saved
    Show,
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .compact()
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env().expect("Failed to load configuration");

    let credentials: Arc<dyn CredentialProvider> = match config.fal_key.as_deref() {
        Some(key) => Arc::new(MemoryCredentials::with_key(key).expect("FAL_KEY is empty")),
        None => Arc::new(FileCredentialStore::new(&config.credential_path)),
    };

    let outcome = match args.command {
        Command::Run {
            model,
            prompt,
            params,
            image,
        } => run(&config, credentials, &model, &prompt, &params, image.as_deref()).await,
        Command::Models => list_models(&config),
        Command::Describe { model } => describe(&config, &model),
        Command::Key { action } => key(credentials.as_ref(), action),
    };

    if let Err(e) = outcome {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(
    config: &AppConfig,
    credentials: Arc<dyn CredentialProvider>,
    slug: &str,
    prompt: &str,
    params: &[String],
    image: Option<&str>,
) -> CliResult {
    let catalog = Catalog::load(&config.data_dir)?;
    let model = match catalog.model(slug) {
        Ok(model) => model,
        Err(e) => {
            if let Some(suggestion) = catalog.suggest_model(slug) {
                eprintln!("did you mean `{suggestion}`?");
            }
            return Err(e.into());
        }
    };

    let mut form = ParameterForm::from_model(model);
    for param in params {
        let (name, value) = param
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=VALUE, got {param:?}"))?;
        form.set(name.trim(), value)?;
    }
    let image_url = image.map(image_ref::resolve_image_arg).transpose()?;
    let request = form.build(prompt, image_url);

    let generator = Generator::new(Arc::new(FalClient::new()?), credentials, config.poll_settings());
    let handle = match generator.spawn(&model.api_config.endpoint, request) {
        Ok(handle) => handle,
        Err(GenerationError::MissingCredential) => {
            return Err("no fal.ai API key stored; run `vidgen-generate key set <KEY>` or set FAL_KEY".into());
        }
        Err(e) => return Err(e.into()),
    };

    let cancel: CancellationToken = handle.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut updates = handle.subscribe();
    let progress = tokio::spawn(async move {
        let mut last: Option<JobSnapshot> = None;
        loop {
            let snapshot = updates.borrow_and_update().clone();
            let changed = last.as_ref().map_or(true, |prev| {
                prev.status != snapshot.status || prev.queue_position != snapshot.queue_position
            });
            if changed && !snapshot.is_finished() {
                match snapshot.queue_position {
                    Some(position) => eprintln!("{} (queue position {position})", snapshot.status),
                    None => eprintln!("{}", snapshot.status),
                }
            }
            last = Some(snapshot);
            if updates.changed().await.is_err() {
                break;
            }
        }
    });

    let outcome = handle.wait().await;
    progress.abort();

    let result = outcome?;
    match result.video_url {
        Some(url) => println!("{url}"),
        None => eprintln!("warning: {}", vidgen::services::resolver::NO_VIDEO_WARNING),
    }
    Ok(())
}

fn list_models(config: &AppConfig) -> CliResult {
    let catalog = Catalog::load(&config.data_dir)?;
    for model in catalog.models() {
        let image = if model.supports_image { " [image]" } else { "" };
        println!("{:<32} {}{}", model.slug, model.name, image);
    }
    Ok(())
}

fn describe(config: &AppConfig, slug: &str) -> CliResult {
    let catalog = Catalog::load(&config.data_dir)?;
    let model = catalog.model(slug)?;
    println!("{} ({})", model.name, model.api_config.endpoint);
    for spec in &model.parameters {
        let mut line = format!("  {:<24} {}", spec.name, spec.kind);
        if let (Some(min), Some(max)) = (spec.min, spec.max) {
            line.push_str(&format!(" [{min}..{max}]"));
        }
        if !spec.options.is_empty() {
            line.push_str(&format!(" {{{}}}", spec.options.join("|")));
        }
        if let Some(default) = &spec.default {
            line.push_str(&format!(" default={default}"));
        }
        println!("{line}");
    }
    Ok(())
}

fn key(credentials: &dyn CredentialProvider, action: KeyAction) -> CliResult {
    match action {
        KeyAction::Set { key } => {
            credentials.set(&key)?;
            println!("Stored API key {}", mask_key(key.trim()));
        }
        KeyAction::Clear => {
            credentials.clear()?;
            println!("Cleared API key");
        }
        KeyAction::Show => match credentials.get()? {
            Some(key) => {
                let saved = credentials
                    .saved_at()?
                    .map(|t| format!(" (saved {})", t.format("%Y-%m-%d %H:%M UTC")))
                    .unwrap_or_default();
                println!("{}{saved}", mask_key(&key));
            }
            None => println!("No API key stored"),
        },
    }
    Ok(())
}
