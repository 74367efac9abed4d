use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use blogdesk::{
    auth::{Credentials, StaticAuth, require_session},
    config::Config,
    jobs::{JobDraft, Jobs},
    post::{
        Authoring, PostCatalog, PostMetadata,
        input::{PostInput, replay},
    },
    promotion::{PromotionDraft, Promotions},
    render::{render_stored, to_html},
    storage::{
        LocalFile,
        backend::{self, Blobs, Documents, Secrets},
    },
};
use clap::{Parser, Subcommand};
use tracing::{error, info};

#[derive(Parser)]
struct Opts {
    #[clap(short, long, env = "BLOGDESK_CONFIG")]
    config: Option<PathBuf>,
    #[clap(long, env = "BLOGDESK_EMAIL")]
    email: Option<String>,
    #[clap(long, env = "BLOGDESK_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[clap(subcommand)]
    Post(PostCommand),
    #[clap(subcommand)]
    Promotion(PromotionCommand),
    #[clap(subcommand)]
    Job(JobCommand),
    /// Print the HTML of a stored content array read from a JSON file
    Render { file: PathBuf },
}

#[derive(Subcommand)]
enum PostCommand {
    /// Author a post from a YAML file and submit it
    Submit { file: PathBuf },
    List,
    Show { id: String },
    /// Replace the metadata of a post with the metadata in a YAML file
    Update { id: String, file: PathBuf },
    Delete { id: String },
}

#[derive(Subcommand)]
enum PromotionCommand {
    Add {
        #[clap(long)]
        name: String,
        #[clap(long)]
        url: String,
        #[clap(long)]
        banner: PathBuf,
    },
    List,
    Update {
        id: String,
        #[clap(long)]
        name: String,
        #[clap(long)]
        url: String,
    },
    Delete { id: String },
}

#[derive(Subcommand)]
enum JobCommand {
    Add { file: PathBuf },
    List,
    Delete { id: String },
}

async fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let src = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    serde_yaml::from_str(&src).with_context(|| format!("parse {}", path.display()))
}

fn secrets() -> Secrets {
    Secrets {
        cloudflare_api_token: std::env::var("CLOUDFLARE_API_TOKEN").ok(),
        r2_access_key_id: std::env::var("R2_ACCESS_KEY_ID").ok(),
        r2_secret_access_key: std::env::var("R2_SECRET_ACCESS_KEY").ok(),
    }
}

async fn post(
    command: PostCommand,
    config: &Config,
    documents: &Documents,
    blobs: &Blobs,
) -> anyhow::Result<()> {
    let collection = config.collections.posts.as_str();
    let catalog = PostCatalog::new(documents, blobs, collection);
    match command {
        PostCommand::Submit { file } => {
            let input: PostInput = read_yaml(&file).await?;
            let base = file.parent().unwrap_or(Path::new("."));
            let mut authoring = Authoring::new(documents, blobs, collection);
            replay(input, base, &mut authoring)
                .await
                .map_err(|e| anyhow!("{}: {e}", file.display()))?;
            let id = authoring.submit().await?;
            println!("{id}");
        }
        PostCommand::List => {
            for entry in catalog.list().await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    entry.id,
                    entry
                        .post
                        .date
                        .map(|date| date.format("%Y-%m-%d").to_string())
                        .unwrap_or_default(),
                    entry.post.category,
                    entry.post.title
                );
                for warning in entry.warnings {
                    println!("\t! {warning}");
                }
            }
        }
        PostCommand::Show { id } => {
            let nodes = catalog
                .render(&id)
                .await?
                .ok_or_else(|| anyhow!("post {id} does not exist"))?;
            println!("{}", to_html(&nodes));
        }
        PostCommand::Update { id, file } => {
            let metadata: PostMetadata = read_yaml(&file).await?;
            catalog.update(&id, &metadata).await?;
        }
        PostCommand::Delete { id } => catalog.delete(&id).await?,
    }
    Ok(())
}

async fn promotion(
    command: PromotionCommand,
    config: &Config,
    documents: &Documents,
    blobs: &Blobs,
) -> anyhow::Result<()> {
    let promotions = Promotions::new(documents, blobs, config.collections.promotions.as_str());
    match command {
        PromotionCommand::Add { name, url, banner } => {
            let banner = LocalFile::open(&banner)
                .await
                .with_context(|| format!("read {}", banner.display()))?;
            let mut draft = PromotionDraft {
                name,
                url,
                banner: Some(banner),
            };
            println!("{}", promotions.create(&mut draft).await?);
        }
        PromotionCommand::List => {
            for (id, promotion) in promotions.list().await? {
                println!(
                    "{id}\t{}\t{}\t{}",
                    promotion.name, promotion.url, promotion.image
                );
            }
        }
        PromotionCommand::Update { id, name, url } => promotions.update(&id, &name, &url).await?,
        PromotionCommand::Delete { id } => promotions.delete(&id).await?,
    }
    Ok(())
}

async fn job(command: JobCommand, config: &Config, documents: &Documents) -> anyhow::Result<()> {
    let jobs = Jobs::new(documents, config.collections.jobs.as_str());
    match command {
        JobCommand::Add { file } => {
            let mut draft: JobDraft = read_yaml(&file).await?;
            println!("{}", jobs.create(&mut draft).await?);
        }
        JobCommand::List => {
            for (id, job) in jobs.list().await? {
                println!("{id}\t{}\t{}\t{}", job.kind, job.location, job.title);
            }
        }
        JobCommand::Delete { id } => jobs.delete(&id).await?,
    }
    Ok(())
}

async fn run(opts: Opts) -> anyhow::Result<()> {
    if let Command::Render { file } = &opts.command {
        let src = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("read {}", file.display()))?;
        let content: serde_json::Value =
            serde_json::from_str(&src).with_context(|| format!("parse {}", file.display()))?;
        println!("{}", to_html(&render_stored(&content)));
        return Ok(());
    }

    let config_path = opts
        .config
        .as_deref()
        .ok_or_else(|| anyhow!("--config or BLOGDESK_CONFIG is required"))?;
    let config: Config = read_yaml(config_path).await?;
    config.validate().map_err(|msg| anyhow!("{msg}"))?;

    let auth = StaticAuth::new(config.admin.clone());
    auth.sign_in(&Credentials {
        email: opts.email.unwrap_or_default(),
        password: opts.password.unwrap_or_default(),
    })?;
    let session = require_session(&auth)?;
    info!(name = %session.name, "session started");

    let (documents, blobs) = backend::open(&config, &secrets()).await?;
    match opts.command {
        Command::Post(command) => post(command, &config, &documents, &blobs).await,
        Command::Promotion(command) => promotion(command, &config, &documents, &blobs).await,
        Command::Job(command) => job(command, &config, &documents).await,
        Command::Render { .. } => Ok(()),
    }
}

fn main() {
    let opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(?e, "failed to start runtime");
            std::process::exit(1);
        }
    };
    if let Err(e) = runtime.block_on(run(opts)) {
        match e.downcast_ref::<blogdesk::Error>() {
            Some(e) => eprintln!("{}", e.user_message()),
            None => eprintln!("Error: {e:#}"),
        }
        error!(?e, "critical error");
        std::process::exit(1);
    }
}
