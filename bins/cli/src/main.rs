//! rehost CLI
//!
//! Uploads local files and mirrors remote resources into the configured
//! object store, printing the public URL of each stored object.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rehost_core::Pipeline;
use rehost_core::storage::{UploadRequest, UploadResult};
use rehost_shared::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "rehost", version, about = "Upload and mirror objects into S3-compatible storage")]
struct Cli {
    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a local file.
    Upload {
        /// File to upload.
        file: PathBuf,
        /// Content type sent with the object.
        #[arg(long)]
        content_type: Option<String>,
        /// Key extension, defaults to the file's own extension.
        #[arg(long)]
        ext: Option<String>,
    },
    /// Fetch a remote URL and re-host it.
    Mirror {
        /// Source URL.
        url: String,
        /// Key extension, with its leading dot.
        #[arg(long, default_value = "")]
        ext: String,
    },
    /// Mirror the generated avatar for a user, falling back to the generator URL.
    Avatar {
        /// User name used as the seed.
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rehost=info,rehost_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;
    let pipeline = Pipeline::from_config(&config).context("invalid storage configuration")?;

    match cli.command {
        Command::Upload {
            file,
            content_type,
            ext,
        } => {
            let body = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let extension = ext.or_else(|| {
                file.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| format!(".{e}"))
            });

            let mut request = UploadRequest::new(body);
            request.content_type = content_type;
            request.extension = extension;

            let result = pipeline.uploads.upload(request).await?;
            print_result(&result, cli.json);
        }
        Command::Mirror { url, ext } => {
            let result = pipeline.mirror.mirror(&url, &ext).await?;
            print_result(&result, cli.json);
        }
        Command::Avatar { name } => {
            let avatars = pipeline
                .avatars
                .as_ref()
                .context("avatar.generator_url is not configured")?;

            let url = match avatars.provision(&name).await {
                Ok(result) => result.url,
                Err(err) => {
                    let fallback = avatars.source_url(&name);
                    warn!(
                        stage = err.stage(),
                        error = %err,
                        fallback = %fallback,
                        "failed to mirror avatar, using generator URL"
                    );
                    fallback
                }
            };
            info!(name = %name, url = %url, "avatar ready");
            println!("{url}");
        }
    }

    Ok(())
}

fn print_result(result: &UploadResult, json: bool) {
    if json {
        let value = serde_json::json!({
            "url": result.url,
            "key": result.key.as_str(),
            "size": result.size,
            "content_type": result.content_type,
        });
        println!("{value}");
    } else {
        println!("{}", result.url);
    }
}
