mod config;
mod notion;
mod page;
mod render;
mod server;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use config::Settings;
use notion::{NotionClient, NotionSource};

#[derive(Parser)]
#[command(name = "notion_blog", about = "Single-page blog rendered from a Notion page")]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the page, the Notion webhook and the refresh endpoint
    Serve {
        /// Address to listen on
        #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
    },
    /// Fetch the page once and write the rendered HTML
    Render {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { addr } => {
            let source = match cli.settings.notion_api_key.as_deref() {
                Some(key) if !key.is_empty() => {
                    Some(Arc::new(NotionClient::new(key)?) as Arc<dyn NotionSource>)
                }
                _ => {
                    warn!("NOTION_API_KEY is not set; {} will answer 500", server::PAGE_PATH);
                    None
                }
            };
            if cli.settings.webhook_secret().is_none() {
                warn!("NOTION_WEBHOOK_VERIFICATION_TOKEN is not set; webhooks will answer 500");
            }
            let state = server::AppState::new(cli.settings, source);
            server::serve(state, addr).await
        }
        Commands::Render { output } => {
            let t0 = Instant::now();
            let (api_key, page_id) = cli.settings.notion_credentials()?;
            let client = NotionClient::new(api_key)?;
            let page = page::fetch_page(&client, page_id).await?;
            let html = render::render_page(&page);

            match output {
                Some(path) => {
                    std::fs::write(&path, &html)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Wrote {} ({} bytes)", path.display(), html.len());
                }
                None => print!("{}", html),
            }
            info!("Rendered in {:.1}s", t0.elapsed().as_secs_f64());
            Ok(())
        }
    }
}
