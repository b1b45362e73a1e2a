// url-digest: scrape a page into metadata plus markdown, or serve
// one-line summaries of posted URLs over HTTP.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use url_digest::{PageScraper, Scraper, load_yaml_config, server};

#[derive(Parser, Debug)]
#[command(name = "url-digest", version, about = "Render, extract and summarize web pages")]
struct Cli {
    /// Config file (defaults to $URL_DIGEST_CONFIG, then ./config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Listen address, overrides server.bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Scrape one URL and print the result
    Scrape {
        url: String,

        /// Print the full result as JSON instead of markdown
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = load_yaml_config(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            server::serve(&config).await
        }
        Command::Scrape { url, json } => {
            url::Url::parse(&url)?;
            let scraper = Scraper::from_config(&config)?;
            let result = scraper.scrape(&url).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("# {}", result.metadata.title);
                if !result.metadata.site_name.is_empty() {
                    println!("Site: {}", result.metadata.site_name);
                }
                if !result.metadata.description.is_empty() {
                    println!("Description: {}", result.metadata.description);
                }
                println!();
                println!("{}", result.content);
            }
            Ok(())
        }
    }
}
