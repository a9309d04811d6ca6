// ABOUTME: Command-line front end for the full-text feed proxy.
// ABOUTME: `feed` converts a feed into a full-text feed; `extract` runs one article extraction.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use fulltext_extract::{
    builtin_registry, load_profiles_from_str, sanitize_html, ExtractInput, HttpTransport,
    Transport,
};
use fulltext_feed::{parse_feed_bytes, FeedError, FeedSource, HttpFeedSource, RawFeed};
use fulltext_proxy::{FeedAssembler, FeedRequest, OutputFormat, ProxyConfig, UrlFilter};
use serde_json::json;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

/// Convert syndication feeds into full-text feeds.
#[derive(Parser, Debug)]
#[command(name = "fulltext", version)]
#[command(about = "Replace feed item summaries with extracted article content", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    http: HttpArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a feed and print it with full article content.
    Feed(FeedArgs),
    /// Extract one article and print its content and images as JSON.
    Extract(ExtractArgs),
}

#[derive(Args, Debug)]
struct HttpArgs {
    /// Article fetch timeout in seconds.
    #[arg(long, global = true, default_value_t = 15)]
    timeout_secs: u64,

    /// User-Agent sent with every request.
    #[arg(long, global = true)]
    user_agent: Option<String>,

    /// Allow fetching from private and loopback addresses.
    #[arg(long, global = true, default_value_t = false)]
    allow_private_networks: bool,

    /// Extra site profiles (JSON array) registered over the built-in ones.
    #[arg(long, global = true)]
    profiles: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct FeedArgs {
    /// Feed URL (http/https).
    url: String,

    /// Number of items to return.
    #[arg(long)]
    limit: Option<usize>,

    /// Output format.
    #[arg(long, default_value = "json")]
    format: OutputFormat,

    /// Read the feed from this file ("-" for stdin) instead of fetching it.
    #[arg(long)]
    feed_file: Option<PathBuf>,

    /// URL filter rules (JSON array) replacing the built-in table.
    #[arg(long)]
    filter_rules: Option<PathBuf>,

    /// Items extracted concurrently.
    #[arg(long, default_value_t = 8)]
    concurrency: usize,

    /// Per-item extraction deadline in seconds.
    #[arg(long, default_value_t = 20)]
    item_deadline_secs: u64,

    /// Whole-request deadline in seconds.
    #[arg(long, default_value_t = 45)]
    request_deadline_secs: u64,

    /// Summary length in characters.
    #[arg(long, default_value_t = 300)]
    summary_length: usize,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Article URL.
    url: String,

    /// Use this HTML file ("-" for stdin) instead of fetching the URL.
    #[arg(long)]
    html_file: Option<PathBuf>,

    /// Print the extractor output without sanitizing it.
    #[arg(long, default_value_t = false)]
    raw: bool,
}

/// Feed source that parses a local file or stdin.
struct LocalFeedSource {
    path: PathBuf,
}

#[async_trait]
impl FeedSource for LocalFeedSource {
    async fn fetch_feed(&self, url: &str) -> Result<RawFeed, FeedError> {
        let bytes = read_input(&self.path)
            .await
            .map_err(|e| FeedError::fetch(self.path.display().to_string(), e))?;
        parse_feed_bytes(&bytes, url)
    }
}

async fn read_input(path: &PathBuf) -> std::io::Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        tokio::io::stdin().read_to_end(&mut buf).await?;
        return Ok(buf);
    }
    tokio::fs::read(path).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let transport = build_transport(&cli.http)?;
    let registry = build_registry(&cli.http, transport).await?;

    match cli.command {
        Command::Feed(args) => run_feed(args, registry).await,
        Command::Extract(args) => run_extract(args, registry).await,
    }
}

fn build_transport(args: &HttpArgs) -> Result<Arc<dyn Transport>> {
    let mut builder = HttpTransport::builder()
        .timeout(Duration::from_secs(args.timeout_secs))
        .allow_private_networks(args.allow_private_networks);
    if let Some(agent) = &args.user_agent {
        builder = builder.user_agent(agent.clone());
    }
    Ok(Arc::new(builder.build()?))
}

async fn build_registry(
    args: &HttpArgs,
    transport: Arc<dyn Transport>,
) -> Result<fulltext_extract::ExtractorRegistry> {
    let mut registry = builtin_registry(Arc::clone(&transport))?;
    if let Some(path) = &args.profiles {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read profiles from {}", path.display()))?;
        for profile in load_profiles_from_str(&json)? {
            tracing::info!(profile = %profile.name, domain = %profile.domain, "Registering site profile");
            registry.register_profile(profile, Arc::clone(&transport));
        }
    }
    Ok(registry)
}

async fn run_feed(args: FeedArgs, registry: fulltext_extract::ExtractorRegistry) -> Result<()> {
    let config = ProxyConfig::builder()
        .max_concurrency(args.concurrency)
        .item_deadline(Duration::from_secs(args.item_deadline_secs))
        .request_deadline(Duration::from_secs(args.request_deadline_secs))
        .summary_length(args.summary_length)
        .build();

    let filter = match &args.filter_rules {
        Some(path) => UrlFilter::from_path(path)?,
        None => UrlFilter::builtin()?,
    };
    let source: Arc<dyn FeedSource> = match args.feed_file {
        Some(path) => Arc::new(LocalFeedSource { path }),
        None => Arc::new(HttpFeedSource::builder().build()?),
    };

    let request = FeedRequest::new(&args.url, args.limit, args.format, &config)?;
    let assembler = FeedAssembler::new(config, source, Arc::new(registry), Arc::new(filter));

    match assembler.process_feed(&request).await {
        Ok(payload) => {
            println!("{}", payload.body);
            Ok(())
        }
        Err(err) => bail!("{} (HTTP {})", err, err.status().as_u16()),
    }
}

async fn run_extract(
    args: ExtractArgs,
    registry: fulltext_extract::ExtractorRegistry,
) -> Result<()> {
    let extractor = registry.resolve(&args.url);
    let input = match &args.html_file {
        Some(path) => {
            let bytes = read_input(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            ExtractInput::Html {
                html: String::from_utf8_lossy(&bytes).into_owned(),
                base_url: Some(args.url.clone()),
            }
        }
        None => ExtractInput::Url(args.url.clone()),
    };

    let extraction = extractor.extract(input).await?;
    let content = if args.raw {
        extraction.content
    } else {
        sanitize_html(&extraction.content)
    };

    let output = json!({
        "url": args.url,
        "extractor": extractor.name(),
        "content": content,
        "images": extraction.images,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
