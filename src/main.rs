use anyhow::Context;
use clap::Parser;
use spiderling::config::{load_config, Config};
use spiderling::dedup::HashDetector;
use spiderling::engine::{CrawlContext, Engine};
use spiderling::fetch::Fetcher;
use spiderling::frontier::{Frontier, MemoryFrontier};
use spiderling::parse::HtmlParser;
use spiderling::policy::{ContentTypePolicy, FollowPolicy, SingleUrlPolicy};
use spiderling::politeness::{MemoryThrottle, RobotsCache};
use spiderling::sink::{CountingSink, RecordingErrorSink};
use spiderling::storage::SqliteStore;
use spiderling::url::NormalizedUrl;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "spiderling", version, about = "A polite, concurrent web crawler")]
struct Cli {
    /// Seed URLs to start crawling from
    #[arg(required = true)]
    seeds: Vec<String>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of crawl threads
    #[arg(long)]
    workers: Option<usize>,

    /// Delay between same-domain requests when robots.txt sets none, in ms
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Follow links onto other domains
    #[arg(long)]
    cross_domain: bool,

    /// Fetch only the seed URLs, follow nothing
    #[arg(long)]
    single_url: bool,

    /// Persist the crawl to a SQLite database at this path
    #[arg(long)]
    database: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn setup_logging(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("spiderling={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers.max(1);
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.crawler.default_delay_ms = delay_ms;
    }
    if cli.cross_domain {
        config.follow.same_domain = false;
    }

    let seeds = cli
        .seeds
        .iter()
        .map(|raw| {
            NormalizedUrl::parse(raw).with_context(|| format!("invalid seed URL: {raw}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let fetcher = Arc::new(Fetcher::new(&config.user_agent)?);
    let robots = Arc::new(RobotsCache::new(
        config.user_agent.crawler_name.clone(),
        config.crawler.default_delay(),
    ));
    let policy: Arc<dyn FollowPolicy> = if cli.single_url {
        Arc::new(SingleUrlPolicy::new())
    } else {
        Arc::new(ContentTypePolicy::new(
            config.follow.content_types.clone(),
            config.follow.same_domain,
        ))
    };

    let database = cli
        .database
        .clone()
        .or_else(|| config.storage.as_ref().map(|s| PathBuf::from(&s.database_path)));

    match database {
        Some(path) => {
            let store = Arc::new(SqliteStore::open(&path)?);
            store.requeue_unfinished()?;
            let ctx = CrawlContext {
                frontier: Arc::clone(&store) as Arc<dyn Frontier>,
                robots,
                throttle: Arc::new(MemoryThrottle::new()),
                detector: Arc::new(HashDetector::new()),
                policy,
                parsers: vec![Arc::new(HtmlParser::new())],
                sink: Arc::clone(&store) as _,
                errors: Arc::clone(&store) as _,
                fetcher,
            };
            let engine = Engine::new(ctx, config.crawler.workers);
            engine.run(&seeds)?;

            let counters = store.counters();
            let (pages, bytes, failures) = store.report()?;
            println!("crawled {pages} pages ({bytes} bytes) into {}", path.display());
            println!(
                "links: {}, redirects: {}, repeated URLs: {}, failures: {failures}",
                counters.links, counters.redirects, counters.repeats
            );
        }
        None => {
            let frontier = Arc::new(MemoryFrontier::new());
            let sink = Arc::new(CountingSink::new());
            let errors = Arc::new(RecordingErrorSink::new());
            let ctx = CrawlContext {
                frontier: Arc::clone(&frontier) as Arc<dyn Frontier>,
                robots,
                throttle: Arc::new(MemoryThrottle::new()),
                detector: Arc::new(HashDetector::new()),
                policy,
                parsers: vec![Arc::new(HtmlParser::new())],
                sink: Arc::clone(&sink) as _,
                errors: Arc::clone(&errors) as _,
                fetcher,
            };
            let engine = Engine::new(ctx, config.crawler.workers);
            engine.run(&seeds)?;

            let counters = frontier.counters();
            println!("crawled {} pages ({} bytes)", sink.pages(), sink.bytes());
            println!(
                "links: {}, redirects: {}, repeated URLs: {}",
                counters.links, counters.redirects, counters.repeats
            );
            for (kind, urls) in errors.by_kind() {
                println!("{} {:?} failures:", urls.len(), kind);
                for url in urls {
                    println!("  {url}");
                }
            }
        }
    }
    Ok(())
}
