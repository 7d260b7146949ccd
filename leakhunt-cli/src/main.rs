//! Leakhunt CLI
//!
//! Keyword leak hunting and link mapping on Tor hidden services.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

use leakhunt_core::{CrawlOptions, EventType, HostEvent, ScopeMode, DEFAULT_PROXY, ROOT_MODULE};
use leakhunt_modules::{LeakHunter, LinkSpider};
use leakhunt_runtime::{Scan, ScanConfig, ScanSummary};
use leakhunt_tor::TorConfig;

#[derive(Parser)]
#[command(name = "leakhunt")]
#[command(author, version, about = "Leakhunt: keyword leak hunting on Tor hidden services", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl onion sites for leaked keywords
    Hunt {
        /// Onion domain or full URL to start from (repeatable)
        #[arg(short, long, required = true)]
        target: Vec<String>,

        /// Comma-separated keywords to hunt for
        #[arg(short, long)]
        keywords: Option<String>,

        /// Link scope: onion or same_domain
        #[arg(long)]
        scope: Option<String>,

        /// Emit the raw body of every fetched page
        #[arg(long)]
        raw: bool,

        /// Write every fetched page to this directory
        #[arg(long)]
        dump_dir: Option<PathBuf>,

        /// Also map discovered onion links with the link spider
        #[arg(long)]
        spider: bool,

        #[command(flatten)]
        crawl: CrawlArgs,
    },

    /// Map onion links reachable from a site
    Spider {
        /// Onion domain or full URL to start from (repeatable)
        #[arg(short, long, required = true)]
        target: Vec<String>,

        #[command(flatten)]
        crawl: CrawlArgs,
    },

    /// Check the Tor proxy
    Status {
        /// SOCKS proxy (socks5h://host:port)
        #[arg(long, env = "LEAKHUNT_PROXY", default_value = DEFAULT_PROXY)]
        proxy: String,
    },
}

/// Options shared by every crawling command
#[derive(Args)]
struct CrawlArgs {
    /// TOML file with crawl options
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override one option, e.g. --set max_pages=20 (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// SOCKS proxy (socks5h://host:port)
    #[arg(long, env = "LEAKHUNT_PROXY")]
    proxy: Option<String>,

    /// Maximum link depth from each target
    #[arg(long)]
    max_depth: Option<i64>,

    /// Maximum pages fetched per target
    #[arg(long)]
    max_pages: Option<i64>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<i64>,

    /// Verify TLS certificates
    #[arg(long)]
    verify_tls: bool,

    /// Skip the proxy reachability probe
    #[arg(long)]
    no_proxy_check: bool,

    /// Output file for findings (default: findings_<timestamp>.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum runtime in seconds (0 = unlimited)
    #[arg(long, default_value = "0")]
    max_runtime: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match cli.command {
        Commands::Hunt {
            target,
            keywords,
            scope,
            raw,
            dump_dir,
            spider,
            crawl,
        } => {
            let mut options = crawl_options(&crawl)?;
            if let Some(keywords) = keywords {
                options.keywords = keywords;
            }
            if let Some(scope) = scope {
                options.set("scope", &scope)?;
            }
            if raw {
                options.emit_raw_content = true;
            }
            if dump_dir.is_some() {
                options.dump_dir = dump_dir;
            }
            options.build().context("invalid crawl options")?;

            println!("🕵️ Leakhunt - onion leak hunting\n");
            if options.keywords.trim().is_empty() {
                println!("⚠️  No keywords given, crawling for links only\n");
            } else {
                println!("🔍 Keywords: {}", options.keywords);
            }
            print_limits(&options, crawl.max_runtime);

            let mut scan = Scan::new(ScanConfig {
                max_runtime_secs: crawl.max_runtime,
            });
            scan.add_module(Box::new(LeakHunter::new(&options)));
            if spider {
                scan.add_module(Box::new(LinkSpider::new(&options)));
            }

            let targets = target
                .iter()
                .map(|t| (hunt_event_type(t), t.clone()))
                .collect();
            run_scan(scan, targets, crawl.output).await?;
        }
        Commands::Spider { target, crawl } => {
            let options = crawl_options(&crawl)?;
            options.build().context("invalid crawl options")?;

            println!("🕸️ Leakhunt - onion link mapping\n");
            print_limits(&options, crawl.max_runtime);

            let mut scan = Scan::new(ScanConfig {
                max_runtime_secs: crawl.max_runtime,
            });
            scan.add_module(Box::new(LinkSpider::new(&options)));

            let targets = target
                .iter()
                .map(|t| (spider_event_type(t), t.clone()))
                .collect();
            run_scan(scan, targets, crawl.output).await?;
        }
        Commands::Status { proxy } => {
            check_status(&proxy).await?;
        }
    }

    Ok(())
}

/// Options from the config file, then --set overrides, then explicit flags
fn crawl_options(crawl: &CrawlArgs) -> Result<CrawlOptions> {
    let mut options = match &crawl.config {
        Some(path) => CrawlOptions::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => CrawlOptions::default(),
    };

    for pair in &crawl.overrides {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("expected KEY=VALUE, got {:?}", pair))?;
        options.set(key, value)?;
    }

    if let Some(proxy) = &crawl.proxy {
        options.proxy_address = proxy.clone();
    }
    if let Some(max_depth) = crawl.max_depth {
        options.max_depth = max_depth;
    }
    if let Some(max_pages) = crawl.max_pages {
        options.max_pages = max_pages;
    }
    if let Some(timeout) = crawl.timeout {
        options.timeout_seconds = timeout;
    }
    if crawl.verify_tls {
        options.verify_tls = true;
    }
    if crawl.no_proxy_check {
        options.check_proxy = false;
    }

    Ok(options)
}

fn hunt_event_type(target: &str) -> EventType {
    if target.contains("://") {
        EventType::Url
    } else {
        EventType::DomainName
    }
}

fn spider_event_type(target: &str) -> EventType {
    if target.contains("://") {
        EventType::Url
    } else {
        EventType::TorOnionSite
    }
}

fn print_limits(options: &CrawlOptions, max_runtime: u64) {
    let scope = match options.scope {
        ScopeMode::Onion => "onion",
        ScopeMode::SameDomain => "same domain",
    };
    println!("🔌 Proxy: {}", options.proxy_address);
    println!(
        "📏 Depth: {} | Pages per target: {} | Scope: {}",
        options.max_depth, options.max_pages, scope
    );
    if max_runtime > 0 {
        println!("⏱️  Max runtime: {}s", max_runtime);
    }
    println!();
}

async fn run_scan(
    mut scan: Scan,
    targets: Vec<(EventType, String)>,
    output: Option<PathBuf>,
) -> Result<()> {
    for (event_type, data) in targets {
        if let Err(e) = scan.submit(event_type, &data) {
            warn!("Skipping target: {}", e);
        }
    }

    let stop = scan.stop_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n🛑 Stopping after the current page...");
            stop.request();
        }
    });

    println!("🚀 Starting scan...");
    let summary = scan.run().await?;

    let findings: Vec<&HostEvent> = scan
        .bus()
        .events()
        .iter()
        .filter(|e| e.module != ROOT_MODULE)
        .collect();

    print_summary(&summary, &findings);

    if findings.is_empty() && output.is_none() {
        return Ok(());
    }

    let output_path = output.unwrap_or_else(|| {
        let timestamp = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S");
        PathBuf::from(format!("findings_{}.json", timestamp))
    });
    fs::write(&output_path, serde_json::to_string_pretty(&findings)?)?;
    println!("📄 Findings saved to: {}", output_path.display());

    Ok(())
}

fn print_summary(summary: &ScanSummary, findings: &[&HostEvent]) {
    if summary.stopped {
        println!("\n⚠️  Scan stopped before all events were handled.");
    } else {
        println!("\n✅ Scan complete!");
    }
    println!(
        "📊 {} events dispatched in {:.1}s, {} duplicates suppressed",
        summary.events_processed,
        summary.elapsed.as_secs_f64(),
        summary.stats.duplicates_suppressed
    );
    for (event_type, count) in &summary.stats.by_type {
        println!("   {}: {}", event_type, count);
    }

    let leaks: Vec<_> = findings
        .iter()
        .filter(|e| e.event_type == EventType::LeakedData)
        .collect();
    if leaks.is_empty() {
        return;
    }

    println!("\n{}", "=".repeat(60));
    for leak in leaks {
        println!("{}\n", leak.data);
    }
}

async fn check_status(proxy: &str) -> Result<()> {
    println!("🔌 Checking Tor proxy {}...\n", proxy);

    if let Err(e) = leakhunt_tor::check_proxy_reachable(proxy).await {
        println!("❌ {}", e);
        println!("\n   To install Tor:");
        println!("   - Linux: sudo apt install tor");
        println!("   - Mac: brew install tor");
        println!("   - Then start: sudo systemctl start tor (or brew services start tor)");
        return Ok(());
    }
    println!("✅ Proxy accepts connections");

    let config = TorConfig {
        socks_addr: proxy.to_string(),
        ..TorConfig::default()
    };

    match leakhunt_tor::check_tor_connection(&config).await {
        Ok(true) => println!("✅ Hidden services are reachable"),
        Ok(false) => {
            println!("⚠️  Test .onion did not answer (Tor may still be bootstrapping)");
        }
        Err(e) => {
            println!("❌ Error checking Tor: {}", e);
        }
    }

    Ok(())
}
