use clap::ArgMatches;
use colored::Colorize;
use sitemapper_core::crawl::{CrawlOptions, execute_crawl};
use sitemapper_core::print_banner;
use sitemapper_core::report::{
    SitemapFormat, generate_crawl_summary, render_sitemap, save_report,
};
use sitemapper_scanner::{CancellationToken, OriginPolicy};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Install the stderr log subscriber. `RUST_LOG` wins over the verbosity flag.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Build crawl options from parsed command-line arguments
pub fn crawl_options_from_matches(matches: &ArgMatches) -> Result<CrawlOptions, String> {
    let url = matches
        .get_one::<Url>("URL")
        .cloned()
        .ok_or_else(|| "A root URL is required".to_string())?;

    let mut options = CrawlOptions::new(url);
    if let Some(depth) = matches.get_one::<i64>("depth") {
        options.max_depth = *depth;
    }
    if let Some(workers) = matches.get_one::<usize>("workers") {
        options.workers = *workers;
    }
    if let Some(capacity) = matches.get_one::<usize>("queue") {
        options.queue_capacity = *capacity;
    }
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        options.timeout_secs = *timeout;
    }
    if matches.get_flag("strict-origin") {
        options.origin_policy = OriginPolicy::SchemeHostPort;
    }
    options.show_progress_bars = !matches.get_flag("quiet");

    Ok(options)
}

pub fn resolve_output_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Write the rendered sitemap to `output`, or to stdout when no path is given.
pub fn write_sitemap(content: &str, output: Option<&Path>) -> io::Result<()> {
    match output {
        Some(path) => save_report(content, path),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()
        }
    }
}

fn spawn_ctrl_c_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!(
                "\n{} Interrupted, finishing with a partial sitemap...",
                "⚠".yellow().bold()
            );
            token.cancel();
        }
    });
}

pub async fn handle_crawl(matches: &ArgMatches) -> Result<(), String> {
    let quiet = matches.get_flag("quiet");
    init_tracing(matches.get_flag("verbose"));

    if !quiet {
        print_banner();
    }

    let options = crawl_options_from_matches(matches)?;
    let format = matches
        .get_one::<String>("format")
        .and_then(|f| SitemapFormat::from_str(f))
        .unwrap_or(SitemapFormat::Text);
    let output = matches
        .get_one::<String>("output")
        .map(|p| resolve_output_path(p));

    if !quiet {
        eprintln!(
            "{} Crawling {}",
            "→".blue(),
            options.url.as_str().bright_white()
        );
        eprintln!(
            "  Max depth: {}  Workers: {}  Queue: {}\n",
            options.max_depth, options.workers, options.queue_capacity
        );
    }

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    let started = Instant::now();
    let outcome = execute_crawl(options, cancel)
        .await
        .map_err(|e| format!("Crawl failed: {}", e))?;
    let elapsed = started.elapsed();
    debug!(pages = outcome.sitemap.len(), "crawl returned");

    let rendered = render_sitemap(&outcome.sitemap, format)
        .map_err(|e| format!("Failed to render sitemap: {}", e))?;

    write_sitemap(&rendered, output.as_deref()).map_err(|e| match &output {
        Some(path) => format!("Failed to write {}: {}", path.display(), e),
        None => format!("Failed to write sitemap: {}", e),
    })?;

    if let Some(path) = &output {
        if !quiet {
            eprintln!(
                "{} Sitemap written to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
    }

    if outcome.cancelled {
        warn!("crawl was cancelled; sitemap is partial");
    }

    if quiet {
        eprintln!("Crawling took {:.2?}", elapsed);
    } else {
        eprintln!();
        eprint!("{}", generate_crawl_summary(&outcome.stats, outcome.cancelled));
    }

    Ok(())
}
