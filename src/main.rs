use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use macos_release_watch::clock::SystemClock;
use macos_release_watch::config::{self, WatchConfig};
use macos_release_watch::logging;
use macos_release_watch::release::{Channel, StoredRelease};
use macos_release_watch::scraper::{HttpPageFetcher, ReleaseExtractor};
use macos_release_watch::store::{ReleaseStore, ReleaseStorer};
use macos_release_watch::watch::scheduler::{run_once, run_periodic};
use macos_release_watch::watch::{LogNotifier, NotificationDispatcher, ReleaseChecker};

#[derive(Parser)]
#[command(name = "macos-release-watch")]
#[command(version, about = "Watches the macOS full installer database for new builds")]
struct Cli {
    /// Config file (defaults to config.json in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overrides the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Write the log file as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Check periodically until interrupted (default)
    Run,
    /// Run a single check now and send notifications
    Check,
    /// Show the latest known release
    Latest {
        #[arg(long, value_enum)]
        channel: Option<ChannelArg>,
    },
    /// Show the last check and the number of known releases
    Status,
    /// List all known releases
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum ChannelArg {
    Public,
    Beta,
}

impl From<ChannelArg> for Channel {
    fn from(arg: ChannelArg) -> Self {
        match arg {
            ChannelArg::Public => Channel::Public,
            ChannelArg::Beta => Channel::Beta,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config::config_path);
    let mut config = WatchConfig::load(&config_path)?;
    if let Some(db) = cli.db {
        config.db_path = Some(db);
    }

    let _guard = logging::init(&config::log_path(), cli.log_json)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(execute(cli.command.unwrap_or(Command::Run), config))
}

async fn execute(command: Command, config: WatchConfig) -> anyhow::Result<()> {
    let db_path = config.resolved_db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory {:?}", parent))?;
    }
    let store = Arc::new(ReleaseStore::new(&db_path)?);

    match command {
        Command::Run => {
            let (checker, dispatcher) = build_watcher(&config, store)?;
            run_periodic(
                Arc::new(checker),
                Arc::new(dispatcher),
                config.check_interval(),
                async {
                    let _ = tokio::signal::ctrl_c().await;
                },
            )
            .await;
        }
        Command::Check => {
            let (checker, dispatcher) = build_watcher(&config, store)?;
            match run_once(&checker, &dispatcher).await {
                Some(report) if report.success() => {
                    println!(
                        "Check finished: {} releases found, {} new",
                        report.total_found,
                        report.new_releases.len()
                    );
                    for release in &report.new_releases {
                        println!(
                            "  new: {} ({}) [{}]",
                            release.version, release.build, release.channel
                        );
                    }
                    if let Some(updated) = report.page_updated {
                        println!("Page updated: {}", updated);
                    }
                }
                Some(report) => {
                    anyhow::bail!(
                        "Check failed: {}",
                        report.error.unwrap_or_default()
                    );
                }
                None => anyhow::bail!("Check could not be completed, see the log for details"),
            }
        }
        Command::Latest { channel } => match channel {
            Some(channel) => print_latest(store.as_ref(), channel.into())?,
            None => {
                print_latest(store.as_ref(), Channel::Public)?;
                print_latest(store.as_ref(), Channel::Beta)?;
            }
        },
        Command::Status => {
            let total = store.count()?;
            match store.last_check()? {
                Some(last) => {
                    println!("Last check:     {}", last.check_time.format("%Y-%m-%d %H:%M:%S UTC"));
                    println!("Releases found: {}", last.releases_found);
                    println!("New releases:   {}", last.new_releases);
                    println!("Status:         {}", last.status);
                }
                None => println!("No checks yet."),
            }
            println!("Known releases: {}", total);
            println!("Check interval: {:?}", config.check_interval());
        }
        Command::List => {
            for stored in store.releases()? {
                println!("{}", describe(&stored));
            }
        }
    }

    Ok(())
}

fn build_watcher(
    config: &WatchConfig,
    store: Arc<ReleaseStore>,
) -> anyhow::Result<(
    ReleaseChecker<ReleaseStore>,
    NotificationDispatcher<ReleaseStore>,
)> {
    let fetcher = HttpPageFetcher::new(&config.page_url, &config.user_agent, config.fetch_timeout())?;
    info!("Watching {}", fetcher.url());

    let checker = ReleaseChecker::new(
        store.clone(),
        Arc::new(fetcher),
        ReleaseExtractor::new(&config.link_suffix),
        Arc::new(SystemClock),
    );
    let dispatcher = NotificationDispatcher::new(
        store,
        Arc::new(LogNotifier),
        config.notify_targets.clone(),
    );

    Ok((checker, dispatcher))
}

fn print_latest(store: &ReleaseStore, channel: Channel) -> anyhow::Result<()> {
    match store.latest(Some(channel))? {
        Some(stored) => println!("{}: {}", channel.label(), describe(&stored)),
        None => println!("{}: no data", channel.label()),
    }
    Ok(())
}

fn describe(stored: &StoredRelease) -> String {
    let release = &stored.release;
    format!(
        "{} ({}) [{}] discovered {}{} {}",
        release.version,
        release.build,
        release.channel,
        stored.date_discovered.format("%Y-%m-%d %H:%M"),
        if stored.notified { ", notified" } else { "" },
        release.download_url
    )
}
