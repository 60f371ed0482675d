use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use launchkit::daemon;
use launchkit::launcher::{Entry, SourceSet};
use launchkit::util::config::AppConfig;
use std::io::{self, BufRead, Write};
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the window-activity history daemon
    Serve,
    /// Write launchable entries to stdout, one per line
    List,
    /// Read one selected entry from stdin and act on it
    Handle,
    /// Check whether the history daemon is reachable
    Status,
}

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = AppConfig::load().context("load configuration")?;

    match cli.command {
        Commands::Serve => daemon::run(&config),
        Commands::List => list_entries(&config),
        Commands::Handle => handle_selection(&config),
        Commands::Status => print_status(&config),
    }
}

fn list_entries(config: &AppConfig) -> Result<()> {
    let sources = SourceSet::defaults(config)?;
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    sources.write_entries(&mut writer)?;
    writer.flush().context("flush entries")
}

fn handle_selection(config: &AppConfig) -> Result<()> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read selection from stdin")?;
    if line.trim().is_empty() {
        anyhow::bail!("no selection on stdin");
    }

    let entry = Entry::parse_line(&line)?;
    let sources = SourceSet::defaults(config)?;
    sources.handle(&entry)
}

fn print_status(config: &AppConfig) -> Result<()> {
    let url = format!("http://127.0.0.1:{}/api/v1/health", config.listen_port);
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .context("build status client")?;

    match client.get(&url).send() {
        Ok(response) if response.status().is_success() => {
            println!("history daemon: running");
            Ok(())
        }
        Ok(response) => {
            println!("history daemon: unhealthy (status {})", response.status());
            Ok(())
        }
        Err(_) => {
            println!("history daemon: not running");
            Ok(())
        }
    }
}
