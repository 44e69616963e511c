mod commands;

use anyhow::Result;
use commands::Command;
use siddu_pulse::{FeedEngine, NoticeReceiver, SidduClient, SidduConfig};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn log_file_path() -> PathBuf {
    // Logs go to ~/.config/siddu/siddu.log or ./siddu.log
    if let Some(home) = std::env::var_os("HOME") {
        let mut path = PathBuf::from(home);
        path.push(".config");
        path.push("siddu");
        std::fs::create_dir_all(&path).ok();
        path.push("siddu.log");
        path
    } else {
        PathBuf::from("siddu.log")
    }
}

fn init_logging() {
    // Default to INFO level, can be overridden with RUST_LOG env var
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_file_path = log_file_path();

    match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)
    {
        Ok(file) => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(file).with_ansi(false))
            .init(),
        Err(_) => {
            eprintln!(
                "Warning: Could not open log file {:?}, logging to stderr",
                log_file_path
            );
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn print_notices(notices: &mut NoticeReceiver) {
    while let Ok(notice) = notices.try_recv() {
        eprintln!("! {}", notice);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    // Parse command-line arguments: [--config <path>] [command ...]
    let mut args = std::env::args().skip(1);
    let mut config_path: Option<PathBuf> = None;
    let mut command_args: Vec<String> = Vec::new();

    while let Some(arg) = args.next() {
        if (arg == "--config" || arg == "-c") && command_args.is_empty() {
            if let Some(path) = args.next() {
                config_path = Some(PathBuf::from(path));
            }
        } else {
            command_args.push(arg);
        }
    }

    // Check environment variable if not provided via CLI
    if config_path.is_none() {
        if let Ok(env_path) = std::env::var("SIDDU_CONFIG") {
            config_path = Some(PathBuf::from(env_path));
        }
    }

    let config = SidduConfig::load(config_path.as_deref())?;
    tracing::info!(
        "[siddu-cli] Using {} (signed in: {})",
        config.api_url,
        config.access_token.is_some()
    );

    let client = SidduClient::from_config(&config)?;
    let (engine, mut notices) = FeedEngine::new(Arc::new(client), config.page_size);
    if let Err(e) = engine
        .change_query(siddu_api::FeedQuery::new(config.default_filter))
        .await
    {
        tracing::warn!("[siddu-cli] Initial feed load failed: {}", e);
    }
    print_notices(&mut notices);

    // One-shot mode
    if !command_args.is_empty() {
        let command = Command::parse(&command_args)?;
        let result = commands::run(&engine, command).await;
        print_notices(&mut notices);
        return result;
    }

    println!("{}", commands::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let words: Vec<String> = line.split_whitespace().map(String::from).collect();
        if words.is_empty() {
            continue;
        }
        if words[0] == "quit" || words[0] == "exit" {
            break;
        }
        match Command::parse(&words) {
            Ok(command) => {
                if let Err(e) = commands::run(&engine, command).await {
                    eprintln!("Error: {}", e);
                }
            }
            Err(e) => eprintln!("{}", e),
        }
        print_notices(&mut notices);
    }
    Ok(())
}
