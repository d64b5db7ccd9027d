use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use lgtm::LgtmBot;
use lgtm::matcher::PatternMatcher;
use lgtm::core::config::{AppConfig, DEFAULT_GITHUB_API_URL, DEFAULT_MESSAGE_PATTERN, LogLevel};

const TROUBLESHOOTING: &str = "Troubleshooting:
- Ensure GITHUB_TOKEN, SLACK_BOT_TOKEN and SLACK_APP_TOKEN are set
- Slack bot token should start with 'xoxb-', app token with 'xapp-'
- Verify the SLACK_MESSAGE_PATTERN regex syntax
- The GitHub token needs 'repo' scope for private repositories or 'public_repo' for public ones
- Socket Mode must be enabled for the Slack app and the bot added to the channel";

#[derive(Parser)]
#[command(
    name = "lgtm",
    version,
    about = "Slack-to-GitHub bot that monitors Slack messages and approves GitHub pull requests"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    settings: Settings,
}

#[derive(Subcommand)]
enum Command {
    /// Start the bot (default)
    Run,
    /// Validate configuration without connecting
    Validate,
    /// Display version information
    Version,
}

#[derive(Args)]
struct Settings {
    /// GitHub personal access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    github_token: Option<String>,

    /// Slack bot user OAuth token
    #[arg(long, env = "SLACK_BOT_TOKEN", hide_env_values = true, global = true)]
    slack_bot_token: Option<String>,

    /// Slack app-level token for Socket Mode
    #[arg(long, env = "SLACK_APP_TOKEN", hide_env_values = true, global = true)]
    slack_app_token: Option<String>,

    /// Channel ID to monitor (empty = all channels)
    #[arg(long, env = "SLACK_CHANNEL_ID", global = true)]
    slack_channel_id: Option<String>,

    /// Regex pattern for message matching
    #[arg(long, env = "SLACK_MESSAGE_PATTERN", default_value = DEFAULT_MESSAGE_PATTERN, global = true)]
    slack_pattern: String,

    /// Default repository owner for bare PR numbers
    #[arg(long, env = "GITHUB_OWNER", global = true)]
    github_owner: Option<String>,

    /// Default repository name for bare PR numbers
    #[arg(long, env = "GITHUB_REPO", global = true)]
    github_repo: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_GITHUB_API_URL, global = true)]
    github_api_url: String,

    /// Logging level (debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,
}

impl Settings {
    fn into_config(self) -> Result<AppConfig> {
        let log_level: LogLevel = self.log_level.parse()?;
        Ok(AppConfig {
            github_token: self.github_token.unwrap_or_default(),
            slack_bot_token: self.slack_bot_token.unwrap_or_default(),
            slack_app_token: self.slack_app_token.unwrap_or_default(),
            slack_channel_id: non_empty(self.slack_channel_id),
            message_pattern: self.slack_pattern,
            default_owner: non_empty(self.github_owner),
            default_repo: non_empty(self.github_repo),
            log_level,
            github_api_url: self.github_api_url,
            retry_base_delay: Duration::from_secs(1),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(cli.settings).await,
        Command::Validate => validate(cli.settings),
        Command::Version => {
            println!("lgtm version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run(settings: Settings) -> Result<()> {
    let config = settings.into_config()?;
    lgtm::setup_logging(config.log_level.as_tracing_level());

    let bot = LgtmBot::new(config).context(TROUBLESHOOTING)?;

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    bot.run(shutdown).await.context(TROUBLESHOOTING)
}

fn validate(settings: Settings) -> Result<()> {
    println!("Validating configuration...");
    let config = settings.into_config()?;
    config.validate().context(TROUBLESHOOTING)?;
    PatternMatcher::new(&config.message_pattern).context(TROUBLESHOOTING)?;
    println!("Configuration valid");
    Ok(())
}

async fn wait_for_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                info!("Received SIGINT, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received SIGINT, shutting down...");
    }

    shutdown.cancel();
}
