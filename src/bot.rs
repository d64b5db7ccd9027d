//! Wiring: builds the matcher, engine, reactor and router from configuration
//! and runs them against Slack Socket Mode.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::config::AppConfig;
use crate::errors::LgtmError;
use crate::github::{ApprovalEngine, GitHubClient};
use crate::matcher::PatternMatcher;
use crate::slack::{FeedbackReactor, MessageRouter, SlackClient, run_socket_mode};

pub struct LgtmBot {
    config: AppConfig,
    matcher: PatternMatcher,
    github: Arc<GitHubClient>,
    slack: Arc<SlackClient>,
}

impl LgtmBot {
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the pattern does not
    /// compile, or the GitHub HTTP client cannot be built.
    pub fn new(config: AppConfig) -> Result<Self, LgtmError> {
        config.validate()?;

        let matcher = PatternMatcher::new(&config.message_pattern)?;
        debug!(pattern = matcher.pattern(), "Pattern matcher initialized");

        let github = Arc::new(GitHubClient::new(
            config.github_token.clone(),
            &config.github_api_url,
        )?);
        let slack = Arc::new(SlackClient::new(config.slack_bot_token.clone()));

        Ok(Self {
            config,
            matcher,
            github,
            slack,
        })
    }

    /// Confirm the GitHub token works and, when defaults are configured,
    /// can see the default repository.
    ///
    /// # Errors
    ///
    /// Returns the GitHub error for the first failing check.
    pub async fn verify_github(&self) -> Result<(), LgtmError> {
        let login = self.github.authenticated_user().await?;
        info!(login = %login, "Authenticated as GitHub user");

        if let (Some(owner), Some(repo)) = (&self.config.default_owner, &self.config.default_repo) {
            self.github.check_repository(owner, repo).await?;
            info!(owner = %owner, repo = %repo, "Repository access confirmed");
        }
        Ok(())
    }

    /// Validate the bot token and return the bot's own user id.
    ///
    /// # Errors
    ///
    /// Returns an error if Slack rejects the bot token.
    pub async fn verify_slack(&self) -> Result<String, LgtmError> {
        let bot_user_id = self.slack.bot_user_id().await?;
        info!(bot_user_id = %bot_user_id, "Bot authenticated with Slack");
        Ok(bot_user_id)
    }

    /// Verify credentials, then process messages until `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if credential checks fail or Socket Mode cannot connect.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), LgtmError> {
        self.verify_github().await?;
        let bot_user_id = self.verify_slack().await?;

        info!(
            pattern = %self.config.message_pattern,
            channel = %self.config.channel_scope(),
            log_level = %self.config.log_level,
            "Configuration loaded"
        );

        let engine = Arc::new(ApprovalEngine::new(
            self.github.clone(),
            self.config.retry_base_delay,
        ));
        let reactor = Arc::new(FeedbackReactor::new(self.slack.clone(), shutdown.clone()));
        let router = Arc::new(MessageRouter::new(
            self.matcher,
            engine,
            reactor,
            self.config.router_settings(Some(bot_user_id)),
            shutdown.clone(),
        ));

        info!("Bot ready - listening for messages...");
        let result = run_socket_mode(router.clone(), &self.config.slack_app_token, shutdown).await;

        router.shutdown().await;
        info!("Bot shutdown complete");
        result.map_err(LgtmError::from)
    }
}
