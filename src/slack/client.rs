//! Slack API client module
//!
//! Wraps the Web API calls the bot needs: identity lookup at startup and
//! adding reactions to messages.

use async_trait::async_trait;
use slack_morphism::errors::SlackClientError;
use slack_morphism::hyper_tokio::{SlackClientHyperConnector, SlackHyperClient};
use slack_morphism::prelude::SlackApiReactionsAddRequest;
use slack_morphism::{SlackApiToken, SlackApiTokenValue, SlackChannelId, SlackReactionName, SlackTs};
use tokio_retry::strategy::jitter;
use tokio_retry::{Retry, strategy::ExponentialBackoff};
use tracing::warn;

use super::reactions::ReactionSink;
use crate::errors::SlackError;

// Build the Slack client connector safely without panicking.
// If connector construction fails, store None and surface a SlackError at call sites.
static SLACK_CLIENT: std::sync::LazyLock<Option<SlackHyperClient>> =
    std::sync::LazyLock::new(|| match SlackClientHyperConnector::new() {
        Ok(connector) => Some(SlackHyperClient::new(connector)),
        Err(e) => {
            warn!("Failed to create Slack HTTP connector: {}", e);
            None
        }
    });

/// Slack's response when the reaction is already on the message.
const ERROR_ALREADY_REACTED: &str = "already_reacted";

pub struct SlackClient {
    token: SlackApiToken,
}

impl SlackClient {
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token: SlackApiToken::new(SlackApiTokenValue::new(token)),
        }
    }

    fn connector() -> Result<&'static SlackHyperClient, SlackError> {
        SLACK_CLIENT.as_ref().ok_or_else(|| {
            SlackError::ConnectorError("Slack HTTP connector not initialized".to_string())
        })
    }

    /// Validate the bot token via `auth.test` and return the bot's own user id.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected after retries.
    pub async fn bot_user_id(&self) -> Result<String, SlackError> {
        let strategy = ExponentialBackoff::from_millis(100).map(jitter).take(3);

        Retry::spawn(strategy, || async {
            let session = Self::connector()?.open_session(&self.token);
            let test_resp = session.auth_test().await?;
            Ok::<_, SlackError>(test_resp.user_id.0)
        })
        .await
    }

    /// Add a reaction once; no retries. An existing identical reaction counts as success.
    ///
    /// # Errors
    ///
    /// Returns an error if the Slack API call fails.
    pub async fn add_reaction(&self, channel: &str, ts: &str, name: &str) -> Result<(), SlackError> {
        let session = Self::connector()?.open_session(&self.token);
        let request = SlackApiReactionsAddRequest::new(
            SlackChannelId(channel.to_string()),
            SlackReactionName(name.to_string()),
            SlackTs(ts.to_string()),
        );

        match session.reactions_add(&request).await {
            Ok(_) => Ok(()),
            Err(SlackClientError::ApiError(e)) if e.code == ERROR_ALREADY_REACTED => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ReactionSink for SlackClient {
    async fn add_reaction(&self, channel: &str, ts: &str, name: &str) -> Result<(), SlackError> {
        SlackClient::add_reaction(self, channel, ts, name).await
    }
}
