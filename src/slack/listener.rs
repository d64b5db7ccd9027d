//! Socket Mode event source.
//!
//! Converts `message` push events into [`InboundMessage`]s and hands them to
//! the router without waiting on processing.

use std::sync::Arc;

use slack_morphism::hyper_tokio::{SlackClientHyperConnector, SlackHyperClient};
use slack_morphism::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::router::MessageRouter;
use crate::core::models::InboundMessage;
use crate::errors::SlackError;

/// Connect with the app-level token and deliver messages to `router` until
/// `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the HTTP connector cannot be built or the Socket Mode
/// connection cannot be opened.
pub async fn run_socket_mode(
    router: Arc<MessageRouter>,
    app_token: &str,
    shutdown: CancellationToken,
) -> Result<(), SlackError> {
    let connector = SlackClientHyperConnector::new()
        .map_err(|e| SlackError::ConnectorError(e.to_string()))?;
    let client = Arc::new(SlackHyperClient::new(connector));

    let callbacks = SlackSocketModeListenerCallbacks::new().with_push_events(on_push_event);
    let environment =
        Arc::new(SlackClientEventsListenerEnvironment::new(client).with_user_state(router));
    let listener = SlackClientSocketModeListener::new(
        &SlackClientSocketModeConfig::new(),
        environment,
        callbacks,
    );

    let token = SlackApiToken::new(SlackApiTokenValue::new(app_token.to_string()));
    info!("Connecting to Slack with Socket Mode...");
    listener.listen_for(&token).await?;
    listener.start().await;
    info!("Connected to Slack workspace");

    shutdown.cancelled().await;
    info!("Stopping Slack listener...");
    listener.shutdown().await;
    Ok(())
}

async fn on_push_event(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> UserCallbackResult<()> {
    let SlackEventCallbackBody::Message(message_event) = event.event else {
        return Ok(());
    };

    let Some(message) = inbound_message(&message_event) else {
        debug!("Ignoring message event without user text");
        return Ok(());
    };

    let router = states
        .read()
        .await
        .get_user_state::<Arc<MessageRouter>>()
        .cloned();

    if let Some(router) = router {
        router.on_message(message);
    }

    Ok(())
}

/// Bot posts, edits, and other events lacking a human sender are dropped here.
fn inbound_message(event: &SlackMessageEvent) -> Option<InboundMessage> {
    if event.sender.bot_id.is_some() {
        return None;
    }

    let user_id = event.sender.user.as_ref()?.0.clone();
    let channel_id = event.origin.channel.as_ref()?.0.clone();
    let text = event.content.as_ref()?.text.clone()?;

    Some(InboundMessage {
        text,
        channel_id,
        user_id,
        ts: event.origin.ts.0.clone(),
        thread_ts: event.origin.thread_ts.as_ref().map(|ts| ts.0.clone()),
    })
}
