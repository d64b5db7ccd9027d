#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use lgtm::core::config::RouterSettings;
use lgtm::core::models::InboundMessage;
use lgtm::errors::{GitHubError, GitHubErrorKind, SlackError};
use lgtm::github::{ApprovalEngine, CodeHost, PullRequestState};
use lgtm::matcher::PatternMatcher;
use lgtm::slack::{FeedbackReactor, MessageRouter, ReactionSink};

/// Scripted code host. Pull requests are open unless configured otherwise;
/// reviews succeed with id `1000 + number` once scripted results run out.
#[derive(Default)]
pub struct FakeCodeHost {
    states: Mutex<HashMap<u64, Result<PullRequestState, GitHubError>>>,
    reviews: Mutex<HashMap<u64, VecDeque<Result<u64, GitHubError>>>>,
    review_calls: Mutex<Vec<(String, String, u64, Instant)>>,
    get_calls: AtomicUsize,
}

impl FakeCodeHost {
    pub fn with_state(self, number: u64, state: Result<PullRequestState, GitHubError>) -> Self {
        self.states.lock().unwrap().insert(number, state);
        self
    }

    pub fn with_reviews(self, number: u64, results: Vec<Result<u64, GitHubError>>) -> Self {
        self.reviews
            .lock()
            .unwrap()
            .insert(number, results.into_iter().collect());
        self
    }

    pub fn review_count(&self) -> usize {
        self.review_calls.lock().unwrap().len()
    }

    pub fn get_count(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn reviewed(&self) -> Vec<(String, String, u64)> {
        self.review_calls
            .lock()
            .unwrap()
            .iter()
            .map(|(o, r, n, _)| (o.clone(), r.clone(), *n))
            .collect()
    }

    pub fn review_instants(&self) -> Vec<Instant> {
        self.review_calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, _, at)| *at)
            .collect()
    }
}

#[async_trait]
impl CodeHost for FakeCodeHost {
    async fn get_pull_request(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
    ) -> Result<PullRequestState, GitHubError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.states
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .unwrap_or_else(|| Ok(open()))
    }

    async fn create_approval_review(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Option<u64>, GitHubError> {
        self.review_calls
            .lock()
            .unwrap()
            .push((owner.to_string(), repo.to_string(), number, Instant::now()));
        self.reviews
            .lock()
            .unwrap()
            .get_mut(&number)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(1000 + number))
            .map(Some)
    }
}

/// Records every reaction; optionally fails each call after recording it.
#[derive(Default)]
pub struct RecordingSink {
    reactions: Mutex<Vec<(String, String, String)>>,
    pub fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            reactions: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.reactions
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, name)| name.clone())
            .collect()
    }

    pub fn targets(&self) -> Vec<(String, String)> {
        self.reactions
            .lock()
            .unwrap()
            .iter()
            .map(|(channel, ts, _)| (channel.clone(), ts.clone()))
            .collect()
    }
}

#[async_trait]
impl ReactionSink for RecordingSink {
    async fn add_reaction(&self, channel: &str, ts: &str, name: &str) -> Result<(), SlackError> {
        self.reactions
            .lock()
            .unwrap()
            .push((channel.to_string(), ts.to_string(), name.to_string()));
        if self.fail {
            return Err(SlackError::ApiError("ratelimited".into()));
        }
        Ok(())
    }
}

pub fn open() -> PullRequestState {
    PullRequestState {
        state: "open".into(),
        merged: false,
    }
}

pub fn transient(message: &str) -> GitHubError {
    GitHubError::new(GitHubErrorKind::Server, message).with_status(502)
}

pub fn message(text: &str) -> InboundMessage {
    InboundMessage {
        text: text.into(),
        channel_id: "C100".into(),
        user_id: "U200".into(),
        ts: "1700000000.000100".into(),
        thread_ts: None,
    }
}

pub struct Harness {
    pub router: Arc<MessageRouter>,
    pub host: Arc<FakeCodeHost>,
    pub sink: Arc<RecordingSink>,
    pub shutdown: CancellationToken,
}

pub fn harness(
    pattern: &str,
    settings: RouterSettings,
    host: FakeCodeHost,
    sink: RecordingSink,
    base_delay: Duration,
) -> Harness {
    let host = Arc::new(host);
    let sink = Arc::new(sink);
    let shutdown = CancellationToken::new();

    let engine = Arc::new(ApprovalEngine::new(host.clone(), base_delay));
    let reactor = Arc::new(FeedbackReactor::new(sink.clone(), shutdown.clone()));
    let router = Arc::new(MessageRouter::new(
        PatternMatcher::new(pattern).unwrap(),
        engine,
        reactor,
        settings,
        shutdown.clone(),
    ));

    Harness {
        router,
        host,
        sink,
        shutdown,
    }
}
